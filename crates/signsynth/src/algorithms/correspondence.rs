use crate::{error::{Result, SynthError}, types::Polygon};

/// Three canonical correspondence points: the two topmost vertices ordered
/// left to right, then the leftmost of the remaining vertices.
///
/// Vertices are first put in a total `(y, x)` order, so any permutation of
/// the same vertex list yields the same points in the same order.
pub fn canonical_points(polygon: &Polygon) -> Result<[[f32; 2]; 3]> {
    if polygon.len() < 3 {
        return Err(SynthError::UnclassifiableShape {
            vertices: polygon.len(),
        });
    }

    let mut sorted = polygon.vertices.clone();
    sorted.sort_by(|a, b| a[1].total_cmp(&b[1]).then(a[0].total_cmp(&b[0])));

    let by_x = |a: &[f32; 2], b: &[f32; 2]| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1]));

    let (top, rest) = sorted.split_at(2);
    let (top_left, top_right) = if by_x(&top[0], &top[1]).is_le() {
        (top[0], top[1])
    } else {
        (top[1], top[0])
    };
    let bottom_left = rest
        .iter()
        .copied()
        .min_by(|a, b| by_x(a, b))
        .ok_or(SynthError::UnclassifiableShape {
            vertices: polygon.len(),
        })?;

    Ok([top_left, top_right, bottom_left])
}
