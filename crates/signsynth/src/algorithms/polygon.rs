use geo_types::{Coord, LineString};

/// Length of a contour, including the closing segment when `closed`
pub fn arc_length(contour: &[[f32; 2]], closed: bool) -> f64 {
    use geo::EuclideanLength;

    let mut coords: Vec<Coord<f64>> = contour
        .iter()
        .map(|&[x, y]| Coord { x: x as f64, y: y as f64 })
        .collect();
    if closed {
        if let Some(&first) = coords.first() {
            coords.push(first);
        }
    }
    LineString::new(coords).euclidean_length()
}

/// Douglas-Peucker approximation of a closed contour.
///
/// The ring is cut at its first point and at the point farthest from it; each
/// half is simplified with geo's Ramer-Douglas-Peucker and the halves are
/// joined again, so both cut points always survive. The result holds each
/// vertex once, without repeating the first point at the end.
pub fn approximate_closed_polygon(contour: &[[f32; 2]], epsilon: f64) -> Vec<[f32; 2]> {
    let mut ring = dedup_ring(contour);
    if ring.len() < 3 {
        return ring;
    }

    let start = ring[0];
    let far = ring
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| dist_sq(start, **a).total_cmp(&dist_sq(start, **b)))
        .map(|(i, _)| i)
        .unwrap_or(0);
    if far == 0 {
        ring.truncate(1);
        return ring;
    }

    let first_half = simplify_chain(&ring[..=far], epsilon);
    let mut second: Vec<[f32; 2]> = ring[far..].to_vec();
    second.push(start);
    let second_half = simplify_chain(&second, epsilon);

    // Both halves share the cut points: keep them from the first half only.
    let mut vertices = first_half;
    vertices.extend_from_slice(&second_half[1..second_half.len() - 1]);
    vertices
}

fn simplify_chain(chain: &[[f32; 2]], epsilon: f64) -> Vec<[f32; 2]> {
    use geo::Simplify;

    let line: LineString<f64> = chain
        .iter()
        .map(|&[x, y]| Coord { x: x as f64, y: y as f64 })
        .collect::<Vec<_>>()
        .into();
    line.simplify(&epsilon)
        .coords()
        .map(|coord| [coord.x as f32, coord.y as f32])
        .collect()
}

/// Drop consecutive duplicates and a trailing copy of the first point.
fn dedup_ring(contour: &[[f32; 2]]) -> Vec<[f32; 2]> {
    let mut ring = contour.to_vec();
    ring.dedup();
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

fn dist_sq(a: [f32; 2], b: [f32; 2]) -> f64 {
    let dx = (a[0] - b[0]) as f64;
    let dy = (a[1] - b[1]) as f64;
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Pixel-stepped outline of an axis-aligned rectangle, clockwise from the
    /// top-left corner.
    fn rectangle_outline(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<[f32; 2]> {
        let mut pts = Vec::new();
        for x in x0..x1 {
            pts.push([x as f32, y0 as f32]);
        }
        for y in y0..y1 {
            pts.push([x1 as f32, y as f32]);
        }
        for x in (x0 + 1..=x1).rev() {
            pts.push([x as f32, y1 as f32]);
        }
        for y in (y0 + 1..=y1).rev() {
            pts.push([x0 as f32, y as f32]);
        }
        pts
    }

    #[test]
    fn test_arc_length_closed_and_open() {
        let square = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];
        assert_relative_eq!(arc_length(&square, true), 40.0);
        assert_relative_eq!(arc_length(&square, false), 30.0);
        assert_eq!(arc_length(&[], true), 0.0);
    }

    #[test]
    fn test_rectangle_reduces_to_corners() {
        let outline = rectangle_outline(2, 3, 40, 25);
        let epsilon = 0.1 * arc_length(&outline, true);
        let vertices = approximate_closed_polygon(&outline, epsilon);

        assert_eq!(vertices.len(), 4);
        for corner in [[2.0, 3.0], [40.0, 3.0], [40.0, 25.0], [2.0, 25.0]] {
            assert!(vertices.contains(&corner), "missing corner {corner:?}");
        }
    }

    #[test]
    fn test_closing_duplicate_is_ignored() {
        let mut outline = rectangle_outline(0, 0, 20, 10);
        outline.push(outline[0]);
        let vertices = approximate_closed_polygon(&outline, 3.0);
        assert_eq!(vertices.len(), 4);
    }

    #[test]
    fn test_degenerate_contours() {
        assert_eq!(approximate_closed_polygon(&[], 1.0).len(), 0);
        assert_eq!(approximate_closed_polygon(&[[1.0, 1.0], [2.0, 2.0]], 1.0).len(), 2);
        assert_eq!(approximate_closed_polygon(&[[3.0, 3.0]; 4], 1.0).len(), 1);
    }
}
