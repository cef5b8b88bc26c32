//! Direct least-squares ellipse fitting (Fitzgibbon, Halir-Flusser form) and
//! the exterior-leak rate used to tell circular signs from polygons.

use image::{GrayImage, Luma};
use nalgebra::{Matrix3, Vector3};

use crate::types::Ellipse;

/// Fit an ellipse to contour points.
///
/// Requires at least 5 points. Returns `None` when the points are degenerate
/// (collinear, all equal) or the best conic is not a real ellipse.
pub fn fit_ellipse(points: &[[f32; 2]]) -> Option<Ellipse> {
    if points.len() < 5 {
        return None;
    }

    // Shift to the centroid and scale so the mean distance is sqrt(2).
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p[0] as f64).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p[1] as f64).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| (p[0] as f64 - mean_x).hypot(p[1] as f64 - mean_y))
        .sum::<f64>()
        / n;
    if mean_dist < 1e-12 {
        return None;
    }
    let scale = std::f64::consts::SQRT_2 / mean_dist;

    // Scatter blocks: S1 = D1ᵀD1, S2 = D1ᵀD2, S3 = D2ᵀD2 with
    // D1 = [x², xy, y²] and D2 = [x, y, 1].
    let mut s1 = Matrix3::<f64>::zeros();
    let mut s2 = Matrix3::<f64>::zeros();
    let mut s3 = Matrix3::<f64>::zeros();
    for &[px, py] in points {
        let x = (px as f64 - mean_x) * scale;
        let y = (py as f64 - mean_y) * scale;
        let d1 = Vector3::new(x * x, x * y, y * y);
        let d2 = Vector3::new(x, y, 1.0);
        s1 += d1 * d1.transpose();
        s2 += d1 * d2.transpose();
        s3 += d2 * d2.transpose();
    }

    let t = -s3.try_inverse()? * s2.transpose();
    let m = s1 + s2 * t;
    // Premultiply by the inverse of the constraint matrix [[0,0,2],[0,-1,0],[2,0,0]].
    #[rustfmt::skip]
    let reduced = Matrix3::new(
        m[(2, 0)] / 2.0, m[(2, 1)] / 2.0, m[(2, 2)] / 2.0,
        -m[(1, 0)], -m[(1, 1)], -m[(1, 2)],
        m[(0, 0)] / 2.0, m[(0, 1)] / 2.0, m[(0, 2)] / 2.0,
    );

    let a1 = reduced
        .complex_eigenvalues()
        .iter()
        .filter(|ev| ev.im.abs() <= 1e-9 * ev.re.abs().max(1.0))
        .filter_map(|ev| null_vector(&(reduced - Matrix3::identity() * ev.re)))
        .find(|v| 4.0 * v[0] * v[2] - v[1] * v[1] > 0.0)?;
    let a2 = t * a1;

    let ellipse = conic_to_ellipse([a1[0], a1[1], a1[2], a2[0], a2[1], a2[2]])?;
    let ellipse = Ellipse {
        cx: ellipse.cx / scale + mean_x,
        cy: ellipse.cy / scale + mean_y,
        a: ellipse.a / scale,
        b: ellipse.b / scale,
        angle: ellipse.angle,
    };
    ellipse.is_valid().then_some(ellipse)
}

/// Null vector of a rank-2 3×3 matrix: the adjugate row with the largest norm.
fn null_vector(m: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let rows = [
        m.row(1).transpose().cross(&m.row(2).transpose()),
        m.row(2).transpose().cross(&m.row(0).transpose()),
        m.row(0).transpose().cross(&m.row(1).transpose()),
    ];
    let best = rows
        .into_iter()
        .max_by(|a, b| a.norm_squared().total_cmp(&b.norm_squared()))?;
    let norm = best.norm();
    (norm > 1e-15).then(|| best / norm)
}

/// Convert `A x² + B xy + C y² + D x + E y + F = 0` to geometric form.
fn conic_to_ellipse([a, b, c, d, e, f]: [f64; 6]) -> Option<Ellipse> {
    let den = 4.0 * a * c - b * b;
    if den <= 0.0 {
        return None;
    }
    let cx = (b * e - 2.0 * c * d) / den;
    let cy = (b * d - 2.0 * a * e) / den;
    let f0 = f + (d * cx + e * cy) / 2.0;

    // Eigenvalues of [[a, b/2], [b/2, c]]; theta is the direction of l_max.
    let r = (a - c).hypot(b);
    let l_max = (a + c) / 2.0 + r / 2.0;
    let l_min = (a + c) / 2.0 - r / 2.0;
    let theta = 0.5 * b.atan2(a - c);

    let r_theta = (-f0 / l_max).sqrt();
    let r_ortho = (-f0 / l_min).sqrt();
    if !(r_theta.is_finite() && r_ortho.is_finite()) || r_theta <= 0.0 || r_ortho <= 0.0 {
        return None;
    }

    let (semi_major, semi_minor, angle) = if r_theta >= r_ortho {
        (r_theta, r_ortho, theta)
    } else {
        (r_ortho, r_theta, theta + std::f64::consts::FRAC_PI_2)
    };

    Some(Ellipse {
        cx,
        cy,
        a: semi_major,
        b: semi_minor,
        angle: normalize_angle(angle),
    })
}

/// Wrap an axis angle into (-π/2, π/2].
fn normalize_angle(angle: f64) -> f64 {
    use std::f64::consts::{FRAC_PI_2, PI};
    let mut angle = angle % PI;
    if angle > FRAC_PI_2 {
        angle -= PI;
    } else if angle <= -FRAC_PI_2 {
        angle += PI;
    }
    angle
}

/// Rasterize a filled ellipse, grown by `margin` pixels, into a 0/255 mask.
pub fn rasterize_ellipse(ellipse: &Ellipse, width: u32, height: u32, margin: f64) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        if ellipse.contains(x as f64, y as f64, margin) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Fraction of the ellipse exterior covered by mask foreground:
/// `|foreground ∩ exterior| / |exterior|`.
///
/// Returns `None` when the ellipse covers the whole mask, since the rate is
/// undefined without exterior pixels.
pub fn exterior_leak_rate(mask: &GrayImage, ellipse_mask: &GrayImage) -> Option<f64> {
    let (exterior, leaked) = mask
        .pixels()
        .zip(ellipse_mask.pixels())
        .filter(|(_, inside)| inside.0[0] == 0)
        .fold((0usize, 0usize), |(exterior, leaked), (fg, _)| {
            (exterior + 1, leaked + usize::from(fg.0[0] > 0))
        });

    (exterior > 0).then(|| leaked as f64 / exterior as f64)
}
