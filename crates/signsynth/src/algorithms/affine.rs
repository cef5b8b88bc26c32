use imageproc::geometric_transformations::Projection;
use nalgebra::{Matrix3, Vector3};

use crate::error::{Result, SynthError};

/// 2×3 affine map `[x', y'] = M · [x, y, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub matrix: [[f64; 3]; 2],
}

impl AffineTransform {
    /// Exact affine map taking each `src[i]` onto `dst[i]`.
    ///
    /// Fails with `DegenerateTransform` when the source points are collinear.
    pub fn from_correspondences(src: &[[f32; 2]; 3], dst: &[[f32; 2]; 3]) -> Result<Self> {
        let system = Matrix3::from_fn(|row, col| match col {
            0 => src[row][0] as f64,
            1 => src[row][1] as f64,
            _ => 1.0,
        });
        // Collinear sources give a zero-area triangle.
        if system.determinant().abs() < 1e-9 {
            return Err(SynthError::DegenerateTransform);
        }
        let inverse = system.try_inverse().ok_or(SynthError::DegenerateTransform)?;

        let xs = inverse * Vector3::from_fn(|row, _| dst[row][0] as f64);
        let ys = inverse * Vector3::from_fn(|row, _| dst[row][1] as f64);

        Ok(Self {
            matrix: [[xs[0], xs[1], xs[2]], [ys[0], ys[1], ys[2]]],
        })
    }

    pub fn apply(&self, [x, y]: [f32; 2]) -> [f32; 2] {
        let [r0, r1] = self.matrix;
        let (x, y) = (x as f64, y as f64);
        [
            (r0[0] * x + r0[1] * y + r0[2]) as f32,
            (r1[0] * x + r1[1] * y + r1[2]) as f32,
        ]
    }

    /// The same map as an imageproc projection, for warping images.
    pub fn to_projection(&self) -> Result<Projection> {
        let [r0, r1] = self.matrix;
        #[rustfmt::skip]
        let matrix = [
            r0[0] as f32, r0[1] as f32, r0[2] as f32,
            r1[0] as f32, r1[1] as f32, r1[2] as f32,
            0.0, 0.0, 1.0,
        ];
        Projection::from_matrix(matrix).ok_or(SynthError::DegenerateTransform)
    }
}
