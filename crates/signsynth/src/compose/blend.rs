//! Blenders that place a masked patch into a background image.

use image::{GrayImage, Rgb, RgbImage};
use tracing::debug;

use crate::{
    config::{BlendConfig, BlendMode},
    error::{Result, SynthError},
    traits::ImageBlender,
};

/// Build the blender selected by `config.mode`
pub fn blender_for(config: &BlendConfig) -> Box<dyn ImageBlender> {
    match config.mode {
        BlendMode::Seamless => Box::new(PoissonBlender::from(config)),
        BlendMode::Paste => Box::new(PasteBlender),
    }
}

/// Top-left corner of a `width`×`height` patch centered at `center`, or
/// `CompositeOutOfBounds` when the patch does not fit the background.
pub fn patch_origin(
    patch: (u32, u32),
    background: (u32, u32),
    center: (i64, i64),
) -> Result<(u32, u32)> {
    let (width, height) = patch;
    let (bg_width, bg_height) = background;
    let x = center.0 - width as i64 / 2;
    let y = center.1 - height as i64 / 2;

    let fits = x >= 0
        && y >= 0
        && x + width as i64 <= bg_width as i64
        && y + height as i64 <= bg_height as i64;
    if !fits {
        return Err(SynthError::CompositeOutOfBounds {
            x,
            y,
            width,
            height,
            bg_width,
            bg_height,
        });
    }
    Ok((x as u32, y as u32))
}

fn check_mask(patch: &RgbImage, mask: &GrayImage) -> Result<()> {
    if patch.dimensions() != mask.dimensions() {
        return Err(SynthError::DimensionMismatch {
            expected: patch.dimensions(),
            actual: mask.dimensions(),
        });
    }
    Ok(())
}

/// Copies patch pixels wherever the mask is set, leaving a hard edge.
#[derive(Debug, Clone, Default)]
pub struct PasteBlender;

impl ImageBlender for PasteBlender {
    fn blend(
        &self,
        patch: &RgbImage,
        mask: &GrayImage,
        background: &RgbImage,
        center: (i64, i64),
    ) -> Result<RgbImage> {
        check_mask(patch, mask)?;
        let (x0, y0) = patch_origin(patch.dimensions(), background.dimensions(), center)?;

        let mut output = background.clone();
        for (x, y, pixel) in patch.enumerate_pixels() {
            if mask.get_pixel(x, y).0[0] > 0 {
                output.put_pixel(x0 + x, y0 + y, *pixel);
            }
        }
        Ok(output)
    }
}

/// Gradient-domain (Poisson) cloning.
///
/// Inside the mask the result keeps the patch's Laplacian while matching the
/// background on the mask border, so color and illumination blend across the
/// seam. Mask pixels on the outermost patch row or column act as border.
#[derive(Debug, Clone)]
pub struct PoissonBlender {
    pub max_iterations: usize,
    pub tolerance: f32,
    pub relaxation: f32,
}

impl Default for PoissonBlender {
    fn default() -> Self {
        Self::from(&BlendConfig::default())
    }
}

impl From<&BlendConfig> for PoissonBlender {
    fn from(config: &BlendConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            relaxation: config.relaxation,
        }
    }
}

impl ImageBlender for PoissonBlender {
    fn blend(
        &self,
        patch: &RgbImage,
        mask: &GrayImage,
        background: &RgbImage,
        center: (i64, i64),
    ) -> Result<RgbImage> {
        check_mask(patch, mask)?;
        let (x0, y0) = patch_origin(patch.dimensions(), background.dimensions(), center)?;
        let (width, height) = patch.dimensions();
        let w = width as usize;
        let mut output = background.clone();

        let interior: Vec<bool> = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| {
                x > 0 && y > 0 && x + 1 < width && y + 1 < height && mask.get_pixel(x, y).0[0] > 0
            })
            .collect();
        let unknowns = interior.iter().filter(|&&inside| inside).count();
        if unknowns == 0 {
            debug!("empty blend mask, background returned unchanged");
            return Ok(output);
        }

        let src: Vec<[f32; 3]> = patch.pixels().map(|p| p.0.map(f32::from)).collect();
        let dst: Vec<[f32; 3]> = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| background.get_pixel(x0 + x, y0 + y).0.map(f32::from))
            .collect();

        // Guidance: discrete Laplacian of the patch, Σ_q (s_p - s_q).
        let mut guidance = vec![[0.0f32; 3]; src.len()];
        for (i, _) in interior.iter().enumerate().filter(|(_, inside)| **inside) {
            for q in [i - 1, i + 1, i - w, i + w] {
                for c in 0..3 {
                    guidance[i][c] += src[i][c] - src[q][c];
                }
            }
        }

        // Start from the patch shifted by the mean border offset; the solver
        // then only has to remove the remaining low-frequency mismatch.
        let offset = border_offset(&interior, &src, &dst, w);
        let mut field = dst;
        for (i, _) in interior.iter().enumerate().filter(|(_, inside)| **inside) {
            for c in 0..3 {
                field[i][c] = src[i][c] + offset[c];
            }
        }

        let mut sweeps = 0;
        for _ in 0..self.max_iterations {
            sweeps += 1;
            let mut max_delta = 0.0f32;
            for (i, _) in interior.iter().enumerate().filter(|(_, inside)| **inside) {
                for c in 0..3 {
                    let neighbours =
                        field[i - 1][c] + field[i + 1][c] + field[i - w][c] + field[i + w][c];
                    let delta = (neighbours + guidance[i][c]) / 4.0 - field[i][c];
                    field[i][c] += self.relaxation * delta;
                    max_delta = max_delta.max(delta.abs());
                }
            }
            if max_delta < self.tolerance {
                break;
            }
        }
        debug!(unknowns, sweeps, "poisson blend solved");

        for (i, _) in interior.iter().enumerate().filter(|(_, inside)| **inside) {
            let x = (i % w) as u32;
            let y = (i / w) as u32;
            let value = field[i].map(|v| v.round().clamp(0.0, 255.0) as u8);
            output.put_pixel(x0 + x, y0 + y, Rgb(value));
        }
        Ok(output)
    }
}

/// Mean `dst - src` over the border pixels adjacent to the interior.
fn border_offset(interior: &[bool], src: &[[f32; 3]], dst: &[[f32; 3]], w: usize) -> [f32; 3] {
    let mut sum = [0.0f32; 3];
    let mut count = 0usize;
    for (i, _) in interior.iter().enumerate().filter(|(_, inside)| **inside) {
        for q in [i - 1, i + 1, i - w, i + w] {
            if !interior[q] {
                for c in 0..3 {
                    sum[c] += dst[q][c] - src[q][c];
                }
                count += 1;
            }
        }
    }
    if count == 0 {
        return [0.0; 3];
    }
    sum.map(|s| s / count as f32)
}
