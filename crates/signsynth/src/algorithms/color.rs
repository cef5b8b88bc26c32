use image::{GrayImage, RgbImage};

use crate::{
    error::{Result, SynthError},
    types::DominantColor,
};

/// Mean `[r, g, b]` over the nonzero pixels of `mask`.
///
/// Returns `Ok(None)` when the mask has no foreground.
pub fn masked_channel_means(region: &RgbImage, mask: &GrayImage) -> Result<Option<[f64; 3]>> {
    if region.dimensions() != mask.dimensions() {
        return Err(SynthError::DimensionMismatch {
            expected: mask.dimensions(),
            actual: region.dimensions(),
        });
    }

    let mut sums = [0.0f64; 3];
    let mut count = 0usize;
    for (pixel, weight) in region.pixels().zip(mask.pixels()) {
        if weight.0[0] == 0 {
            continue;
        }
        for (sum, &value) in sums.iter_mut().zip(pixel.0.iter()) {
            *sum += value as f64;
        }
        count += 1;
    }

    if count == 0 {
        return Ok(None);
    }
    Ok(Some(sums.map(|sum| sum / count as f64)))
}

/// Label the region by the channel with the greatest masked mean.
pub fn classify_color(region: &RgbImage, mask: &GrayImage) -> Result<DominantColor> {
    let [r, g, b] = masked_channel_means(region, mask)?.ok_or(SynthError::UndefinedColor)?;

    // Strict comparisons keep the earlier channel on ties.
    let mut best = (DominantColor::Blue, b);
    for candidate in [(DominantColor::Green, g), (DominantColor::Red, r)] {
        if candidate.1 > best.1 {
            best = candidate;
        }
    }
    Ok(best.0)
}
