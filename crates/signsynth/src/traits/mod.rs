use image::{GrayImage, RgbImage};
use crate::error::Result;

/// Trait for contour extraction algorithms
pub trait ContourExtractor: Send + Sync {
    /// Extract the outer contours of the foreground regions of a binary image
    fn extract_contours(&self, image: &GrayImage) -> Result<Vec<Vec<[f32; 2]>>>;
}

/// Trait for compositing a patch into a background image
pub trait ImageBlender: Send + Sync {
    /// Place `patch` with its center at `center` in `background`, restricted
    /// to the nonzero pixels of `mask`. Returns a new image; the background is
    /// left untouched.
    fn blend(
        &self,
        patch: &RgbImage,
        mask: &GrayImage,
        background: &RgbImage,
        center: (i64, i64),
    ) -> Result<RgbImage>;
}
