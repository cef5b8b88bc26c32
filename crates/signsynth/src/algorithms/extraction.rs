use image::GrayImage;
use imageproc::contours::BorderType;

use crate::{error::Result, traits::ContourExtractor};

/// Imageproc-based contour extractor keeping outer borders only
#[derive(Debug, Clone, Default)]
pub struct ImageprocContourExtractor;

impl ContourExtractor for ImageprocContourExtractor {
    /// Pixels outside the image count as background, so blobs touching the
    /// border still close into an outer contour.
    fn extract_contours(&self, binary_image: &GrayImage) -> Result<Vec<Vec<[f32; 2]>>> {
        let mut padded = GrayImage::new(binary_image.width() + 2, binary_image.height() + 2);
        image::imageops::replace(&mut padded, binary_image, 1, 1);
        let contours = imageproc::contours::find_contours::<i32>(&padded);

        let result = contours
            .into_iter()
            .filter(|contour| {
                matches!(contour.border_type, BorderType::Outer) && contour.parent.is_none()
            })
            .map(|contour| {
                contour
                    .points
                    .iter()
                    .map(|p| [(p.x - 1) as f32, (p.y - 1) as f32])
                    .collect()
            })
            .collect();

        Ok(result)
    }
}

/// Binarize a mask: pixels above `threshold` become 255, the rest 0.
pub fn binarize(mask: &GrayImage, threshold: u8) -> GrayImage {
    imageproc::contrast::threshold(mask, threshold)
}

/// Pick the contour enclosing the largest area.
///
/// Ties fall back to the point count so single-row or single-column blobs,
/// which have zero area, still yield a contour.
pub fn largest_contour(contours: Vec<Vec<[f32; 2]>>) -> Option<Vec<[f32; 2]>> {
    contours.into_iter().max_by(|a, b| {
        shoelace_area(a)
            .total_cmp(&shoelace_area(b))
            .then(a.len().cmp(&b.len()))
    })
}

fn shoelace_area(points: &[[f32; 2]]) -> f64 {
    use geo::Area;
    use geo_types::{Coord, LineString, Polygon};

    if points.len() < 3 {
        return 0.0;
    }
    let ring: Vec<Coord<f64>> = points
        .iter()
        .map(|&[x, y]| Coord { x: x as f64, y: y as f64 })
        .collect();
    Polygon::new(LineString::new(ring), vec![]).unsigned_area()
}
