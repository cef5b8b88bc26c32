use image::GrayImage;
use tracing::debug;

use crate::{
    algorithms::{
        ellipse::{exterior_leak_rate, fit_ellipse, rasterize_ellipse},
        extraction::{binarize, largest_contour, ImageprocContourExtractor},
        polygon::{approximate_closed_polygon, arc_length},
    },
    config::DetectorConfig,
    error::{Result, SynthError},
    traits::ContourExtractor,
    types::{Polygon, ShapeCategory, ShapeDetection},
};

/// Classifies a single-object mask as circle, triangle, inverted triangle,
/// rectangle or others.
///
/// Failures never escape: a missing or degenerate outline is reported as
/// `others` with an unclassified descriptor.
#[derive(Debug, Clone, Default)]
pub struct ShapeDetector<C = ImageprocContourExtractor>
where
    C: ContourExtractor,
{
    pub config: DetectorConfig,
    pub contour_extractor: C,
}

impl ShapeDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            contour_extractor: ImageprocContourExtractor,
        }
    }
}

impl<C: ContourExtractor> ShapeDetector<C> {
    pub fn with_extractor(config: DetectorConfig, contour_extractor: C) -> Self {
        Self {
            config,
            contour_extractor,
        }
    }

    pub fn detect(&self, mask: &GrayImage) -> ShapeDetection {
        self.try_detect(mask)
            .unwrap_or_else(|_| ShapeDetection::unclassified())
    }

    /// Like [`detect`](Self::detect), but reports an `others` outcome as
    /// `UnclassifiableShape` with the approximated vertex count.
    pub fn try_detect(&self, mask: &GrayImage) -> Result<ShapeDetection> {
        let binary = binarize(mask, self.config.mask_threshold);
        let Some(contour) = self.outer_contour(&binary) else {
            debug!("mask has no foreground contour");
            return Err(SynthError::UnclassifiableShape { vertices: 0 });
        };

        if contour.len() >= self.config.min_ellipse_points {
            if let Some(detection) = self.try_circle(&binary, &contour) {
                return Ok(detection);
            }
        }

        self.classify_polygon(&contour)
    }

    fn outer_contour(&self, binary: &GrayImage) -> Option<Vec<[f32; 2]>> {
        match self.contour_extractor.extract_contours(binary) {
            Ok(contours) => largest_contour(contours),
            Err(err) => {
                debug!(%err, "contour extraction failed");
                None
            }
        }
    }

    fn try_circle(&self, binary: &GrayImage, contour: &[[f32; 2]]) -> Option<ShapeDetection> {
        let ellipse = fit_ellipse(contour)?;
        let inside = rasterize_ellipse(
            &ellipse,
            binary.width(),
            binary.height(),
            self.config.ellipse_margin,
        );
        let rate = exterior_leak_rate(binary, &inside)?;
        debug!(rate, a = ellipse.a, b = ellipse.b, "ellipse exterior leak");

        (rate < self.config.circle_leak_threshold).then(|| ShapeDetection::circle(ellipse))
    }

    fn classify_polygon(&self, contour: &[[f32; 2]]) -> Result<ShapeDetection> {
        let epsilon = self.config.polygon_epsilon_ratio * arc_length(contour, true);
        if epsilon <= 0.0 {
            // Every contour point coincides.
            return Err(SynthError::UnclassifiableShape { vertices: 1 });
        }

        let mut vertices = approximate_closed_polygon(contour, epsilon);
        vertices.sort_by(|a, b| a[1].total_cmp(&b[1]));
        debug!(count = vertices.len(), epsilon, "polygon approximation");

        match vertices.len() {
            3 => {
                // Apex-down when the two upper vertices sit closer together
                // vertically than the lower pair.
                let upper_gap = (vertices[0][1] - vertices[1][1]).abs();
                let lower_gap = (vertices[1][1] - vertices[2][1]).abs();
                let category = if upper_gap < lower_gap {
                    ShapeCategory::InvertedTriangle
                } else {
                    ShapeCategory::Triangle
                };
                Ok(ShapeDetection::from_polygon(category, Polygon::new(vertices)))
            }
            4 => Ok(ShapeDetection::from_polygon(
                ShapeCategory::Rectangle,
                Polygon::new(vertices),
            )),
            count => Err(SynthError::UnclassifiableShape { vertices: count }),
        }
    }
}

/// Detect the shape of a mask with the default contour extractor.
pub fn detect_shape(mask: &GrayImage, config: &DetectorConfig) -> ShapeDetection {
    ShapeDetector::new(config.clone()).detect(mask)
}
