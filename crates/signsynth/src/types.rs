use std::str::FromStr;

use image::RgbImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::SynthError;

/// Sign outline categories the detector can tell apart.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ShapeCategory {
    Circle,
    Triangle,
    InvertedTriangle,
    Rectangle,
    Others,
}

impl ShapeCategory {
    /// Categories composited through the affine (polygon) path
    pub fn is_polygon(self) -> bool {
        matches!(
            self,
            Self::Triangle | Self::InvertedTriangle | Self::Rectangle
        )
    }
}

/// Channel with the greatest mask-weighted mean.
///
/// Variants are declared in the channel order used to break ties
/// (blue wins over green wins over red on equal means).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum DominantColor {
    #[serde(rename = "blue", alias = "b")]
    #[strum(to_string = "blue", serialize = "b")]
    Blue,
    #[serde(rename = "green", alias = "g")]
    #[strum(to_string = "green", serialize = "g")]
    Green,
    #[serde(rename = "red", alias = "r")]
    #[strum(to_string = "red", serialize = "r")]
    Red,
}

/// Geometric ellipse parameters in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub cx: f64,
    pub cy: f64,
    /// Semi-major axis length.
    pub a: f64,
    /// Semi-minor axis length.
    pub b: f64,
    /// Rotation of the major axis from +x, in radians.
    pub angle: f64,
}

impl Ellipse {
    pub fn center(&self) -> (f64, f64) {
        (self.cx, self.cy)
    }

    /// Full axis lengths as `(major, minor)`
    pub fn axes(&self) -> (f64, f64) {
        (2.0 * self.a, 2.0 * self.b)
    }

    pub fn is_valid(&self) -> bool {
        self.a > 0.0
            && self.b > 0.0
            && self.a.is_finite()
            && self.b.is_finite()
            && self.cx.is_finite()
            && self.cy.is_finite()
            && self.angle.is_finite()
    }

    /// Whether `(x, y)` lies inside the ellipse grown by `margin` pixels on
    /// both semi-axes.
    pub fn contains(&self, x: f64, y: f64, margin: f64) -> bool {
        let (sin_a, cos_a) = self.angle.sin_cos();
        let dx = x - self.cx;
        let dy = y - self.cy;
        let u = dx * cos_a + dy * sin_a;
        let v = -dx * sin_a + dy * cos_a;
        let a = self.a + margin;
        let b = self.b + margin;
        (u * u) / (a * a) + (v * v) / (b * b) <= 1.0
    }
}

/// Ordered polygon vertices, sorted by ascending vertical coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<[f32; 2]>,
}

impl Polygon {
    pub fn new(vertices: Vec<[f32; 2]>) -> Self {
        Self { vertices }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Get the bounding box of the vertices
    pub fn bounding_box(&self) -> ([f32; 2], [f32; 2]) {
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;

        for &[x, y] in &self.vertices {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        ([min_x, min_y], [max_x, max_y])
    }
}

/// Geometric descriptor attached to a detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum ShapeDescriptor {
    Ellipse(Ellipse),
    Polygon(Polygon),
    Unclassified,
}

/// Category plus descriptor produced by the shape detector.
///
/// Only the detector builds these, so the category always agrees with the
/// descriptor: `circle` carries an ellipse, the polygon categories carry 3 or
/// 4 vertices and `others` carries nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeDetection {
    category: ShapeCategory,
    descriptor: ShapeDescriptor,
}

impl ShapeDetection {
    pub(crate) fn circle(ellipse: Ellipse) -> Self {
        Self {
            category: ShapeCategory::Circle,
            descriptor: ShapeDescriptor::Ellipse(ellipse),
        }
    }

    pub(crate) fn from_polygon(category: ShapeCategory, polygon: Polygon) -> Self {
        debug_assert!(category.is_polygon());
        Self {
            category,
            descriptor: ShapeDescriptor::Polygon(polygon),
        }
    }

    pub(crate) fn unclassified() -> Self {
        Self {
            category: ShapeCategory::Others,
            descriptor: ShapeDescriptor::Unclassified,
        }
    }

    pub fn category(&self) -> ShapeCategory {
        self.category
    }

    pub fn descriptor(&self) -> &ShapeDescriptor {
        &self.descriptor
    }

    pub fn is_classified(&self) -> bool {
        self.category != ShapeCategory::Others
    }

    pub fn polygon(&self) -> Option<&Polygon> {
        match &self.descriptor {
            ShapeDescriptor::Polygon(polygon) => Some(polygon),
            _ => None,
        }
    }

    pub fn ellipse(&self) -> Option<&Ellipse> {
        match &self.descriptor {
            ShapeDescriptor::Ellipse(ellipse) => Some(ellipse),
            _ => None,
        }
    }
}

/// Integer pixel rectangle; the origin may lie outside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Top-left corner clamped into the image
    pub fn clamped_origin(&self) -> (u32, u32) {
        (self.x.max(0) as u32, self.y.max(0) as u32)
    }
}

/// Horizontal third of the photograph holding the object center.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HorizontalPosition {
    Left,
    Center,
    Right,
}

/// Normalized bounding box `(cx, cy, w, h)` in [0, 1] plus a class id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub class_id: u32,
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl Annotation {
    pub fn new(class_id: u32, cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self {
            class_id,
            cx,
            cy,
            w,
            h,
        }
    }

    /// Box width and height in pixels, unrounded
    pub fn pixel_size(&self, image_width: u32, image_height: u32) -> (f64, f64) {
        (
            self.w * image_width as f64,
            self.h * image_height as f64,
        )
    }

    /// Box center in pixels, truncated toward zero
    pub fn pixel_center(&self, image_width: u32, image_height: u32) -> (i64, i64) {
        (
            (self.cx * image_width as f64) as i64,
            (self.cy * image_height as f64) as i64,
        )
    }

    /// Box in pixels. The top-left corner is truncated toward zero.
    pub fn pixel_rect(&self, image_width: u32, image_height: u32) -> PixelRect {
        let (w, h) = self.pixel_size(image_width, image_height);
        PixelRect {
            x: ((self.cx - self.w / 2.0) * image_width as f64) as i64,
            y: ((self.cy - self.h / 2.0) * image_height as f64) as i64,
            width: w.max(0.0) as u32,
            height: h.max(0.0) as u32,
        }
    }

    pub fn position(&self, image_width: u32) -> HorizontalPosition {
        let (cx, _) = self.pixel_center(image_width, 1);
        let third = (image_width / 3) as i64;
        if cx < third {
            HorizontalPosition::Left
        } else if cx > (image_width as i64 * 2) / 3 {
            HorizontalPosition::Right
        } else {
            HorizontalPosition::Center
        }
    }
}

impl FromStr for Annotation {
    type Err = SynthError;

    /// Parse a `class cx cy w h` line.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<f64> = line
            .split_whitespace()
            .map(|field| {
                field
                    .parse::<f64>()
                    .map_err(|e| SynthError::InvalidAnnotation(format!("{field:?}: {e}")))
            })
            .collect::<Result<_, _>>()?;

        let &[class, cx, cy, w, h] = fields.as_slice() else {
            return Err(SynthError::InvalidAnnotation(format!(
                "expected 5 fields, got {}",
                fields.len()
            )));
        };

        if class < 0.0 || class.fract() != 0.0 {
            return Err(SynthError::InvalidAnnotation(format!(
                "class id must be a non-negative integer, got {class}"
            )));
        }
        if w <= 0.0 || h <= 0.0 {
            return Err(SynthError::InvalidAnnotation(format!(
                "box size must be positive, got {w}x{h}"
            )));
        }

        Ok(Self::new(class as u32, cx, cy, w, h))
    }
}

/// One row of the reference icon table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct CatalogEntry {
    pub id: String,
    pub shape: ShapeCategory,
    pub color: DominantColor,
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, shape: ShapeCategory, color: DominantColor) -> Self {
        Self {
            id: id.into(),
            shape,
            color,
        }
    }
}

/// Metadata describing one produced composite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SynthRecord {
    pub sign_id: String,
    pub shape: ShapeCategory,
    pub color: DominantColor,
    pub position: HorizontalPosition,
}

/// A composite photograph plus the icon that was placed in it.
#[derive(Debug, Clone)]
pub struct CompositeResult {
    pub image: RgbImage,
    pub record: SynthRecord,
}

impl CompositeResult {
    pub fn entry_id(&self) -> &str {
        &self.record.sign_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_parses_yolo_line() {
        let ann: Annotation = "3 0.5 0.25 0.25 0.5".parse().expect("valid line");
        assert_eq!(ann.class_id, 3);
        assert_eq!(ann.pixel_center(200, 100), (100, 25));

        let rect = ann.pixel_rect(200, 100);
        assert_eq!((rect.x, rect.y), (75, 0));
        assert_eq!((rect.width, rect.height), (50, 50));
    }

    #[test]
    fn test_box_past_left_edge_clamps_origin() {
        let rect = Annotation::new(0, 0.0, 0.5, 0.5, 0.5).pixel_rect(100, 100);
        assert_eq!((rect.x, rect.y), (-25, 25));
        assert_eq!(rect.clamped_origin(), (0, 25));
    }

    #[test]
    fn test_annotation_rejects_bad_input() {
        assert!("1 0.5 0.5 0.1".parse::<Annotation>().is_err());
        assert!("x 0.5 0.5 0.1 0.1".parse::<Annotation>().is_err());
        assert!("1.5 0.5 0.5 0.1 0.1".parse::<Annotation>().is_err());
        assert!("1 0.5 0.5 0.0 0.1".parse::<Annotation>().is_err());
    }

    #[test]
    fn test_position_thirds() {
        let at = |cx| Annotation::new(0, cx, 0.5, 0.1, 0.1).position(300);
        assert_eq!(at(0.1), HorizontalPosition::Left);
        assert_eq!(at(0.5), HorizontalPosition::Center);
        assert_eq!(at(0.9), HorizontalPosition::Right);
    }

    #[test]
    fn test_color_accepts_short_and_long_names() {
        assert_eq!("r".parse::<DominantColor>().unwrap(), DominantColor::Red);
        assert_eq!("blue".parse::<DominantColor>().unwrap(), DominantColor::Blue);
        assert_eq!(DominantColor::Green.to_string(), "green");

        let parsed: DominantColor = serde_json::from_str("\"b\"").unwrap();
        assert_eq!(parsed, DominantColor::Blue);
    }

    #[test]
    fn test_category_names_are_snake_case() {
        assert_eq!(ShapeCategory::InvertedTriangle.to_string(), "inverted_triangle");
        assert_eq!(
            "inverted_triangle".parse::<ShapeCategory>().unwrap(),
            ShapeCategory::InvertedTriangle
        );
        assert!(ShapeCategory::Rectangle.is_polygon());
        assert!(!ShapeCategory::Circle.is_polygon());
    }

    #[test]
    fn test_ellipse_contains_respects_rotation() {
        let ellipse = Ellipse {
            cx: 0.0,
            cy: 0.0,
            a: 10.0,
            b: 2.0,
            angle: std::f64::consts::FRAC_PI_2,
        };
        assert!(ellipse.contains(0.0, 9.0, 0.0));
        assert!(!ellipse.contains(9.0, 0.0, 0.0));
        assert!(ellipse.contains(0.0, 10.5, 1.0));
    }
}
