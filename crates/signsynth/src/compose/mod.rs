//! Places a reference icon into a photograph over a detected sign.
//!
//! Circular targets get a uniformly scaled icon centered on the annotation
//! box. Polygonal targets get an affine warp that maps three canonical icon
//! vertices onto the target's, so the icon follows the target's perspective.

pub mod blend;

pub use blend::{blender_for, patch_origin, PasteBlender, PoissonBlender};

use image::{
    imageops::{self, FilterType},
    GrayImage, Luma, Rgb, Rgba, RgbImage, RgbaImage,
};
use imageproc::geometric_transformations::{warp_into, Interpolation};
use tracing::debug;

use crate::{
    algorithms::{affine::AffineTransform, correspondence::canonical_points},
    error::{Result, SynthError},
    traits::ImageBlender,
    types::{Annotation, Polygon, ShapeDescriptor, ShapeDetection},
};

/// Which compositing path a target/icon pair takes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement<'a> {
    Circle,
    Polygon {
        target: &'a Polygon,
        icon: &'a Polygon,
    },
}

impl<'a> Placement<'a> {
    pub fn resolve(target: &'a ShapeDetection, icon: &'a ShapeDetection) -> Result<Self> {
        match (target.descriptor(), icon.descriptor()) {
            (ShapeDescriptor::Ellipse(_), _) => Ok(Self::Circle),
            (ShapeDescriptor::Polygon(target), ShapeDescriptor::Polygon(icon)) => {
                Ok(Self::Polygon { target, icon })
            }
            (ShapeDescriptor::Polygon(_), _) => Err(SynthError::UnclassifiableShape {
                vertices: icon.polygon().map_or(0, Polygon::len),
            }),
            (ShapeDescriptor::Unclassified, _) => {
                Err(SynthError::UnclassifiableShape { vertices: 0 })
            }
        }
    }
}

/// Composite `icon` into `background` over the region described by
/// `annotation`.
///
/// `target` is the detection made on the region's mask, with polygon vertices
/// in region coordinates; `icon_shape` is the detection made on the icon's
/// alpha channel. The background is left untouched; a new image is returned.
pub fn compose(
    background: &RgbImage,
    icon: &RgbaImage,
    target: &ShapeDetection,
    icon_shape: &ShapeDetection,
    annotation: &Annotation,
    blender: &dyn ImageBlender,
) -> Result<RgbImage> {
    match Placement::resolve(target, icon_shape)? {
        Placement::Circle => compose_circle(background, icon, annotation, blender),
        Placement::Polygon {
            target,
            icon: icon_polygon,
        } => compose_polygon(background, icon, target, icon_polygon, annotation, blender),
    }
}

/// Uniform scale that fits an icon inside a box without distortion
pub fn fit_scale(icon: (u32, u32), box_size: (f64, f64)) -> f64 {
    let (icon_w, icon_h) = icon;
    let (box_w, box_h) = box_size;
    (box_w / icon_w as f64).min(box_h / icon_h as f64)
}

fn scaled_size((width, height): (u32, u32), scale: f64) -> Result<(u32, u32)> {
    let scaled_w = (width as f64 * scale).round();
    let scaled_h = (height as f64 * scale).round();
    if !(scaled_w >= 1.0 && scaled_h >= 1.0) {
        return Err(SynthError::DegenerateTransform);
    }
    Ok((scaled_w as u32, scaled_h as u32))
}

pub fn compose_circle(
    background: &RgbImage,
    icon: &RgbaImage,
    annotation: &Annotation,
    blender: &dyn ImageBlender,
) -> Result<RgbImage> {
    let (bg_w, bg_h) = background.dimensions();
    let scale = fit_scale(icon.dimensions(), annotation.pixel_size(bg_w, bg_h));
    let (width, height) = scaled_size(icon.dimensions(), scale)?;
    debug!(scale, width, height, "circle placement");

    let resized = imageops::resize(icon, width, height, FilterType::Lanczos3);
    let (patch, mask) = split_alpha(&resized);
    blender.blend(&patch, &mask, background, annotation.pixel_center(bg_w, bg_h))
}

pub fn compose_polygon(
    background: &RgbImage,
    icon: &RgbaImage,
    target: &Polygon,
    icon_polygon: &Polygon,
    annotation: &Annotation,
    blender: &dyn ImageBlender,
) -> Result<RgbImage> {
    let src = canonical_points(icon_polygon)?;
    let dst = canonical_points(target)?;
    let transform = AffineTransform::from_correspondences(&src, &dst)?;

    let ([min_x, min_y], [max_x, max_y]) = target.bounding_box();

    // The canvas is at least icon-sized and grows to hold the target polygon,
    // so the warped icon is never clipped.
    let canvas_w = icon.width().max((max_x.ceil() as u32).saturating_add(1));
    let canvas_h = icon.height().max((max_y.ceil() as u32).saturating_add(1));
    let mut warped = RgbaImage::new(canvas_w, canvas_h);
    warp_into(
        icon,
        &transform.to_projection()?,
        Interpolation::Bicubic,
        Rgba([0, 0, 0, 0]),
        &mut warped,
    );

    let (x, y, w, h) = opaque_bounds(&warped).ok_or(SynthError::DegenerateTransform)?;
    let cropped = imageops::crop_imm(&warped, x, y, w, h).to_image();

    let width = ((max_x - min_x) as u32).max(1);
    let height = ((max_y - min_y) as u32).max(1);
    let resized = imageops::resize(&cropped, width, height, FilterType::Lanczos3);
    let (patch, mask) = split_alpha(&resized);

    // Target vertices are relative to the region crop, whose origin is the
    // box's top-left clamped into the photograph.
    let (origin_x, origin_y) = annotation
        .pixel_rect(background.width(), background.height())
        .clamped_origin();
    let center = (
        ((min_x + max_x) / 2.0).floor() as i64 + origin_x as i64,
        ((min_y + max_y) / 2.0).floor() as i64 + origin_y as i64,
    );
    debug!(?center, width, height, "polygon placement");

    blender.blend(&patch, &mask, background, center)
}

/// Split an RGBA image into its color channels and a 0/255 mask of the pixels
/// with non-zero alpha.
pub fn split_alpha(image: &RgbaImage) -> (RgbImage, GrayImage) {
    let (width, height) = image.dimensions();
    let mut rgb = RgbImage::new(width, height);
    let mut mask = GrayImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        rgb.put_pixel(x, y, Rgb([r, g, b]));
        mask.put_pixel(x, y, Luma([if a > 0 { 255 } else { 0 }]));
    }
    (rgb, mask)
}

/// Bounding box `(x, y, width, height)` of the pixels with non-zero alpha.
pub fn opaque_bounds(image: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel.0[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bounds.map(|(x0, y0, x1, y1)| (x0, y0, x1 - x0 + 1, y1 - y0 + 1))
}
