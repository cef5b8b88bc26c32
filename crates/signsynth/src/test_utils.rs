//! Mask and icon fixtures shared by unit tests.

use image::{GrayImage, Luma, Rgba, RgbaImage};
use imageproc::{drawing::draw_polygon_mut, point::Point};

/// Filled axis-aligned ellipse with semi-axes `a`, `b`.
pub fn ellipse_mask(width: u32, height: u32, cx: f64, cy: f64, a: f64, b: f64) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let dx = (x as f64 - cx) / a;
        let dy = (y as f64 - cy) / b;
        Luma([if dx * dx + dy * dy <= 1.0 { 255 } else { 0 }])
    })
}

/// Filled polygon; vertices must not repeat the first point at the end.
pub fn polygon_mask(width: u32, height: u32, vertices: &[(i32, i32)]) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    let points: Vec<Point<i32>> = vertices.iter().map(|&(x, y)| Point::new(x, y)).collect();
    draw_polygon_mut(&mut mask, &points, Luma([255]));
    mask
}

/// Filled rectangle covering `x0..=x1`, `y0..=y1`.
pub fn rect_mask(width: u32, height: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let inside = (x0..=x1).contains(&x) && (y0..=y1).contains(&y);
        Luma([if inside { 255 } else { 0 }])
    })
}

/// Opaque ellipse filling the icon, transparent corners.
pub fn rgba_ellipse_icon(width: u32, height: u32, rgb: [u8; 3]) -> RgbaImage {
    let mask = ellipse_mask(
        width,
        height,
        (width as f64 - 1.0) / 2.0,
        (height as f64 - 1.0) / 2.0,
        width as f64 / 2.0,
        height as f64 / 2.0,
    );
    with_alpha(&mask, rgb)
}

/// Opaque polygon on a transparent canvas.
pub fn rgba_polygon_icon(
    width: u32,
    height: u32,
    vertices: &[(i32, i32)],
    rgb: [u8; 3],
) -> RgbaImage {
    with_alpha(&polygon_mask(width, height, vertices), rgb)
}

fn with_alpha(mask: &GrayImage, [r, g, b]: [u8; 3]) -> RgbaImage {
    RgbaImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get_pixel(x, y).0[0] > 0 {
            Rgba([r, g, b, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}
