pub mod affine;
pub mod color;
pub mod correspondence;
pub mod detection;
pub mod ellipse;
pub mod extraction;
pub mod polygon;

pub use affine::AffineTransform;
pub use color::{classify_color, masked_channel_means};
pub use correspondence::canonical_points;
pub use detection::{detect_shape, ShapeDetector};
pub use ellipse::{exterior_leak_rate, fit_ellipse, rasterize_ellipse};
pub use extraction::{binarize, largest_contour, ImageprocContourExtractor};
pub use polygon::{approximate_closed_polygon, arc_length};
