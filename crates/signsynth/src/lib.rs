//! # Road Sign Synthesis Library
//!
//! Builds labeled training images by finding the outline of a masked sign in
//! a photograph and compositing a matching reference icon over it.
//!
//! ## Pipeline
//!
//! For every object region:
//!
//! 1. **Shape detection**: the mask outline is classified as circle,
//!    triangle, inverted triangle, rectangle or others (ellipse fit plus
//!    exterior-leak test, then polygon approximation).
//! 2. **Color classification**: the dominant channel of the masked pixels.
//! 3. **Catalog matching**: icons tagged with the same shape and color,
//!    sampled up to a configured fan-out with a seeded generator.
//! 4. **Composition**: circles are scaled into the box, polygons are warped
//!    through an affine map between canonical vertices; both are blended
//!    with gradient-domain cloning.
//!
//! Failures are local: a region or candidate that cannot be processed is
//! skipped and reported, and every other unit of work still runs.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use signsynth::{Annotation, CatalogEntry, DominantColor, RegionJob, ShapeCategory, Synthesizer};
//!
//! let photo = image::open("street.jpg")?.to_rgb8();
//! let mask = image::open("region_0.png")?.to_luma8();
//! let icon = image::open("no_entry.png")?.to_rgba8();
//!
//! let synthesizer = Synthesizer::builder()
//!     .add_icon(
//!         CatalogEntry::new("no_entry", ShapeCategory::Circle, DominantColor::Red),
//!         icon,
//!     )
//!     .build()?;
//!
//! let job = RegionJob::new("0 0.42 0.35 0.08 0.12".parse::<Annotation>()?, mask);
//! for outcome in synthesizer.synthesize(&photo, &[job]) {
//!     for composite in outcome.composites {
//!         composite.image.save(format!("{}.png", composite.entry_id()))?;
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod algorithms;
pub mod catalog;
pub mod compose;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod traits;
pub mod types;

#[cfg(test)]
mod test_utils;

pub use algorithms::{canonical_points, classify_color, detect_shape, ShapeDetector};
pub use catalog::{match_catalog, sample_candidates, Catalog, ReferenceIcon};
pub use compose::{compose, PasteBlender, Placement, PoissonBlender};
pub use config::{BlendConfig, BlendMode, DetectorConfig, SynthConfig};
pub use error::{Result, SynthError};
pub use pipeline::{crop_region, RegionJob, RegionOutcome, Synthesizer, SynthesizerBuilder};
pub use traits::{ContourExtractor, ImageBlender};
pub use types::{
    Annotation, CatalogEntry, CompositeResult, DominantColor, Ellipse, HorizontalPosition,
    PixelRect, Polygon, ShapeCategory, ShapeDescriptor, ShapeDetection, SynthRecord,
};
