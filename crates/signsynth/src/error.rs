use thiserror::Error;

use crate::types::{DominantColor, ShapeCategory};

#[derive(Error, Debug)]
pub enum SynthError {
    #[error("Unclassifiable shape: outline approximated to {vertices} vertices")]
    UnclassifiableShape { vertices: usize },

    #[error("Undefined dominant color: mask has no foreground pixels")]
    UndefinedColor,

    #[error("No catalog entry matches shape {shape} with color {color}")]
    NoCatalogMatch {
        shape: ShapeCategory,
        color: DominantColor,
    },

    #[error(
        "Composite out of bounds: {width}x{height} patch at ({x}, {y}) does not fit a {bg_width}x{bg_height} background"
    )]
    CompositeOutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
        bg_width: u32,
        bg_height: u32,
    },

    #[error("Degenerate transform: correspondence points are collinear or the warp is empty")]
    DegenerateTransform,

    #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Invalid annotation: {0}")]
    InvalidAnnotation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to load image: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SynthError {
    /// Whether the failure is local to one region or candidate.
    ///
    /// Recoverable errors skip the unit of work; the pipeline keeps going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnclassifiableShape { .. }
                | Self::UndefinedColor
                | Self::NoCatalogMatch { .. }
                | Self::CompositeOutOfBounds { .. }
                | Self::DegenerateTransform
                | Self::DimensionMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SynthError>;
