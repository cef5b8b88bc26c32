use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{Result, SynthError};

/// Thresholds used by the shape detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DetectorConfig {
    /// A mask pixel is foreground when its value is above this threshold.
    pub mask_threshold: u8,
    /// Contours with fewer points skip the ellipse test.
    pub min_ellipse_points: usize,
    /// Exterior-leak rate below which the mask is a circle.
    #[schemars(range(min = 0.0, max = 1.0))]
    pub circle_leak_threshold: f64,
    /// Pixels added to both semi-axes when rasterizing the fitted ellipse.
    pub ellipse_margin: f64,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    #[schemars(range(min = 0.0, max = 1.0))]
    pub polygon_epsilon_ratio: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            mask_threshold: 0,
            min_ellipse_points: 6,
            circle_leak_threshold: 0.05,
            ellipse_margin: 1.0,
            polygon_epsilon_ratio: 0.1,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BlendMode {
    /// Gradient-domain (Poisson) cloning
    #[default]
    Seamless,
    /// Masked pixel copy with a hard edge
    Paste,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BlendConfig {
    pub mode: BlendMode,
    /// Upper bound on solver sweeps.
    pub max_iterations: usize,
    /// Stop once the largest per-sweep update drops below this many levels.
    pub tolerance: f32,
    /// Successive over-relaxation factor, in (0, 2).
    pub relaxation: f32,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            mode: BlendMode::Seamless,
            max_iterations: 400,
            tolerance: 0.05,
            relaxation: 1.8,
        }
    }
}

/// Top-level synthesis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SynthConfig {
    /// Candidates composited per region, capped at the match count.
    pub fan_out: usize,
    /// Base seed; each region derives its own generator from it.
    pub seed: u64,
    pub detector: DetectorConfig,
    pub blend: BlendConfig,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            fan_out: 3,
            seed: 0,
            detector: DetectorConfig::default(),
            blend: BlendConfig::default(),
        }
    }
}

impl SynthConfig {
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SynthConfig)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a `.toml` or `.json` configuration file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&contents),
            Some("json") => Self::from_json_str(&contents),
            _ => Err(SynthError::Config(format!(
                "unsupported config format: {}",
                path.display()
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let detector = &self.detector;
        if !(0.0..=1.0).contains(&detector.circle_leak_threshold) {
            return Err(SynthError::Config(format!(
                "circle_leak_threshold must be in [0, 1], got {}",
                detector.circle_leak_threshold
            )));
        }
        if !(detector.polygon_epsilon_ratio > 0.0 && detector.polygon_epsilon_ratio <= 1.0) {
            return Err(SynthError::Config(format!(
                "polygon_epsilon_ratio must be in (0, 1], got {}",
                detector.polygon_epsilon_ratio
            )));
        }
        if !(detector.ellipse_margin >= 0.0 && detector.ellipse_margin.is_finite()) {
            return Err(SynthError::Config(format!(
                "ellipse_margin must be a non-negative number, got {}",
                detector.ellipse_margin
            )));
        }
        if detector.min_ellipse_points < 5 {
            return Err(SynthError::Config(format!(
                "min_ellipse_points must be at least 5, got {}",
                detector.min_ellipse_points
            )));
        }

        let blend = &self.blend;
        if !(blend.relaxation > 0.0 && blend.relaxation < 2.0) {
            return Err(SynthError::Config(format!(
                "relaxation must be in (0, 2), got {}",
                blend.relaxation
            )));
        }
        if !(blend.tolerance > 0.0) {
            return Err(SynthError::Config(format!(
                "tolerance must be positive, got {}",
                blend.tolerance
            )));
        }
        Ok(())
    }
}
