use image::RgbaImage;

use crate::{
    algorithms::detection::ShapeDetector,
    catalog::ReferenceIcon,
    compose::blender_for,
    config::SynthConfig,
    error::{Result, SynthError},
    pipeline::Synthesizer,
    traits::ImageBlender,
    types::CatalogEntry,
};

/// Builder for a [`Synthesizer`] with a fluent API
#[derive(Default)]
pub struct SynthesizerBuilder {
    config: SynthConfig,
    blender: Option<Box<dyn ImageBlender>>,
    icons: Vec<(CatalogEntry, RgbaImage)>,
}

impl SynthesizerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configuration
    pub fn config(mut self, config: SynthConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom blender instead of the one selected by `blend.mode`
    pub fn set_blender<B>(mut self, blender: B) -> Self
    where
        B: ImageBlender + 'static,
    {
        self.blender = Some(Box::new(blender));
        self
    }

    /// Add a reference icon with its catalog row
    pub fn add_icon(mut self, entry: CatalogEntry, image: RgbaImage) -> Self {
        self.icons.push((entry, image));
        self
    }

    pub fn add_icons<I>(self, icons: I) -> Self
    where
        I: IntoIterator<Item = (CatalogEntry, RgbaImage)>,
    {
        icons
            .into_iter()
            .fold(self, |builder, (entry, image)| builder.add_icon(entry, image))
    }

    /// Validate the configuration and precompute every icon's outline.
    pub fn build(self) -> Result<Synthesizer> {
        self.config.validate()?;

        let mut seen = std::collections::HashSet::new();
        if let Some((entry, _)) = self.icons.iter().find(|(entry, _)| !seen.insert(&entry.id)) {
            return Err(SynthError::Config(format!(
                "duplicate catalog id: {}",
                entry.id
            )));
        }

        let detector = ShapeDetector::new(self.config.detector.clone());
        let icons = self
            .icons
            .into_iter()
            .map(|(entry, image)| ReferenceIcon::new(entry, image, &detector))
            .collect();
        let blender = self
            .blender
            .unwrap_or_else(|| blender_for(&self.config.blend));

        Ok(Synthesizer::new(self.config, detector, blender, icons))
    }
}
