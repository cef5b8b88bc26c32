pub mod builder;

pub use builder::SynthesizerBuilder;

use std::collections::HashMap;

use image::{imageops, GrayImage, RgbImage};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::{
    algorithms::{color::classify_color, detection::ShapeDetector, extraction::binarize},
    catalog::{match_catalog, sample_candidates, Catalog, ReferenceIcon},
    compose::compose,
    config::SynthConfig,
    error::{Result, SynthError},
    traits::ImageBlender,
    types::{Annotation, CompositeResult, DominantColor, ShapeDetection, SynthRecord},
};

/// One object region of a photograph: its box and its segmentation mask.
///
/// The mask covers the crop starting at the box's top-left corner.
#[derive(Debug, Clone)]
pub struct RegionJob {
    pub annotation: Annotation,
    pub mask: GrayImage,
}

impl RegionJob {
    pub fn new(annotation: Annotation, mask: GrayImage) -> Self {
        Self { annotation, mask }
    }
}

/// Everything one region produced: composites plus the reasons any region
/// or candidate was skipped.
#[derive(Debug, Default)]
pub struct RegionOutcome {
    pub index: usize,
    pub composites: Vec<CompositeResult>,
    pub skipped: Vec<SynthError>,
}

impl RegionOutcome {
    fn skipped(index: usize, err: SynthError) -> Self {
        Self {
            index,
            composites: Vec::new(),
            skipped: vec![err],
        }
    }
}

/// Detects, classifies, matches and composites every region of a photograph.
pub struct Synthesizer {
    config: SynthConfig,
    detector: ShapeDetector,
    blender: Box<dyn ImageBlender>,
    catalog: Catalog,
    icons: HashMap<String, ReferenceIcon>,
}

impl Synthesizer {
    pub fn builder() -> SynthesizerBuilder {
        SynthesizerBuilder::new()
    }

    pub(crate) fn new(
        config: SynthConfig,
        detector: ShapeDetector,
        blender: Box<dyn ImageBlender>,
        icons: Vec<ReferenceIcon>,
    ) -> Self {
        let catalog = icons.iter().map(|icon| icon.entry.clone()).collect();
        let icons = icons
            .into_iter()
            .map(|icon| (icon.entry.id.clone(), icon))
            .collect();
        Self {
            config,
            detector,
            blender,
            catalog,
            icons,
        }
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Process every region in parallel.
    ///
    /// Each region draws its candidates from its own generator, seeded from
    /// the configured seed plus the region index, so the result does not
    /// depend on thread scheduling.
    #[tracing::instrument(skip_all, fields(regions = jobs.len()))]
    pub fn synthesize(&self, photo: &RgbImage, jobs: &[RegionJob]) -> Vec<RegionOutcome> {
        let outcomes: Vec<RegionOutcome> = jobs
            .par_iter()
            .enumerate()
            .map(|(index, job)| {
                let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(index as u64));
                let mut outcome = self.process_region(photo, job, &mut rng);
                outcome.index = index;
                outcome
            })
            .collect();

        let produced: usize = outcomes.iter().map(|o| o.composites.len()).sum();
        info!(produced, "synthesis finished");
        outcomes
    }

    /// Process a single region. Failures are collected, never propagated.
    #[tracing::instrument(skip_all, fields(class_id = job.annotation.class_id))]
    pub fn process_region<R: Rng + ?Sized>(
        &self,
        photo: &RgbImage,
        job: &RegionJob,
        rng: &mut R,
    ) -> RegionOutcome {
        let (detection, color, icons) = match self.select(photo, job, rng) {
            Ok(selection) => selection,
            Err(err) => {
                debug!(%err, "region skipped");
                return RegionOutcome::skipped(0, err);
            }
        };

        let position = job.annotation.position(photo.width());
        let results: Vec<Result<CompositeResult>> = icons
            .par_iter()
            .map(|icon| {
                let image = compose(
                    photo,
                    &icon.image,
                    &detection,
                    &icon.shape,
                    &job.annotation,
                    self.blender.as_ref(),
                )?;
                Ok(CompositeResult {
                    image,
                    record: SynthRecord {
                        sign_id: icon.entry.id.clone(),
                        shape: detection.category(),
                        color,
                        position,
                    },
                })
            })
            .collect();

        let mut outcome = RegionOutcome::default();
        for result in results {
            match result {
                Ok(composite) => outcome.composites.push(composite),
                Err(err) => {
                    debug!(%err, "candidate skipped");
                    outcome.skipped.push(err);
                }
            }
        }
        outcome
    }

    /// Shape, color and the sampled icons for one region.
    fn select<R: Rng + ?Sized>(
        &self,
        photo: &RgbImage,
        job: &RegionJob,
        rng: &mut R,
    ) -> Result<(ShapeDetection, DominantColor, Vec<&ReferenceIcon>)> {
        let mask = binarize(&job.mask, self.detector.config.mask_threshold);
        let region = crop_region(photo, &job.annotation, &mask)?;

        let detection = self.detector.try_detect(&mask)?;
        let color = classify_color(&region, &mask)?;
        let shape = detection.category();
        debug!(%shape, %color, "region classified");

        let candidates = match_catalog(shape, color, &self.catalog);
        if candidates.is_empty() {
            return Err(SynthError::NoCatalogMatch { shape, color });
        }
        let icons: Vec<&ReferenceIcon> = sample_candidates(&candidates, self.config.fan_out, rng)
            .into_iter()
            .filter_map(|entry| self.icons.get(&entry.id))
            .collect();
        debug!(
            candidates = candidates.len(),
            picked = ?icons.iter().map(|icon| icon.id()).collect::<Vec<_>>(),
            "catalog candidates"
        );
        Ok((detection, color, icons))
    }
}

/// The photograph window a region mask refers to.
///
/// The window starts at the box's top-left corner, clamped into the image, and
/// has the mask's dimensions. A window running past the image edge is a
/// `DimensionMismatch`.
pub fn crop_region(
    photo: &RgbImage,
    annotation: &Annotation,
    mask: &GrayImage,
) -> Result<RgbImage> {
    let (width, height) = photo.dimensions();
    let (x, y) = annotation.pixel_rect(width, height).clamped_origin();
    let (mask_w, mask_h) = mask.dimensions();

    let available = (width.saturating_sub(x), height.saturating_sub(y));
    if mask_w > available.0 || mask_h > available.1 {
        return Err(SynthError::DimensionMismatch {
            expected: (mask_w, mask_h),
            actual: (available.0.min(mask_w), available.1.min(mask_h)),
        });
    }
    Ok(imageops::crop_imm(photo, x, y, mask_w, mask_h).to_image())
}
