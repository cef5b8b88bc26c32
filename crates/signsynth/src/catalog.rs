//! Reference icon catalog and candidate selection.

use image::RgbaImage;
use rand::{seq::SliceRandom, Rng};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    algorithms::detection::ShapeDetector,
    compose::split_alpha,
    error::Result,
    traits::ContourExtractor,
    types::{CatalogEntry, DominantColor, ShapeCategory, ShapeDetection},
};

/// Read-only table of shape/color tagged reference icons.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Parse a JSON array of `{ "id", "shape", "color" }` rows.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }
}

impl FromIterator<CatalogEntry> for Catalog {
    fn from_iter<I: IntoIterator<Item = CatalogEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Entries whose declared shape and color both match, in catalog order.
pub fn match_catalog(
    shape: ShapeCategory,
    color: DominantColor,
    catalog: &Catalog,
) -> Vec<&CatalogEntry> {
    catalog
        .entries
        .iter()
        .filter(|entry| entry.shape == shape && entry.color == color)
        .collect()
}

/// Up to `k` distinct candidates drawn uniformly at random.
pub fn sample_candidates<'a, R: Rng + ?Sized>(
    candidates: &[&'a CatalogEntry],
    k: usize,
    rng: &mut R,
) -> Vec<&'a CatalogEntry> {
    candidates.choose_multiple(rng, k).copied().collect()
}

/// A catalog entry with its decoded image and the shape detected on the
/// icon's opaque pixels.
#[derive(Debug, Clone)]
pub struct ReferenceIcon {
    pub entry: CatalogEntry,
    pub image: RgbaImage,
    pub shape: ShapeDetection,
}

impl ReferenceIcon {
    pub fn new<C: ContourExtractor>(
        entry: CatalogEntry,
        image: RgbaImage,
        detector: &ShapeDetector<C>,
    ) -> Self {
        let (_, alpha) = split_alpha(&image);
        let shape = detector.detect(&alpha);
        if shape.category() != entry.shape {
            tracing::debug!(
                id = %entry.id,
                declared = %entry.shape,
                detected = %shape.category(),
                "icon outline disagrees with its catalog shape"
            );
        }
        Self {
            entry,
            image,
            shape,
        }
    }

    pub fn id(&self) -> &str {
        &self.entry.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::DetectorConfig, test_utils::rgba_ellipse_icon};
    use rand::{rngs::StdRng, SeedableRng};
    use strum::IntoEnumIterator;

    fn sample_catalog() -> Catalog {
        Catalog::new(vec![
            CatalogEntry::new("stop", ShapeCategory::Rectangle, DominantColor::Red),
            CatalogEntry::new("no_entry", ShapeCategory::Circle, DominantColor::Red),
            CatalogEntry::new("speed_30", ShapeCategory::Circle, DominantColor::Red),
            CatalogEntry::new("roundabout", ShapeCategory::Circle, DominantColor::Blue),
            CatalogEntry::new("no_parking", ShapeCategory::Circle, DominantColor::Red),
            CatalogEntry::new("give_way", ShapeCategory::InvertedTriangle, DominantColor::Red),
        ])
    }

    #[test]
    fn test_empty_catalog_never_matches() {
        let catalog = Catalog::default();
        for shape in ShapeCategory::iter() {
            for color in DominantColor::iter() {
                assert!(match_catalog(shape, color, &catalog).is_empty());
            }
        }
    }

    #[test]
    fn test_match_requires_shape_and_color() {
        let catalog = sample_catalog();
        let ids: Vec<&str> = match_catalog(ShapeCategory::Circle, DominantColor::Red, &catalog)
            .iter()
            .map(|entry| entry.id.as_str())
            .collect();
        assert_eq!(ids, ["no_entry", "speed_30", "no_parking"]);

        assert!(match_catalog(ShapeCategory::Triangle, DominantColor::Red, &catalog).is_empty());
        assert!(match_catalog(ShapeCategory::Rectangle, DominantColor::Green, &catalog).is_empty());
    }

    #[test]
    fn test_sampling_is_seeded_and_distinct() {
        let catalog = sample_catalog();
        let candidates = match_catalog(ShapeCategory::Circle, DominantColor::Red, &catalog);

        let first = sample_candidates(&candidates, 2, &mut StdRng::seed_from_u64(7));
        let second = sample_candidates(&candidates, 2, &mut StdRng::seed_from_u64(7));
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_ne!(first[0].id, first[1].id);
    }

    #[test]
    fn test_sampling_caps_at_candidate_count() {
        let catalog = sample_catalog();
        let candidates = match_catalog(ShapeCategory::Circle, DominantColor::Red, &catalog);
        let picked = sample_candidates(&candidates, 10, &mut StdRng::seed_from_u64(1));

        let mut ids: Vec<&str> = picked.iter().map(|entry| entry.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, ["no_entry", "no_parking", "speed_30"]);

        assert!(sample_candidates(&[], 3, &mut StdRng::seed_from_u64(1)).is_empty());
    }

    #[test]
    fn test_catalog_rows_accept_short_colors() {
        let catalog = Catalog::from_json_str(
            r#"[
                {"id": "a", "shape": "circle", "color": "r"},
                {"id": "b", "shape": "inverted_triangle", "color": "blue"}
            ]"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("a").map(|e| e.color), Some(DominantColor::Red));
        assert_eq!(
            catalog.get("b").map(|e| e.shape),
            Some(ShapeCategory::InvertedTriangle)
        );
        let unknown_shape = r#"[{"id": "c", "shape": "hexagon", "color": "r"}]"#;
        assert!(Catalog::from_json_str(unknown_shape).is_err());
    }

    #[test]
    fn test_reference_icon_detects_its_own_shape() {
        let detector = ShapeDetector::new(DetectorConfig::default());
        let icon = ReferenceIcon::new(
            CatalogEntry::new("no_entry", ShapeCategory::Circle, DominantColor::Red),
            rgba_ellipse_icon(64, 64, [200, 0, 0]),
            &detector,
        );
        assert_eq!(icon.id(), "no_entry");
        assert_eq!(icon.shape.category(), ShapeCategory::Circle);
    }
}
