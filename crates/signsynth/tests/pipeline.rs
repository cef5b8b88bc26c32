use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::{drawing::draw_polygon_mut, point::Point};
use rand::{rngs::StdRng, SeedableRng};

use signsynth::{
    compose, crop_region, detect_shape, match_catalog, sample_candidates, Annotation, BlendConfig,
    BlendMode, Catalog, CatalogEntry, DetectorConfig, DominantColor, HorizontalPosition,
    PasteBlender, RegionJob, ShapeCategory, ShapeDetector, SynthConfig, SynthError, Synthesizer,
};

fn polygon_mask(width: u32, height: u32, vertices: &[(i32, i32)]) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    let points: Vec<Point<i32>> = vertices.iter().map(|&(x, y)| Point::new(x, y)).collect();
    draw_polygon_mut(&mut mask, &points, Luma([255]));
    mask
}

fn polygon_icon(width: u32, height: u32, vertices: &[(i32, i32)], color: [u8; 3]) -> RgbaImage {
    let mut icon = RgbaImage::new(width, height);
    let points: Vec<Point<i32>> = vertices.iter().map(|&(x, y)| Point::new(x, y)).collect();
    draw_polygon_mut(&mut icon, &points, Rgba([color[0], color[1], color[2], 255]));
    icon
}

/// 256x256 street photo with a blue inverted triangle whose region box has
/// its top-left corner at (128, 64).
fn triangle_scene() -> (RgbImage, RegionJob) {
    let vertices = [(130, 66), (222, 66), (176, 156)];
    let mut photo = RgbImage::from_pixel(256, 256, Rgb([120, 120, 110]));
    let points: Vec<Point<i32>> = vertices.iter().map(|&(x, y)| Point::new(x, y)).collect();
    draw_polygon_mut(&mut photo, &points, Rgb([25, 60, 200]));

    // Box: x 128..224, y 64..160.
    let annotation = Annotation::new(4, 0.6875, 0.4375, 0.375, 0.375);
    let local: Vec<(i32, i32)> = vertices.iter().map(|&(x, y)| (x - 128, y - 64)).collect();
    let mask = polygon_mask(96, 96, &local);
    (photo, RegionJob::new(annotation, mask))
}

fn paste_config() -> SynthConfig {
    SynthConfig {
        blend: BlendConfig {
            mode: BlendMode::Paste,
            ..BlendConfig::default()
        },
        ..SynthConfig::default()
    }
}

#[test]
fn detects_inverted_triangle_region() {
    let (photo, job) = triangle_scene();
    let detection = detect_shape(&job.mask, &DetectorConfig::default());
    assert_eq!(detection.category(), ShapeCategory::InvertedTriangle);

    let region = crop_region(&photo, &job.annotation, &job.mask).unwrap();
    assert_eq!(
        signsynth::classify_color(&region, &job.mask).unwrap(),
        DominantColor::Blue
    );
}

#[test]
fn composes_polygon_icon_over_region() {
    let (photo, job) = triangle_scene();
    let detector = ShapeDetector::new(DetectorConfig::default());
    let target = detector.detect(&job.mask);

    let icon = polygon_icon(90, 80, &[(0, 0), (89, 0), (45, 79)], [250, 250, 0]);
    let (_, alpha) = signsynth::compose::split_alpha(&icon);
    let icon_shape = detector.detect(&alpha);
    assert_eq!(icon_shape.category(), ShapeCategory::InvertedTriangle);

    let out = compose(&photo, &icon, &target, &icon_shape, &job.annotation, &PasteBlender).unwrap();
    assert_eq!(out.dimensions(), photo.dimensions());

    // The triangle's centroid now shows the icon color.
    let [r, g, b] = out.get_pixel(176, 96).0;
    assert!(r > 200 && g > 200 && b < 60, "got {:?}", [r, g, b]);
    // Far from the region nothing changed.
    assert_eq!(out.get_pixel(20, 20), photo.get_pixel(20, 20));
}

#[test]
fn synthesizer_end_to_end() {
    let (photo, job) = triangle_scene();
    let give_way = polygon_icon(90, 80, &[(0, 0), (89, 0), (45, 79)], [30, 40, 220]);
    let synthesizer = Synthesizer::builder()
        .config(paste_config())
        .add_icon(
            CatalogEntry::new("blue_yield", ShapeCategory::InvertedTriangle, DominantColor::Blue),
            give_way.clone(),
        )
        .add_icon(
            CatalogEntry::new("red_yield", ShapeCategory::InvertedTriangle, DominantColor::Red),
            give_way,
        )
        .build()
        .unwrap();

    let outcomes = synthesizer.synthesize(&photo, &[job]);
    assert_eq!(outcomes.len(), 1);
    let outcome = &outcomes[0];
    assert!(outcome.skipped.is_empty(), "{:?}", outcome.skipped);
    assert_eq!(outcome.composites.len(), 1);

    let record = &outcome.composites[0].record;
    assert_eq!(record.sign_id, "blue_yield");
    assert_eq!(record.shape, ShapeCategory::InvertedTriangle);
    assert_eq!(record.color, DominantColor::Blue);
    assert_eq!(record.position, HorizontalPosition::Right);

    let json = serde_json::to_value(record).unwrap();
    assert_eq!(json["shape"], "inverted_triangle");
    assert_eq!(json["color"], "blue");
    assert_eq!(json["position"], "right");
}

#[test]
fn seamless_blend_keeps_photo_outside_patch() {
    let (photo, job) = triangle_scene();
    let icon = polygon_icon(90, 80, &[(0, 0), (89, 0), (45, 79)], [30, 40, 220]);
    let synthesizer = Synthesizer::builder()
        .add_icon(
            CatalogEntry::new("blue_yield", ShapeCategory::InvertedTriangle, DominantColor::Blue),
            icon,
        )
        .build()
        .unwrap();

    let outcome = synthesizer.process_region(&photo, &job, &mut StdRng::seed_from_u64(0));
    assert_eq!(outcome.composites.len(), 1);
    let image = &outcome.composites[0].image;
    assert_eq!(image.get_pixel(5, 250), photo.get_pixel(5, 250));
    assert_eq!(image.get_pixel(128, 200), photo.get_pixel(128, 200));
}

#[test]
fn unmatched_region_yields_no_catalog_match() {
    let (photo, job) = triangle_scene();
    let synthesizer = Synthesizer::builder().config(paste_config()).build().unwrap();

    let outcomes = synthesizer.synthesize(&photo, &[job]);
    assert!(outcomes[0].composites.is_empty());
    assert!(matches!(
        outcomes[0].skipped.as_slice(),
        [SynthError::NoCatalogMatch { .. }]
    ));
}

#[test]
fn catalog_from_json_drives_matching() {
    let catalog = Catalog::from_json_str(
        r#"[
            {"id": "r1", "shape": "triangle", "color": "r"},
            {"id": "r2", "shape": "triangle", "color": "red"},
            {"id": "b1", "shape": "triangle", "color": "b"}
        ]"#,
    )
    .unwrap();

    let matched = match_catalog(ShapeCategory::Triangle, DominantColor::Red, &catalog);
    assert_eq!(matched.len(), 2);

    let mut rng = StdRng::seed_from_u64(11);
    let picked = sample_candidates(&matched, 1, &mut rng);
    assert_eq!(picked.len(), 1);
    assert!(picked[0].id.starts_with('r'));
}

#[test]
fn config_file_round_trip() {
    let dir = std::env::temp_dir().join(format!("signsynth-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("synth.toml");
    std::fs::write(&path, "fan_out = 2\n[detector]\ncircle_leak_threshold = 0.1\n").unwrap();

    let config = SynthConfig::from_path(&path).unwrap();
    assert_eq!(config.fan_out, 2);
    assert_eq!(config.detector.circle_leak_threshold, 0.1);

    let bad = dir.join("synth.yaml");
    std::fs::write(&bad, "fan_out: 2").unwrap();
    assert!(matches!(SynthConfig::from_path(&bad), Err(SynthError::Config(_))));

    std::fs::remove_dir_all(&dir).unwrap();
}
