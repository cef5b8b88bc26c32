use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::{
    drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_polygon_mut, Canvas},
    point::Point,
    rect::Rect,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use signsynth::{
    Annotation, CatalogEntry, DominantColor, RegionJob, ShapeCategory, ShapeDetector,
    SynthConfig, SynthRecord, Synthesizer,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a synthetic street scene and composite catalog icons onto it
    Run {
        /// Directory receiving the composites and records.json
        #[arg(short, long, default_value = "synth_output")]
        output_dir: PathBuf,
        /// Overrides the configured seed
        #[arg(long)]
        seed: Option<u64>,
        /// Optional `.toml` or `.json` configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Classify the shape of a mask image and print it as JSON
    Detect {
        /// Grayscale mask; nonzero pixels are foreground
        #[arg(short, long)]
        mask: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the JSON schema of the configuration file
    Schema,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Run {
            output_dir,
            seed,
            config,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(seed) = seed {
                config.seed = *seed;
            }
            run_demo(output_dir, config)?;
        }
        Commands::Detect { mask, config } => {
            let config = load_config(config.as_deref())?;
            let mask = image::open(mask)?.to_luma8();
            let detection = ShapeDetector::new(config.detector).detect(&mask);
            println!("{}", serde_json::to_string_pretty(&detection)?);
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&SynthConfig::schema())?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SynthConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            Ok(SynthConfig::from_path(path)?)
        }
        None => Ok(SynthConfig::default()),
    }
}

fn run_demo(output_dir: &Path, config: SynthConfig) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;

    let scene = Scene::street();
    let photo = scene.render();
    photo.save(output_dir.join("scene.png"))?;

    let synthesizer = Synthesizer::builder()
        .config(config)
        .add_icons(demo_icons())
        .build()?;
    info!(
        "Catalog holds {} icons, fan-out {}",
        synthesizer.catalog().len(),
        synthesizer.config().fan_out
    );

    let jobs = scene.jobs(photo.width(), photo.height());
    let outcomes = synthesizer.synthesize(&photo, &jobs);

    let mut records: Vec<SynthRecord> = Vec::new();
    for outcome in outcomes {
        for err in &outcome.skipped {
            warn!("Region {}: skipped ({err})", outcome.index);
        }
        for composite in outcome.composites {
            let path = output_dir.join(format!(
                "region{}_{}.png",
                outcome.index,
                composite.entry_id()
            ));
            composite.image.save(&path)?;
            info!("Saved {}", path.display());
            records.push(composite.record);
        }
    }

    if records.is_empty() {
        return Err(eyre!("no composite was produced"));
    }
    let records_path = output_dir.join("records.json");
    std::fs::write(&records_path, serde_json::to_string_pretty(&records)?)?;
    info!("✅ Wrote {} records to {}", records.len(), records_path.display());
    Ok(())
}

/// A painted sign in the demo scene, in photograph coordinates.
enum Sign {
    Disc { center: (i32, i32), radius: i32 },
    Polygon(Vec<(i32, i32)>),
}

impl Sign {
    fn bounds(&self) -> (i32, i32, i32, i32) {
        match self {
            Self::Disc { center, radius } => (
                center.0 - radius,
                center.1 - radius,
                center.0 + radius,
                center.1 + radius,
            ),
            Self::Polygon(points) => points.iter().fold(
                (i32::MAX, i32::MAX, i32::MIN, i32::MIN),
                |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            ),
        }
    }

    fn paint<C: Canvas>(&self, canvas: &mut C, offset: (i32, i32), color: C::Pixel) {
        match self {
            Self::Disc { center, radius } => {
                draw_filled_circle_mut(
                    canvas,
                    (center.0 - offset.0, center.1 - offset.1),
                    *radius,
                    color,
                );
            }
            Self::Polygon(points) => {
                let points: Vec<Point<i32>> = points
                    .iter()
                    .map(|&(x, y)| Point::new(x - offset.0, y - offset.1))
                    .collect();
                draw_polygon_mut(canvas, &points, color);
            }
        }
    }
}

struct Scene {
    width: u32,
    height: u32,
    signs: Vec<(Sign, Rgb<u8>)>,
}

impl Scene {
    fn street() -> Self {
        Self {
            width: 640,
            height: 320,
            signs: vec![
                (
                    Sign::Disc {
                        center: (110, 150),
                        radius: 36,
                    },
                    Rgb([205, 35, 40]),
                ),
                (
                    Sign::Polygon(vec![(270, 110), (360, 118), (356, 196), (266, 188)]),
                    Rgb([30, 70, 190]),
                ),
                (
                    Sign::Polygon(vec![(450, 100), (560, 100), (505, 196)]),
                    Rgb([210, 40, 35]),
                ),
            ],
        }
    }

    fn render(&self) -> RgbImage {
        let mut photo = RgbImage::from_fn(self.width, self.height, |_, y| {
            let sky = 150 + (60 * y / self.height) as u8;
            Rgb([sky - 20, sky - 5, sky])
        });
        for (sign, color) in &self.signs {
            sign.paint(&mut photo, (0, 0), *color);
        }
        photo
    }

    /// One job per sign: a box padded by a few pixels and a mask in the
    /// box's frame.
    fn jobs(&self, width: u32, height: u32) -> Vec<RegionJob> {
        const PAD: i32 = 6;
        self.signs
            .iter()
            .enumerate()
            .map(|(class_id, (sign, _))| {
                let (x0, y0, x1, y1) = sign.bounds();
                let (x0, y0, x1, y1) = (x0 - PAD, y0 - PAD, x1 + PAD, y1 + PAD);
                let (w, h) = ((x1 - x0) as f64, (y1 - y0) as f64);
                let annotation = Annotation::new(
                    class_id as u32,
                    (x0 as f64 + w / 2.0) / width as f64,
                    (y0 as f64 + h / 2.0) / height as f64,
                    w / width as f64,
                    h / height as f64,
                );

                let rect = annotation.pixel_rect(width, height);
                let (ox, oy) = rect.clamped_origin();
                let mut mask = GrayImage::new(rect.width, rect.height);
                sign.paint(&mut mask, (ox as i32, oy as i32), Luma([255]));
                RegionJob::new(annotation, mask)
            })
            .collect()
    }
}

fn demo_icons() -> Vec<(CatalogEntry, RgbaImage)> {
    let red = Rgba([200, 20, 30, 255]);
    let blue = Rgba([20, 60, 200, 255]);
    let white = Rgba([250, 250, 250, 255]);

    let mut no_entry = RgbaImage::new(120, 120);
    draw_filled_circle_mut(&mut no_entry, (60, 60), 59, red);
    draw_filled_rect_mut(&mut no_entry, Rect::at(22, 50).of_size(76, 20), white);

    let mut speed_limit = RgbaImage::new(120, 120);
    draw_filled_circle_mut(&mut speed_limit, (60, 60), 59, red);
    draw_filled_circle_mut(&mut speed_limit, (60, 60), 44, white);

    let mut parking = RgbaImage::new(100, 100);
    draw_filled_rect_mut(&mut parking, Rect::at(0, 0).of_size(100, 100), blue);
    draw_filled_rect_mut(&mut parking, Rect::at(35, 20).of_size(14, 60), white);
    draw_filled_rect_mut(&mut parking, Rect::at(35, 20).of_size(34, 30), white);

    let mut give_way = RgbaImage::new(120, 104);
    let outer = [Point::new(0, 0), Point::new(119, 0), Point::new(60, 103)];
    let inner = [Point::new(22, 12), Point::new(97, 12), Point::new(60, 77)];
    draw_polygon_mut(&mut give_way, &outer, red);
    draw_polygon_mut(&mut give_way, &inner, white);

    vec![
        (
            CatalogEntry::new("no_entry", ShapeCategory::Circle, DominantColor::Red),
            no_entry,
        ),
        (
            CatalogEntry::new("speed_limit", ShapeCategory::Circle, DominantColor::Red),
            speed_limit,
        ),
        (
            CatalogEntry::new("parking", ShapeCategory::Rectangle, DominantColor::Blue),
            parking,
        ),
        (
            CatalogEntry::new("give_way", ShapeCategory::InvertedTriangle, DominantColor::Red),
            give_way,
        ),
    ]
}
