use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use editor_core::{
    detect_background_colors_with_rng, flatten_onto, remove_color_background, remove_color_background_hq,
    remove_suggested_backgrounds, vectorize, vectorize_hq, vectorize_with_colors_hq_with_rng, Color, DetailLevel,
    VectorDocument, DEFAULT_SEED, DEFAULT_TOLERANCE, MAX_COLORS, MIN_COLORS,
};
use image::RgbImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

mod output;
mod svg_writer;

#[derive(Parser, Debug)]
#[command(name = "bg-editor", about = "Detect and remove image backgrounds, and convert images to SVG")]
struct Cli {
    /// Seed for the clustering jitter
    #[arg(long, global = true, default_value_t = DEFAULT_SEED)]
    seed: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Suggest background colors from the image border
    Detect {
        input: PathBuf,
        #[arg(short = 'n', long, default_value_t = 6)]
        suggestions: usize,
        /// Print candidates as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove one color (name, #rrggbb or r,g,b)
    Remove {
        input: PathBuf,
        #[arg(long, default_value = "white")]
        color: Color,
        #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f64,
        /// Refine the mask and anti-alias the edges
        #[arg(long)]
        hq: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write one cutout per suggested background color
    RemoveAll {
        input: PathBuf,
        #[arg(short = 'n', long, default_value_t = 6)]
        suggestions: usize,
        #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f64,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Trace dark shapes into a black SVG
    Vectorize {
        input: PathBuf,
        #[arg(long, default_value = "high")]
        detail: DetailLevel,
        /// Global threshold, outer contours only
        #[arg(long)]
        basic: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Quantize colors and trace each as its own SVG layer
    VectorizeColors {
        input: PathBuf,
        #[arg(long, default_value_t = 8)]
        colors: usize,
        #[arg(long, default_value = "high")]
        detail: DetailLevel,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Remove the dominant background, then vectorize the result
    Process {
        input: PathBuf,
        #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f64,
        #[arg(long, default_value = "high")]
        detail: DetailLevel,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

/// Decode an image, flattening any transparency onto white.
fn load_rgb(path: &Path) -> Result<RgbImage> {
    let decoded = image::open(path).with_context(|| format!("Failed to open image {}", path.display()))?;
    if decoded.color().has_alpha() {
        Ok(flatten_onto(&decoded.to_rgba8(), Color::WHITE))
    } else {
        Ok(decoded.to_rgb8())
    }
}

fn clamp_tolerance(tolerance: f64) -> f64 {
    tolerance.clamp(0.0, 100.0)
}

fn write_svg(path: &Path, doc: &VectorDocument) -> Result<()> {
    let markup = svg_writer::to_svg(doc).to_string();
    output::write_atomic(path, markup.as_bytes())?;
    println!("✅ Wrote {} ({} paths)", path.display(), doc.len());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut rng = StdRng::seed_from_u64(cli.seed);

    match cli.command {
        Command::Detect {
            input,
            suggestions,
            json,
        } => {
            let image = load_rgb(&input)?;
            let candidates = detect_background_colors_with_rng(&image, suggestions, &mut rng)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&candidates)?);
            } else if candidates.is_empty() {
                println!("⚠️  No background colors found");
            } else {
                println!("🎨 Suggested background colors for {}", input.display());
                for (i, c) in candidates.iter().enumerate() {
                    println!(
                        "  {}. {} {} {:<18} {:5.1}%",
                        i + 1,
                        c.color.hex(),
                        c.color,
                        c.label.name(),
                        c.coverage
                    );
                }
            }
        }
        Command::Remove {
            input,
            color,
            tolerance,
            hq,
            output,
        } => {
            let image = load_rgb(&input)?;
            let tolerance = clamp_tolerance(tolerance);
            let result = if hq {
                remove_color_background_hq(&image, color, tolerance)?
            } else {
                remove_color_background(&image, color, tolerance)?
            };
            let path = output.unwrap_or_else(|| output::removal_path(&input, None, color.label()));
            output::save_png(&path, &result)?;
            println!("✅ Removed {} ({}) -> {}", color.hex(), color.label(), path.display());
        }
        Command::RemoveAll {
            input,
            suggestions,
            tolerance,
            out_dir,
        } => {
            let image = load_rgb(&input)?;
            let candidates = detect_background_colors_with_rng(&image, suggestions, &mut rng)?;
            info!(candidates = candidates.len(), "removing all suggested colors");
            let results = remove_suggested_backgrounds(&image, &candidates, clamp_tolerance(tolerance))?;
            for (candidate, cutout) in results {
                let path = output::removal_path(&input, out_dir.as_deref(), candidate.label);
                output::save_png(&path, &cutout)?;
                println!("✅ {} {:5.1}% -> {}", candidate.label, candidate.coverage, path.display());
            }
        }
        Command::Vectorize {
            input,
            detail,
            basic,
            output,
        } => {
            let image = load_rgb(&input)?;
            let (doc, suffix) = if basic {
                (vectorize(&image)?, "_vector.svg")
            } else {
                (vectorize_hq(&image, detail)?, "_vector_hq.svg")
            };
            let path = output.unwrap_or_else(|| output::sibling_path(&input, None, suffix));
            write_svg(&path, &doc)?;
        }
        Command::VectorizeColors {
            input,
            colors,
            detail,
            output,
        } => {
            let image = load_rgb(&input)?;
            let colors = colors.clamp(MIN_COLORS, MAX_COLORS);
            let doc = vectorize_with_colors_hq_with_rng(&image, colors, detail, &mut rng)?;
            let path = output.unwrap_or_else(|| output::sibling_path(&input, None, "_color_vector_hq.svg"));
            write_svg(&path, &doc)?;
        }
        Command::Process {
            input,
            tolerance,
            detail,
            out_dir,
        } => {
            let image = load_rgb(&input)?;
            let outcome = editor_core::process_complete(&image, clamp_tolerance(tolerance), detail)?;
            match &outcome.removed {
                Some((candidate, cutout)) => {
                    let path = output::removal_path(&input, out_dir.as_deref(), candidate.label);
                    output::save_png(&path, cutout)?;
                    println!("✅ Removed {} -> {}", candidate.label, path.display());
                }
                None => println!("⚠️  No background color detected, vectorizing the input image"),
            }
            let path = output::sibling_path(&input, out_dir.as_deref(), "_vector_hq.svg");
            write_svg(&path, &outcome.document)?;
        }
    }

    Ok(())
}
