//! Background color detection, background removal and raster-to-vector
//! conversion.
//!
//! Every entry point is synchronous and self-contained. Randomized steps take
//! an explicit generator; the plain variants seed one with [`DEFAULT_SEED`].

use image::{RgbImage, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{info, warn};

pub mod clusterer;
pub mod color;
pub mod compositor;
pub mod contours;
pub mod contrast;
pub mod detail;
pub mod document;
pub mod error;
pub mod filter;
pub mod kmeans;
pub mod mask;
pub mod partition;
pub mod sampler;
pub mod simplify;
pub mod vectorize;

pub use clusterer::{ClusterOutcome, ColorCandidate, ColorClusterer, FallbackReason};
pub use color::{parse_color, Color, ColorLabel};
pub use compositor::{flatten_onto, Compositor};
pub use contours::{Contour, ContourExtractor};
pub use contrast::Clahe;
pub use detail::{DetailLevel, DetailParams};
pub use document::{FillRule, PathCommand, VectorDocument, VectorPath};
pub use error::{EditorError, Result};
pub use kmeans::KMeansConfig;
pub use mask::{Mask, MaskBuilder, MaskConfig, RefinedMask};
pub use partition::{ColorRegion, ColorRegionPartitioner};
pub use sampler::PixelSampler;
pub use simplify::{PathSimplifier, Shape, SimplifiedPath};
pub use vectorize::Vectorizer;

/// Seed used by the entry points that do not take a generator.
pub const DEFAULT_SEED: u64 = 42;

/// Default removal tolerance.
pub const DEFAULT_TOLERANCE: f64 = 30.0;

/// Accepted range for the number of colors in a colored vectorization.
pub const MIN_COLORS: usize = 2;
pub const MAX_COLORS: usize = 32;

fn validate_tolerance(tolerance: f64) -> Result<()> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(EditorError::InvalidInput(format!(
            "tolerance must be a non-negative number, got {tolerance}"
        )));
    }
    Ok(())
}

/// Suggest likely background colors, ranked by border coverage.
pub fn detect_background_colors(image: &RgbImage, num_suggestions: usize) -> Result<Vec<ColorCandidate>> {
    let mut rng = StdRng::seed_from_u64(DEFAULT_SEED);
    detect_background_colors_with_rng(image, num_suggestions, &mut rng)
}

/// [`detect_background_colors`] with a caller-supplied jitter source.
pub fn detect_background_colors_with_rng<R: Rng + ?Sized>(
    image: &RgbImage,
    num_suggestions: usize,
    rng: &mut R,
) -> Result<Vec<ColorCandidate>> {
    error::ensure_non_empty(image.width(), image.height())?;
    if num_suggestions == 0 {
        return Err(EditorError::InvalidInput("num_suggestions must be at least 1".into()));
    }

    let samples = PixelSampler::new().sample(image);
    let candidates = if samples.is_empty() {
        warn!("border sample too small, using corner sampling");
        let mut corners = sampler::corner_candidates(image);
        corners.truncate(num_suggestions);
        corners
    } else {
        ColorClusterer::default().cluster(&samples, num_suggestions, rng)
    };

    info!(
        width = image.width(),
        height = image.height(),
        candidates = candidates.len(),
        "detected background colors"
    );
    Ok(candidates)
}

/// Hard cutout of every pixel matching `target` under the fused distance tests.
pub fn remove_color_background(image: &RgbImage, target: Color, tolerance: f64) -> Result<RgbaImage> {
    validate_tolerance(tolerance)?;
    let mask = MaskBuilder::default().build_raw(image, target, tolerance);
    info!(%target, tolerance, removed = mask.count(), "removed background");
    Compositor::new().apply(image, &mask)
}

/// Cutout with morphological refinement and anti-aliased edges.
pub fn remove_color_background_hq(image: &RgbImage, target: Color, tolerance: f64) -> Result<RgbaImage> {
    validate_tolerance(tolerance)?;
    let refined = MaskBuilder::default().build_mask(image, target, tolerance);
    info!(%target, tolerance, removed = refined.mask.count(), "removed background (hq)");
    Compositor::new().apply_soft(image, &refined)
}

/// Produce one high-quality cutout per candidate, in candidate order.
pub fn remove_suggested_backgrounds(
    image: &RgbImage,
    candidates: &[ColorCandidate],
    tolerance: f64,
) -> Result<Vec<(ColorCandidate, RgbaImage)>> {
    candidates
        .iter()
        .map(|c| Ok((c.clone(), remove_color_background_hq(image, c.color, tolerance)?)))
        .collect()
}

/// Monochrome vectorization with a fixed global threshold.
pub fn vectorize(image: &RgbImage) -> Result<VectorDocument> {
    error::ensure_non_empty(image.width(), image.height())?;
    let doc = Vectorizer::new(DetailParams::basic()).vectorize(image);
    info!(paths = doc.len(), "vectorized");
    Ok(doc)
}

/// Monochrome vectorization tuned by a detail level.
pub fn vectorize_hq(image: &RgbImage, level: DetailLevel) -> Result<VectorDocument> {
    error::ensure_non_empty(image.width(), image.height())?;
    let doc = Vectorizer::new(level.params()).vectorize(image);
    info!(%level, paths = doc.len(), "vectorized (hq)");
    Ok(doc)
}

/// Colored vectorization: one layer of paths per quantized color.
pub fn vectorize_with_colors_hq(image: &RgbImage, num_colors: usize, level: DetailLevel) -> Result<VectorDocument> {
    let mut rng = StdRng::seed_from_u64(DEFAULT_SEED);
    vectorize_with_colors_hq_with_rng(image, num_colors, level, &mut rng)
}

/// [`vectorize_with_colors_hq`] with a caller-supplied seeding source.
pub fn vectorize_with_colors_hq_with_rng<R: Rng + ?Sized>(
    image: &RgbImage,
    num_colors: usize,
    level: DetailLevel,
    rng: &mut R,
) -> Result<VectorDocument> {
    error::ensure_non_empty(image.width(), image.height())?;
    if !(MIN_COLORS..=MAX_COLORS).contains(&num_colors) {
        return Err(EditorError::InvalidInput(format!(
            "num_colors must be within {MIN_COLORS}..={MAX_COLORS}, got {num_colors}"
        )));
    }

    let regions = ColorRegionPartitioner::default().partition(image, num_colors, level, rng);
    let doc = vectorize::regions_to_document(image.width(), image.height(), &regions);
    info!(%level, regions = regions.len(), paths = doc.len(), "vectorized with colors");
    Ok(doc)
}

/// Output of [`process_complete`].
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    pub candidates: Vec<ColorCandidate>,
    /// Top candidate and the image with it removed, when one was found.
    #[serde(skip)]
    pub removed: Option<(ColorCandidate, RgbaImage)>,
    pub document: VectorDocument,
}

/// Detect the dominant background, remove it, then vectorize what remains.
///
/// Removed pixels are flattened onto white before tracing so they read as
/// paper.
pub fn process_complete(image: &RgbImage, tolerance: f64, level: DetailLevel) -> Result<ProcessOutcome> {
    let candidates = detect_background_colors(image, 6)?;

    let (removed, document) = match candidates.first() {
        Some(top) => {
            let cutout = remove_color_background_hq(image, top.color, tolerance)?;
            let flat = flatten_onto(&cutout, Color::WHITE);
            let document = vectorize_hq(&flat, level)?;
            (Some((top.clone(), cutout)), document)
        }
        None => (None, vectorize_hq(image, level)?),
    };

    Ok(ProcessOutcome {
        candidates,
        removed,
        document,
    })
}
