use image::RgbImage;
use tracing::debug;

use crate::clusterer::ColorCandidate;
use crate::color::Color;

/// Minimum number of border pixels required before clustering is attempted.
pub const MIN_SAMPLES: usize = 10;

/// Border band thickness for an image of the given height.
pub fn band_thickness(height: u32) -> u32 {
    (height / 20).clamp(5, 20)
}

/// Collects pixels from the border band of an image.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelSampler;

impl PixelSampler {
    pub fn new() -> Self {
        Self
    }

    /// Sample the top, bottom, left and right bands.
    ///
    /// The side bands only cover rows strictly between the top and bottom
    /// bands so corner pixels are counted once. Returns an empty vector when
    /// fewer than [`MIN_SAMPLES`] pixels were collected; callers fall back to
    /// [`corner_candidates`] in that case.
    pub fn sample(&self, image: &RgbImage) -> Vec<Color> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let t = band_thickness(height);
        let top_end = t.min(height);
        let bottom_start = height.saturating_sub(t).max(top_end);
        let left_end = t.min(width);
        let right_start = width.saturating_sub(t).max(left_end);

        let band_rows = top_end + (height - bottom_start);
        let side_rows = bottom_start - top_end;
        let side_cols = left_end + (width - right_start);
        let capacity = (band_rows as usize) * (width as usize) + (side_rows as usize) * (side_cols as usize);

        let mut samples = Vec::with_capacity(capacity);
        let rows = (0..top_end).chain(bottom_start..height);
        for y in rows {
            for x in 0..width {
                samples.push(Color::from(*image.get_pixel(x, y)));
            }
        }
        for y in top_end..bottom_start {
            for x in (0..left_end).chain(right_start..width) {
                samples.push(Color::from(*image.get_pixel(x, y)));
            }
        }

        debug!(thickness = t, samples = samples.len(), "sampled border band");

        if samples.len() < MIN_SAMPLES {
            debug!("border sample too small");
            return Vec::new();
        }
        samples
    }
}

/// Six fixed probe points: four corners plus top and bottom center.
pub fn corner_points(width: u32, height: u32) -> [(u32, u32); 6] {
    let (r, b, c) = (width.saturating_sub(1), height.saturating_sub(1), width / 2);
    [(0, 0), (r, 0), (0, b), (r, b), (c, 0), (c, b)]
}

/// Equal-weight candidates from the six probe points.
///
/// Identical colors are merged so coverages still sum to 100.
pub fn corner_candidates(image: &RgbImage) -> Vec<ColorCandidate> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let points = corner_points(width, height);
    let mut merged: Vec<(Color, usize)> = Vec::with_capacity(points.len());
    for (x, y) in points {
        let color = Color::from(*image.get_pixel(x, y));
        match merged.iter_mut().find(|(c, _)| *c == color) {
            Some((_, n)) => *n += 1,
            None => merged.push((color, 1)),
        }
    }

    // Stable sort keeps first-seen order among equal counts
    merged.sort_by(|a, b| b.1.cmp(&a.1));
    let total = points.len() as f64;
    merged
        .into_iter()
        .map(|(color, n)| ColorCandidate::new(color, n as f64 / total * 100.0))
        .collect()
}
