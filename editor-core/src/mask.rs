use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::Color;
use crate::filter::{field_to_gray, gaussian_taps, separable_blur};

pub const MASK_ON: u8 = 255;
pub const MASK_OFF: u8 = 0;

/// Scale factors and refinement settings for mask construction.
///
/// The metric scale factors are empirical defaults and may be recalibrated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskConfig {
    /// Manhattan threshold as a multiple of the tolerance.
    pub manhattan_scale: f64,
    /// Per-channel threshold as a multiple of the tolerance.
    pub channel_scale: f64,
    pub open_radius: u8,
    pub close_radius: u8,
    pub smoothing_sigma: f32,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            manhattan_scale: 1.5,
            channel_scale: 0.7,
            open_radius: 1,
            close_radius: 2,
            smoothing_sigma: 0.5,
        }
    }
}

/// Binary removal mask; 255 marks background.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask(GrayImage);

impl Mask {
    pub fn from_gray(image: GrayImage) -> Self {
        Self(image)
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.0
    }

    pub fn into_gray(self) -> GrayImage {
        self.0
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y)[0] > 127
    }

    pub fn count(&self) -> usize {
        self.0.pixels().filter(|p| p[0] > 127).count()
    }
}

/// Refined mask together with the smoothed field it was thresholded from.
#[derive(Debug, Clone)]
pub struct RefinedMask {
    pub mask: Mask,
    /// Smoothed intensity before re-thresholding, used for soft alpha.
    pub field: GrayImage,
}

/// Builds background masks from fused color distance tests.
#[derive(Debug, Clone, Default)]
pub struct MaskBuilder {
    config: MaskConfig,
}

impl MaskBuilder {
    pub fn new(config: MaskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MaskConfig {
        &self.config
    }

    /// Whether `pixel` is close enough to `target` under any of the three metrics.
    pub fn matches(&self, pixel: [f64; 3], target: [f64; 3], tolerance: f64) -> bool {
        let d = [
            (pixel[0] - target[0]).abs(),
            (pixel[1] - target[1]).abs(),
            (pixel[2] - target[2]).abs(),
        ];

        let euclidean = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
        if euclidean <= tolerance {
            return true;
        }

        let manhattan = d[0] + d[1] + d[2];
        if manhattan <= tolerance * self.config.manhattan_scale {
            return true;
        }

        let gate = tolerance * self.config.channel_scale;
        d.iter().all(|v| *v <= gate)
    }

    /// Unrefined mask: the logical OR of the three distance tests.
    pub fn build_raw(&self, image: &RgbImage, target: Color, tolerance: f64) -> Mask {
        let t = target.to_f64();
        let mask = GrayImage::from_fn(image.width(), image.height(), |x, y| {
            let p = image.get_pixel(x, y);
            let p = [p[0] as f64, p[1] as f64, p[2] as f64];
            Luma([if self.matches(p, t, tolerance) { MASK_ON } else { MASK_OFF }])
        });
        Mask(mask)
    }

    /// Open to drop speckles, close to fill pinholes, then smooth and re-threshold.
    pub fn refine(&self, raw: &Mask) -> RefinedMask {
        let (w, h) = raw.dimensions();
        let opened = open(raw.as_gray(), Norm::L1, self.config.open_radius);
        let closed = close(&opened, Norm::L1, self.config.close_radius);

        let taps = gaussian_taps(self.config.smoothing_sigma, 1);
        let field = field_to_gray(&separable_blur(&closed, &taps), w, h);
        let mask = GrayImage::from_fn(w, h, |x, y| {
            Luma([if field.get_pixel(x, y)[0] > 127 { MASK_ON } else { MASK_OFF }])
        });

        RefinedMask {
            mask: Mask(mask),
            field,
        }
    }

    /// Raw mask followed by refinement.
    pub fn build_mask(&self, image: &RgbImage, target: Color, tolerance: f64) -> RefinedMask {
        let raw = self.build_raw(image, target, tolerance);
        let refined = self.refine(&raw);
        debug!(
            raw = raw.count(),
            refined = refined.mask.count(),
            "built background mask"
        );
        refined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_each_metric_can_match() {
        let builder = MaskBuilder::default();
        let target = [100.0, 100.0, 100.0];
        // Euclidean 17.3, inside tolerance 20
        assert!(builder.matches([110.0, 110.0, 110.0], target, 20.0));
        // Euclidean 25 > 20, Manhattan 25 <= 30
        assert!(builder.matches([125.0, 100.0, 100.0], target, 20.0));
        // Far on every metric
        assert!(!builder.matches([200.0, 0.0, 50.0], target, 20.0));
    }

    #[test]
    fn test_channel_gate_extends_recall() {
        let builder = MaskBuilder::new(MaskConfig {
            manhattan_scale: 0.0,
            ..MaskConfig::default()
        });
        let target = [100.0, 100.0, 100.0];
        // Euclidean 22.5 > 20, every channel within 14
        assert!(builder.matches([113.0, 113.0, 113.0], target, 20.0));
        assert!(!builder.matches([115.0, 115.0, 115.0], target, 20.0));
    }

    #[test]
    fn test_zero_tolerance_is_exact() {
        let mut img = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        img.put_pixel(1, 1, Rgb([10, 20, 31]));
        let mask = MaskBuilder::default().build_raw(&img, Color::new(10, 20, 30), 0.0);
        assert_eq!(mask.count(), 15);
        assert!(!mask.is_set(1, 1));
    }

    #[test]
    fn test_refine_removes_speckle_and_fills_hole() {
        let builder = MaskBuilder::default();
        let mut raw = GrayImage::new(30, 30);
        // Solid block with a pinhole
        for y in 5..25 {
            for x in 5..25 {
                raw.put_pixel(x, y, Luma([MASK_ON]));
            }
        }
        raw.put_pixel(15, 15, Luma([MASK_OFF]));
        // Isolated speckle
        raw.put_pixel(1, 28, Luma([MASK_ON]));

        let refined = builder.refine(&Mask::from_gray(raw));
        assert!(refined.mask.is_set(15, 15));
        assert!(!refined.mask.is_set(1, 28));
        assert_eq!(refined.mask.dimensions(), (30, 30));
        assert_eq!(refined.field.get_pixel(15, 10)[0], 255);
        assert_eq!(refined.field.get_pixel(0, 0)[0], 0);
    }
}
