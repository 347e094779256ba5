use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::map::map_colors2;

use crate::color::Color;
use crate::error::{EditorError, Result};
use crate::mask::{Mask, RefinedMask};

fn check_dimensions(image: &RgbImage, alpha: &GrayImage) -> Result<()> {
    if image.dimensions() != alpha.dimensions() {
        return Err(EditorError::DimensionMismatch {
            expected: image.dimensions(),
            actual: alpha.dimensions(),
        });
    }
    Ok(())
}

/// Turns masks into RGBA output. Source channels are copied unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Compositor;

impl Compositor {
    pub fn new() -> Self {
        Self
    }

    /// Attach `alpha` as the fourth channel.
    pub fn with_alpha(&self, image: &RgbImage, alpha: &GrayImage) -> Result<RgbaImage> {
        check_dimensions(image, alpha)?;
        Ok(map_colors2(image, alpha, |Rgb([r, g, b]), Luma([a])| Rgba([r, g, b, a])))
    }

    /// Hard cutout: masked pixels become fully transparent.
    pub fn apply(&self, image: &RgbImage, mask: &Mask) -> Result<RgbaImage> {
        let mask = mask.as_gray();
        check_dimensions(image, mask)?;
        Ok(map_colors2(image, mask, |Rgb([r, g, b]), Luma([m])| {
            let a = if m > 127 { 0 } else { 255 };
            Rgba([r, g, b, a])
        }))
    }

    /// Soft cutout: alpha is the inverse of the smoothed pre-threshold field.
    pub fn apply_soft(&self, image: &RgbImage, refined: &RefinedMask) -> Result<RgbaImage> {
        check_dimensions(image, &refined.field)?;
        Ok(map_colors2(image, &refined.field, |Rgb([r, g, b]), Luma([f])| {
            Rgba([r, g, b, 255 - f])
        }))
    }
}

/// Blend an RGBA image over a solid background color.
pub fn flatten_onto(image: &RgbaImage, background: Color) -> RgbImage {
    let bg = [background.r as u32, background.g as u32, background.b as u32];
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
        let a = a as u32;
        let mix = |c: u8, bgc: u32| ((c as u32 * a + bgc * (255 - a) + 127) / 255) as u8;
        Rgb([mix(r, bg[0]), mix(g, bg[1]), mix(b, bg[2])])
    })
}
