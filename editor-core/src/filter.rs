//! Separable Gaussian filtering on single-channel images.
//!
//! Results are kept in `f32` so callers can threshold against the exact local
//! mean, and are rounded when converted back to 8 bits.

use image::{GrayImage, Luma};

/// Normalized Gaussian taps of length `2 * radius + 1`.
pub fn gaussian_taps(sigma: f32, radius: usize) -> Vec<f32> {
    if radius == 0 || sigma <= 0.0 {
        return vec![1.0];
    }
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut taps: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let d = i as f32 - radius as f32;
            (-(d * d) / two_sigma_sq).exp()
        })
        .collect();
    let sum: f32 = taps.iter().sum();
    taps.iter_mut().for_each(|t| *t /= sum);
    taps
}

/// Sigma conventionally paired with an odd kernel size.
pub fn kernel_sigma(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Taps for an odd kernel size, using [`kernel_sigma`].
pub fn kernel_taps(ksize: u32) -> Vec<f32> {
    let radius = (ksize.max(1) as usize - 1) / 2;
    gaussian_taps(kernel_sigma(ksize), radius)
}

/// Convolve with `taps` horizontally then vertically, replicating edge pixels.
pub fn separable_blur(image: &GrayImage, taps: &[f32]) -> Vec<f32> {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let src: Vec<f32> = image.as_raw().iter().map(|&v| v as f32).collect();
    if taps.len() <= 1 || w == 0 || h == 0 {
        return src;
    }
    let r = (taps.len() / 2) as isize;

    let mut horizontal = vec![0.0f32; w * h];
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0.0;
            for (i, t) in taps.iter().enumerate() {
                let sx = (x as isize + i as isize - r).clamp(0, w as isize - 1) as usize;
                acc += row[sx] * t;
            }
            horizontal[y * w + x] = acc;
        }
    }

    let mut out = vec![0.0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (i, t) in taps.iter().enumerate() {
                let sy = (y as isize + i as isize - r).clamp(0, h as isize - 1) as usize;
                acc += horizontal[sy * w + x] * t;
            }
            out[y * w + x] = acc;
        }
    }
    out
}

/// Round a float field back into an 8-bit image.
pub fn field_to_gray(field: &[f32], width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let v = field[(y * width + x) as usize];
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

/// Gaussian blur for an odd kernel size; sizes of 1 or less return a copy.
pub fn blur_gray(image: &GrayImage, ksize: u32) -> GrayImage {
    if ksize <= 1 {
        return image.clone();
    }
    let field = separable_blur(image, &kernel_taps(ksize));
    field_to_gray(&field, image.width(), image.height())
}
