//! Contrast-limited adaptive histogram equalization.
//!
//! The image is split into a grid of tiles. Each tile gets its own
//! equalization table built from a clipped histogram, and every pixel blends
//! the tables of the four nearest tile centers.

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

const BINS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clahe {
    /// Histogram bins are capped at this multiple of a uniform tile histogram.
    pub clip_limit: f32,
    /// Tiles per axis, reduced on images smaller than the grid.
    pub tile_grid: u32,
}

impl Default for Clahe {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tile_grid: 8,
        }
    }
}

/// Tile indices on either side of a position in tile-center units, and the
/// weight of the second one.
fn neighbors(f: f32, count: u32) -> (usize, usize, f32) {
    let lo = f.floor();
    let last = count - 1;
    let i0 = (lo.max(0.0) as u32).min(last);
    let i1 = ((lo + 1.0).max(0.0) as u32).min(last);
    (i0 as usize, i1 as usize, f - lo)
}

impl Clahe {
    /// Equalization table for the pixels in `[x0, x0 + w) x [y0, y0 + h)`.
    fn tile_table(&self, image: &GrayImage, x0: u32, y0: u32, w: u32, h: u32) -> [u8; BINS] {
        let x1 = (x0 + w).min(image.width());
        let y1 = (y0 + h).min(image.height());
        let mut hist = [0u32; BINS];
        for y in y0..y1 {
            for x in x0..x1 {
                hist[image.get_pixel(x, y)[0] as usize] += 1;
            }
        }
        let total: u32 = hist.iter().sum();
        let mut table = [0u8; BINS];
        if total == 0 {
            return table;
        }

        let limit = ((self.clip_limit * total as f32 / BINS as f32) as u32).max(1);
        let mut excess = 0u32;
        for bin in hist.iter_mut() {
            if *bin > limit {
                excess += *bin - limit;
                *bin = limit;
            }
        }
        // Spread the clipped counts evenly, remainder over evenly spaced bins
        let share = excess / BINS as u32;
        let remainder = (excess % BINS as u32) as usize;
        hist.iter_mut().for_each(|bin| *bin += share);
        if remainder > 0 {
            let step = (BINS / remainder).max(1);
            for i in (0..BINS).step_by(step).take(remainder) {
                hist[i] += 1;
            }
        }

        let scale = 255.0 / total as f32;
        let mut cumulative = 0u32;
        for (entry, bin) in table.iter_mut().zip(hist) {
            cumulative += bin;
            *entry = (cumulative as f32 * scale).round().min(255.0) as u8;
        }
        table
    }

    pub fn apply(&self, image: &GrayImage) -> GrayImage {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return image.clone();
        }
        let grid = self.tile_grid.max(1);
        let tile_w = width.div_ceil(grid.min(width));
        let tile_h = height.div_ceil(grid.min(height));
        let cols = width.div_ceil(tile_w);
        let rows = height.div_ceil(tile_h);

        let mut tables = Vec::with_capacity((cols * rows) as usize);
        for ty in 0..rows {
            for tx in 0..cols {
                tables.push(self.tile_table(image, tx * tile_w, ty * tile_h, tile_w, tile_h));
            }
        }

        GrayImage::from_fn(width, height, |x, y| {
            let v = image.get_pixel(x, y)[0] as usize;
            let (c0, c1, wx) = neighbors((x as f32 + 0.5) / tile_w as f32 - 0.5, cols);
            let (r0, r1, wy) = neighbors((y as f32 + 0.5) / tile_h as f32 - 0.5, rows);
            let at = |r: usize, c: usize| tables[r * cols as usize + c][v] as f32;
            let top = at(r0, c0) * (1.0 - wx) + at(r0, c1) * wx;
            let bottom = at(r1, c0) * (1.0 - wx) + at(r1, c1) * wx;
            Luma([(top * (1.0 - wy) + bottom * wy).round().clamp(0.0, 255.0) as u8])
        })
    }
}
