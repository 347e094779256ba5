use std::collections::HashMap;

use image::{GrayImage, Luma, RgbImage};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clusterer::color_histogram;
use crate::color::Color;
use crate::contours::{ContourExtractor, INK, PAPER};
use crate::detail::DetailLevel;
use crate::kmeans::{self, squared_distance, KMeansConfig, Point};
use crate::simplify::{PathSimplifier, Shape};

/// One flat-color layer of a colored vectorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRegion {
    pub color: Color,
    pub shapes: Vec<Shape>,
}

impl ColorRegion {
    /// Pixels covered by this layer, holes excluded.
    pub fn pixel_area(&self) -> f64 {
        self.shapes.iter().map(Shape::pixel_area).sum()
    }
}

/// An image reduced to a small palette.
#[derive(Debug, Clone)]
pub struct Quantized {
    /// Palette entries, most frequent first.
    pub palette: Vec<Color>,
    /// Palette index per pixel, row-major.
    pub labels: Vec<usize>,
    pub width: u32,
    pub height: u32,
}

impl Quantized {
    /// Binary mask of pixels assigned to palette entry `index`.
    pub fn membership(&self, index: usize) -> GrayImage {
        let width = self.width;
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let label = self.labels[(y * width + x) as usize];
            Luma([if label == index { INK } else { PAPER }])
        })
    }

    /// Repaint every pixel with its palette color.
    pub fn to_image(&self) -> RgbImage {
        let width = self.width;
        RgbImage::from_fn(self.width, self.height, |x, y| {
            self.palette[self.labels[(y * width + x) as usize]].to_rgb()
        })
    }
}

fn nearest_index(point: &Point, palette: &[Point]) -> usize {
    palette
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(point, c)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
        .0
}

/// Quantizes an image and traces each palette color separately.
#[derive(Debug, Clone)]
pub struct ColorRegionPartitioner {
    config: KMeansConfig,
}

impl Default for ColorRegionPartitioner {
    fn default() -> Self {
        Self::new(KMeansConfig::quantization())
    }
}

impl ColorRegionPartitioner {
    pub fn new(config: KMeansConfig) -> Self {
        Self { config }
    }

    /// Cluster every pixel of `image` into at most `num_colors` colors.
    pub fn quantize<R: Rng + ?Sized>(&self, image: &RgbImage, num_colors: usize, rng: &mut R) -> Quantized {
        let pixels: Vec<Color> = image.pixels().map(|p| Color::from(*p)).collect();
        let hist = color_histogram(&pixels);
        let k = num_colors.min(hist.len()).max(1);

        let points: Vec<Point> = hist.iter().map(|(c, _)| c.to_f64().map(|v| v / 255.0)).collect();
        let weights: Vec<f64> = hist.iter().map(|(_, n)| *n as f64).collect();

        let (centroids, distinct_labels) = match kmeans::fit(&points, &weights, k, &self.config, rng) {
            Ok(fit) => (fit.centroids, fit.labels),
            Err(e) => {
                // Most frequent colors become the palette
                warn!(?e, "quantization clustering failed, using histogram palette");
                let mut ranked: Vec<usize> = (0..hist.len()).collect();
                ranked.sort_by(|&a, &b| hist[b].1.cmp(&hist[a].1));
                let centroids: Vec<Point> = ranked.iter().take(k).map(|&i| points[i]).collect();
                let labels = points.iter().map(|p| nearest_index(p, &centroids)).collect();
                (centroids, labels)
            }
        };

        // Order palette entries by pixel count, dropping unused centroids
        let mut counts = vec![0usize; centroids.len()];
        for (label, (_, n)) in distinct_labels.iter().zip(&hist) {
            counts[*label] += n;
        }
        let mut order: Vec<usize> = (0..centroids.len()).filter(|&j| counts[j] > 0).collect();
        order.sort_by(|&a, &b| counts[b].cmp(&counts[a]).then(a.cmp(&b)));
        let mut remap = vec![0usize; centroids.len()];
        for (new, &old) in order.iter().enumerate() {
            remap[old] = new;
        }
        let palette: Vec<Color> = order
            .iter()
            .map(|&j| Color::from_f64(centroids[j].map(|v| v * 255.0)))
            .collect();

        let lookup: HashMap<Color, usize> = hist
            .iter()
            .zip(&distinct_labels)
            .map(|((c, _), &l)| (*c, remap[l]))
            .collect();
        let labels = pixels.iter().map(|c| lookup.get(c).copied().unwrap_or(0)).collect();

        debug!(distinct = hist.len(), colors = palette.len(), "quantized image");
        Quantized {
            palette,
            labels,
            width: image.width(),
            height: image.height(),
        }
    }

    /// Vector regions per palette color, omitting colors with no surviving shapes.
    ///
    /// Quantization runs on the source pixels, so flat areas keep their exact
    /// color. Areas of other colors enclosed by a region are cut out of it.
    pub fn partition<R: Rng + ?Sized>(
        &self,
        image: &RgbImage,
        num_colors: usize,
        level: DetailLevel,
        rng: &mut R,
    ) -> Vec<ColorRegion> {
        if image.width() == 0 || image.height() == 0 {
            return Vec::new();
        }
        let quantized = self.quantize(image, num_colors, rng);

        let params = level.params();
        let extractor = ContourExtractor::new(params);
        let simplifier = PathSimplifier::from_params(&params);

        let mut regions = Vec::new();
        for (index, color) in quantized.palette.iter().enumerate() {
            let membership = extractor.clean(&quantized.membership(index));
            let shapes = simplifier.simplify_shapes(&extractor.trace(&membership));
            if shapes.is_empty() {
                continue;
            }
            regions.push(ColorRegion { color: *color, shapes });
        }

        debug!(regions = regions.len(), "partitioned color regions");
        regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn stripes(colors: &[[u8; 3]], stripe_width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(stripe_width * colors.len() as u32, height, |x, _| {
            Rgb(colors[(x / stripe_width) as usize])
        })
    }

    #[test]
    fn test_quantize_exact_palette() {
        let img = stripes(&[[200, 30, 30], [30, 200, 30], [30, 30, 200]], 10, 10);
        let q = ColorRegionPartitioner::default().quantize(&img, 8, &mut StdRng::seed_from_u64(42));
        assert_eq!(q.palette.len(), 3);
        assert_eq!(q.to_image(), img);
    }

    #[test]
    fn test_quantize_merges_near_colors() {
        let img = stripes(&[[0, 0, 0], [2, 2, 2], [250, 250, 250], [253, 253, 253]], 5, 5);
        let q = ColorRegionPartitioner::default().quantize(&img, 2, &mut StdRng::seed_from_u64(1));
        assert_eq!(q.palette.len(), 2);
        assert_eq!(q.labels[0], q.labels[5]);
        assert_ne!(q.labels[0], q.labels[10]);
    }

    #[test]
    fn test_partition_one_region_per_block() {
        let colors = [[220, 40, 40], [40, 220, 40], [40, 40, 220]];
        let img = stripes(&colors, 20, 40);
        let regions = ColorRegionPartitioner::default().partition(
            &img,
            5,
            DetailLevel::High,
            &mut StdRng::seed_from_u64(42),
        );

        assert_eq!(regions.len(), 3);
        for region in &regions {
            let area = region.pixel_area();
            assert!((area - 800.0).abs() <= 40.0, "area {area}");
            assert!(colors.contains(&[region.color.r, region.color.g, region.color.b]));
        }
    }

    fn partition_area(img: &RgbImage, num_colors: usize, color: Color) -> f64 {
        let regions = ColorRegionPartitioner::default().partition(
            img,
            num_colors,
            DetailLevel::High,
            &mut StdRng::seed_from_u64(42),
        );
        regions
            .iter()
            .find(|r| r.color == color)
            .map(ColorRegion::pixel_area)
            .unwrap_or(0.0)
    }

    fn assert_close(area: f64, expected: f64) {
        assert!((area - expected).abs() <= expected * 0.02 + 4.0, "area {area}, expected {expected}");
    }

    #[test]
    fn test_surrounding_region_excludes_enclosed_square() {
        let mut img = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        for y in 30..70 {
            for x in 30..70 {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        assert_close(partition_area(&img, 4, Color::WHITE), 8400.0);
        assert_close(partition_area(&img, 4, Color::BLACK), 1600.0);
    }

    #[test]
    fn test_minority_frame_keeps_interior_open() {
        let red = Color::new(200, 30, 30);
        let blue = Color::new(30, 30, 200);
        let img = RgbImage::from_fn(100, 100, |x, y| {
            let frame = x < 6 || y < 6 || x >= 94 || y >= 94;
            if frame {
                red.to_rgb()
            } else {
                blue.to_rgb()
            }
        });
        let regions = ColorRegionPartitioner::default().partition(
            &img,
            4,
            DetailLevel::High,
            &mut StdRng::seed_from_u64(42),
        );
        assert_eq!(regions.len(), 2);
        // Most frequent color first, so the frame is drawn over the interior
        assert_eq!(regions[0].color, blue);
        assert_eq!(regions[1].color, red);
        assert_eq!(regions[1].shapes.len(), 1);
        assert_eq!(regions[1].shapes[0].holes.len(), 1);
        assert_close(regions[1].pixel_area(), 2256.0);
        assert_close(regions[0].pixel_area(), 7744.0);
    }

    #[test]
    fn test_nested_squares() {
        let img = RgbImage::from_fn(100, 100, |x, y| {
            let inner = (40..60).contains(&x) && (40..60).contains(&y);
            let middle = (20..80).contains(&x) && (20..80).contains(&y);
            if inner {
                Rgb([20, 20, 180])
            } else if middle {
                Rgb([180, 20, 20])
            } else {
                Rgb([240, 240, 240])
            }
        });
        assert_close(partition_area(&img, 5, Color::new(240, 240, 240)), 6400.0);
        assert_close(partition_area(&img, 5, Color::new(180, 20, 20)), 3200.0);
        assert_close(partition_area(&img, 5, Color::new(20, 20, 180)), 400.0);
    }

    #[test]
    fn test_dark_background_is_traced() {
        let mut img = RgbImage::from_pixel(80, 60, Rgb([0, 0, 0]));
        for y in 20..40 {
            for x in 25..55 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        assert_close(partition_area(&img, 2, Color::BLACK), 4800.0 - 600.0);
        assert_close(partition_area(&img, 2, Color::WHITE), 600.0);
    }

    #[test]
    fn test_tiny_regions_omitted() {
        let mut img = RgbImage::from_pixel(30, 30, Rgb([255, 255, 255]));
        img.put_pixel(15, 15, Rgb([0, 0, 0]));
        let regions = ColorRegionPartitioner::default().partition(
            &img,
            2,
            DetailLevel::Low,
            &mut StdRng::seed_from_u64(42),
        );
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].color, Color::WHITE);
    }
}
