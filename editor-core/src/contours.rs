use geo::{Area, BoundingRect, Coord, EuclideanLength, LineString, Polygon, Rect};
use image::{imageops, GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};
use imageproc::point::Point;
use tracing::debug;

use crate::detail::{DetailParams, Retrieval, Threshold};
use crate::filter::{blur_gray, kernel_taps, separable_blur};

pub const INK: u8 = 255;
pub const PAPER: u8 = 0;

/// Intensity at or below which a low-contrast pixel counts as ink.
const FLAT_INK_CUTOFF: u8 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    Outer,
    Hole,
}

/// A closed traced boundary in pixel-center coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
    pub kind: BoundaryKind,
    /// Index of the enclosing contour within the same extraction result.
    pub parent: Option<usize>,
}

impl Contour {
    pub fn coords(&self) -> Vec<Coord<f64>> {
        self.points
            .iter()
            .map(|p| Coord {
                x: p.x as f64,
                y: p.y as f64,
            })
            .collect()
    }

    /// Enclosed area of the boundary polygon.
    pub fn area(&self) -> f64 {
        Polygon::new(LineString::from(self.coords()), vec![]).unsigned_area()
    }

    /// Length of the closed boundary.
    pub fn perimeter(&self) -> f64 {
        ring_length(&self.coords())
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        LineString::from(self.coords()).bounding_rect()
    }
}

/// Length of a ring, including the closing edge back to its first point.
pub fn ring_length(ring: &[Coord<f64>]) -> f64 {
    if ring.len() < 2 {
        return 0.0;
    }
    let mut line = LineString::from(ring.to_vec());
    line.close();
    line.euclidean_length()
}

/// Shoelace area and boundary lattice point count of a ring.
fn lattice_measure(vertices: &[Coord<f64>]) -> (f64, f64) {
    let polygon = Polygon::new(LineString::from(vertices.to_vec()), vec![]);
    let mut boundary = 0u64;
    for i in 0..vertices.len() {
        let a = vertices[i];
        let b = vertices[(i + 1) % vertices.len()];
        boundary += gcd((b.x - a.x).abs().round() as u64, (b.y - a.y).abs().round() as u64);
    }
    (polygon.unsigned_area(), boundary as f64)
}

/// Number of whole pixels covered by a lattice polygon through pixel centers.
///
/// Uses Pick's theorem, counting boundary lattice points edge by edge.
pub fn pixel_area(vertices: &[Coord<f64>]) -> f64 {
    if vertices.len() < 3 {
        return vertices.len() as f64;
    }
    let (area, boundary) = lattice_measure(vertices);
    area + boundary / 2.0 + 1.0
}

/// Pixels strictly inside a lattice polygon.
///
/// A traced hole runs through the ink pixels around it, so this is the
/// number of pixels the hole removes from its enclosing shape.
pub fn interior_pixels(vertices: &[Coord<f64>]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let (area, boundary) = lattice_measure(vertices);
    (area - boundary / 2.0 + 1.0).max(0.0)
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Binarizes an image and traces region boundaries.
#[derive(Debug, Clone)]
pub struct ContourExtractor {
    params: DetailParams,
}

impl ContourExtractor {
    pub fn new(params: DetailParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DetailParams {
        &self.params
    }

    /// Mark ink pixels with 255.
    ///
    /// The intensity image is blurred and, when configured, locally
    /// equalized before thresholding. In adaptive mode a pixel is ink when it
    /// is darker than its local Gaussian mean by more than the bias. Pixels
    /// whose neighborhood has no such contrast fall back to a fixed cutoff, so
    /// flat dark areas stay filled and flat light areas stay empty.
    pub fn binarize(&self, image: &RgbImage) -> GrayImage {
        let gray = imageops::grayscale(image);
        let gray = blur_gray(&gray, self.params.blur_kernel);
        let gray = match &self.params.contrast {
            Some(clahe) => clahe.apply(&gray),
            None => gray,
        };

        match self.params.threshold {
            Threshold::Global(cutoff) => GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
                Luma([if gray.get_pixel(x, y)[0] <= cutoff { INK } else { PAPER }])
            }),
            Threshold::Adaptive { block_size, bias } => {
                let mean = separable_blur(&gray, &kernel_taps(block_size.max(3) | 1));
                let width = gray.width();
                GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
                    let v = gray.get_pixel(x, y)[0] as f32;
                    let m = mean[(y * width + x) as usize];
                    let ink = if (v - m).abs() <= bias {
                        v <= FLAT_INK_CUTOFF as f32
                    } else {
                        v <= m - bias
                    };
                    Luma([if ink { INK } else { PAPER }])
                })
            }
        }
    }

    /// Close small gaps then drop speckles.
    pub fn clean(&self, binary: &GrayImage) -> GrayImage {
        let closed = close(binary, Norm::LInf, 1);
        open(&closed, Norm::LInf, 1)
    }

    /// Trace ink boundaries, keeping those large enough for the detail level.
    ///
    /// Parent indices are remapped onto the returned vector; a contour whose
    /// parent was discarded gets no parent.
    pub fn trace(&self, binary: &GrayImage) -> Vec<Contour> {
        let (width, height) = binary.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }
        // Ink touching the image edge only gets an outer boundary when
        // surrounded by paper, so trace a copy with a one pixel margin
        let mut padded = GrayImage::from_pixel(width + 2, height + 2, Luma([PAPER]));
        imageops::replace(&mut padded, binary, 1, 1);
        let raw = find_contours::<i32>(&padded);
        let total = raw.len();
        let (max_x, max_y) = (width as i32 - 1, height as i32 - 1);

        let mut index_map = vec![None; raw.len()];
        let mut kept = Vec::new();
        for (i, c) in raw.into_iter().enumerate() {
            if self.params.retrieval == Retrieval::External && c.parent.is_some() {
                continue;
            }
            let kind = match c.border_type {
                BorderType::Outer => BoundaryKind::Outer,
                BorderType::Hole => BoundaryKind::Hole,
            };
            let points = c
                .points
                .into_iter()
                .map(|p| Point::new((p.x - 1).clamp(0, max_x), (p.y - 1).clamp(0, max_y)))
                .collect();
            let contour = Contour {
                points,
                kind,
                parent: c.parent,
            };
            if contour.points.len() < 3 || contour.area() < self.params.min_contour_area {
                continue;
            }
            index_map[i] = Some(kept.len());
            kept.push(contour);
        }

        // Parents always precede their children in tracing order
        for contour in kept.iter_mut() {
            contour.parent = contour.parent.and_then(|p| index_map[p]);
        }

        debug!(traced = total, kept = kept.len(), "traced contours");
        kept
    }

    /// Binarize, clean and trace.
    pub fn extract(&self, image: &RgbImage) -> Vec<Contour> {
        let binary = self.clean(&self.binarize(image));
        self.trace(&binary)
    }
}
