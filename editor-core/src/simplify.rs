use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::contours::{interior_pixels, pixel_area, ring_length, BoundaryKind, Contour};
use crate::detail::DetailParams;
use crate::document::{PathCommand, VectorPath};

/// Reduced vertex ring ready to be rendered as a closed path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplifiedPath {
    pub vertices: Vec<Coord<f64>>,
    pub smoothing_factor: f64,
}

impl SimplifiedPath {
    /// Drawing instructions for this ring.
    ///
    /// With smoothing enabled each interior vertex becomes the control point
    /// of a quadratic segment ending halfway to the next vertex. The last
    /// vertex is always reached with a straight segment before closing.
    pub fn commands(&self) -> Vec<PathCommand> {
        let v = &self.vertices;
        let n = v.len();
        if n == 0 {
            return Vec::new();
        }

        let mut commands = Vec::with_capacity(n + 1);
        commands.push(PathCommand::MoveTo(v[0]));
        for i in 1..n {
            if i < n - 1 && self.smoothing_factor > 0.0 {
                commands.push(PathCommand::QuadTo {
                    control: v[i],
                    end: midpoint(v[i], v[i + 1]),
                });
            } else {
                commands.push(PathCommand::LineTo(v[i]));
            }
        }
        commands.push(PathCommand::Close);
        commands
    }
}

/// An outer ring together with the holes cut out of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub outer: SimplifiedPath,
    pub holes: Vec<SimplifiedPath>,
}

impl Shape {
    /// Whole pixels covered by the outer ring minus those inside its holes.
    pub fn pixel_area(&self) -> f64 {
        let holes: f64 = self.holes.iter().map(|h| interior_pixels(&h.vertices)).sum();
        (pixel_area(&self.outer.vertices) - holes).max(0.0)
    }

    /// A filled path; holes become even-odd subpaths.
    pub fn to_path(&self, fill: Color) -> VectorPath {
        let mut path = VectorPath::new(self.outer.commands(), fill);
        for hole in &self.holes {
            path.push_hole(hole.commands());
        }
        path
    }
}

fn midpoint(a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (a.x + b.x) / 2.0,
        y: (a.y + b.y) / 2.0,
    }
}

fn point_segment_distance(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return ((p.x - a.x).powi(2) + (p.y - a.y).powi(2)).sqrt();
    }
    // Perpendicular distance to the infinite line through a and b
    ((p.x - a.x) * dy - (p.y - a.y) * dx).abs() / len_sq.sqrt()
}

/// Douglas-Peucker on an open polyline; endpoints are always kept.
pub fn douglas_peucker(points: &[Coord<f64>], epsilon: f64) -> Vec<Coord<f64>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let first = points[0];
    let last = points[points.len() - 1];

    let mut max_dist = 0.0;
    let mut max_idx = 0;
    for (i, p) in points.iter().enumerate().take(points.len() - 1).skip(1) {
        let dist = point_segment_distance(*p, first, last);
        if dist > max_dist {
            max_dist = dist;
            max_idx = i;
        }
    }

    if max_dist > epsilon {
        let mut left = douglas_peucker(&points[..=max_idx], epsilon);
        let right = douglas_peucker(&points[max_idx..], epsilon);
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

/// Douglas-Peucker on a closed ring.
///
/// The ring is split at its first point and the point farthest from it; each
/// half is simplified separately so both split points survive.
pub fn douglas_peucker_closed(ring: &[Coord<f64>], epsilon: f64) -> Vec<Coord<f64>> {
    if ring.len() < 3 {
        return ring.to_vec();
    }
    let start = ring[0];
    let far = ring
        .iter()
        .enumerate()
        .map(|(i, p)| (i, (p.x - start.x).powi(2) + (p.y - start.y).powi(2)))
        .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best })
        .0;
    if far == 0 {
        return vec![start];
    }

    let mut first_half = douglas_peucker(&ring[..=far], epsilon);
    let mut second: Vec<Coord<f64>> = ring[far..].to_vec();
    second.push(start);
    let mut second_half = douglas_peucker(&second, epsilon);

    first_half.pop();
    second_half.pop();
    first_half.extend(second_half);
    first_half
}

/// Reduces traced boundaries to a small vertex set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSimplifier {
    pub epsilon_factor: f64,
    pub smoothing_factor: f64,
}

impl PathSimplifier {
    pub fn new(epsilon_factor: f64, smoothing_factor: f64) -> Self {
        Self {
            epsilon_factor,
            smoothing_factor,
        }
    }

    pub fn from_params(params: &DetailParams) -> Self {
        Self::new(params.epsilon_factor, params.smoothing_factor)
    }

    /// Simplify a ring with `epsilon = epsilon_factor * perimeter`.
    ///
    /// Returns `None` when fewer than three vertices remain.
    pub fn simplify_ring(&self, ring: &[Coord<f64>]) -> Option<SimplifiedPath> {
        let epsilon = self.epsilon_factor * ring_length(ring);
        let vertices = douglas_peucker_closed(ring, epsilon);
        if vertices.len() < 3 {
            return None;
        }
        Some(SimplifiedPath {
            vertices,
            smoothing_factor: self.smoothing_factor,
        })
    }

    pub fn simplify(&self, contour: &Contour) -> Option<SimplifiedPath> {
        self.simplify_ring(&contour.coords())
    }

    /// Group traced boundaries into shapes.
    ///
    /// Every outer boundary starts a shape and each hole joins the shape of
    /// its parent. Holes whose parent was not kept are dropped, as are
    /// boundaries that simplify away.
    pub fn simplify_shapes(&self, contours: &[Contour]) -> Vec<Shape> {
        let mut shape_for = vec![None; contours.len()];
        let mut shapes: Vec<Shape> = Vec::new();
        for (i, contour) in contours.iter().enumerate() {
            let Some(simplified) = self.simplify(contour) else {
                continue;
            };
            match contour.kind {
                BoundaryKind::Outer => {
                    shape_for[i] = Some(shapes.len());
                    shapes.push(Shape {
                        outer: simplified,
                        holes: Vec::new(),
                    });
                }
                BoundaryKind::Hole => {
                    if let Some(s) = contour.parent.and_then(|p| shape_for[p]) {
                        shapes[s].holes.push(simplified);
                    }
                }
            }
        }
        shapes
    }
}
