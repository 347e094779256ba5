//! Weighted k-means with k-means++ seeding and Lloyd refinement.
//!
//! Points are RGB triples (usually normalized to [0, 1]) carrying a weight,
//! which lets callers cluster deduplicated colors while still accounting for
//! how often each color occurred.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub type Point = [f64; 3];

/// Iteration limits and restart policy for a clustering run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KMeansConfig {
    pub max_iterations: usize,
    /// Convergence threshold, relative to the mean per-channel variance.
    pub tolerance: f64,
    pub restarts: usize,
    /// Standard deviation of the Gaussian jitter added before clustering.
    pub jitter: f64,
    /// Whether centroids are pulled toward frequent colors.
    pub weighted: bool,
}

impl KMeansConfig {
    /// Fast, relaxed settings used on border samples.
    pub fn border_sampling() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-3,
            restarts: 5,
            jitter: 1e-6,
            weighted: false,
        }
    }

    /// Thorough settings used to quantize a whole image.
    pub fn quantization() -> Self {
        Self {
            max_iterations: 300,
            tolerance: 1e-4,
            restarts: 20,
            jitter: 0.0,
            weighted: true,
        }
    }
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self::border_sampling()
    }
}

#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub centroids: Vec<Point>,
    pub labels: Vec<usize>,
    pub inertia: f64,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KMeansFailure {
    EmptyInput,
    InvalidClusterCount,
    NonFinite,
}

#[inline]
pub fn squared_distance(a: &Point, b: &Point) -> f64 {
    let d0 = a[0] - b[0];
    let d1 = a[1] - b[1];
    let d2 = a[2] - b[2];
    d0 * d0 + d1 * d1 + d2 * d2
}

fn nearest(point: &Point, centroids: &[Point]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

/// Weighted mean of the per-channel variances, used to scale the tolerance.
fn mean_variance(points: &[Point], weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let mut mean = [0.0; 3];
    for (p, w) in points.iter().zip(weights) {
        for ch in 0..3 {
            mean[ch] += p[ch] * w;
        }
    }
    mean.iter_mut().for_each(|m| *m /= total);

    let mut var = 0.0;
    for (p, w) in points.iter().zip(weights) {
        var += squared_distance(p, &mean) * w;
    }
    var / total / 3.0
}

/// Draw an index with probability proportional to `scores`.
fn pick_weighted<R: Rng + ?Sized>(scores: &[f64], rng: &mut R) -> Option<usize> {
    let total: f64 = scores.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }
    let mut target = rng.gen::<f64>() * total;
    for (i, s) in scores.iter().enumerate() {
        if target < *s {
            return Some(i);
        }
        target -= s;
    }
    scores.iter().rposition(|s| *s > 0.0)
}

/// k-means++ seeding over weighted points.
fn seed_centroids<R: Rng + ?Sized>(points: &[Point], weights: &[f64], k: usize, rng: &mut R) -> Vec<Point> {
    let mut centroids = Vec::with_capacity(k);
    let first = pick_weighted(weights, rng).unwrap_or(0);
    centroids.push(points[first]);

    let mut dist: Vec<f64> = points.iter().map(|p| squared_distance(p, &points[first])).collect();
    while centroids.len() < k {
        let scores: Vec<f64> = dist.iter().zip(weights).map(|(d, w)| d * w).collect();
        // All remaining mass sits on existing centroids
        let Some(next) = pick_weighted(&scores, rng) else {
            break;
        };
        let c = points[next];
        centroids.push(c);
        for (d, p) in dist.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &c));
        }
    }

    // Pad with copies when there are fewer distinct points than k
    while centroids.len() < k {
        centroids.push(centroids[centroids.len() - 1]);
    }
    centroids
}

fn lloyd(
    points: &[Point],
    weights: &[f64],
    mut centroids: Vec<Point>,
    config: &KMeansConfig,
    tol: f64,
) -> KMeansFit {
    let k = centroids.len();
    let mut labels = vec![0usize; points.len()];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;

        for (label, p) in labels.iter_mut().zip(points) {
            *label = nearest(p, &centroids).0;
        }

        let mut sums = vec![[0.0f64; 3]; k];
        let mut mass = vec![0.0f64; k];
        for ((p, w), &l) in points.iter().zip(weights).zip(&labels) {
            for ch in 0..3 {
                sums[l][ch] += p[ch] * w;
            }
            mass[l] += w;
        }

        let mut shift = 0.0;
        for j in 0..k {
            // Empty clusters keep their previous centroid
            if mass[j] <= 0.0 {
                continue;
            }
            let updated = [sums[j][0] / mass[j], sums[j][1] / mass[j], sums[j][2] / mass[j]];
            shift += squared_distance(&updated, &centroids[j]);
            centroids[j] = updated;
        }

        if shift <= tol {
            converged = true;
            break;
        }
    }

    let mut inertia = 0.0;
    for ((label, p), w) in labels.iter_mut().zip(points).zip(weights) {
        let (idx, d) = nearest(p, &centroids);
        *label = idx;
        inertia += d * w;
    }

    KMeansFit {
        centroids,
        labels,
        inertia,
        iterations,
        converged,
    }
}

/// Cluster `points` into `k` groups, keeping the restart with the lowest inertia.
///
/// When `config.weighted` is false every point counts once regardless of
/// `weights`.
pub fn fit<R: Rng + ?Sized>(
    points: &[Point],
    weights: &[f64],
    k: usize,
    config: &KMeansConfig,
    rng: &mut R,
) -> Result<KMeansFit, KMeansFailure> {
    if points.is_empty() || points.len() != weights.len() {
        return Err(KMeansFailure::EmptyInput);
    }
    if k == 0 {
        return Err(KMeansFailure::InvalidClusterCount);
    }
    if points.iter().flatten().any(|v| !v.is_finite()) {
        return Err(KMeansFailure::NonFinite);
    }

    let uniform;
    let weights = if config.weighted {
        weights
    } else {
        uniform = vec![1.0; points.len()];
        uniform.as_slice()
    };

    let tol = config.tolerance * mean_variance(points, weights);
    let mut best: Option<KMeansFit> = None;

    for _ in 0..config.restarts.max(1) {
        let seeds = seed_centroids(points, weights, k, rng);
        let run = lloyd(points, weights, seeds, config, tol);
        if !run.inertia.is_finite() {
            return Err(KMeansFailure::NonFinite);
        }
        if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
            best = Some(run);
        }
    }

    let best = best.ok_or(KMeansFailure::EmptyInput)?;
    if !best.converged {
        debug!(iterations = best.iterations, "k-means stopped at iteration cap");
    }
    Ok(best)
}
