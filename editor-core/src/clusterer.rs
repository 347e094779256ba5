use std::collections::BTreeMap;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::color::{Color, ColorLabel};
use crate::kmeans::{self, KMeansConfig, Point};

/// Clustering is skipped below this many distinct colors.
pub const MIN_DISTINCT_COLORS: usize = 5;
/// Upper bound on the number of clusters for border sampling.
pub const MAX_CLUSTERS: usize = 20;

/// A proposed background color with its share of the sampled pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorCandidate {
    pub color: Color,
    /// Percentage of sampled pixels, in [0, 100].
    pub coverage: f64,
    pub label: ColorLabel,
}

impl ColorCandidate {
    pub fn new(color: Color, coverage: f64) -> Self {
        Self {
            color,
            coverage,
            label: color.label(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackReason {
    /// Too few distinct colors for clustering to be meaningful.
    DegenerateSample,
    /// The centroid search produced unusable values.
    NumericalFailure,
}

/// Result of a clustering attempt; fallbacks are resolved by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterOutcome {
    Clustered(Vec<ColorCandidate>),
    Fallback(FallbackReason),
}

/// Distinct colors in ascending order with their occurrence counts.
pub fn color_histogram(pixels: &[Color]) -> Vec<(Color, usize)> {
    let mut counts: BTreeMap<Color, usize> = BTreeMap::new();
    for p in pixels {
        *counts.entry(*p).or_insert(0) += 1;
    }
    counts.into_iter().collect()
}

/// Effective cluster count for `distinct` colors and `requested` suggestions.
pub fn cluster_count(requested: usize, distinct: usize) -> usize {
    let k = (requested * 2).min(distinct / 5).min(MAX_CLUSTERS);
    k.max(2).min(distinct.max(1))
}

/// Most frequent distinct colors, by raw count.
pub fn histogram_candidates(pixels: &[Color], limit: usize) -> Vec<ColorCandidate> {
    let total = pixels.len();
    if total == 0 {
        return Vec::new();
    }
    let mut hist = color_histogram(pixels);
    hist.sort_by(|a, b| b.1.cmp(&a.1));
    hist.into_iter()
        .take(limit)
        .map(|(color, n)| ColorCandidate::new(color, n as f64 / total as f64 * 100.0))
        .collect()
}

/// Distinct colors with equal coverage, most frequent first.
fn uniform_candidates(pixels: &[Color], limit: usize) -> Vec<ColorCandidate> {
    let mut hist = color_histogram(pixels);
    if hist.is_empty() {
        return Vec::new();
    }
    let share = 100.0 / hist.len() as f64;
    hist.sort_by(|a, b| b.1.cmp(&a.1));
    hist.into_iter()
        .take(limit)
        .map(|(color, _)| ColorCandidate::new(color, share))
        .collect()
}

/// Ranks sampled colors into background candidates.
#[derive(Debug, Clone)]
pub struct ColorClusterer {
    config: KMeansConfig,
}

impl Default for ColorClusterer {
    fn default() -> Self {
        Self::new(KMeansConfig::border_sampling())
    }
}

impl ColorClusterer {
    pub fn new(config: KMeansConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Cluster the samples, reporting when a fallback strategy is needed.
    pub fn try_cluster<R: Rng + ?Sized>(
        &self,
        pixels: &[Color],
        num_suggestions: usize,
        rng: &mut R,
    ) -> ClusterOutcome {
        let hist = color_histogram(pixels);
        if hist.len() < MIN_DISTINCT_COLORS {
            return ClusterOutcome::Fallback(FallbackReason::DegenerateSample);
        }

        let k = cluster_count(num_suggestions, hist.len());
        debug!(distinct = hist.len(), k, "clustering border colors");

        let noise = Normal::new(0.0, self.config.jitter)
            .ok()
            .filter(|_| self.config.jitter > 0.0);
        let points: Vec<Point> = hist
            .iter()
            .map(|(c, _)| {
                let mut p = c.to_f64().map(|v| v / 255.0);
                if let Some(noise) = &noise {
                    for v in p.iter_mut() {
                        *v = (*v + noise.sample(rng)).clamp(0.0, 1.0);
                    }
                }
                p
            })
            .collect();
        let weights: Vec<f64> = hist.iter().map(|(_, n)| *n as f64).collect();

        let fit = match kmeans::fit(&points, &weights, k, &self.config, rng) {
            Ok(fit) => fit,
            Err(e) => {
                debug!(?e, "k-means failed");
                return ClusterOutcome::Fallback(FallbackReason::NumericalFailure);
            }
        };

        // Map distinct-color labels back onto every sampled pixel
        let mut members = vec![0usize; k];
        for (label, (_, n)) in fit.labels.iter().zip(&hist) {
            members[*label] += n;
        }

        let mut ranked: Vec<usize> = (0..k).filter(|&j| members[j] > 0).collect();
        ranked.sort_by(|&a, &b| members[b].cmp(&members[a]).then(a.cmp(&b)));

        let total = pixels.len() as f64;
        let candidates = ranked
            .into_iter()
            .take(num_suggestions)
            .map(|j| {
                let color = Color::from_f64(fit.centroids[j].map(|v| v * 255.0));
                ColorCandidate::new(color, members[j] as f64 / total * 100.0)
            })
            .collect();
        ClusterOutcome::Clustered(candidates)
    }

    /// Cluster the samples, resolving any fallback.
    ///
    /// Degenerate samples return each distinct color with equal coverage;
    /// clustering failures fall back to histogram ranking.
    pub fn cluster<R: Rng + ?Sized>(
        &self,
        pixels: &[Color],
        num_suggestions: usize,
        rng: &mut R,
    ) -> Vec<ColorCandidate> {
        match self.try_cluster(pixels, num_suggestions, rng) {
            ClusterOutcome::Clustered(candidates) => candidates,
            ClusterOutcome::Fallback(FallbackReason::DegenerateSample) => {
                debug!("few distinct colors, skipping clustering");
                uniform_candidates(pixels, num_suggestions)
            }
            ClusterOutcome::Fallback(FallbackReason::NumericalFailure) => {
                warn!("clustering failed, using histogram ranking");
                histogram_candidates(pixels, num_suggestions)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn noisy_samples() -> Vec<Color> {
        let mut pixels = Vec::new();
        // Mostly near-white with a smaller blue population
        for i in 0..200u8 {
            pixels.push(Color::new(250 + i % 6, 252, 251));
        }
        for i in 0..20u8 {
            pixels.push(Color::new(10 + i % 5, 20, 200));
        }
        pixels
    }

    #[test]
    fn test_cluster_count_bounds() {
        assert_eq!(cluster_count(5, 5), 2);
        assert_eq!(cluster_count(5, 100), 10);
        assert_eq!(cluster_count(30, 1000), MAX_CLUSTERS);
        assert_eq!(cluster_count(1, 2), 2);
    }

    #[test]
    fn test_ranks_by_coverage() {
        let clusterer = ColorClusterer::default();
        let mut rng = StdRng::seed_from_u64(42);
        let candidates = clusterer.cluster(&noisy_samples(), 5, &mut rng);

        assert!(!candidates.is_empty());
        for pair in candidates.windows(2) {
            assert!(pair[0].coverage >= pair[1].coverage);
        }
        let sum: f64 = candidates.iter().map(|c| c.coverage).sum();
        assert!(sum <= 100.0 + 1e-9);
        assert_eq!(candidates[0].label, ColorLabel::WhiteVeryLight);
    }

    #[test]
    fn test_degenerate_sample_is_reported() {
        let pixels = vec![Color::WHITE; 30];
        let clusterer = ColorClusterer::default();
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(
            clusterer.try_cluster(&pixels, 3, &mut rng),
            ClusterOutcome::Fallback(FallbackReason::DegenerateSample)
        );

        let candidates = clusterer.cluster(&pixels, 3, &mut rng);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].color, Color::WHITE);
        assert_eq!(candidates[0].coverage, 100.0);
    }

    #[test]
    fn test_uniform_coverage_for_few_colors() {
        let mut pixels = vec![Color::WHITE; 9];
        pixels.push(Color::BLACK);
        let candidates = ColorClusterer::default().cluster(&pixels, 5, &mut StdRng::seed_from_u64(0));
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].color, Color::WHITE);
        assert_eq!(candidates[0].coverage, 50.0);
        assert_eq!(candidates[1].coverage, 50.0);
    }

    #[test]
    fn test_histogram_candidates() {
        let mut pixels = vec![Color::BLACK; 3];
        pixels.extend(vec![Color::WHITE; 7]);
        let candidates = histogram_candidates(&pixels, 6);
        assert_eq!(candidates[0].color, Color::WHITE);
        assert!((candidates[0].coverage - 70.0).abs() < 1e-9);
        assert!((candidates[1].coverage - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_seeded_runs_are_identical() {
        let clusterer = ColorClusterer::default();
        let a = clusterer.cluster(&noisy_samples(), 4, &mut StdRng::seed_from_u64(42));
        let b = clusterer.cluster(&noisy_samples(), 4, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
