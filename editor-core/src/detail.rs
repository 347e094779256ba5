use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::contrast::Clahe;
use crate::error::EditorError;

/// Vectorization quality preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Low,
    Medium,
    #[default]
    High,
    Ultra,
}

impl DetailLevel {
    pub const ALL: [DetailLevel; 4] = [Self::Low, Self::Medium, Self::High, Self::Ultra];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Ultra => "ultra",
        }
    }

    pub fn params(&self) -> DetailParams {
        DetailParams::for_level(*self)
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DetailLevel {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "ultra" => Ok(Self::Ultra),
            other => Err(EditorError::InvalidInput(format!("unknown detail level: {other}"))),
        }
    }
}

/// How the intensity image is split into ink and paper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Threshold {
    /// Pixels at or below the cutoff are ink.
    Global(u8),
    /// Pixels at or below the Gaussian-weighted local mean minus `bias` are ink.
    Adaptive { block_size: u32, bias: f32 },
}

/// Which traced boundaries are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Retrieval {
    /// Outermost boundaries only.
    External,
    /// All boundaries with their parent/hole relations.
    Tree,
}

/// Parameters driving extraction, simplification and smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetailParams {
    /// Odd Gaussian kernel size applied before thresholding; 1 disables it.
    pub blur_kernel: u32,
    /// Local contrast equalization applied after the blur.
    pub contrast: Option<Clahe>,
    pub threshold: Threshold,
    pub retrieval: Retrieval,
    pub min_contour_area: f64,
    /// Simplification tolerance as a fraction of contour perimeter.
    pub epsilon_factor: f64,
    /// Zero emits straight segments only.
    pub smoothing_factor: f64,
}

impl DetailParams {
    pub fn for_level(level: DetailLevel) -> Self {
        let (blur_kernel, block_size, bias, min_contour_area, epsilon_factor, smoothing_factor) = match level {
            DetailLevel::Low => (5, 11, 2.0, 100.0, 0.02, 2.0),
            DetailLevel::Medium => (3, 9, 2.0, 50.0, 0.01, 1.5),
            DetailLevel::High => (3, 7, 1.0, 25.0, 0.005, 1.0),
            DetailLevel::Ultra => (1, 5, 1.0, 10.0, 0.002, 0.5),
        };
        Self {
            blur_kernel,
            contrast: Some(Clahe::default()),
            threshold: Threshold::Adaptive { block_size, bias },
            retrieval: Retrieval::Tree,
            min_contour_area,
            epsilon_factor,
            smoothing_factor,
        }
    }

    /// Global threshold, outer boundaries, collinear points removed, no curves.
    pub fn basic() -> Self {
        Self {
            blur_kernel: 1,
            contrast: None,
            threshold: Threshold::Global(127),
            retrieval: Retrieval::External,
            min_contour_area: 1.0,
            epsilon_factor: 0.0,
            smoothing_factor: 0.0,
        }
    }
}

impl Default for DetailParams {
    fn default() -> Self {
        Self::for_level(DetailLevel::default())
    }
}
