use thiserror::Error;

/// Errors surfaced by the core pipeline.
///
/// Degenerate samples and clustering failures are not errors: they are
/// reported through [`crate::clusterer::ClusterOutcome`] and resolved by a
/// fallback strategy inside the crate.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown color: {0}")]
    UnknownColor(String),

    #[error("image has zero width or height")]
    EmptyImage,

    #[error("dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, EditorError>;

/// Reject zero-sized images up front so later stages can index freely.
pub(crate) fn ensure_non_empty(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(EditorError::EmptyImage);
    }
    Ok(())
}
