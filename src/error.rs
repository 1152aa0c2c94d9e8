//! Error taxonomy for the conversion pipeline.
//!
//! Only `Input`, `InvalidOptions` and `FallbackRender` ever reach a caller of
//! [`crate::convert`]. The three tool variants are recovered inside the
//! pipeline by degrading to a fallback renderer.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("cannot decode image: {0}")]
    Input(String),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("no working external tracer found")]
    ToolUnavailable,

    #[error("external tracer timed out after {0:?}")]
    ToolTimeout(Duration),

    #[error("external tracer failed: {0}")]
    ToolFailure(String),

    #[error("failed to write vector document: {0}")]
    FallbackRender(#[from] std::io::Error),
}

impl ConvertError {
    /// True for the errors the pipeline absorbs by switching to a fallback renderer.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ConvertError::ToolUnavailable | ConvertError::ToolTimeout(_) | ConvertError::ToolFailure(_)
        )
    }
}

impl From<image::ImageError> for ConvertError {
    fn from(error: image::ImageError) -> Self {
        ConvertError::Input(error.to_string())
    }
}
