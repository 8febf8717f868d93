//! Renderer-local errors, converted to the core error at the trait seam.

use thiserror::Error;

pub(crate) type Result<T> = std::result::Result<T, RenderError>;

/// Errors raised while drawing or encoding a chart.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The plotting backend failed.
    #[error("drawing failed: {0}")]
    Drawing(String),

    /// The bitmap could not be encoded as PNG.
    #[error("PNG encoding failed: {0}")]
    Encoding(String),

    /// The chart has no values to draw.
    #[error("nothing to draw for '{0}'")]
    Empty(String),

    /// The resolved values do not fit the chart kind.
    #[error("{kind} cannot draw {values} values")]
    Mismatch { kind: String, values: String },
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for RenderError
{
    fn from(err: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        RenderError::Drawing(err.to_string())
    }
}

impl From<image::ImageError> for RenderError {
    fn from(err: image::ImageError) -> Self {
        RenderError::Encoding(err.to_string())
    }
}

impl From<RenderError> for chartdeck_core::Error {
    fn from(err: RenderError) -> Self {
        chartdeck_core::Error::RenderError(err.to_string())
    }
}
