//! Error types for CRS handling.

use thiserror::Error;

/// Errors that can occur while parsing or transforming coordinates.
#[derive(Error, Debug)]
pub enum GeodesyError {
    /// The EPSG code is not present in the definitions table.
    #[error("EPSG:{0} is not in the CRS definitions table")]
    UnknownEpsg(u32),

    /// The CRS description could not be parsed.
    #[error("unparseable CRS: {0}")]
    Unparseable(String),

    /// The parameter dictionary is missing required entries.
    #[error("invalid CRS parameters: {0}")]
    InvalidParams(String),

    /// The projection definition was rejected by the proj engine.
    #[error("invalid projection definition: {0}")]
    InvalidProjection(String),

    /// A coordinate transformation failed.
    #[error("coordinate transform failed: {0}")]
    TransformFailed(String),
}

impl GeodesyError {
    /// Create an Unparseable error.
    pub fn unparseable(msg: impl Into<String>) -> Self {
        Self::Unparseable(msg.into())
    }

    /// Create an InvalidParams error.
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }
}

/// Result type for geodesy operations.
pub type Result<T> = std::result::Result<T, GeodesyError>;
