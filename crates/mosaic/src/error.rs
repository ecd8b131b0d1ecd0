//! Error types for mosaic queries.

use thiserror::Error;

/// Errors that can occur while loading or querying a mosaic.
#[derive(Error, Debug)]
pub enum MosaicError {
    /// A configuration input could not be used.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Geometry input is invalid beyond repair.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// The requested field is not part of the mosaic.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// A produced buffer does not match the requested window shape.
    #[error("dimension mismatch: window is {expected:?}, producer returned {produced} values")]
    DimensionMismatch {
        /// Requested (width, height).
        expected: (usize, usize),
        /// Number of values actually produced.
        produced: usize,
    },

    /// File access failed outside of raster decoding.
    #[error("io error: {0}")]
    Io(String),

    /// Raster file access failed.
    #[error("raster access: {0}")]
    RasterIo(#[from] raster_io::RasterIoError),

    /// CRS parsing or coordinate reprojection failed.
    #[error("geodesy: {0}")]
    Geodesy(#[from] geodesy::GeodesyError),
}

impl MosaicError {
    /// Create a Configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a Geometry error.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    /// Create an UnknownField error.
    pub fn unknown_field(name: impl Into<String>) -> Self {
        Self::UnknownField(name.into())
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch(expected: (usize, usize), produced: usize) -> Self {
        Self::DimensionMismatch { expected, produced }
    }
}

impl From<std::io::Error> for MosaicError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for MosaicError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Result type for mosaic operations.
pub type Result<T> = std::result::Result<T, MosaicError>;
