//! Error types for raster file access.

use thiserror::Error;

/// Errors that can occur while reading or writing raster files.
#[derive(Error, Debug)]
pub enum RasterIoError {
    /// Failed to open the raster file.
    #[error("failed to open raster: {0}")]
    OpenFailed(String),

    /// Failed to decode pixel data.
    #[error("failed to read raster data: {0}")]
    ReadFailed(String),

    /// Failed to encode pixel data.
    #[error("failed to write raster: {0}")]
    WriteFailed(String),

    /// The file's georeferencing or layout tags are missing or malformed.
    #[error("invalid raster metadata: {0}")]
    InvalidMetadata(String),

    /// The requested band does not exist.
    #[error("band {band} out of range, file has {bands} band(s)")]
    BandOutOfRange { band: usize, bands: usize },
}

impl RasterIoError {
    /// Create an OpenFailed error.
    pub fn open_failed(msg: impl Into<String>) -> Self {
        Self::OpenFailed(msg.into())
    }

    /// Create a ReadFailed error.
    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::ReadFailed(msg.into())
    }

    /// Create a WriteFailed error.
    pub fn write_failed(msg: impl Into<String>) -> Self {
        Self::WriteFailed(msg.into())
    }

    /// Create an InvalidMetadata error.
    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }
}

impl From<std::io::Error> for RasterIoError {
    fn from(err: std::io::Error) -> Self {
        Self::OpenFailed(err.to_string())
    }
}

impl From<tiff::TiffError> for RasterIoError {
    fn from(err: tiff::TiffError) -> Self {
        Self::ReadFailed(err.to_string())
    }
}

/// Result type for raster I/O operations.
pub type Result<T> = std::result::Result<T, RasterIoError>;
