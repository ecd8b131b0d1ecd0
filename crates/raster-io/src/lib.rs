//! GeoTIFF access behind a small windowed-read/multi-band-write surface.
//!
//! The decoding itself belongs to the tiff crate; this crate adds the
//! georeferencing tags, boundless window assembly from strips, and the
//! interleaved float writer the mosaic layer needs.

pub mod error;
pub mod reader;
mod tags;
pub mod writer;

pub use error::{RasterIoError, Result};
pub use reader::{open, read_window_boundless, PixelWindow, RasterMeta};
pub use writer::{write_geotiff, WriteImage};
