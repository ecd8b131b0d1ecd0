//! Coordinate reference system handling.
//!
//! Wraps a pure Rust proj stack (proj4rs + the crs-definitions EPSG table)
//! behind two types: [`Crs`], parsed from an EPSG code, a definition string,
//! or a proj parameter dictionary, and [`Transformer`], a prepared
//! source/target projection pair for point and bounds reprojection.

pub mod crs;
pub mod error;
pub mod transform;

pub use crs::Crs;
pub use error::{GeodesyError, Result};
pub use transform::Transformer;
