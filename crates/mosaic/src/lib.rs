//! Shape-Driven Queries over Virtual Raster Mosaics
//!
//! This crate answers "give me field F inside shape S" over a set of
//! co-registered raster files, without ever materializing the mosaic.
//! The first raster defines the domain grid (CRS, resolution, extent);
//! every query resolves to a pixel-aligned window on that grid and reads
//! only the pixels it needs:
//!
//! - **Selectors**: disk, box, and polygon shapes, including GeoJSON
//!   input with CRS-aware reprojection and union repair
//! - **Windowed reads**: boundless, resampled onto the domain grid, with
//!   fifteen resampling kernels from nearest to lanczos and rms
//! - **Exact masking**: pixel-center inclusion applied uniformly, so a
//!   disk query is a disk, not its bounding box
//! - **Round-trippable export**: multi-band GeoTIFF plus a YAML sidecar
//!   that preserves field identities across reload
//!
//! # Architecture
//!
//! ```text
//! read(selector, field)
//!      │
//!      ▼
//! Mosaic::window ── selector hash ──► WindowCache
//!      │                                  │
//!      │ resolve: clip to domain,         │ hit: reuse Rc<WindowGrid>
//!      │ snap outward to pixel grid       │
//!      ▼                                  ▼
//! sampler::read_field ──► raster-io boundless read
//!      │                        │
//!      │ grids differ?          └─ strip-assembled, nodata-filled
//!      ├─► resample::reproject (inverse mapping, per-pixel kernel)
//!      │
//!      ├─► crop full window to trimmed window
//!      │
//!      └─► flip to ascending orientation, apply selection mask
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mosaic::{Mosaic, Selector};
//!
//! let mut mosaic = Mosaic::load(&["elevation.tif", "slope.tif"])?;
//!
//! // 1 km disk around a point, in domain coordinates
//! let disk = Selector::disk((3_501_279.0, 3_725_080.0), 1_000.0);
//! let elevation = mosaic.read(&disk, "elevation")?;
//!
//! for value in &elevation.data {
//!     // masked pixels hold elevation.fill
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod fields;
pub mod mask;
pub mod mosaic;
pub mod polygon;
pub mod resample;
pub mod sampler;
pub mod selector;
pub mod transform;
pub mod view;
pub mod window;

// Re-export commonly used types at crate root
pub use cache::CacheStats;
pub use config::MosaicConfig;
pub use error::{MosaicError, Result};
pub use export::sidecar_path;
pub use fields::{FieldBuffer, FieldDescriptor, FieldRegistry};
pub use mask::Mask;
pub use mosaic::Mosaic;
pub use resample::ResamplingMethod;
pub use selector::{PolygonRegion, Selector};
pub use transform::GeoTransform;
pub use view::{GridSnapshot, WindowGrid};
pub use window::{FracWindow, Rounding};
