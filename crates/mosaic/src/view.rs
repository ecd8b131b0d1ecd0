//! Window views over the domain grid.

use std::rc::Rc;

use geodesy::Crs;

use crate::fields::FieldRegistry;
use crate::selector::Selector;
use crate::transform::GeoTransform;

/// Immutable geometry of a grid: either the full domain or a resolved
/// window of it.
#[derive(Debug, Clone)]
pub struct GridSnapshot {
    pub crs: Crs,
    /// Raster-oriented transform anchored at this grid's own corner.
    pub transform: GeoTransform,
    pub width: usize,
    pub height: usize,
    /// Minimum world coordinate per axis.
    pub left_edge: (f64, f64),
    /// Maximum world coordinate per axis.
    pub right_edge: (f64, f64),
    pub resolution: (f64, f64),
    /// Axes the transform walks against ascending world coordinates.
    pub flip: [bool; 2],
}

impl GridSnapshot {
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// World coordinates of a pixel center, in ascending orientation:
    /// row 0 sits at the minimum y edge regardless of raster layout.
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.left_edge.0 + (col as f64 + 0.5) * self.resolution.0,
            self.left_edge.1 + (row as f64 + 0.5) * self.resolution.1,
        )
    }
}

/// A resolved selection window over the domain grid.
///
/// Every buffer read through a window has the window's shape and an
/// ascending orientation: row 0 holds the lowest world y, column 0 the
/// lowest world x. The window also carries a handle on the mosaic's
/// field registry so callers can list what is readable through it.
#[derive(Clone)]
pub struct WindowGrid {
    snapshot: GridSnapshot,
    selector: Selector,
    selector_hash: u64,
    fields: Rc<FieldRegistry>,
}

impl WindowGrid {
    pub(crate) fn new(
        snapshot: GridSnapshot,
        selector: Selector,
        selector_hash: u64,
        fields: Rc<FieldRegistry>,
    ) -> Self {
        Self { snapshot, selector, selector_hash, fields }
    }

    pub fn snapshot(&self) -> &GridSnapshot {
        &self.snapshot
    }

    /// The selector this window was resolved from.
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Structural hash of the selector; the caches key on this.
    pub fn selector_hash(&self) -> u64 {
        self.selector_hash
    }

    pub fn left_edge(&self) -> (f64, f64) {
        self.snapshot.left_edge
    }

    pub fn right_edge(&self) -> (f64, f64) {
        self.snapshot.right_edge
    }

    pub fn width(&self) -> usize {
        self.snapshot.width
    }

    pub fn height(&self) -> usize {
        self.snapshot.height
    }

    pub fn shape(&self) -> (usize, usize) {
        self.snapshot.shape()
    }

    pub fn resolution(&self) -> (f64, f64) {
        self.snapshot.resolution
    }

    pub fn crs(&self) -> &Crs {
        &self.snapshot.crs
    }

    /// Raster-oriented transform of this window.
    pub fn transform(&self) -> &GeoTransform {
        &self.snapshot.transform
    }

    pub fn flip(&self) -> [bool; 2] {
        self.snapshot.flip
    }

    /// Names of the fields readable through this window.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.names()
    }
}

impl std::fmt::Debug for WindowGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowGrid")
            .field("snapshot", &self.snapshot)
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}
