//! Affine grid geometry.
//!
//! A raster's placement in its CRS is a 6-parameter affine transform
//! mapping pixel indices to world coordinates:
//!
//! ```text
//! x = a * col + b * row + c
//! y = d * col + e * row + f
//! ```
//!
//! North-up rasters have `b == d == 0`, `a > 0` and `e < 0`: columns walk
//! east, rows walk south from the top-left corner at `(c, f)`.

use crate::window::FracWindow;

/// Affine mapping between pixel indices and world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl GeoTransform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Builds from the `[a, b, c, d, e, f]` layout used by raster metadata.
    pub fn from_array(coeffs: [f64; 6]) -> Self {
        let [a, b, c, d, e, f] = coeffs;
        Self::new(a, b, c, d, e, f)
    }

    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Maps a (col, row) pixel position to world coordinates.
    ///
    /// Integer positions address pixel corners; `(col + 0.5, row + 0.5)`
    /// is the pixel center.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// Maps world coordinates back to a fractional (col, row) position.
    ///
    /// The transform must be invertible; see [`is_invertible`].
    ///
    /// [`is_invertible`]: GeoTransform::is_invertible
    pub fn invert(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.a * self.e - self.b * self.d;
        let dx = x - self.c;
        let dy = y - self.f;
        ((self.e * dx - self.b * dy) / det, (self.a * dy - self.d * dx) / det)
    }

    /// Whether the linear part has a usable inverse.
    pub fn is_invertible(&self) -> bool {
        let det = self.a * self.e - self.b * self.d;
        det.is_finite() && det.abs() > f64::EPSILON
    }

    /// Per-axis pixel size in CRS units.
    ///
    /// The column step vector is `(a, d)` and the row step vector `(b, e)`,
    /// so this holds for rotated transforms too.
    pub fn resolution(&self) -> (f64, f64) {
        (self.a.hypot(self.d), self.b.hypot(self.e))
    }

    /// Which axes run against ascending world coordinates.
    ///
    /// `[x_flipped, y_flipped]`; north-up rasters report `[false, true]`.
    pub fn flip_axes(&self) -> [bool; 2] {
        [self.a < 0.0, self.e < 0.0]
    }

    /// Fractional pixel window covering a world-coordinate box.
    ///
    /// All four corners are inverted so the result is correct whatever the
    /// axis orientation.
    pub fn pixel_window(&self, left_edge: (f64, f64), right_edge: (f64, f64)) -> FracWindow {
        let corners = [
            (left_edge.0, left_edge.1),
            (left_edge.0, right_edge.1),
            (right_edge.0, left_edge.1),
            (right_edge.0, right_edge.1),
        ];

        let mut min_col = f64::INFINITY;
        let mut min_row = f64::INFINITY;
        let mut max_col = f64::NEG_INFINITY;
        let mut max_row = f64::NEG_INFINITY;
        for (x, y) in corners {
            let (col, row) = self.invert(x, y);
            min_col = min_col.min(col);
            min_row = min_row.min(row);
            max_col = max_col.max(col);
            max_row = max_row.max(row);
        }

        FracWindow {
            col_off: min_col,
            row_off: min_row,
            width: (max_col - min_col).max(0.0),
            height: (max_row - min_row).max(0.0),
        }
    }

    /// The transform of a sub-window anchored at fractional pixel offsets.
    pub fn for_window(&self, col_off: f64, row_off: f64) -> Self {
        Self {
            c: self.a * col_off + self.b * row_off + self.c,
            f: self.d * col_off + self.e * row_off + self.f,
            ..*self
        }
    }

    /// Re-anchors the origin onto a world-coordinate box.
    ///
    /// Each axis anchors at whichever box edge the axis walks away from, so
    /// a north-up transform anchors y at the top (maximum) edge.
    pub fn with_edges(&self, left_edge: (f64, f64), right_edge: (f64, f64)) -> Self {
        let [flip_x, flip_y] = self.flip_axes();
        Self {
            c: if flip_x { right_edge.0 } else { left_edge.0 },
            f: if flip_y { right_edge.1 } else { left_edge.1 },
            ..*self
        }
    }
}
