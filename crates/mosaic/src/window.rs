//! Window resolution: from selector bounds to pixel-aligned windows.
//!
//! Selection extents are clipped to the domain and snapped outward to
//! whole pixel multiples measured from the domain origin, so the same
//! world-coordinate box always lands on the same pixels no matter how the
//! selector was phrased.

use geodesy::{Crs, Transformer};
use raster_io::PixelWindow;

use crate::error::Result;
use crate::selector::Selector;
use crate::transform::GeoTransform;
use crate::view::GridSnapshot;

/// A pixel window with fractional offsets and lengths, produced by
/// inverting world bounds through an affine transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FracWindow {
    pub col_off: f64,
    pub row_off: f64,
    pub width: f64,
    pub height: f64,
}

/// How a fractional window becomes whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Round offsets and lengths to the nearest pixel. The result covers
    /// only pixels that are at least half inside the window.
    Trimmed,
    /// Floor offsets, ceil the far edges. The result covers every pixel
    /// the window touches.
    Full,
}

impl FracWindow {
    /// Rounds to whole pixels under the given policy.
    pub fn round(&self, rounding: Rounding) -> PixelWindow {
        let (col, row, width, height) = match rounding {
            Rounding::Trimmed => {
                let col = (self.col_off + 0.5).floor();
                let row = (self.row_off + 0.5).floor();
                let width = (self.col_off + self.width + 0.5).floor() - col;
                let height = (self.row_off + self.height + 0.5).floor() - row;
                (col, row, width, height)
            }
            Rounding::Full => {
                let col = self.col_off.floor();
                let row = self.row_off.floor();
                let width = (self.col_off + self.width).ceil() - col;
                let height = (self.row_off + self.height).ceil() - row;
                (col, row, width, height)
            }
        };
        PixelWindow::new(
            col as i64,
            row as i64,
            width.max(0.0) as usize,
            height.max(0.0) as usize,
        )
    }
}

/// Resolves a selector against the domain grid.
///
/// The selector's bounding box is clipped to the domain, then each edge is
/// snapped outward (floor for the lower, ceil for the upper) to a whole
/// number of pixels from the domain's left edge. Extents entirely outside
/// the domain collapse to a zero-size box on the nearest domain edge.
pub fn resolve(selector: &Selector, domain: &GridSnapshot) -> ((f64, f64), (f64, f64)) {
    let (sel_left, sel_right) = selector.bounding_box();
    let dom_left = domain.left_edge;
    let dom_right = domain.right_edge;
    let (res_x, res_y) = domain.resolution;

    let clip = |v: f64, lo: f64, hi: f64| v.max(lo).min(hi);
    let lx = clip(sel_left.0, dom_left.0, dom_right.0);
    let ly = clip(sel_left.1, dom_left.1, dom_right.1);
    let rx = clip(sel_right.0, dom_left.0, dom_right.0);
    let ry = clip(sel_right.1, dom_left.1, dom_right.1);

    let snap_down = |v: f64, origin: f64, res: f64| ((v - origin) / res).floor() * res + origin;
    let snap_up = |v: f64, origin: f64, res: f64| ((v - origin) / res).ceil() * res + origin;

    let left = (
        snap_down(lx, dom_left.0, res_x),
        snap_down(ly, dom_left.1, res_y),
    );
    let right = (
        snap_up(rx, dom_left.0, res_x).min(dom_right.0),
        snap_up(ry, dom_left.1, res_y).min(dom_right.1),
    );
    (left, right)
}

/// Fractional window of a world-coordinate box on a raster's own grid.
///
/// When the box is expressed in a different CRS than the raster, the
/// bounds are reprojected first.
pub fn raster_window(
    left_edge: (f64, f64),
    right_edge: (f64, f64),
    bounds_crs: &Crs,
    raster_crs: &Crs,
    raster_transform: &GeoTransform,
) -> Result<FracWindow> {
    let transformer = Transformer::new(bounds_crs, raster_crs)?;
    let (left, right) = transformer.transform_bounds(left_edge, right_edge)?;
    Ok(raster_transform.pixel_window(left, right))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> GridSnapshot {
        let transform =
            GeoTransform::from_array([20.0, 0.0, 500_000.0, 0.0, -20.0, 5_000_000.0]);
        GridSnapshot {
            crs: Crs::from_epsg(32633).unwrap(),
            transform,
            width: 60,
            height: 60,
            left_edge: (500_000.0, 4_998_800.0),
            right_edge: (501_200.0, 5_000_000.0),
            resolution: (20.0, 20.0),
            flip: [false, true],
        }
    }

    #[test]
    fn test_trimmed_rounding_majority_rule() {
        let w = FracWindow { col_off: 2.6, row_off: 0.0, width: 2.8, height: 4.0 };
        let p = w.round(Rounding::Trimmed);
        // Pixels 3 and 4 are covered by more than half
        assert_eq!((p.col_off, p.width), (3, 2));
        assert_eq!((p.row_off, p.height), (0, 4));
    }

    #[test]
    fn test_full_rounding_covers_everything_touched() {
        let w = FracWindow { col_off: 2.6, row_off: 0.0, width: 2.8, height: 4.0 };
        let p = w.round(Rounding::Full);
        // Pixels 2 through 5 are all touched
        assert_eq!((p.col_off, p.width), (2, 4));
    }

    #[test]
    fn test_rounding_policies_agree_when_aligned() {
        let w = FracWindow { col_off: 20.0, row_off: 25.0, width: 25.0, height: 25.0 };
        assert_eq!(w.round(Rounding::Trimmed), w.round(Rounding::Full));
    }

    #[test]
    fn test_negative_length_clamps_to_zero() {
        let w = FracWindow { col_off: 5.0, row_off: 5.0, width: -2.0, height: 1.0 };
        let p = w.round(Rounding::Full);
        assert_eq!(p.width, 0);
        assert!(p.is_empty());
    }

    #[test]
    fn test_resolve_snaps_outward_to_pixel_multiples() {
        let selector = Selector::rectangle((500_410.0, 4_999_010.0), (500_895.0, 4_999_495.0));
        let (left, right) = resolve(&selector, &domain());
        assert_eq!(left, (500_400.0, 4_999_000.0));
        assert_eq!(right, (500_900.0, 4_999_500.0));
    }

    #[test]
    fn test_resolve_aligned_box_is_unchanged() {
        let selector = Selector::rectangle((500_400.0, 4_999_000.0), (500_900.0, 4_999_500.0));
        let (left, right) = resolve(&selector, &domain());
        assert_eq!(left, (500_400.0, 4_999_000.0));
        assert_eq!(right, (500_900.0, 4_999_500.0));
    }

    #[test]
    fn test_resolve_clips_to_domain() {
        let selector = Selector::rectangle((499_000.0, 4_998_000.0), (502_000.0, 5_001_000.0));
        let (left, right) = resolve(&selector, &domain());
        assert_eq!(left, (500_000.0, 4_998_800.0));
        assert_eq!(right, (501_200.0, 5_000_000.0));
    }

    #[test]
    fn test_resolve_outside_domain_collapses() {
        let selector = Selector::rectangle((600_000.0, 4_999_000.0), (601_000.0, 4_999_500.0));
        let (left, right) = resolve(&selector, &domain());
        assert_eq!(left.0, right.0);

        let d = domain();
        let frac = d.transform.pixel_window(left, right);
        assert!(frac.round(Rounding::Trimmed).is_empty());
    }

    #[test]
    fn test_raster_window_same_crs() {
        let d = domain();
        let w = raster_window(
            (500_400.0, 4_999_000.0),
            (500_900.0, 4_999_500.0),
            &d.crs,
            &d.crs,
            &d.transform,
        )
        .unwrap();
        assert!((w.col_off - 20.0).abs() < 1e-9);
        assert!((w.width - 25.0).abs() < 1e-9);
    }
}
