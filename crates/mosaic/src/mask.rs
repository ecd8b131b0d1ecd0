//! Selection masks: which pixels of a window a selector includes.
//!
//! Inclusion is decided per pixel center. Boxes are half-open, disks
//! compare center distance against the radius, polygons are rasterized
//! with an even-odd scanline. A resolved window snaps outward to whole
//! pixels, so its mask is what separates "in the window" from "in the
//! selection".

use geo::MultiPolygon;

use crate::selector::Selector;
use crate::transform::GeoTransform;
use crate::view::WindowGrid;

/// Boolean pixel mask in a window's ascending orientation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    pub data: Vec<bool>,
    pub width: usize,
    pub height: usize,
}

impl Mask {
    pub fn filled(width: usize, height: usize, value: bool) -> Self {
        Self { data: vec![value; width * height], width, height }
    }

    /// Value at (col, row); false outside the mask.
    pub fn get(&self, col: usize, row: usize) -> bool {
        if col >= self.width || row >= self.height {
            return false;
        }
        self.data[row * self.width + col]
    }

    /// Number of included pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Computes the mask of a selector over a resolved window.
pub fn selection_mask(selector: &Selector, window: &WindowGrid) -> Mask {
    let (width, height) = window.shape();
    match selector {
        Selector::Box { left_edge, right_edge } => {
            let mut mask = Mask::filled(width, height, false);
            for row in 0..height {
                for col in 0..width {
                    let (x, y) = window.snapshot().pixel_center(col, row);
                    let inside = x >= left_edge.0
                        && x < right_edge.0
                        && y >= left_edge.1
                        && y < right_edge.1;
                    mask.data[row * width + col] = inside;
                }
            }
            mask
        }
        Selector::Disk { center, radius } => {
            let r2 = radius * radius;
            let mut mask = Mask::filled(width, height, false);
            for row in 0..height {
                for col in 0..width {
                    let (x, y) = window.snapshot().pixel_center(col, row);
                    let dx = x - center.0;
                    let dy = y - center.1;
                    mask.data[row * width + col] = dx * dx + dy * dy <= r2;
                }
            }
            mask
        }
        Selector::Polygon(region) => {
            let mut mask = rasterize(&region.region, window.transform(), width, height);
            flip_mask(&mut mask, window.flip());
            mask
        }
    }
}

/// Rasterizes a polygon region onto a pixel grid, in the grid's own
/// raster orientation.
///
/// Even-odd scanline at pixel-center rows: a pixel is included when its
/// center lies inside an odd number of ring boundaries, so holes punch
/// out and self-intersections resolve deterministically. Spans are
/// half-open on their right edge, mirroring the box rule.
pub fn rasterize(
    region: &MultiPolygon<f64>,
    transform: &GeoTransform,
    width: usize,
    height: usize,
) -> Mask {
    let mut mask = Mask::filled(width, height, false);
    if width == 0 || height == 0 {
        return mask;
    }

    // Project every ring into pixel space once
    let mut edges: Vec<((f64, f64), (f64, f64))> = Vec::new();
    for poly in region {
        for ring in std::iter::once(poly.exterior()).chain(poly.interiors()) {
            let points: Vec<(f64, f64)> =
                ring.coords().map(|c| transform.invert(c.x, c.y)).collect();
            if points.len() < 2 {
                continue;
            }
            for pair in points.windows(2) {
                edges.push((pair[0], pair[1]));
            }
            if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
                if first != last {
                    edges.push((last, first));
                }
            }
        }
    }

    let mut crossings: Vec<f64> = Vec::new();
    for row in 0..height {
        let yc = row as f64 + 0.5;

        crossings.clear();
        for &((x1, y1), (x2, y2)) in &edges {
            // Half-open in y so a vertex on the scanline counts once;
            // horizontal edges never cross
            if (y1 <= yc && y2 > yc) || (y2 <= yc && y1 > yc) {
                crossings.push(x1 + (yc - y1) * (x2 - x1) / (y2 - y1));
            }
        }
        crossings.sort_by(f64::total_cmp);

        for pair in crossings.chunks(2) {
            let &[x0, x1] = pair else { continue };
            // Centers in [x0, x1): first col with col + 0.5 >= x0,
            // one past the last col with col + 0.5 < x1
            let start = (x0 - 0.5).ceil().max(0.0) as usize;
            let end = (x1 - 0.5).ceil().clamp(0.0, width as f64) as usize;
            for col in start..end {
                mask.data[row * width + col] = true;
            }
        }
    }
    mask
}

// Reorders a raster-oriented mask into ascending orientation.
fn flip_mask(mask: &mut Mask, flip: [bool; 2]) {
    let (w, h) = (mask.width, mask.height);
    if flip[1] {
        for row in 0..h / 2 {
            for col in 0..w {
                mask.data.swap(row * w + col, (h - 1 - row) * w + col);
            }
        }
    }
    if flip[0] {
        for row in 0..h {
            mask.data[row * w..(row + 1) * w].reverse();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldRegistry;
    use crate::view::GridSnapshot;
    use geo::polygon;
    use geodesy::Crs;
    use std::rc::Rc;

    // North-up window over [0, size] x [0, size] with 1-unit pixels
    fn window(size: usize) -> WindowGrid {
        let s = size as f64;
        let snapshot = GridSnapshot {
            crs: Crs::from_epsg(32633).unwrap(),
            transform: GeoTransform::from_array([1.0, 0.0, 0.0, 0.0, -1.0, s]),
            width: size,
            height: size,
            left_edge: (0.0, 0.0),
            right_edge: (s, s),
            resolution: (1.0, 1.0),
            flip: [false, true],
        };
        let selector = Selector::rectangle((0.0, 0.0), (s, s));
        let hash = selector.structural_hash();
        WindowGrid::new(snapshot, selector, hash, Rc::new(FieldRegistry::new()))
    }

    #[test]
    fn test_box_mask_is_half_open() {
        let w = window(3);
        let selector = Selector::rectangle((0.0, 0.0), (2.0, 2.0));
        let mask = selection_mask(&selector, &w);
        // Centers at 0.5 and 1.5 are in; 2.5 is out on both axes
        assert_eq!(mask.count(), 4);
        assert!(mask.get(0, 0));
        assert!(mask.get(1, 1));
        assert!(!mask.get(2, 0));
        assert!(!mask.get(0, 2));
    }

    #[test]
    fn test_disk_mask_counts_centers() {
        let w = window(3);
        // Center of the middle pixel; radius catches the 4 orthogonal
        // neighbors (distance 1) but not the diagonals (distance ~1.41)
        let selector = Selector::disk((1.5, 1.5), 1.2);
        let mask = selection_mask(&selector, &w);
        assert_eq!(mask.count(), 5);
        assert!(mask.get(1, 1));
        assert!(mask.get(1, 0));
        assert!(mask.get(0, 1));
        assert!(!mask.get(0, 0));
        assert!(!mask.get(2, 2));
    }

    #[test]
    fn test_rasterize_triangle() {
        let region = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 0.0, y: 4.0),
        ]]);
        // Identity transform: pixel space == world space
        let t = GeoTransform::from_array([1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let mask = rasterize(&region, &t, 4, 4);
        // Row 0 catches 3 centers under the hypotenuse, then 2, 1, 0
        assert_eq!(mask.count(), 6);
        let row_counts: Vec<usize> = (0..4)
            .map(|row| (0..4).filter(|&col| mask.get(col, row)).count())
            .collect();
        assert_eq!(row_counts, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_rasterize_hole_is_punched_out() {
        let region = MultiPolygon::new(vec![polygon![
            exterior: [
                (x: 0.0, y: 0.0),
                (x: 4.0, y: 0.0),
                (x: 4.0, y: 4.0),
                (x: 0.0, y: 4.0),
            ],
            interiors: [[
                (x: 1.0, y: 1.0),
                (x: 3.0, y: 1.0),
                (x: 3.0, y: 3.0),
                (x: 1.0, y: 3.0),
            ]],
        ]]);
        let t = GeoTransform::from_array([1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let mask = rasterize(&region, &t, 4, 4);
        // 16 pixels minus the 2x2 hole
        assert_eq!(mask.count(), 12);
        assert!(!mask.get(1, 1));
        assert!(!mask.get(2, 2));
        assert!(mask.get(0, 0));
        assert!(mask.get(3, 3));
    }

    #[test]
    fn test_polygon_selection_mask_is_ascending() {
        let w = window(4);
        let region = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 0.0, y: 4.0),
        ]]);
        let selector = Selector::polygon(region).unwrap();
        let mask = selection_mask(&selector, &w);
        assert_eq!(mask.count(), 6);
        // Ascending orientation: row 0 is the southern, widest row
        let row_counts: Vec<usize> = (0..4)
            .map(|row| (0..4).filter(|&col| mask.get(col, row)).count())
            .collect();
        assert_eq!(row_counts, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_mask_get_out_of_bounds() {
        let mask = Mask::filled(2, 2, true);
        assert!(mask.get(1, 1));
        assert!(!mask.get(2, 0));
        assert!(!mask.get(0, 5));
    }
}
