//! Prepared coordinate transformations between two CRS.

use proj4rs::proj::Proj;
use tracing::debug;

use crate::crs::Crs;
use crate::error::{GeodesyError, Result};

/// Points sampled along each edge when transforming a bounding box. Curved
/// projections can bow an edge outside the box spanned by its corners.
const EDGE_SAMPLES: usize = 5;

/// A prepared source/target projection pair.
///
/// Building the proj objects once and reusing them keeps repeated point
/// transforms cheap, the same way a cached transformer pair is used for
/// tile reprojection.
pub struct Transformer {
    src: Option<Proj>,
    dst: Option<Proj>,
    src_geographic: bool,
    dst_geographic: bool,
}

impl Transformer {
    /// Prepare a transformer from `src` to `dst`. Equal CRS yield an
    /// identity transformer that never touches the proj engine.
    pub fn new(src: &Crs, dst: &Crs) -> Result<Self> {
        if src == dst {
            return Ok(Self {
                src: None,
                dst: None,
                src_geographic: src.is_geographic(),
                dst_geographic: dst.is_geographic(),
            });
        }

        debug!(src = %src, dst = %dst, "preparing coordinate transformer");
        let src_proj = Proj::from_proj_string(src.proj_string())
            .map_err(|e| GeodesyError::InvalidProjection(format!("{src}: {e:?}")))?;
        let dst_proj = Proj::from_proj_string(dst.proj_string())
            .map_err(|e| GeodesyError::InvalidProjection(format!("{dst}: {e:?}")))?;

        Ok(Self {
            src: Some(src_proj),
            dst: Some(dst_proj),
            src_geographic: src.is_geographic(),
            dst_geographic: dst.is_geographic(),
        })
    }

    /// Whether this transformer is a no-op.
    pub fn is_identity(&self) -> bool {
        self.src.is_none()
    }

    /// Transform a single point.
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let (src, dst) = match (&self.src, &self.dst) {
            (Some(s), Some(d)) => (s, d),
            _ => return Ok((x, y)),
        };

        // proj4rs works in radians for geographic coordinates
        let (x_in, y_in) = if self.src_geographic {
            (x.to_radians(), y.to_radians())
        } else {
            (x, y)
        };

        let mut point = (x_in, y_in, 0.0);
        proj4rs::transform::transform(src, dst, &mut point)
            .map_err(|e| GeodesyError::TransformFailed(format!("({x}, {y}): {e:?}")))?;

        if self.dst_geographic {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }

    /// Transform a coordinate bounding box, returning the axis-aligned box
    /// enclosing the transformed boundary.
    pub fn transform_bounds(
        &self,
        left_edge: (f64, f64),
        right_edge: (f64, f64),
    ) -> Result<((f64, f64), (f64, f64))> {
        if self.is_identity() {
            return Ok((left_edge, right_edge));
        }

        let (x0, y0) = left_edge;
        let (x1, y1) = right_edge;
        let step = 1.0 / (EDGE_SAMPLES - 1) as f64;

        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for i in 0..EDGE_SAMPLES {
            let t = i as f64 * step;
            let xs = x0 + (x1 - x0) * t;
            let ys = y0 + (y1 - y0) * t;
            for (px, py) in [(xs, y0), (xs, y1), (x0, ys), (x1, ys)] {
                let (tx, ty) = self.transform(px, py)?;
                min_x = min_x.min(tx);
                min_y = min_y.min(ty);
                max_x = max_x.max(tx);
                max_y = max_y.max(ty);
            }
        }

        Ok(((min_x, min_y), (max_x, max_y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_transform() {
        let utm = Crs::from_epsg(32633).unwrap();
        let t = Transformer::new(&utm, &utm).unwrap();
        assert!(t.is_identity());
        assert_eq!(t.transform(500_000.0, 5_000_000.0).unwrap(), (500_000.0, 5_000_000.0));
    }

    #[test]
    fn test_wgs84_to_utm() {
        let wgs84 = Crs::from_epsg(4326).unwrap();
        let utm33 = Crs::from_epsg(32633).unwrap();
        let t = Transformer::new(&wgs84, &utm33).unwrap();

        // Zone 33 central meridian is 15 degrees east
        let (x, y) = t.transform(15.0, 52.0).unwrap();
        assert!((x - 500_000.0).abs() < 1.0, "easting {x}");
        assert!(y > 5_000_000.0 && y < 6_000_000.0, "northing {y}");
    }

    #[test]
    fn test_roundtrip_point() {
        let wgs84 = Crs::from_epsg(4326).unwrap();
        let utm33 = Crs::from_epsg(32633).unwrap();
        let fwd = Transformer::new(&wgs84, &utm33).unwrap();
        let back = Transformer::new(&utm33, &wgs84).unwrap();

        let (x, y) = fwd.transform(14.3, 51.8).unwrap();
        let (lon, lat) = back.transform(x, y).unwrap();
        assert!((lon - 14.3).abs() < 1e-6);
        assert!((lat - 51.8).abs() < 1e-6);
    }

    #[test]
    fn test_transform_bounds_contains_corners() {
        let wgs84 = Crs::from_epsg(4326).unwrap();
        let utm33 = Crs::from_epsg(32633).unwrap();
        let t = Transformer::new(&wgs84, &utm33).unwrap();

        let (le, re) = t.transform_bounds((12.0, 50.0), (16.0, 53.0)).unwrap();
        for (lon, lat) in [(12.0, 50.0), (16.0, 50.0), (12.0, 53.0), (16.0, 53.0)] {
            let (x, y) = t.transform(lon, lat).unwrap();
            assert!(x >= le.0 - 1e-6 && x <= re.0 + 1e-6);
            assert!(y >= le.1 - 1e-6 && y <= re.1 + 1e-6);
        }
        assert!(le.0 < re.0);
        assert!(le.1 < re.1);
    }
}
