//! Geometric selectors for mosaic queries.
//!
//! A selector describes a region of interest in domain coordinates. Its
//! bounding box drives window resolution; its exact shape drives the
//! selection mask. Selectors are plain values: hashing one captures its
//! full geometry, which is what the query caches key on.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use geo::{BoundingRect, MultiPolygon};
use geodesy::Crs;

use crate::error::{MosaicError, Result};
use crate::polygon;

/// A 2-D region of interest expressed in domain coordinates.
#[derive(Debug, Clone)]
pub enum Selector {
    /// Pixels whose centers lie within `radius` of `center`.
    Disk {
        center: (f64, f64),
        radius: f64,
    },
    /// Pixels whose centers lie in the half-open box `[left_edge, right_edge)`.
    Box {
        left_edge: (f64, f64),
        right_edge: (f64, f64),
    },
    /// Pixels whose centers fall inside a polygonal region.
    Polygon(PolygonRegion),
}

impl Selector {
    /// A disk of `radius` around `center`.
    pub fn disk(center: (f64, f64), radius: f64) -> Self {
        Self::Disk { center, radius }
    }

    /// An axis-aligned box between two corners.
    pub fn rectangle(left_edge: (f64, f64), right_edge: (f64, f64)) -> Self {
        Self::Box { left_edge, right_edge }
    }

    /// An axis-aligned box described by its center and full side lengths.
    pub fn rectangle_from_center(center: (f64, f64), size: (f64, f64)) -> Self {
        let half = (size.0 / 2.0, size.1 / 2.0);
        Self::Box {
            left_edge: (center.0 - half.0, center.1 - half.1),
            right_edge: (center.0 + half.0, center.1 + half.1),
        }
    }

    /// A polygonal region. Overlapping parts are unioned into one region.
    pub fn polygon(region: MultiPolygon<f64>) -> Result<Self> {
        let merged = polygon::merge_region(region)?;
        Ok(Self::Polygon(PolygonRegion::new(merged)?))
    }

    /// Loads a polygonal region from a GeoJSON file.
    ///
    /// Rings are reprojected from the file's declared CRS into
    /// `target_crs` and unioned into one region.
    pub fn polygon_from_file(path: &Path, target_crs: &Crs) -> Result<Self> {
        let ring_set = polygon::load_rings(path)?;
        let rings = polygon::reproject_rings(&ring_set.rings, &ring_set.crs, target_crs)?;
        let region = polygon::union_rings(&rings)?;
        Ok(Self::Polygon(PolygonRegion::new(region)?))
    }

    /// Axis-aligned bounding box as `(left_edge, right_edge)`.
    pub fn bounding_box(&self) -> ((f64, f64), (f64, f64)) {
        match self {
            Self::Disk { center, radius } => (
                (center.0 - radius, center.1 - radius),
                (center.0 + radius, center.1 + radius),
            ),
            Self::Box { left_edge, right_edge } => (*left_edge, *right_edge),
            Self::Polygon(region) => (region.left_edge, region.right_edge),
        }
    }

    /// Hash of the selector's full geometry.
    ///
    /// Two selectors with identical shape parameters hash the same, which
    /// is what makes cached windows reusable across equivalent queries.
    pub fn structural_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl Hash for Selector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Disk { center, radius } => {
                0u8.hash(state);
                center.0.to_bits().hash(state);
                center.1.to_bits().hash(state);
                radius.to_bits().hash(state);
            }
            Self::Box { left_edge, right_edge } => {
                1u8.hash(state);
                left_edge.0.to_bits().hash(state);
                left_edge.1.to_bits().hash(state);
                right_edge.0.to_bits().hash(state);
                right_edge.1.to_bits().hash(state);
            }
            Self::Polygon(region) => {
                2u8.hash(state);
                for poly in &region.region {
                    for ring in std::iter::once(poly.exterior()).chain(poly.interiors()) {
                        ring.0.len().hash(state);
                        for coord in &ring.0 {
                            coord.x.to_bits().hash(state);
                            coord.y.to_bits().hash(state);
                        }
                    }
                }
            }
        }
    }
}

/// A validated polygonal region with its bounding box precomputed.
#[derive(Debug, Clone)]
pub struct PolygonRegion {
    pub region: MultiPolygon<f64>,
    pub left_edge: (f64, f64),
    pub right_edge: (f64, f64),
}

impl PolygonRegion {
    /// Wraps a region, rejecting empty geometry.
    pub fn new(region: MultiPolygon<f64>) -> Result<Self> {
        polygon::validate_region(&region)?;
        let rect = region
            .bounding_rect()
            .ok_or_else(|| MosaicError::geometry("polygon region has no extent"))?;
        Ok(Self {
            left_edge: (rect.min().x, rect.min().y),
            right_edge: (rect.max().x, rect.max().y),
            region,
        })
    }
}
