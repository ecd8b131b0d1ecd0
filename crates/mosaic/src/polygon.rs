//! Polygon input handling.
//!
//! Polygons arrive either as `geo` geometry or as GeoJSON files. Either
//! way they are validated, reprojected into the domain CRS, and unioned
//! into a single region so overlapping parts never select a pixel twice.

use std::fs;
use std::path::Path;

use geo::{BooleanOps, LineString, MultiPolygon, Polygon};
use geodesy::{Crs, Transformer};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{MosaicError, Result};

/// Rings pulled from a polygon file, plus the CRS they are expressed in.
#[derive(Debug, Clone)]
pub struct RingSet {
    /// Exterior rings, one per polygon part, in file order.
    pub rings: Vec<Vec<(f64, f64)>>,
    pub crs: Crs,
}

/// Loads polygon exterior rings from a GeoJSON file.
///
/// Accepts FeatureCollection, Feature, GeometryCollection, Polygon and
/// MultiPolygon documents. Interior rings are dropped. The CRS comes from
/// the document's legacy `crs` member when present, otherwise WGS84 as
/// the GeoJSON spec prescribes.
pub fn load_rings(path: &Path) -> Result<RingSet> {
    let text = fs::read_to_string(path)?;
    let doc: Value = serde_json::from_str(&text)
        .map_err(|e| MosaicError::geometry(format!("{}: {e}", path.display())))?;

    let crs = document_crs(&doc)?;
    let mut rings = Vec::new();
    collect_rings(&doc, &mut rings)?;
    if rings.is_empty() {
        return Err(MosaicError::geometry(format!(
            "{}: no polygon geometry found",
            path.display()
        )));
    }

    info!(
        path = %path.display(),
        rings = rings.len(),
        crs = %crs,
        "loaded polygon rings"
    );
    Ok(RingSet { rings, crs })
}

/// Reprojects all ring coordinates from `src` into `dst`.
pub fn reproject_rings(
    rings: &[Vec<(f64, f64)>],
    src: &Crs,
    dst: &Crs,
) -> Result<Vec<Vec<(f64, f64)>>> {
    let transformer = Transformer::new(src, dst)?;
    if transformer.is_identity() {
        return Ok(rings.to_vec());
    }

    debug!(from = %src, to = %dst, "reprojecting polygon rings");
    let mut out = Vec::with_capacity(rings.len());
    for ring in rings {
        let mut projected = Vec::with_capacity(ring.len());
        for &(x, y) in ring {
            projected.push(transformer.transform(x, y)?);
        }
        out.push(projected);
    }
    Ok(out)
}

/// Unions rings into one region.
///
/// Overlapping rings merge; the union also repairs regions that would
/// otherwise double-select pixels.
pub fn union_rings(rings: &[Vec<(f64, f64)>]) -> Result<MultiPolygon<f64>> {
    validate_rings(rings)?;
    let polys: Vec<Polygon<f64>> = rings
        .iter()
        .map(|ring| Polygon::new(LineString::from(ring.clone()), vec![]))
        .collect();
    merge_polygons(polys)
}

/// Unions the parts of an existing region into one, keeping any holes.
pub fn merge_region(region: MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
    validate_region(&region)?;
    merge_polygons(region.0)
}

fn merge_polygons(polys: Vec<Polygon<f64>>) -> Result<MultiPolygon<f64>> {
    let part_count = polys.len();
    let mut iter = polys.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| MosaicError::geometry("no polygon rings to merge"))?;
    let mut merged = MultiPolygon::new(vec![first]);
    for poly in iter {
        merged = merged.union(&MultiPolygon::new(vec![poly]));
    }

    if part_count > 1 {
        info!(
            parts = part_count,
            merged = merged.0.len(),
            "unioned polygon parts into one region"
        );
    }
    Ok(merged)
}

/// Checks every exterior ring of a region for degenerate arity.
pub(crate) fn validate_region(region: &MultiPolygon<f64>) -> Result<()> {
    for poly in region {
        let exterior: Vec<(f64, f64)> = poly.exterior().coords().map(|c| (c.x, c.y)).collect();
        if effective_points(&exterior) < 3 {
            return Err(MosaicError::geometry(
                "polygon exterior has fewer than 3 distinct points",
            ));
        }
    }
    Ok(())
}

fn validate_rings(rings: &[Vec<(f64, f64)>]) -> Result<()> {
    for (i, ring) in rings.iter().enumerate() {
        if effective_points(ring) < 3 {
            return Err(MosaicError::geometry(format!(
                "ring {i} has fewer than 3 distinct points"
            )));
        }
    }
    Ok(())
}

/// Point count ignoring a closing duplicate of the first point.
fn effective_points(ring: &[(f64, f64)]) -> usize {
    match ring {
        [first, .., last] if first == last => ring.len() - 1,
        _ => ring.len(),
    }
}

fn document_crs(doc: &Value) -> Result<Crs> {
    let name = doc
        .get("crs")
        .and_then(|crs| crs.get("properties"))
        .and_then(|props| props.get("name"))
        .and_then(Value::as_str);
    match name {
        Some(name) => parse_crs_name(name),
        None => {
            debug!("polygon file declares no CRS, assuming WGS84");
            Ok(Crs::from_epsg(4326)?)
        }
    }
}

// Handles "EPSG:n", "urn:ogc:def:crs:EPSG::n" and the CRS84 alias.
fn parse_crs_name(name: &str) -> Result<Crs> {
    if name.ends_with("CRS84") || name.ends_with("CRS:84") {
        return Ok(Crs::from_epsg(4326)?);
    }
    if let Some(code) = name
        .rsplit(':')
        .find(|part| !part.is_empty())
        .filter(|part| part.chars().all(|c| c.is_ascii_digit()))
        .and_then(|part| part.parse::<u32>().ok())
    {
        return Ok(Crs::from_epsg(code)?);
    }
    Ok(Crs::parse(name)?)
}

fn collect_rings(value: &Value, out: &mut Vec<Vec<(f64, f64)>>) -> Result<()> {
    match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            if let Some(features) = value.get("features").and_then(Value::as_array) {
                for feature in features {
                    collect_rings(feature, out)?;
                }
            }
            Ok(())
        }
        Some("Feature") => {
            match value.get("geometry") {
                Some(geometry) if !geometry.is_null() => collect_rings(geometry, out),
                _ => Ok(()),
            }
        }
        Some("GeometryCollection") => {
            if let Some(geometries) = value.get("geometries").and_then(Value::as_array) {
                for geometry in geometries {
                    collect_rings(geometry, out)?;
                }
            }
            Ok(())
        }
        Some("Polygon") => push_exterior(value.get("coordinates"), out),
        Some("MultiPolygon") => {
            let polys = value
                .get("coordinates")
                .and_then(Value::as_array)
                .ok_or_else(|| MosaicError::geometry("MultiPolygon has no coordinates"))?;
            for poly in polys {
                push_exterior(Some(poly), out)?;
            }
            Ok(())
        }
        other => Err(MosaicError::geometry(format!(
            "unsupported GeoJSON type: {}",
            other.unwrap_or("<missing>")
        ))),
    }
}

fn push_exterior(rings_json: Option<&Value>, out: &mut Vec<Vec<(f64, f64)>>) -> Result<()> {
    let rings = rings_json
        .and_then(Value::as_array)
        .ok_or_else(|| MosaicError::geometry("polygon coordinates must be an array of rings"))?;
    let exterior = rings
        .first()
        .ok_or_else(|| MosaicError::geometry("polygon has no rings"))?;
    if rings.len() > 1 {
        debug!(holes = rings.len() - 1, "ignoring polygon interior rings");
    }

    let coords = exterior
        .as_array()
        .ok_or_else(|| MosaicError::geometry("polygon ring must be an array of positions"))?;
    let mut ring = Vec::with_capacity(coords.len());
    for position in coords {
        let pair = position
            .as_array()
            .filter(|pair| pair.len() >= 2)
            .ok_or_else(|| MosaicError::geometry("ring positions must be [x, y] pairs"))?;
        let x = pair[0]
            .as_f64()
            .ok_or_else(|| MosaicError::geometry("ring coordinates must be numeric"))?;
        let y = pair[1]
            .as_f64()
            .ok_or_else(|| MosaicError::geometry("ring coordinates must be numeric"))?;
        ring.push((x, y));
    }
    out.push(ring);
    Ok(())
}
