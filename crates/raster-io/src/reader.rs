//! GeoTIFF metadata and boundless windowed reads.
//!
//! Every read opens the file, decodes only the strips overlapping the
//! requested window, and drops the handle before returning. Requests are
//! allowed to run past the raster edge in any direction; pixels outside the
//! file are filled with the caller's fill value.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::debug;

use crate::error::{RasterIoError, Result};
use crate::tags::{
    GEOGRAPHIC_TYPE_GEO_KEY, GT_MODEL_TYPE_GEO_KEY, MODEL_TYPE_GEOGRAPHIC,
    PROJECTED_CS_TYPE_GEO_KEY,
};

/// A rectangular pixel-space window. Offsets may be negative and extents may
/// run past the raster edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub col_off: i64,
    pub row_off: i64,
    pub width: usize,
    pub height: usize,
}

impl PixelWindow {
    pub fn new(col_off: i64, row_off: i64, width: usize, height: usize) -> Self {
        Self {
            col_off,
            row_off,
            width,
            height,
        }
    }

    /// Number of pixels in the window.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Georeferencing and layout for one raster file.
#[derive(Debug, Clone)]
pub struct RasterMeta {
    pub path: PathBuf,
    pub width: usize,
    pub height: usize,
    pub bands: usize,
    /// Pixel→coordinate affine as (a, b, c, d, e, f):
    /// x = a·col + b·row + c, y = d·col + e·row + f.
    pub transform: [f64; 6],
    /// EPSG code from the geokey directory, when present.
    pub epsg: Option<u32>,
    /// GeoAsciiParams content, which may carry a proj definition string.
    pub crs_text: Option<String>,
    /// Declared nodata value, when present.
    pub nodata: Option<f64>,
    /// Format driver name.
    pub driver: &'static str,
}

impl RasterMeta {
    /// Pixel size along each axis.
    pub fn resolution(&self) -> (f64, f64) {
        let [a, b, _, d, e, _] = self.transform;
        (a.hypot(d), b.hypot(e))
    }
}

/// Open a GeoTIFF and return its metadata. The file handle is released
/// before returning.
pub fn open(path: &Path) -> Result<RasterMeta> {
    let file = File::open(path)
        .map_err(|e| RasterIoError::open_failed(format!("{}: {e}", path.display())))?;
    let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions()?;
    let bands = tag_u64(&mut decoder, Tag::SamplesPerPixel).unwrap_or(1) as usize;

    let transform = read_transform(&mut decoder, path)?;
    let epsg = read_geokeys(&mut decoder);
    let crs_text = tag_ascii(&mut decoder, Tag::GeoAsciiParamsTag);
    let nodata = tag_ascii(&mut decoder, Tag::GdalNodata)
        .and_then(|s| s.trim().parse::<f64>().ok());

    debug!(
        path = %path.display(),
        width,
        height,
        bands,
        epsg = ?epsg,
        "opened raster"
    );

    Ok(RasterMeta {
        path: path.to_path_buf(),
        width: width as usize,
        height: height as usize,
        bands,
        transform,
        epsg,
        crs_text,
        nodata,
        driver: "GTiff",
    })
}

/// Read one band over `window`, filling pixels outside the raster with
/// `fill`. The returned buffer is row-major `window.width × window.height`.
pub fn read_window_boundless(
    meta: &RasterMeta,
    band: usize,
    window: &PixelWindow,
    fill: f64,
) -> Result<Vec<f64>> {
    if band >= meta.bands {
        return Err(RasterIoError::BandOutOfRange {
            band,
            bands: meta.bands,
        });
    }

    let mut out = vec![fill; window.len()];

    // Intersection with the raster extent, in raster pixel coordinates.
    let col0 = window.col_off.max(0);
    let row0 = window.row_off.max(0);
    let col1 = (window.col_off + window.width as i64).min(meta.width as i64);
    let row1 = (window.row_off + window.height as i64).min(meta.height as i64);
    if col0 >= col1 || row0 >= row1 {
        debug!(
            path = %meta.path.display(),
            ?window,
            "window entirely outside raster extent, returning fill"
        );
        return Ok(out);
    }

    let file = File::open(&meta.path)
        .map_err(|e| RasterIoError::open_failed(format!("{}: {e}", meta.path.display())))?;
    let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());

    if tag_u64(&mut decoder, Tag::PlanarConfiguration).unwrap_or(1) != 1 {
        return Err(RasterIoError::invalid_metadata(format!(
            "{}: planar sample layout is not supported",
            meta.path.display()
        )));
    }

    if tag_u64(&mut decoder, Tag::TileWidth).is_some() {
        // Tiled layout: decode the full image and copy the overlap.
        let data = chunk_to_f64(decoder.read_image()?);
        copy_rows(
            &mut out, &data, meta, band, window, col0, col1, row0, row1, 0,
        );
        return Ok(out);
    }

    let rows_per_strip = tag_u64(&mut decoder, Tag::RowsPerStrip)
        .map(|v| v as usize)
        .unwrap_or(meta.height)
        .max(1);

    let first_strip = row0 as usize / rows_per_strip;
    let last_strip = (row1 as usize - 1) / rows_per_strip;
    for strip in first_strip..=last_strip {
        let strip_top = strip * rows_per_strip;
        let data = chunk_to_f64(decoder.read_chunk(strip as u32)?);
        let lo = row0.max(strip_top as i64);
        let hi = row1.min((strip_top + rows_per_strip) as i64);
        copy_rows(
            &mut out, &data, meta, band, window, col0, col1, lo, hi, strip_top,
        );
    }

    Ok(out)
}

/// Copy rows `[row_lo, row_hi)` of the raster out of a decoded chunk whose
/// first row is `chunk_top`.
#[allow(clippy::too_many_arguments)]
fn copy_rows(
    out: &mut [f64],
    chunk: &[f64],
    meta: &RasterMeta,
    band: usize,
    window: &PixelWindow,
    col0: i64,
    col1: i64,
    row_lo: i64,
    row_hi: i64,
    chunk_top: usize,
) {
    for row in row_lo..row_hi {
        let src_row = row as usize - chunk_top;
        for col in col0..col1 {
            let src = (src_row * meta.width + col as usize) * meta.bands + band;
            if src >= chunk.len() {
                continue;
            }
            let dst =
                (row - window.row_off) as usize * window.width + (col - window.col_off) as usize;
            out[dst] = chunk[src];
        }
    }
}

fn chunk_to_f64(result: DecodingResult) -> Vec<f64> {
    match result {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
    }
}

/// Build the affine transform from ModelTransformation when present,
/// otherwise from ModelPixelScale + ModelTiepoint.
fn read_transform(decoder: &mut Decoder<BufReader<File>>, path: &Path) -> Result<[f64; 6]> {
    if let Some(m) = tag_f64_vec(decoder, Tag::ModelTransformationTag) {
        if m.len() >= 8 {
            return Ok([m[0], m[1], m[3], m[4], m[5], m[7]]);
        }
    }

    let scale = tag_f64_vec(decoder, Tag::ModelPixelScaleTag);
    let tiepoint = tag_f64_vec(decoder, Tag::ModelTiepointTag);
    match (scale, tiepoint) {
        (Some(s), Some(t)) if s.len() >= 2 && t.len() >= 6 => {
            // Tiepoint maps raster (I, J) to model (X, Y); ScaleY is
            // stored positive for north-up rasters.
            let x0 = t[3] - t[0] * s[0];
            let y0 = t[4] + t[1] * s[1];
            Ok([s[0], 0.0, x0, 0.0, -s[1], y0])
        }
        _ => Err(RasterIoError::invalid_metadata(format!(
            "{}: no usable georeferencing tags",
            path.display()
        ))),
    }
}

/// Extract the EPSG code from the geokey directory.
fn read_geokeys(decoder: &mut Decoder<BufReader<File>>) -> Option<u32> {
    let keys = match tag_u16_vec(decoder, Tag::GeoKeyDirectoryTag) {
        Some(k) if k.len() >= 4 => k,
        _ => return None,
    };

    let mut model = 0u16;
    let mut projected_code = None;
    let mut geographic_code = None;
    let count = keys[3] as usize;
    for i in 0..count {
        let base = 4 + i * 4;
        if base + 3 >= keys.len() {
            break;
        }
        let (id, location, _, value) = (keys[base], keys[base + 1], keys[base + 2], keys[base + 3]);
        if location != 0 {
            continue;
        }
        match id {
            GT_MODEL_TYPE_GEO_KEY => model = value,
            PROJECTED_CS_TYPE_GEO_KEY if (1..32767).contains(&value) => {
                projected_code = Some(u32::from(value))
            }
            GEOGRAPHIC_TYPE_GEO_KEY if (1..32767).contains(&value) => {
                geographic_code = Some(u32::from(value))
            }
            _ => {}
        }
    }

    // A projected file also records its underlying geographic CRS, so the
    // projected code wins when both are present.
    if model == MODEL_TYPE_GEOGRAPHIC {
        geographic_code.or(projected_code)
    } else {
        projected_code.or(geographic_code)
    }
}

fn tag_f64_vec(decoder: &mut Decoder<BufReader<File>>, tag: Tag) -> Option<Vec<f64>> {
    decoder
        .find_tag(tag)
        .ok()
        .flatten()
        .and_then(|v| v.into_f64_vec().ok())
}

fn tag_u16_vec(decoder: &mut Decoder<BufReader<File>>, tag: Tag) -> Option<Vec<u16>> {
    decoder
        .find_tag(tag)
        .ok()
        .flatten()
        .and_then(|v| v.into_u16_vec().ok())
}

fn tag_u64(decoder: &mut Decoder<BufReader<File>>, tag: Tag) -> Option<u64> {
    decoder
        .find_tag(tag)
        .ok()
        .flatten()
        .and_then(|v| v.into_u64().ok())
}

fn tag_ascii(decoder: &mut Decoder<BufReader<File>>, tag: Tag) -> Option<String> {
    let text = decoder
        .find_tag(tag)
        .ok()
        .flatten()
        .and_then(|v| v.into_string().ok())?;
    let trimmed = text.trim_end_matches(['\0', '|']).trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
