//! Reading source pixels onto the domain grid.
//!
//! A read runs in raster orientation end to end and flips to ascending
//! orientation exactly once, at the very end:
//!
//! 1. the window's world box becomes a full (touched pixels) and a
//!    trimmed (majority rule) window on the domain grid,
//! 2. the same box becomes a full window on the source's own grid,
//!    reprojecting the bounds if the CRSs differ,
//! 3. that source window is read boundlessly, with nodata outside,
//! 4. unless the grids match exactly, the source pixels are resampled
//!    onto the domain full window,
//! 5. the full window is cropped to the trimmed one, and the result
//!    flipped ascending.

use raster_io::PixelWindow;
use tracing::{debug, warn};

use crate::error::Result;
use crate::fields::{FieldBuffer, SourceRasterRef};
use crate::resample::{reproject, ResamplingMethod};
use crate::transform::GeoTransform;
use crate::view::GridSnapshot;
use crate::window::{raster_window, Rounding};

/// Reads one source band over a world-coordinate box, producing a buffer
/// on the domain grid in ascending orientation.
pub fn read_field(
    base: &GridSnapshot,
    left_edge: (f64, f64),
    right_edge: (f64, f64),
    source: &SourceRasterRef,
    method: ResamplingMethod,
) -> Result<FieldBuffer> {
    let base_frac = base.transform.pixel_window(left_edge, right_edge);
    let trimmed = base_frac.round(Rounding::Trimmed);
    let full = base_frac.round(Rounding::Full);
    if trimmed.is_empty() {
        return Ok(FieldBuffer::filled(
            trimmed.width,
            trimmed.height,
            source.nodata,
        ));
    }

    let src_frac = raster_window(
        left_edge,
        right_edge,
        &base.crs,
        &source.crs,
        &source.transform,
    )?;
    let src_window = src_frac.round(Rounding::Full);

    let src_data =
        raster_io::read_window_boundless(&source.meta, source.band, &src_window, source.nodata)?;

    // Both transforms re-anchored at their windows' corners, so pixel
    // (0, 0) of each buffer sits at its transform's origin
    let dst_transform = base
        .transform
        .for_window(full.col_off as f64, full.row_off as f64);
    let src_transform = source
        .transform
        .for_window(src_window.col_off as f64, src_window.row_off as f64);

    let aligned = base.crs == source.crs
        && transforms_match(&dst_transform, &src_transform)
        && (src_window.width, src_window.height) == (full.width, full.height);

    let resampled = if aligned {
        src_data
    } else {
        debug!(
            source = %source.meta.path.display(),
            src_crs = %source.crs,
            dst_crs = %base.crs,
            %method,
            "resampling source onto the domain grid"
        );
        reproject(
            &src_data,
            src_window.width,
            src_window.height,
            &src_transform,
            &source.crs,
            full.width,
            full.height,
            &dst_transform,
            &base.crs,
            method,
            source.nodata,
        )?
    };

    let mut data = crop_to_trimmed(&resampled, &full, &trimmed, source.nodata);
    flip_buffer(&mut data, trimmed.width, trimmed.height, base.flip);
    Ok(FieldBuffer::new(
        data,
        trimmed.width,
        trimmed.height,
        source.nodata,
    ))
}

// Coefficient-wise comparison; offsets are in CRS units so a micro-unit
// tolerance is far below any real pixel.
fn transforms_match(a: &GeoTransform, b: &GeoTransform) -> bool {
    a.to_array()
        .iter()
        .zip(b.to_array().iter())
        .all(|(x, y)| (x - y).abs() <= 1e-6)
}

// Copies the trimmed sub-window out of the full-window buffer. The
// trimmed window nests inside the full one by construction; should the
// offsets ever disagree, the copy clamps and the rest stays fill.
fn crop_to_trimmed(
    data: &[f64],
    full: &PixelWindow,
    trimmed: &PixelWindow,
    fill: f64,
) -> Vec<f64> {
    if trimmed == full {
        return data.to_vec();
    }

    let dc = trimmed.col_off - full.col_off;
    let dr = trimmed.row_off - full.row_off;
    if dc < 0
        || dr < 0
        || dc as usize + trimmed.width > full.width
        || dr as usize + trimmed.height > full.height
    {
        warn!(?full, ?trimmed, "trimmed window escapes the full window");
    }

    let mut out = vec![fill; trimmed.len()];
    for row in 0..trimmed.height {
        let src_row = dr + row as i64;
        if src_row < 0 || src_row >= full.height as i64 {
            continue;
        }
        for col in 0..trimmed.width {
            let src_col = dc + col as i64;
            if src_col < 0 || src_col >= full.width as i64 {
                continue;
            }
            out[row * trimmed.width + col] =
                data[src_row as usize * full.width + src_col as usize];
        }
    }
    out
}

/// Reverses flipped axes in place. Involutive: the same call converts
/// raster orientation to ascending and back.
pub(crate) fn flip_buffer(data: &mut [f64], width: usize, height: usize, flip: [bool; 2]) {
    if flip[1] {
        for row in 0..height / 2 {
            for col in 0..width {
                data.swap(row * width + col, (height - 1 - row) * width + col);
            }
        }
    }
    if flip[0] {
        for row in 0..height {
            data[row * width..(row + 1) * width].reverse();
        }
    }
}
