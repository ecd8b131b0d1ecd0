//! Resampling methods for moving pixels between grids.
//!
//! Point kernels (nearest through lanczos) sample around the mapped
//! position and suit same-or-finer targets. Footprint kernels (average
//! through rms) aggregate every source pixel overlapped by the target
//! pixel's footprint and suit coarser targets. All kernels treat the fill
//! value and NaN as missing.

use geodesy::{Crs, Transformer};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::transform::GeoTransform;

/// How pixels are resampled onto a different grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResamplingMethod {
    #[default]
    Nearest,
    Bilinear,
    Cubic,
    CubicSpline,
    Gauss,
    Lanczos,
    Average,
    Mode,
    Max,
    Min,
    Median,
    Q1,
    Q3,
    Sum,
    Rms,
}

impl ResamplingMethod {
    /// Parses a method name, case-insensitively, with a few aliases.
    ///
    /// Unrecognised names fall back to nearest with a warning rather than
    /// failing the query.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "nearest" | "near" => Self::Nearest,
            "bilinear" => Self::Bilinear,
            "cubic" | "bicubic" => Self::Cubic,
            "cubic_spline" | "cubicspline" => Self::CubicSpline,
            "gauss" => Self::Gauss,
            "lanczos" => Self::Lanczos,
            "average" | "mean" => Self::Average,
            "mode" => Self::Mode,
            "max" => Self::Max,
            "min" => Self::Min,
            "median" | "med" => Self::Median,
            "q1" => Self::Q1,
            "q3" => Self::Q3,
            "sum" => Self::Sum,
            "rms" => Self::Rms,
            other => {
                warn!(method = other, "unknown resampling method, using nearest");
                Self::Nearest
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
            Self::Cubic => "cubic",
            Self::CubicSpline => "cubic_spline",
            Self::Gauss => "gauss",
            Self::Lanczos => "lanczos",
            Self::Average => "average",
            Self::Mode => "mode",
            Self::Max => "max",
            Self::Min => "min",
            Self::Median => "median",
            Self::Q1 => "q1",
            Self::Q3 => "q3",
            Self::Sum => "sum",
            Self::Rms => "rms",
        }
    }

    /// Whether the method aggregates over the target pixel's footprint
    /// instead of sampling around a point.
    pub fn is_footprint(&self) -> bool {
        matches!(
            self,
            Self::Average
                | Self::Mode
                | Self::Max
                | Self::Min
                | Self::Median
                | Self::Q1
                | Self::Q3
                | Self::Sum
                | Self::Rms
        )
    }
}

impl std::fmt::Display for ResamplingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resamples a source buffer onto a destination grid, reprojecting
/// between CRSs when they differ.
///
/// Each destination pixel center is mapped inversely into source pixel
/// space and sampled there with `method`. Destination pixels that map
/// outside the source buffer, or outside the projection's domain, keep
/// `fill`.
#[allow(clippy::too_many_arguments)]
pub fn reproject(
    src: &[f64],
    src_width: usize,
    src_height: usize,
    src_transform: &GeoTransform,
    src_crs: &Crs,
    dst_width: usize,
    dst_height: usize,
    dst_transform: &GeoTransform,
    dst_crs: &Crs,
    method: ResamplingMethod,
    fill: f64,
) -> Result<Vec<f64>> {
    let transformer = Transformer::new(dst_crs, src_crs)?;
    let to_source = |col: f64, row: f64| -> geodesy::Result<(f64, f64)> {
        let (x, y) = dst_transform.apply(col, row);
        let (x, y) = transformer.transform(x, y)?;
        Ok(src_transform.invert(x, y))
    };

    // Footprint size of one destination pixel, in source pixels, measured
    // at the grid origin
    let scale = if method.is_footprint() {
        let origin = to_source(0.5, 0.5)?;
        let east = to_source(1.5, 0.5)?;
        let south = to_source(0.5, 1.5)?;
        (
            (east.0 - origin.0).hypot(east.1 - origin.1),
            (south.0 - origin.0).hypot(south.1 - origin.1),
        )
    } else {
        (1.0, 1.0)
    };

    let mut out = vec![fill; dst_width * dst_height];
    let mut unmappable = 0usize;
    for row in 0..dst_height {
        for col in 0..dst_width {
            let (sx, sy) = match to_source(col as f64 + 0.5, row as f64 + 0.5) {
                Ok(pos) => pos,
                Err(_) => {
                    unmappable += 1;
                    continue;
                }
            };
            if let Some(value) = sample(method, src, src_width, src_height, sx, sy, scale, fill)
            {
                out[row * dst_width + col] = value;
            }
        }
    }

    if unmappable > 0 {
        debug!(
            pixels = unmappable,
            "destination pixels fell outside the projection domain"
        );
    }
    Ok(out)
}

/// Samples a buffer at a corner-based fractional pixel position.
///
/// `(x, y)` uses the convention where pixel `(i, j)` spans
/// `[i, i+1) x [j, j+1)` and its center sits at `(i + 0.5, j + 0.5)`.
#[allow(clippy::too_many_arguments)]
pub fn sample(
    method: ResamplingMethod,
    data: &[f64],
    width: usize,
    height: usize,
    x: f64,
    y: f64,
    scale: (f64, f64),
    fill: f64,
) -> Option<f64> {
    match method {
        ResamplingMethod::Nearest => nearest(data, width, height, x - 0.5, y - 0.5),
        ResamplingMethod::Bilinear => bilinear(data, width, height, x - 0.5, y - 0.5, fill),
        ResamplingMethod::Cubic => cubic(data, width, height, x - 0.5, y - 0.5, fill),
        ResamplingMethod::CubicSpline => {
            cubic_spline(data, width, height, x - 0.5, y - 0.5, fill)
        }
        ResamplingMethod::Gauss => gauss(data, width, height, x - 0.5, y - 0.5, fill),
        ResamplingMethod::Lanczos => lanczos(data, width, height, x - 0.5, y - 0.5, fill),
        _ => sample_footprint(method, data, width, height, x, y, scale, fill),
    }
}

fn is_valid(value: f64, fill: f64) -> bool {
    !value.is_nan() && value != fill
}

// Positions up to half a pixel beyond the first/last center still clamp
// onto the grid; anything further is off the buffer.
fn clamp_index(pos: f64, len: usize) -> Option<f64> {
    if len == 0 {
        return None;
    }
    let max = (len - 1) as f64;
    if pos < -0.5 || pos > max + 0.5 {
        return None;
    }
    Some(pos.clamp(0.0, max))
}

/// Nearest neighbor: the value of the closest pixel center.
pub fn nearest(data: &[f64], width: usize, height: usize, x: f64, y: f64) -> Option<f64> {
    let x = clamp_index(x, width)?;
    let y = clamp_index(y, height)?;
    let col = x.round() as usize;
    let row = y.round() as usize;
    Some(data[row * width + col])
}

/// Bilinear: smoothly interpolates the four nearest pixel centers.
///
/// Any missing corner makes the result missing.
pub fn bilinear(
    data: &[f64],
    width: usize,
    height: usize,
    x: f64,
    y: f64,
    fill: f64,
) -> Option<f64> {
    let x = clamp_index(x, width)?;
    let y = clamp_index(y, height)?;
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let xf = x - x0 as f64;
    let yf = y - y0 as f64;

    let v00 = data[y0 * width + x0];
    let v10 = data[y0 * width + x1];
    let v01 = data[y1 * width + x0];
    let v11 = data[y1 * width + x1];

    if !is_valid(v00, fill) || !is_valid(v10, fill) || !is_valid(v01, fill) || !is_valid(v11, fill)
    {
        return None;
    }

    let top = v00 * (1.0 - xf) + v10 * xf;
    let bottom = v01 * (1.0 - xf) + v11 * xf;
    Some(top * (1.0 - yf) + bottom * yf)
}

/// Bicubic: Catmull-Rom over a 4x4 neighborhood.
///
/// Falls back to bilinear when the neighborhood contains missing pixels.
pub fn cubic(
    data: &[f64],
    width: usize,
    height: usize,
    x: f64,
    y: f64,
    fill: f64,
) -> Option<f64> {
    let values = gather_4x4(data, width, height, x, y, fill)?;
    match values {
        Some((values, xf, yf)) => {
            let mut rows = [0.0f64; 4];
            for (j, row) in values.iter().enumerate() {
                rows[j] = cubic_1d(row[0], row[1], row[2], row[3], xf);
            }
            Some(cubic_1d(rows[0], rows[1], rows[2], rows[3], yf))
        }
        None => bilinear(data, width, height, x, y, fill),
    }
}

/// B-spline cubic: smoother than Catmull-Rom, does not pass through the
/// sample values.
///
/// Falls back to bilinear when the neighborhood contains missing pixels.
pub fn cubic_spline(
    data: &[f64],
    width: usize,
    height: usize,
    x: f64,
    y: f64,
    fill: f64,
) -> Option<f64> {
    let values = gather_4x4(data, width, height, x, y, fill)?;
    match values {
        Some((values, xf, yf)) => {
            let mut rows = [0.0f64; 4];
            for (j, row) in values.iter().enumerate() {
                rows[j] = bspline_1d(row[0], row[1], row[2], row[3], xf);
            }
            Some(bspline_1d(rows[0], rows[1], rows[2], rows[3], yf))
        }
        None => bilinear(data, width, height, x, y, fill),
    }
}

// Outer None: position off the buffer. Inner None: neighborhood holds a
// missing pixel, caller decides the fallback.
#[allow(clippy::type_complexity)]
fn gather_4x4(
    data: &[f64],
    width: usize,
    height: usize,
    x: f64,
    y: f64,
    fill: f64,
) -> Option<Option<([[f64; 4]; 4], f64, f64)>> {
    let x = clamp_index(x, width)?;
    let y = clamp_index(y, height)?;
    let xi = x.floor() as i64;
    let yi = y.floor() as i64;
    let xf = x - xi as f64;
    let yf = y - yi as f64;

    let mut values = [[0.0f64; 4]; 4];
    for j in 0..4i64 {
        for i in 0..4i64 {
            let px = (xi + i - 1).clamp(0, width as i64 - 1) as usize;
            let py = (yi + j - 1).clamp(0, height as i64 - 1) as usize;
            let v = data[py * width + px];
            if !is_valid(v, fill) {
                return Some(None);
            }
            values[j as usize][i as usize] = v;
        }
    }
    Some(Some((values, xf, yf)))
}

/// 1D cubic interpolation using a Catmull-Rom spline.
fn cubic_1d(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;

    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    let d = p1;

    a * t3 + b * t2 + c * t + d
}

/// 1D cubic B-spline basis. Weights always sum to one.
fn bspline_1d(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;

    let w0 = -t3 + 3.0 * t2 - 3.0 * t + 1.0;
    let w1 = 3.0 * t3 - 6.0 * t2 + 4.0;
    let w2 = -3.0 * t3 + 3.0 * t2 + 3.0 * t + 1.0;
    let w3 = t3;

    (w0 * p0 + w1 * p1 + w2 * p2 + w3 * p3) / 6.0
}

/// Gaussian blur sample: binomial 3x3 weights around the nearest pixel,
/// skipping missing pixels and renormalizing.
pub fn gauss(
    data: &[f64],
    width: usize,
    height: usize,
    x: f64,
    y: f64,
    fill: f64,
) -> Option<f64> {
    const WEIGHTS: [[f64; 3]; 3] = [[1.0, 2.0, 1.0], [2.0, 4.0, 2.0], [1.0, 2.0, 1.0]];

    let x = clamp_index(x, width)?;
    let y = clamp_index(y, height)?;
    let ci = x.round() as i64;
    let ri = y.round() as i64;

    let mut sum = 0.0;
    let mut weight_sum = 0.0;
    for (j, row_weights) in WEIGHTS.iter().enumerate() {
        let py = ri + j as i64 - 1;
        if py < 0 || py >= height as i64 {
            continue;
        }
        for (i, w) in row_weights.iter().enumerate() {
            let px = ci + i as i64 - 1;
            if px < 0 || px >= width as i64 {
                continue;
            }
            let v = data[py as usize * width + px as usize];
            if !is_valid(v, fill) {
                continue;
            }
            sum += w * v;
            weight_sum += w;
        }
    }

    (weight_sum > 0.0).then(|| sum / weight_sum)
}

/// Lanczos windowed sinc over a 6x6 neighborhood (a = 3).
///
/// Missing pixels are skipped and the remaining weights renormalized.
pub fn lanczos(
    data: &[f64],
    width: usize,
    height: usize,
    x: f64,
    y: f64,
    fill: f64,
) -> Option<f64> {
    let x = clamp_index(x, width)?;
    let y = clamp_index(y, height)?;
    let xi = x.floor() as i64;
    let yi = y.floor() as i64;

    let mut sum = 0.0;
    let mut weight_sum = 0.0;
    for j in -2..=3i64 {
        let py = yi + j;
        if py < 0 || py >= height as i64 {
            continue;
        }
        let wy = lanczos_weight(y - py as f64);
        for i in -2..=3i64 {
            let px = xi + i;
            if px < 0 || px >= width as i64 {
                continue;
            }
            let v = data[py as usize * width + px as usize];
            if !is_valid(v, fill) {
                continue;
            }
            let w = wy * lanczos_weight(x - px as f64);
            sum += w * v;
            weight_sum += w;
        }
    }

    (weight_sum.abs() > 1e-9).then(|| sum / weight_sum)
}

fn lanczos_weight(t: f64) -> f64 {
    if t.abs() >= 3.0 {
        return 0.0;
    }
    sinc(t) * sinc(t / 3.0)
}

fn sinc(t: f64) -> f64 {
    let a = std::f64::consts::PI * t;
    if a.abs() < 1e-12 {
        1.0
    } else {
        a.sin() / a
    }
}

// Aggregates over the target pixel's footprint. (cx, cy) are corner-based
// source pixel coordinates of the target pixel center; `scale` is the
// footprint size in source pixels.
fn sample_footprint(
    method: ResamplingMethod,
    data: &[f64],
    width: usize,
    height: usize,
    cx: f64,
    cy: f64,
    scale: (f64, f64),
    fill: f64,
) -> Option<f64> {
    let samples = footprint_samples(data, width, height, cx, cy, scale, fill);
    if samples.is_empty() {
        return None;
    }

    match method {
        ResamplingMethod::Average => {
            let (sum, weight) = weighted_sum(&samples);
            (weight > 0.0).then(|| sum / weight)
        }
        ResamplingMethod::Sum => Some(weighted_sum(&samples).0),
        ResamplingMethod::Rms => {
            let mut sum = 0.0;
            let mut weight = 0.0;
            for &(v, w) in &samples {
                sum += w * v * v;
                weight += w;
            }
            (weight > 0.0).then(|| (sum / weight).sqrt())
        }
        ResamplingMethod::Min => samples.iter().map(|&(v, _)| v).reduce(f64::min),
        ResamplingMethod::Max => samples.iter().map(|&(v, _)| v).reduce(f64::max),
        ResamplingMethod::Median => quantile(samples, 0.5),
        ResamplingMethod::Q1 => quantile(samples, 0.25),
        ResamplingMethod::Q3 => quantile(samples, 0.75),
        ResamplingMethod::Mode => mode(samples),
        _ => None,
    }
}

// Area-weighted samples under the footprint, invalid pixels skipped. The
// footprint half-width never drops below half a source pixel so upscaling
// still sees one pixel.
fn footprint_samples(
    data: &[f64],
    width: usize,
    height: usize,
    cx: f64,
    cy: f64,
    scale: (f64, f64),
    fill: f64,
) -> Vec<(f64, f64)> {
    let hx = (scale.0 / 2.0).max(0.5);
    let hy = (scale.1 / 2.0).max(0.5);

    let x_min = ((cx - hx).floor() as i64).max(0);
    let x_max = ((cx + hx).ceil() as i64).min(width as i64);
    let y_min = ((cy - hy).floor() as i64).max(0);
    let y_max = ((cy + hy).ceil() as i64).min(height as i64);

    let mut samples = Vec::new();
    for iy in y_min..y_max {
        let oy = overlap(iy, cy, hy);
        if oy <= 0.0 {
            continue;
        }
        for ix in x_min..x_max {
            let v = data[iy as usize * width + ix as usize];
            if !is_valid(v, fill) {
                continue;
            }
            let ox = overlap(ix, cx, hx);
            if ox <= 0.0 {
                continue;
            }
            samples.push((v, ox * oy));
        }
    }
    samples
}

// Length of the intersection of [i, i+1] with [center-half, center+half].
fn overlap(i: i64, center: f64, half: f64) -> f64 {
    let lo = (i as f64).max(center - half);
    let hi = (i as f64 + 1.0).min(center + half);
    (hi - lo).max(0.0)
}

fn weighted_sum(samples: &[(f64, f64)]) -> (f64, f64) {
    let mut sum = 0.0;
    let mut weight = 0.0;
    for &(v, w) in samples {
        sum += w * v;
        weight += w;
    }
    (sum, weight)
}

// Nearest-rank quantile of the sample values, weights ignored.
fn quantile(samples: Vec<(f64, f64)>, q: f64) -> Option<f64> {
    let mut values: Vec<f64> = samples.into_iter().map(|(v, _)| v).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let idx = ((values.len() - 1) as f64 * q).round() as usize;
    Some(values[idx])
}

// Most frequent value; ties resolve to the smallest.
fn mode(samples: Vec<(f64, f64)>) -> Option<f64> {
    let mut values: Vec<f64> = samples.into_iter().map(|(v, _)| v).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let mut best = values[0];
    let mut best_run = 1usize;
    let mut run = 1usize;
    for i in 1..values.len() {
        if values[i].to_bits() == values[i - 1].to_bits() {
            run += 1;
        } else {
            run = 1;
        }
        if run > best_run {
            best_run = run;
            best = values[i];
        }
    }
    Some(best)
}
