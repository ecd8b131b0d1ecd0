//! GeoTIFF fixtures with known geometry.
//!
//! All helpers write north-up rasters: positive pixel width, negative
//! pixel height, origin at the top-left corner. Values are 64-bit floats
//! so tests can compare what they read against what they wrote exactly.

use std::path::Path;

use raster_io::{write_geotiff, RasterIoError, WriteImage};

use crate::generators::create_test_grid;

/// Nodata value shared by the fixtures.
pub const NODATA: f64 = -9999.0;

/// Builds the affine transform of a north-up raster.
///
/// `origin` is the top-left corner in world coordinates and `resolution`
/// the square pixel size in CRS units.
pub fn north_up_transform(origin: (f64, f64), resolution: f64) -> [f64; 6] {
    [resolution, 0.0, origin.0, 0.0, -resolution, origin.1]
}

/// Writes a single-band north-up GeoTIFF.
///
/// # Arguments
///
/// * `path` - Output file path
/// * `width`, `height` - Raster shape in pixels
/// * `origin` - Top-left corner in world coordinates
/// * `resolution` - Square pixel size in CRS units
/// * `epsg` - CRS code stamped into the geokeys
/// * `nodata` - Optional nodata value for the GDAL_NODATA tag
/// * `data` - Row-major band values, `width * height` long
pub fn write_raster(
    path: &Path,
    width: usize,
    height: usize,
    origin: (f64, f64),
    resolution: f64,
    epsg: u32,
    nodata: Option<f64>,
    data: &[f64],
) -> Result<(), RasterIoError> {
    write_bands(path, width, height, origin, resolution, epsg, nodata, &[data])
}

/// Writes a multi-band north-up GeoTIFF, one slice per band.
pub fn write_bands(
    path: &Path,
    width: usize,
    height: usize,
    origin: (f64, f64),
    resolution: f64,
    epsg: u32,
    nodata: Option<f64>,
    bands: &[&[f64]],
) -> Result<(), RasterIoError> {
    let image = WriteImage {
        width,
        height,
        bands: bands.to_vec(),
        transform: north_up_transform(origin, resolution),
        epsg: Some(epsg),
        // Fixtures only distinguish WGS84 lat/lon from projected systems
        geographic: epsg == 4326,
        proj_text: None,
        nodata,
    };
    write_geotiff(path, &image)
}

/// Writes a single-band raster carrying the `col * 1000 + row` pattern.
///
/// Returns the data that was written so tests can derive expected values.
pub fn write_pattern_raster(
    path: &Path,
    width: usize,
    height: usize,
    origin: (f64, f64),
    resolution: f64,
    epsg: u32,
) -> Result<Vec<f64>, RasterIoError> {
    let data = create_test_grid(width, height);
    write_raster(
        path,
        width,
        height,
        origin,
        resolution,
        epsg,
        Some(NODATA),
        &data,
    )?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_north_up_transform() {
        let t = north_up_transform((500_000.0, 5_000_000.0), 20.0);
        assert_eq!(t, [20.0, 0.0, 500_000.0, 0.0, -20.0, 5_000_000.0]);
    }

    #[test]
    fn test_pattern_raster_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pattern.tif");
        let written =
            write_pattern_raster(&path, 8, 6, (100.0, 200.0), 2.0, 32633).unwrap();

        let meta = raster_io::open(&path).unwrap();
        assert_eq!(meta.width, 8);
        assert_eq!(meta.height, 6);
        assert_eq!(meta.bands, 1);
        assert_eq!(meta.epsg, Some(32633));
        assert_eq!(meta.nodata, Some(NODATA));
        assert_eq!(meta.transform, north_up_transform((100.0, 200.0), 2.0));

        let window = raster_io::PixelWindow::new(0, 0, 8, 6);
        let data = raster_io::read_window_boundless(&meta, 0, &window, f64::NAN).unwrap();
        assert_eq!(data, written);
    }
}
