//! Multi-band GeoTIFF writing.
//!
//! Bands arrive planar (one row-major `f64` buffer per band) and are written
//! interleaved into a single strip, 64-bit IEEE floats, with pixel scale,
//! tiepoint, geokey, and nodata tags. This is the low-level directory layout
//! rather than the encoder's fixed color types so any band count works.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

use crate::error::{RasterIoError, Result};
use crate::tags::{
    GDAL_NODATA, GEOGRAPHIC_TYPE_GEO_KEY, GEO_ASCII_PARAMS, GEO_KEY_DIRECTORY,
    GT_MODEL_TYPE_GEO_KEY, GT_RASTER_TYPE_GEO_KEY, MODEL_PIXEL_SCALE, MODEL_TIEPOINT,
    MODEL_TYPE_GEOGRAPHIC, MODEL_TYPE_PROJECTED, PROJECTED_CS_TYPE_GEO_KEY, RASTER_PIXEL_IS_AREA,
};

/// One multi-band image to be written.
pub struct WriteImage<'a> {
    pub width: usize,
    pub height: usize,
    /// Planar band buffers, each `width × height` row-major.
    pub bands: Vec<&'a [f64]>,
    /// Pixel→coordinate affine as (a, b, c, d, e, f). Rotation terms must
    /// be zero; the pixel-scale/tiepoint tag pair cannot express them.
    pub transform: [f64; 6],
    pub epsg: Option<u32>,
    /// Marks the CRS as geographic when no EPSG code is available.
    pub geographic: bool,
    /// Proj definition string recorded in GeoAsciiParams.
    pub proj_text: Option<String>,
    pub nodata: Option<f64>,
}

impl WriteImage<'_> {
    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RasterIoError::write_failed("image has zero dimensions"));
        }
        if self.bands.is_empty() {
            return Err(RasterIoError::write_failed("image has no bands"));
        }
        let expected = self.width * self.height;
        for (i, band) in self.bands.iter().enumerate() {
            if band.len() != expected {
                return Err(RasterIoError::write_failed(format!(
                    "band {i} has {} pixels, expected {expected}",
                    band.len()
                )));
            }
        }
        let [_, b, _, d, _, _] = self.transform;
        if b != 0.0 || d != 0.0 {
            return Err(RasterIoError::write_failed(
                "rotated transforms are not supported",
            ));
        }
        Ok(())
    }
}

/// Write a multi-band GeoTIFF to `path`.
pub fn write_geotiff(path: &Path, image: &WriteImage<'_>) -> Result<()> {
    image.validate()?;

    let file = File::create(path)
        .map_err(|e| RasterIoError::write_failed(format!("{}: {e}", path.display())))?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
    let mut dir = encoder.new_directory()?;

    let bands = image.bands.len();
    dir.write_tag(Tag::ImageWidth, image.width as u32)?;
    dir.write_tag(Tag::ImageLength, image.height as u32)?;
    dir.write_tag(Tag::BitsPerSample, vec![64u16; bands].as_slice())?;
    dir.write_tag(Tag::Compression, 1u16)?;
    dir.write_tag(Tag::PhotometricInterpretation, 1u16)?;
    dir.write_tag(Tag::SamplesPerPixel, bands as u16)?;
    // 3 = IEEE floating point
    dir.write_tag(Tag::SampleFormat, vec![3u16; bands].as_slice())?;
    dir.write_tag(Tag::PlanarConfiguration, 1u16)?;
    dir.write_tag(Tag::RowsPerStrip, image.height as u32)?;
    if bands > 1 {
        dir.write_tag(Tag::ExtraSamples, vec![0u16; bands - 1].as_slice())?;
    }

    let [a, _, x0, _, e, y0] = image.transform;
    // ScaleY is stored positive for north-up rasters
    dir.write_tag(
        Tag::Unknown(MODEL_PIXEL_SCALE),
        [a, -e, 0.0].as_slice(),
    )?;
    dir.write_tag(
        Tag::Unknown(MODEL_TIEPOINT),
        [0.0, 0.0, 0.0, x0, y0, 0.0].as_slice(),
    )?;
    dir.write_tag(
        Tag::Unknown(GEO_KEY_DIRECTORY),
        geokey_directory(image.epsg, image.geographic).as_slice(),
    )?;
    if let Some(proj) = &image.proj_text {
        dir.write_tag(Tag::Unknown(GEO_ASCII_PARAMS), format!("{proj}|").as_str())?;
    }
    if let Some(nodata) = image.nodata {
        let text = if nodata.is_nan() {
            "nan".to_string()
        } else {
            format!("{nodata}")
        };
        dir.write_tag(Tag::Unknown(GDAL_NODATA), text.as_str())?;
    }

    // Interleave the planar bands into one strip of little-endian floats.
    let mut pixel_bytes = Vec::with_capacity(image.width * image.height * bands * 8);
    for i in 0..image.width * image.height {
        for band in &image.bands {
            pixel_bytes.extend_from_slice(&band[i].to_le_bytes());
        }
    }

    let strip_offset = dir.write_data(pixel_bytes.as_slice())?;
    dir.write_tag(Tag::StripOffsets, strip_offset as u32)?;
    dir.write_tag(Tag::StripByteCounts, pixel_bytes.len() as u32)?;

    dir.finish()?;
    Ok(())
}

/// GeoKeyDirectory: version header plus model-type, raster-type, and CRS
/// entries.
fn geokey_directory(epsg: Option<u32>, geographic: bool) -> Vec<u16> {
    let key_count = if epsg.is_some() { 3 } else { 2 };
    let mut keys = vec![1, 1, 0, key_count];

    let model = if geographic {
        MODEL_TYPE_GEOGRAPHIC
    } else {
        MODEL_TYPE_PROJECTED
    };
    keys.extend_from_slice(&[GT_MODEL_TYPE_GEO_KEY, 0, 1, model]);
    keys.extend_from_slice(&[GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);

    if let Some(code) = epsg {
        let key = if geographic {
            GEOGRAPHIC_TYPE_GEO_KEY
        } else {
            PROJECTED_CS_TYPE_GEO_KEY
        };
        keys.extend_from_slice(&[key, 0, 1, code as u16]);
    }

    keys
}
