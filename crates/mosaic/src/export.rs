//! Round-trippable raster export.
//!
//! Export writes selected fields as one multi-band GeoTIFF plus a YAML
//! sidecar recording each band's field identity. Loading a mosaic from
//! an exported file finds the sidecar by name and reconstructs the same
//! fields, so export followed by load reproduces the data exactly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use raster_io::WriteImage;

use crate::error::{MosaicError, Result};
use crate::fields::FieldDescriptor;
use crate::mosaic::Mosaic;
use crate::sampler::flip_buffer;
use crate::selector::Selector;

/// One band's identity in the sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SidecarEntry {
    field_type: String,
    field_name: String,
    units: String,
    take_log: bool,
}

/// `{stem: {band_1: entry, band_2: entry, ...}}`
type SidecarDocument = BTreeMap<String, BTreeMap<String, SidecarEntry>>;

impl Mosaic {
    /// Exports fields over the full domain or a selector-resolved window.
    ///
    /// One band per field, in request order, each read with the selection
    /// mask applied. The file's nodata is the first field's fill value;
    /// other fields' missing pixels are remapped onto it. A sidecar named
    /// `{stem}_fields.yaml` is written beside the raster.
    pub fn export(
        &mut self,
        path: &Path,
        fields: &[&str],
        selector: Option<&Selector>,
    ) -> Result<()> {
        if fields.is_empty() {
            return Err(MosaicError::configuration(
                "export needs at least one field",
            ));
        }

        let selector = match selector {
            Some(selector) => selector.clone(),
            None => {
                let (left, right) = self.bounding_box();
                Selector::rectangle(left, right)
            }
        };
        let window = self.window(&selector);
        let (width, height) = window.shape();
        if width == 0 || height == 0 {
            return Err(MosaicError::geometry(
                "export window has no pixels inside the domain",
            ));
        }

        let mut bands: Vec<Vec<f64>> = Vec::with_capacity(fields.len());
        let mut descriptors: Vec<FieldDescriptor> = Vec::with_capacity(fields.len());
        let mut nodata: Option<f64> = None;
        for field in fields {
            let mut buffer = self.read_on_window(&window, field)?;
            let descriptor = self
                .descriptor(field)
                .ok_or_else(|| MosaicError::unknown_field(*field))?;

            let fill = *nodata.get_or_insert(buffer.fill);
            if !same_fill(buffer.fill, fill) {
                let own = buffer.fill;
                for value in &mut buffer.data {
                    if (own.is_nan() && value.is_nan()) || *value == own {
                        *value = fill;
                    }
                }
            }

            // Buffers are ascending; the file stores raster orientation
            flip_buffer(&mut buffer.data, width, height, window.flip());
            bands.push(buffer.data);
            descriptors.push(descriptor);
        }

        let crs = window.crs();
        let image = WriteImage {
            width,
            height,
            bands: bands.iter().map(|band| band.as_slice()).collect(),
            transform: window.transform().to_array(),
            epsg: crs.epsg(),
            geographic: crs.is_geographic(),
            proj_text: crs
                .epsg()
                .is_none()
                .then(|| crs.proj_string().to_string()),
            nodata: Some(nodata.unwrap_or(f64::NAN)),
        };
        raster_io::write_geotiff(path, &image)?;
        write_sidecar(path, &descriptors)?;

        info!(
            path = %path.display(),
            bands = bands.len(),
            width,
            height,
            "exported mosaic window"
        );
        Ok(())
    }
}

fn same_fill(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// The sidecar path belonging to a raster: `{stem}_fields.yaml` beside it.
pub fn sidecar_path(raster: &Path) -> PathBuf {
    raster.with_file_name(format!("{}_fields.yaml", raster_stem(raster)))
}

fn raster_stem(raster: &Path) -> String {
    raster
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "raster".to_string())
}

fn write_sidecar(raster: &Path, descriptors: &[FieldDescriptor]) -> Result<()> {
    let mut bands = BTreeMap::new();
    for (index, descriptor) in descriptors.iter().enumerate() {
        bands.insert(
            format!("band_{}", index + 1),
            SidecarEntry {
                field_type: descriptor.kind.clone(),
                field_name: descriptor.name.clone(),
                units: descriptor.units.clone(),
                take_log: descriptor.take_log,
            },
        );
    }

    let mut document = SidecarDocument::new();
    document.insert(raster_stem(raster), bands);
    std::fs::write(sidecar_path(raster), serde_yaml::to_string(&document)?)?;
    Ok(())
}

/// Reads a raster's sidecar, if one exists, as band index → descriptor.
///
/// Band indices in the result are zero-based; the file's `band_{n}` keys
/// are one-based. A present but malformed sidecar is an error, not a
/// silent fallback to stem naming.
pub(crate) fn read_sidecar(raster: &Path) -> Result<Option<BTreeMap<usize, FieldDescriptor>>> {
    let path = sidecar_path(raster);
    if !path.exists() {
        return Ok(None);
    }

    let text = std::fs::read_to_string(&path)?;
    let document: SidecarDocument = serde_yaml::from_str(&text)?;
    let stem = raster_stem(raster);
    let Some(bands) = document.get(stem.as_str()).or_else(|| document.values().next())
    else {
        return Err(MosaicError::configuration(format!(
            "{}: sidecar holds no field map",
            path.display()
        )));
    };

    let mut fields = BTreeMap::new();
    for (key, entry) in bands {
        let band = key
            .strip_prefix("band_")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|&n| n >= 1)
            .ok_or_else(|| {
                MosaicError::configuration(format!(
                    "{}: bad band key {key:?}",
                    path.display()
                ))
            })?;
        fields.insert(
            band - 1,
            FieldDescriptor {
                kind: entry.field_type.clone(),
                name: entry.field_name.clone(),
                units: entry.units.clone(),
                take_log: entry.take_log,
            },
        );
    }
    debug!(path = %path.display(), bands = fields.len(), "read field sidecar");
    Ok(Some(fields))
}
