//! The mosaic facade.
//!
//! A [`Mosaic`] opens a set of co-registered rasters, takes the first as
//! its domain grid, and answers shape-driven queries: resolve a selector
//! to a pixel-aligned window, read any field over that window on the
//! domain grid, and restrict the result to the selector's exact geometry.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info, warn};

use geodesy::Crs;
use raster_io::RasterMeta;

use crate::cache::{CacheStats, ValueCache, WindowCache};
use crate::config::MosaicConfig;
use crate::error::{MosaicError, Result};
use crate::export;
use crate::fields::{
    DerivedField, FieldBuffer, FieldDescriptor, FieldRegistry, SourceField, SourceRasterRef,
};
use crate::mask::{self, Mask};
use crate::sampler;
use crate::selector::Selector;
use crate::transform::GeoTransform;
use crate::view::{GridSnapshot, WindowGrid};
use crate::window::{resolve, Rounding};

/// A virtual mosaic over co-registered raster files.
///
/// The first file passed to [`load`] defines the domain: its CRS,
/// resolution and extent become the grid every query is answered on.
/// Other sources may sit on different grids or in different CRSs; their
/// pixels are resampled onto the domain at read time.
///
/// [`load`]: Mosaic::load
pub struct Mosaic {
    config: MosaicConfig,
    base: GridSnapshot,
    fields: Rc<FieldRegistry>,
    window_cache: WindowCache,
    value_cache: ValueCache,
}

impl Mosaic {
    /// Opens the given rasters with default configuration.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        Self::load_with(paths, MosaicConfig::default())
    }

    /// Opens the given rasters. The first path defines the domain grid.
    ///
    /// Every band of every file becomes a named field: `{stem}` for
    /// single-band files, `{stem}_b{n}` for multi-band ones. A file with
    /// a `{stem}_fields.yaml` sidecar gets its field identities from the
    /// sidecar instead.
    pub fn load_with<P: AsRef<Path>>(paths: &[P], config: MosaicConfig) -> Result<Self> {
        config.validate().map_err(MosaicError::configuration)?;

        let mut sources: Vec<(PathBuf, RasterMeta, Crs, GeoTransform)> = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let meta = raster_io::open(path)?;
            let transform = GeoTransform::from_array(meta.transform);
            if !transform.is_invertible() {
                return Err(MosaicError::geometry(format!(
                    "{}: transform is not invertible",
                    path.display()
                )));
            }
            let crs = source_crs(&meta, config.crs_override.as_deref(), path)?;
            sources.push((path.to_path_buf(), meta, crs, transform));
        }

        let Some((_, primary_meta, primary_crs, primary_transform)) = sources.first() else {
            return Err(MosaicError::configuration(
                "at least one source raster is required",
            ));
        };
        let base = domain_snapshot(primary_meta, primary_crs, primary_transform);

        let units = match base.crs.linear_unit_name() {
            Some(unit) => unit.to_string(),
            None => {
                warn!(crs = %base.crs, "unknown linear units, assuming metres");
                "metre".to_string()
            }
        };

        let mut registry = FieldRegistry::new();
        for (path, meta, crs, transform) in &sources {
            let nodata = resolve_nodata(config.nodata_override, meta.nodata, path);
            let stem = file_stem(path);

            let sidecar = export::read_sidecar(path)?;
            if let Some(map) = &sidecar {
                if map.len() != meta.bands {
                    return Err(MosaicError::configuration(format!(
                        "{}: sidecar describes {} bands, file has {}",
                        path.display(),
                        map.len(),
                        meta.bands
                    )));
                }
            }

            for band in 0..meta.bands {
                let descriptor = match &sidecar {
                    Some(map) => map.get(&band).cloned().ok_or_else(|| {
                        MosaicError::configuration(format!(
                            "{}: sidecar has no entry for band {}",
                            path.display(),
                            band + 1
                        ))
                    })?,
                    None => FieldDescriptor {
                        kind: stem.clone(),
                        name: default_field_name(&stem, band, meta.bands),
                        units: units.clone(),
                        take_log: false,
                    },
                };
                registry.insert_source(
                    descriptor.name.clone(),
                    SourceField {
                        source: SourceRasterRef {
                            meta: meta.clone(),
                            band,
                            crs: crs.clone(),
                            transform: *transform,
                            nodata,
                        },
                        descriptor,
                    },
                )?;
            }
        }

        info!(
            sources = sources.len(),
            fields = registry.len(),
            crs = %base.crs,
            width = base.width,
            height = base.height,
            "loaded mosaic"
        );

        Ok(Self {
            window_cache: WindowCache::new(config.window_cache_capacity),
            value_cache: ValueCache::new(config.cache_field_values),
            config,
            base,
            fields: Rc::new(registry),
        })
    }

    /// Resolves a selector to a pixel-aligned window view.
    ///
    /// Windows are cached by the selector's structural hash, so asking
    /// for the same shape again, however it was phrased, is free. An
    /// extent outside the domain resolves to an empty window rather
    /// than failing.
    pub fn window(&mut self, selector: &Selector) -> Rc<WindowGrid> {
        let key = selector.structural_hash();
        if let Some(window) = self.window_cache.get(key) {
            return window;
        }

        let (left, right) = resolve(selector, &self.base);
        let frac = self.base.transform.pixel_window(left, right);
        let pixels = frac.round(Rounding::Trimmed);
        let transform = self
            .base
            .transform
            .for_window(pixels.col_off as f64, pixels.row_off as f64);
        debug!(
            ?left,
            ?right,
            width = pixels.width,
            height = pixels.height,
            "resolved selection window"
        );

        let snapshot = GridSnapshot {
            crs: self.base.crs.clone(),
            transform,
            width: pixels.width,
            height: pixels.height,
            left_edge: left,
            right_edge: right,
            resolution: self.base.resolution,
            flip: self.base.flip,
        };
        let window = Rc::new(WindowGrid::new(
            snapshot,
            selector.clone(),
            key,
            Rc::clone(&self.fields),
        ));
        self.window_cache.insert(key, Rc::clone(&window));
        window
    }

    /// Reads one field over a selector.
    ///
    /// The buffer has the resolved window's shape, ascending orientation,
    /// and the selection mask applied: pixels the selector excludes hold
    /// the buffer's fill value. Unknown field names fail before any I/O.
    pub fn read(&mut self, selector: &Selector, field: &str) -> Result<FieldBuffer> {
        if !self.fields.contains(field) {
            return Err(MosaicError::unknown_field(field));
        }
        let window = self.window(selector);
        self.read_on_window(&window, field)
    }

    /// Reads one field over an already-resolved window.
    pub fn read_on_window(&mut self, window: &WindowGrid, field: &str) -> Result<FieldBuffer> {
        if !self.fields.contains(field) {
            return Err(MosaicError::unknown_field(field));
        }

        let key = window.selector_hash();
        if let Some(buffer) = self.value_cache.get(key, field) {
            debug!(field, "field value served from cache");
            return Ok(buffer);
        }

        let buffer = self.compute_field(window, field)?;
        if self.value_cache.is_enabled() {
            self.value_cache.insert(key, field, buffer.clone());
        }
        Ok(buffer)
    }

    /// Reads several fields over one selector.
    ///
    /// Fields are independent: one failing read leaves the others
    /// untouched, so the result carries one `Result` per requested field.
    pub fn read_many(
        &mut self,
        selector: &Selector,
        fields: &[&str],
    ) -> Vec<(String, Result<FieldBuffer>)> {
        let window = self.window(selector);
        fields
            .iter()
            .map(|field| ((*field).to_string(), self.read_on_window(&window, field)))
            .collect()
    }

    fn compute_field(&mut self, window: &WindowGrid, field: &str) -> Result<FieldBuffer> {
        let fields = Rc::clone(&self.fields);

        if let Some(source_field) = fields.source(field) {
            let mut buffer = sampler::read_field(
                &self.base,
                window.left_edge(),
                window.right_edge(),
                &source_field.source,
                self.config.resampling,
            )?;
            if buffer.shape() == window.shape() {
                buffer.apply_mask(&mask::selection_mask(window.selector(), window));
            } else {
                warn!(
                    field,
                    expected = ?window.shape(),
                    produced = ?buffer.shape(),
                    "read buffer does not match the window shape, skipping mask"
                );
            }
            return Ok(buffer);
        }

        if let Some(derived) = fields.derived(field) {
            let mut inputs = Vec::with_capacity(derived.inputs.len());
            for input in &derived.inputs {
                inputs.push(self.read_on_window(window, input)?);
            }
            let data = (derived.compute)(&inputs);
            let (width, height) = window.shape();
            if data.len() != width * height {
                return Err(MosaicError::dimension_mismatch((width, height), data.len()));
            }
            let mut buffer = FieldBuffer::new(data, width, height, f64::NAN);
            buffer.apply_mask(&mask::selection_mask(window.selector(), window));
            return Ok(buffer);
        }

        Err(MosaicError::unknown_field(field))
    }

    /// Registers a field computed from other fields' buffers.
    ///
    /// The closure receives the input buffers in declaration order, all
    /// masked to the selection, and returns row-major values for the
    /// same window; missing pixels in its output should be NaN. The new
    /// field is keyed by `descriptor.name` and becomes readable through
    /// every window, including ones resolved before this call.
    pub fn add_derived_field<F>(
        &self,
        descriptor: FieldDescriptor,
        inputs: Vec<String>,
        compute: F,
    ) -> Result<()>
    where
        F: Fn(&[FieldBuffer]) -> Vec<f64> + 'static,
    {
        self.fields.add_derived(
            descriptor.name.clone(),
            DerivedField {
                descriptor,
                inputs,
                compute: Rc::new(compute),
            },
        )
    }

    /// Per-pixel inclusion mask of a window's selector.
    pub fn selection_mask(&self, window: &WindowGrid) -> Mask {
        mask::selection_mask(window.selector(), window)
    }

    /// The polygon coverage mask of a window.
    ///
    /// For windows resolved from a polygon selector this is the
    /// rasterized region; for box and disk windows there is no polygon
    /// to restrict by, so every pixel is included.
    pub fn fill_mask(&self, window: &WindowGrid) -> Mask {
        match window.selector() {
            Selector::Polygon(_) => mask::selection_mask(window.selector(), window),
            _ => Mask::filled(window.width(), window.height(), true),
        }
    }

    /// Loads a polygon selector from a GeoJSON file, reprojecting its
    /// rings into the domain CRS.
    pub fn polygon_selector(&self, path: &Path) -> Result<Selector> {
        Selector::polygon_from_file(path, &self.base.crs)
    }

    /// The domain grid every query is answered on.
    pub fn domain(&self) -> &GridSnapshot {
        &self.base
    }

    pub fn crs(&self) -> &Crs {
        &self.base.crs
    }

    pub fn resolution(&self) -> (f64, f64) {
        self.base.resolution
    }

    /// Domain pixel dimensions.
    pub fn shape(&self) -> (usize, usize) {
        self.base.shape()
    }

    /// Domain extent as (left_edge, right_edge), the default viewport
    /// for plotting.
    pub fn bounding_box(&self) -> ((f64, f64), (f64, f64)) {
        (self.base.left_edge, self.base.right_edge)
    }

    /// All field names, in registration order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.names()
    }

    /// The descriptor of a field, if it exists.
    pub fn descriptor(&self, field: &str) -> Option<FieldDescriptor> {
        self.fields.descriptor(field)
    }

    pub fn config(&self) -> &MosaicConfig {
        &self.config
    }

    pub fn window_cache_stats(&self) -> CacheStats {
        self.window_cache.stats()
    }

    pub fn value_cache_stats(&self) -> CacheStats {
        self.value_cache.stats()
    }

    /// Drops every cached field value. Callers mutate source files at
    /// their own risk; this is the invalidation hook.
    pub fn clear_value_cache(&mut self) {
        self.value_cache.clear();
    }
}

impl std::fmt::Debug for Mosaic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mosaic")
            .field("base", &self.base)
            .field("fields", &self.fields.names())
            .finish_non_exhaustive()
    }
}

fn source_crs(meta: &RasterMeta, override_text: Option<&str>, path: &Path) -> Result<Crs> {
    if let Some(code) = meta.epsg {
        match Crs::from_epsg(code) {
            Ok(crs) => return Ok(crs),
            Err(e) => warn!(path = %path.display(), code, error = %e, "EPSG code not usable"),
        }
    }
    if let Some(text) = &meta.crs_text {
        match Crs::parse(text) {
            Ok(crs) => return Ok(crs),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "source CRS text is unparseable")
            }
        }
    }
    if let Some(text) = override_text {
        return Ok(Crs::parse(text)?);
    }
    Err(MosaicError::configuration(format!(
        "{}: no parseable CRS and no override configured",
        path.display()
    )))
}

fn resolve_nodata(override_value: Option<f64>, declared: Option<f64>, path: &Path) -> f64 {
    match (override_value, declared) {
        (Some(overriding), Some(declared)) => {
            if overriding != declared {
                warn!(
                    path = %path.display(),
                    declared,
                    using = overriding,
                    "nodata override replaces the declared value"
                );
            }
            overriding
        }
        (Some(overriding), None) => overriding,
        (None, Some(declared)) => declared,
        (None, None) => {
            warn!(path = %path.display(), "source declares no nodata, using NaN");
            f64::NAN
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "field".to_string())
}

fn default_field_name(stem: &str, band: usize, bands: usize) -> String {
    if bands == 1 {
        stem.to_string()
    } else {
        format!("{}_b{}", stem, band + 1)
    }
}

fn domain_snapshot(meta: &RasterMeta, crs: &Crs, transform: &GeoTransform) -> GridSnapshot {
    let (w, h) = (meta.width as f64, meta.height as f64);
    let corners = [
        transform.apply(0.0, 0.0),
        transform.apply(w, 0.0),
        transform.apply(0.0, h),
        transform.apply(w, h),
    ];
    let mut left = (f64::INFINITY, f64::INFINITY);
    let mut right = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for (x, y) in corners {
        left.0 = left.0.min(x);
        left.1 = left.1.min(y);
        right.0 = right.0.max(x);
        right.1 = right.1.max(y);
    }

    GridSnapshot {
        crs: crs.clone(),
        transform: *transform,
        width: meta.width,
        height: meta.height,
        left_edge: left,
        right_edge: right,
        resolution: transform.resolution(),
        flip: transform.flip_axes(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{create_test_grid, write_bands, write_raster, NODATA};

    fn write_alpha(dir: &Path) -> PathBuf {
        let path = dir.join("alpha.tif");
        let data = create_test_grid(60, 60);
        write_raster(&path, 60, 60, (500_000.0, 5_000_000.0), 20.0, 32633, Some(NODATA), &data)
            .unwrap();
        path
    }

    #[test]
    fn test_load_names_fields_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_alpha(dir.path());

        let mosaic = Mosaic::load(&[path]).unwrap();
        assert_eq!(mosaic.field_names(), vec!["alpha".to_string()]);
        assert_eq!(mosaic.shape(), (60, 60));
        assert_eq!(mosaic.resolution(), (20.0, 20.0));
        assert_eq!(mosaic.crs().epsg(), Some(32633));
        assert_eq!(
            mosaic.bounding_box(),
            ((500_000.0, 4_998_800.0), (501_200.0, 5_000_000.0))
        );

        let descriptor = mosaic.descriptor("alpha").unwrap();
        assert_eq!(descriptor.kind, "alpha");
        assert_eq!(descriptor.units, "metre");
        assert!(!descriptor.take_log);
    }

    #[test]
    fn test_load_multiband_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pair.tif");
        let b1 = create_test_grid(8, 8);
        let b2 = vec![1.0; 64];
        write_bands(
            &path,
            8,
            8,
            (500_000.0, 5_000_000.0),
            20.0,
            32633,
            Some(NODATA),
            &[&b1, &b2],
        )
        .unwrap();

        let mosaic = Mosaic::load(&[path]).unwrap();
        assert_eq!(
            mosaic.field_names(),
            vec!["pair_b1".to_string(), "pair_b2".to_string()]
        );
    }

    #[test]
    fn test_load_empty_paths_fails() {
        let paths: [PathBuf; 0] = [];
        let err = Mosaic::load(&paths).unwrap_err();
        assert!(matches!(err, MosaicError::Configuration(_)));
    }

    #[test]
    fn test_unknown_field_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let mut mosaic = Mosaic::load(&[write_alpha(dir.path())]).unwrap();

        let selector = Selector::rectangle((500_400.0, 4_999_000.0), (500_900.0, 4_999_500.0));
        let err = mosaic.read(&selector, "nope").unwrap_err();
        assert!(matches!(err, MosaicError::UnknownField(name) if name == "nope"));
        // Nothing was resolved on the way to the failure
        assert_eq!(mosaic.window_cache_stats().entries, 0);
    }

    #[test]
    fn test_window_cache_reuses_equivalent_selectors() {
        let dir = tempfile::tempdir().unwrap();
        let mut mosaic = Mosaic::load(&[write_alpha(dir.path())]).unwrap();

        let by_edges = Selector::rectangle((500_400.0, 4_999_000.0), (500_900.0, 4_999_500.0));
        let by_center =
            Selector::rectangle_from_center((500_650.0, 4_999_250.0), (500.0, 500.0));

        let w1 = mosaic.window(&by_edges);
        let w2 = mosaic.window(&by_center);
        assert!(Rc::ptr_eq(&w1, &w2));
        assert_eq!(mosaic.window_cache_stats().hits, 1);
        assert_eq!(w1.shape(), (25, 25));
    }

    #[test]
    fn test_read_aligned_box() {
        let dir = tempfile::tempdir().unwrap();
        let mut mosaic = Mosaic::load(&[write_alpha(dir.path())]).unwrap();

        let selector = Selector::rectangle((500_400.0, 4_999_000.0), (500_900.0, 4_999_500.0));
        let buffer = mosaic.read(&selector, "alpha").unwrap();
        assert_eq!(buffer.shape(), (25, 25));
        assert_eq!(buffer.get(0, 0), Some(20_049.0));
        assert_eq!(buffer.count_valid(), 625);
    }

    #[test]
    fn test_read_disk_masks_corners() {
        let dir = tempfile::tempdir().unwrap();
        let mut mosaic = Mosaic::load(&[write_alpha(dir.path())]).unwrap();

        let selector = Selector::disk((500_600.0, 4_999_200.0), 200.0);
        let buffer = mosaic.read(&selector, "alpha").unwrap();
        let window = mosaic.window(&selector);

        assert_eq!(buffer.shape(), (20, 20));
        // Corner centers sit further than 200 m from the disk center
        assert_eq!(buffer.get(0, 0), Some(NODATA));
        assert_eq!(buffer.get(19, 19), Some(NODATA));
        assert_eq!(
            buffer.count_valid(),
            mosaic.selection_mask(&window).count()
        );
        assert!(buffer.count_valid() > 0);
    }

    #[test]
    fn test_outside_domain_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut mosaic = Mosaic::load(&[write_alpha(dir.path())]).unwrap();

        let selector = Selector::rectangle((600_000.0, 4_999_000.0), (601_000.0, 4_999_500.0));
        let buffer = mosaic.read(&selector, "alpha").unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_derived_field_reads_and_checks_shape() {
        let dir = tempfile::tempdir().unwrap();
        let mut mosaic = Mosaic::load(&[write_alpha(dir.path())]).unwrap();

        mosaic
            .add_derived_field(
                FieldDescriptor {
                    kind: "derived".to_string(),
                    name: "alpha_double".to_string(),
                    units: "metre".to_string(),
                    take_log: false,
                },
                vec!["alpha".to_string()],
                |inputs| inputs[0].data.iter().map(|v| v * 2.0).collect(),
            )
            .unwrap();

        let selector = Selector::rectangle((500_400.0, 4_999_000.0), (500_900.0, 4_999_500.0));
        let buffer = mosaic.read(&selector, "alpha_double").unwrap();
        assert_eq!(buffer.get(0, 0), Some(40_098.0));

        mosaic
            .add_derived_field(
                FieldDescriptor {
                    kind: "derived".to_string(),
                    name: "broken".to_string(),
                    units: "metre".to_string(),
                    take_log: false,
                },
                vec!["alpha".to_string()],
                |_| vec![0.0; 3],
            )
            .unwrap();
        let err = mosaic.read(&selector, "broken").unwrap_err();
        assert!(matches!(
            err,
            MosaicError::DimensionMismatch { expected: (25, 25), produced: 3 }
        ));
    }

    #[test]
    fn test_missing_nodata_falls_back_to_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bare.tif");
        let data = create_test_grid(8, 8);
        write_raster(&path, 8, 8, (500_000.0, 5_000_000.0), 20.0, 32633, None, &data).unwrap();

        let mut mosaic = Mosaic::load(&[path]).unwrap();
        let selector = Selector::rectangle((500_000.0, 4_999_840.0), (500_160.0, 5_000_000.0));
        let buffer = mosaic.read(&selector, "bare").unwrap();
        assert!(buffer.fill.is_nan());
        assert_eq!(buffer.count_valid(), 64);
    }

    #[test]
    fn test_nodata_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_alpha(dir.path());

        let config = MosaicConfig {
            nodata_override: Some(-5.0),
            ..Default::default()
        };
        let mut mosaic = Mosaic::load_with(&[path], config).unwrap();
        let selector = Selector::rectangle((500_400.0, 4_999_000.0), (500_900.0, 4_999_500.0));
        let buffer = mosaic.read(&selector, "alpha").unwrap();
        assert_eq!(buffer.fill, -5.0);
    }

    #[test]
    fn test_fill_mask_is_all_true_for_box_windows() {
        let dir = tempfile::tempdir().unwrap();
        let mut mosaic = Mosaic::load(&[write_alpha(dir.path())]).unwrap();

        let selector = Selector::rectangle((500_400.0, 4_999_000.0), (500_900.0, 4_999_500.0));
        let window = mosaic.window(&selector);
        let mask = mosaic.fill_mask(&window);
        assert_eq!(mask.count(), 625);
    }
}
