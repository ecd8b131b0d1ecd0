//! Configuration for mosaic loading and queries.

use serde::{Deserialize, Serialize};

use crate::resample::ResamplingMethod;

/// Configuration for a mosaic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MosaicConfig {
    /// Resampling method used when a source's grid differs from the
    /// domain grid.
    pub resampling: ResamplingMethod,

    /// Number of resolved selection windows kept in the window cache.
    pub window_cache_capacity: usize,

    /// Keep read field buffers keyed by (window, field) for reuse.
    /// Invalidation is the caller's responsibility.
    pub cache_field_values: bool,

    /// CRS applied to source rasters that lack a parseable CRS, e.g.
    /// `"EPSG:32633"` or a proj string.
    pub crs_override: Option<String>,

    /// Nodata value applied to every source, replacing whatever the
    /// files declare.
    pub nodata_override: Option<f64>,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            resampling: ResamplingMethod::Nearest,
            window_cache_capacity: 4,
            cache_field_values: false,
            crs_override: None,
            nodata_override: None,
        }
    }
}

impl MosaicConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("MOSAIC_RESAMPLING") {
            config.resampling = ResamplingMethod::from_name(&val);
        }

        if let Ok(val) = std::env::var("MOSAIC_WINDOW_CACHE_CAPACITY") {
            if let Ok(capacity) = val.parse() {
                config.window_cache_capacity = capacity;
            }
        }

        if let Ok(val) = std::env::var("MOSAIC_CACHE_FIELD_VALUES") {
            config.cache_field_values = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("MOSAIC_CRS") {
            if !val.is_empty() {
                config.crs_override = Some(val);
            }
        }

        if let Ok(val) = std::env::var("MOSAIC_NODATA") {
            if let Ok(nodata) = val.parse() {
                config.nodata_override = Some(nodata);
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.window_cache_capacity == 0 {
            return Err("window_cache_capacity must be > 0".to_string());
        }

        if let Some(crs) = &self.crs_override {
            geodesy::Crs::parse(crs)
                .map_err(|e| format!("crs_override is not usable: {e}"))?;
        }

        if let Some(nodata) = self.nodata_override {
            if nodata.is_infinite() {
                return Err("nodata_override must be finite or NaN".to_string());
            }
        }

        Ok(())
    }
}
