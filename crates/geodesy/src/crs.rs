//! CRS descriptions parsed from EPSG codes, definition strings, or
//! parameter dictionaries.

use crate::error::{GeodesyError, Result};

/// A coordinate reference system, held as a proj definition string with the
/// EPSG code preserved when one was given.
#[derive(Debug, Clone)]
pub struct Crs {
    epsg: Option<u32>,
    proj: String,
    geographic: bool,
}

impl Crs {
    /// Look up a CRS by EPSG code.
    pub fn from_epsg(code: u32) -> Result<Self> {
        let def = u16::try_from(code)
            .ok()
            .and_then(crs_definitions::from_code)
            .ok_or(GeodesyError::UnknownEpsg(code))?;
        Ok(Self {
            epsg: Some(code),
            geographic: def.proj4.contains("+proj=longlat"),
            proj: def.proj4.to_string(),
        })
    }

    /// Parse a CRS from a textual description.
    ///
    /// Accepts `"EPSG:32633"` (any case), a bare numeric code, or a proj
    /// definition string starting with `+`.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(GeodesyError::unparseable("empty CRS description"));
        }

        if let Some(code) = trimmed
            .strip_prefix("EPSG:")
            .or_else(|| trimmed.strip_prefix("epsg:"))
            .or_else(|| trimmed.strip_prefix("Epsg:"))
        {
            let code: u32 = code
                .trim()
                .parse()
                .map_err(|_| GeodesyError::unparseable(trimmed))?;
            return Self::from_epsg(code);
        }

        if trimmed.chars().all(|c| c.is_ascii_digit()) {
            let code: u32 = trimmed
                .parse()
                .map_err(|_| GeodesyError::unparseable(trimmed))?;
            return Self::from_epsg(code);
        }

        if trimmed.starts_with('+') {
            return Ok(Self {
                epsg: None,
                geographic: trimmed.contains("+proj=longlat"),
                proj: trimmed.to_string(),
            });
        }

        Err(GeodesyError::unparseable(trimmed))
    }

    /// Build a CRS from a proj parameter dictionary, e.g.
    /// `{"proj": "utm", "zone": 33, "datum": "WGS84"}`.
    ///
    /// String and numeric values become `+key=value` terms; a `true` value
    /// becomes a bare `+key` flag and `false` drops the key.
    pub fn from_params(params: &serde_json::Value) -> Result<Self> {
        let map = params
            .as_object()
            .ok_or_else(|| GeodesyError::invalid_params("expected a parameter object"))?;
        if !map.contains_key("proj") {
            return Err(GeodesyError::invalid_params("missing required key 'proj'"));
        }

        let mut terms = Vec::with_capacity(map.len());
        // proj4rs wants +proj first
        for (key, value) in std::iter::once(("proj", &map["proj"])).chain(
            map.iter()
                .filter(|(k, _)| *k != "proj")
                .map(|(k, v)| (k.as_str(), v)),
        ) {
            match value {
                serde_json::Value::Bool(true) => terms.push(format!("+{key}")),
                serde_json::Value::Bool(false) => {}
                serde_json::Value::String(s) => terms.push(format!("+{key}={s}")),
                serde_json::Value::Number(n) => terms.push(format!("+{key}={n}")),
                other => {
                    return Err(GeodesyError::invalid_params(format!(
                        "unsupported value for '{key}': {other}"
                    )))
                }
            }
        }

        Self::parse(&terms.join(" "))
    }

    /// The EPSG code, when this CRS was built from one.
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// The proj definition string.
    pub fn proj_string(&self) -> &str {
        &self.proj
    }

    /// Whether coordinates are geographic (longitude/latitude degrees).
    pub fn is_geographic(&self) -> bool {
        self.geographic
    }

    /// Name of the linear unit, when it can be determined from the
    /// definition. Projected definitions without a `+units` term default to
    /// metres, matching proj.
    pub fn linear_unit_name(&self) -> Option<&'static str> {
        if self.geographic {
            return Some("degree");
        }
        for term in self.proj.split_ascii_whitespace() {
            if let Some(unit) = term.strip_prefix("+units=") {
                return match unit {
                    "m" => Some("metre"),
                    "ft" => Some("foot"),
                    "us-ft" => Some("US survey foot"),
                    _ => None,
                };
            }
            if term.starts_with("+to_meter=") {
                return None;
            }
        }
        Some("metre")
    }

    fn sorted_terms(&self) -> Vec<&str> {
        let mut terms: Vec<&str> = self.proj.split_ascii_whitespace().collect();
        terms.sort_unstable();
        terms
    }
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool {
        match (self.epsg, other.epsg) {
            (Some(a), Some(b)) => a == b,
            // Definition strings are order-insensitive
            _ => self.sorted_terms() == other.sorted_terms(),
        }
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.epsg {
            Some(code) => write!(f, "EPSG:{code}"),
            None => write!(f, "{}", self.proj),
        }
    }
}
