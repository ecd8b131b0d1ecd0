//! Field identity and the registry mapping names to data sources.
//!
//! Every band of every source raster becomes a named field. Derived
//! fields compute their pixels from other fields' buffers. The registry
//! is shared between a mosaic and the window views it hands out, so a
//! view can always list what is readable through it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use geodesy::Crs;
use raster_io::RasterMeta;

use crate::error::{MosaicError, Result};
use crate::mask::Mask;
use crate::transform::GeoTransform;

/// Identity recorded per field, preserved through export sidecars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Source grouping, by default the originating file's stem.
    pub kind: String,
    /// The field's own name.
    pub name: String,
    /// Unit label, e.g. `"metre"`.
    pub units: String,
    /// Display hint: whether the field is best viewed in log scale.
    pub take_log: bool,
}

/// Where one source-backed field's pixels live.
#[derive(Debug, Clone)]
pub struct SourceRasterRef {
    pub meta: RasterMeta,
    /// Zero-based band index inside the file.
    pub band: usize,
    pub crs: Crs,
    pub transform: GeoTransform,
    /// Working fill value for reads of this source.
    pub nodata: f64,
}

/// A source-backed field: raster reference plus identity.
#[derive(Debug, Clone)]
pub struct SourceField {
    pub source: SourceRasterRef,
    pub descriptor: FieldDescriptor,
}

/// Signature of a derived-field computation.
///
/// Receives the input fields' buffers in declaration order and returns
/// row-major values for the same window.
pub type DeriveFn = dyn Fn(&[FieldBuffer]) -> Vec<f64>;

/// A field computed from other fields.
#[derive(Clone)]
pub struct DerivedField {
    pub descriptor: FieldDescriptor,
    /// Input field names, in the order the closure receives them.
    pub inputs: Vec<String>,
    pub compute: Rc<DeriveFn>,
}

impl std::fmt::Debug for DerivedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedField")
            .field("descriptor", &self.descriptor)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

/// A rectangular block of field values.
///
/// Rows are ordered by ascending world coordinate on both axes: row 0 is
/// the southernmost row of a north-up domain. Missing pixels hold `fill`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBuffer {
    pub data: Vec<f64>,
    pub width: usize,
    pub height: usize,
    /// Value standing in for missing pixels. May be NaN.
    pub fill: f64,
}

impl FieldBuffer {
    pub fn new(data: Vec<f64>, width: usize, height: usize, fill: f64) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self { data, width, height, fill }
    }

    /// A buffer holding only fill values.
    pub fn filled(width: usize, height: usize, fill: f64) -> Self {
        Self::new(vec![fill; width * height], width, height, fill)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value at (col, row), or None outside the buffer.
    pub fn get(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(self.data[row * self.width + col])
    }

    /// Whether a value counts as missing under this buffer's fill.
    pub fn is_missing(&self, value: f64) -> bool {
        if self.fill.is_nan() {
            value.is_nan()
        } else {
            value == self.fill
        }
    }

    /// Number of non-missing pixels.
    pub fn count_valid(&self) -> usize {
        self.data.iter().filter(|&&v| !self.is_missing(v)).count()
    }

    /// Writes fill into every pixel the mask excludes.
    pub fn apply_mask(&mut self, mask: &Mask) {
        debug_assert_eq!((mask.width, mask.height), (self.width, self.height));
        let n = self.data.len().min(mask.data.len());
        for i in 0..n {
            if !mask.data[i] {
                self.data[i] = self.fill;
            }
        }
    }
}

/// Name-to-field map shared by a mosaic and its window views.
///
/// Source fields are fixed at load time; derived fields may be added
/// later through a shared handle, which is why that half sits behind a
/// RefCell.
#[derive(Default)]
pub struct FieldRegistry {
    sources: BTreeMap<String, SourceField>,
    derived: RefCell<BTreeMap<String, DerivedField>>,
    /// Registration order, for stable listings.
    names: RefCell<Vec<String>>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source-backed field. Names must be unique.
    pub fn insert_source(&mut self, name: String, field: SourceField) -> Result<()> {
        if self.contains(&name) {
            return Err(MosaicError::configuration(format!(
                "duplicate field name: {name}"
            )));
        }
        self.names.borrow_mut().push(name.clone());
        self.sources.insert(name, field);
        Ok(())
    }

    /// Registers a derived field.
    ///
    /// Every input must already be registered, which also rules out
    /// dependency cycles.
    pub fn add_derived(&self, name: String, field: DerivedField) -> Result<()> {
        if self.contains(&name) {
            return Err(MosaicError::configuration(format!(
                "duplicate field name: {name}"
            )));
        }
        for input in &field.inputs {
            if !self.contains(input) {
                return Err(MosaicError::unknown_field(input.clone()));
            }
        }
        self.names.borrow_mut().push(name.clone());
        self.derived.borrow_mut().insert(name, field);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name) || self.derived.borrow().contains_key(name)
    }

    pub fn source(&self, name: &str) -> Option<&SourceField> {
        self.sources.get(name)
    }

    pub fn derived(&self, name: &str) -> Option<DerivedField> {
        self.derived.borrow().get(name).cloned()
    }

    /// The descriptor of any field, source-backed or derived.
    pub fn descriptor(&self, name: &str) -> Option<FieldDescriptor> {
        if let Some(field) = self.sources.get(name) {
            return Some(field.descriptor.clone());
        }
        self.derived.borrow().get(name).map(|d| d.descriptor.clone())
    }

    /// All field names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.names.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.names.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.borrow().is_empty()
    }
}
