//! Archive store contract.
//!
//! Day-files are written through these traits only. A store resolves field
//! and dimension names; the ingest core never touches a storage engine.

pub mod memory;
#[cfg(feature = "netcdf")]
pub mod netcdf;

use std::path::Path;

use crate::error::StoreResult;

pub use memory::{MemoryHandle, MemoryStore};
#[cfg(feature = "netcdf")]
pub use self::netcdf::{NetcdfHandle, NetcdfStore};

/// Element type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Int,
    Float,
    Double,
}

/// A single value written to a variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    Double(f64),
}

impl Value {
    pub fn as_f64(self) -> f64 {
        match self {
            Value::Int(v) => f64::from(v),
            Value::Float(v) => f64::from(v),
            Value::Double(v) => v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimSize {
    Unlimited,
    Fixed(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimensionDef {
    pub name: String,
    pub size: DimSize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub name: String,
    pub var_type: VarType,
    pub dims: Vec<String>,
    pub attributes: Vec<(String, String)>,
    /// Value unwritten elements read back as.
    pub fill_value: Option<f32>,
}

/// Layout of a new archive file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub dimensions: Vec<DimensionDef>,
    pub variables: Vec<VariableDef>,
    pub global_attributes: Vec<(String, String)>,
}

impl Schema {
    pub fn dimension(&mut self, name: &str, size: DimSize) -> &mut Self {
        self.dimensions.push(DimensionDef {
            name: name.to_string(),
            size,
        });
        self
    }

    pub fn variable(
        &mut self,
        name: &str,
        var_type: VarType,
        dims: &[&str],
        attributes: &[(&str, &str)],
    ) -> &mut Self {
        self.variables.push(VariableDef {
            name: name.to_string(),
            var_type,
            dims: dims.iter().map(|d| d.to_string()).collect(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            fill_value: None,
        });
        self
    }

    /// Sets the fill value of the float variable `name`.
    pub fn fill_value(&mut self, name: &str, value: f32) -> &mut Self {
        if let Some(var) = self.variables.iter_mut().find(|v| v.name == name) {
            var.fill_value = Some(value);
        }
        self
    }

    pub fn global(&mut self, name: &str, value: &str) -> &mut Self {
        self.global_attributes
            .push((name.to_string(), value.to_string()));
        self
    }

    pub fn find_variable(&self, name: &str) -> Option<&VariableDef> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn global_attribute(&self, name: &str) -> Option<&str> {
        self.global_attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Creates and opens archive files.
pub trait ArchiveStore {
    type Handle: ArchiveHandle;

    fn exists(&self, path: &Path) -> bool;

    /// Create (or replace) `path` with `schema`, open for writing.
    fn create(&mut self, path: &Path, schema: &Schema) -> StoreResult<Self::Handle>;

    /// Open an existing file for appending.
    fn open(&mut self, path: &Path) -> StoreResult<Self::Handle>;
}

/// An open archive file.
///
/// `index` and `start` hold one entry per variable dimension; scalars take an
/// empty index.
pub trait ArchiveHandle {
    fn path(&self) -> &Path;

    /// Current length of a dimension; for the unlimited dimension this is the
    /// number of records written so far.
    fn dimension_len(&self, name: &str) -> StoreResult<usize>;

    fn write_scalar(&mut self, field: &str, index: &[usize], value: Value) -> StoreResult<()>;

    fn write_slice(
        &mut self,
        field: &str,
        start: &[usize],
        count: &[usize],
        data: &[f32],
    ) -> StoreResult<()>;

    fn read_scalar(&self, field: &str, index: &[usize]) -> StoreResult<f64>;

    fn read_slice(&self, field: &str, start: &[usize], count: &[usize]) -> StoreResult<Vec<f32>>;

    /// Make everything written so far durable.
    fn flush(&mut self) -> StoreResult<()>;

    fn close(self) -> StoreResult<()>
    where
        Self: Sized;
}
