//! In-memory archive store.
//!
//! Backs `--dry-run` and the test suite. Files live as long as the store (and
//! its clones, which share the same files), so several ingest runs against one
//! store behave like consecutive invocations against one directory.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::{ArchiveHandle, ArchiveStore, DimSize, Schema, Value, VarType, VariableDef};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone)]
struct MemoryVariable {
    def: VariableDef,
    values: BTreeMap<Vec<usize>, f64>,
}

#[derive(Debug, Clone)]
struct MemoryFile {
    schema: Schema,
    /// Current length of every dimension.
    dims: HashMap<String, usize>,
    variables: HashMap<String, MemoryVariable>,
    flushes: usize,
}

impl MemoryFile {
    fn new(schema: &Schema) -> Self {
        let dims = schema
            .dimensions
            .iter()
            .map(|d| {
                let len = match d.size {
                    DimSize::Unlimited => 0,
                    DimSize::Fixed(n) => n,
                };
                (d.name.clone(), len)
            })
            .collect();
        let variables = schema
            .variables
            .iter()
            .map(|def| {
                let var = MemoryVariable {
                    def: def.clone(),
                    values: BTreeMap::new(),
                };
                (def.name.clone(), var)
            })
            .collect();
        Self {
            schema: schema.clone(),
            dims,
            variables,
            flushes: 0,
        }
    }

    fn dimension_len(&self, name: &str) -> StoreResult<usize> {
        self.dims
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::MissingDimension(name.to_string()))
    }

    fn is_unlimited(&self, name: &str) -> bool {
        self.schema
            .dimensions
            .iter()
            .any(|d| d.name == name && d.size == DimSize::Unlimited)
    }

    fn variable(&self, field: &str) -> StoreResult<&MemoryVariable> {
        self.variables
            .get(field)
            .ok_or_else(|| StoreError::MissingField(field.to_string()))
    }

    fn check_index(&self, field: &str, index: &[usize], writing: bool) -> StoreResult<()> {
        let def = &self.variable(field)?.def;
        if def.dims.len() != index.len() {
            return Err(StoreError::Access {
                field: field.to_string(),
                reason: format!("expected {} indices, got {}", def.dims.len(), index.len()),
            });
        }
        for (dim, &i) in def.dims.iter().zip(index) {
            let len = self.dimension_len(dim)?;
            let growable = writing && self.is_unlimited(dim);
            if i >= len && !growable {
                return Err(StoreError::Access {
                    field: field.to_string(),
                    reason: format!("index {i} is out of bounds for dimension `{dim}` of length {len}"),
                });
            }
        }
        Ok(())
    }

    fn put(&mut self, field: &str, index: Vec<usize>, value: f64) -> StoreResult<()> {
        self.check_index(field, &index, true)?;
        let var = self
            .variables
            .get_mut(field)
            .ok_or_else(|| StoreError::MissingField(field.to_string()))?;
        let stored = match var.def.var_type {
            VarType::Int => f64::from(value as i32),
            VarType::Float => f64::from(value as f32),
            VarType::Double => value,
        };
        for (dim, &i) in var.def.dims.iter().zip(&index) {
            if let Some(len) = self.dims.get_mut(dim) {
                *len = (*len).max(i + 1);
            }
        }
        var.values.insert(index, stored);
        Ok(())
    }

    /// Unwritten elements read back as the variable's fill value, or NaN
    /// when it has none.
    fn get(&self, field: &str, index: &[usize]) -> StoreResult<f64> {
        self.check_index(field, index, false)?;
        let var = self.variable(field)?;
        let fill = var.def.fill_value.map_or(f64::NAN, f64::from);
        Ok(var.values.get(index).copied().unwrap_or(fill))
    }
}

/// Row-major positions of the hyperslab `start .. start + count`.
fn hyperslab(start: &[usize], count: &[usize]) -> Vec<Vec<usize>> {
    let mut positions = vec![Vec::with_capacity(start.len())];
    for (&s, &c) in start.iter().zip(count) {
        positions = positions
            .into_iter()
            .flat_map(|prefix| {
                (s..s + c).map(move |i| {
                    let mut p = prefix.clone();
                    p.push(i);
                    p
                })
            })
            .collect();
    }
    positions
}

type Files = Rc<RefCell<HashMap<PathBuf, MemoryFile>>>;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: Files,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of all files in the store, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.files.borrow().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Number of flushes issued against `path`.
    pub fn flush_count(&self, path: &Path) -> Option<usize> {
        self.files.borrow().get(path).map(|f| f.flushes)
    }

    pub fn global_attribute(&self, path: &Path, name: &str) -> Option<String> {
        self.files
            .borrow()
            .get(path)
            .and_then(|f| f.schema.global_attribute(name).map(str::to_string))
    }
}

impl ArchiveStore for MemoryStore {
    type Handle = MemoryHandle;

    fn exists(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path)
    }

    fn create(&mut self, path: &Path, schema: &Schema) -> StoreResult<MemoryHandle> {
        for var in &schema.variables {
            if let Some(dim) = var
                .dims
                .iter()
                .find(|d| !schema.dimensions.iter().any(|def| &def.name == *d))
            {
                return Err(StoreError::Create {
                    path: path.to_path_buf(),
                    reason: format!("variable `{}` uses undefined dimension `{dim}`", var.name),
                });
            }
        }
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), MemoryFile::new(schema));
        Ok(MemoryHandle {
            path: path.to_path_buf(),
            files: Rc::clone(&self.files),
        })
    }

    fn open(&mut self, path: &Path) -> StoreResult<MemoryHandle> {
        if !self.exists(path) {
            return Err(StoreError::Open {
                path: path.to_path_buf(),
                reason: "no such file".to_string(),
            });
        }
        Ok(MemoryHandle {
            path: path.to_path_buf(),
            files: Rc::clone(&self.files),
        })
    }
}

#[derive(Debug)]
pub struct MemoryHandle {
    path: PathBuf,
    files: Files,
}

impl MemoryHandle {
    fn with_file<T>(&self, f: impl FnOnce(&MemoryFile) -> StoreResult<T>) -> StoreResult<T> {
        let files = self.files.borrow();
        let file = files.get(&self.path).ok_or(StoreError::Closed)?;
        f(file)
    }

    fn with_file_mut<T>(&mut self, f: impl FnOnce(&mut MemoryFile) -> StoreResult<T>) -> StoreResult<T> {
        let mut files = self.files.borrow_mut();
        let file = files.get_mut(&self.path).ok_or(StoreError::Closed)?;
        f(file)
    }
}

impl ArchiveHandle for MemoryHandle {
    fn path(&self) -> &Path {
        &self.path
    }

    fn dimension_len(&self, name: &str) -> StoreResult<usize> {
        self.with_file(|file| file.dimension_len(name))
    }

    fn write_scalar(&mut self, field: &str, index: &[usize], value: Value) -> StoreResult<()> {
        self.with_file_mut(|file| file.put(field, index.to_vec(), value.as_f64()))
    }

    fn write_slice(
        &mut self,
        field: &str,
        start: &[usize],
        count: &[usize],
        data: &[f32],
    ) -> StoreResult<()> {
        let positions = hyperslab(start, count);
        if positions.len() != data.len() || start.len() != count.len() {
            return Err(StoreError::Access {
                field: field.to_string(),
                reason: format!("slab holds {} values, got {}", positions.len(), data.len()),
            });
        }
        self.with_file_mut(|file| {
            for (position, &value) in positions.into_iter().zip(data) {
                file.put(field, position, f64::from(value))?;
            }
            Ok(())
        })
    }

    fn read_scalar(&self, field: &str, index: &[usize]) -> StoreResult<f64> {
        self.with_file(|file| file.get(field, index))
    }

    fn read_slice(&self, field: &str, start: &[usize], count: &[usize]) -> StoreResult<Vec<f32>> {
        self.with_file(|file| {
            hyperslab(start, count)
                .iter()
                .map(|position| file.get(field, position).map(|v| v as f32))
                .collect()
        })
    }

    fn flush(&mut self) -> StoreResult<()> {
        self.with_file_mut(|file| {
            file.flushes += 1;
            Ok(())
        })
    }

    fn close(self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        let mut schema = Schema::default();
        schema
            .dimension("time", DimSize::Unlimited)
            .dimension("height", DimSize::Fixed(3))
            .variable("hour", VarType::Float, &["time"], &[("units", "UTC")])
            .variable("slab", VarType::Float, &["time", "height"], &[])
            .variable("base", VarType::Int, &[], &[])
            .variable("bg", VarType::Float, &["time"], &[])
            .fill_value("bg", -9_999.0)
            .global("comment", "test");
        schema
    }

    #[test]
    fn unlimited_dimension_grows_with_writes() {
        let mut store = MemoryStore::new();
        let path = Path::new("a.cdf");
        let mut handle = store.create(path, &schema()).unwrap();
        assert_eq!(handle.dimension_len("time").unwrap(), 0);
        handle.write_scalar("hour", &[0], Value::Double(1.5)).unwrap();
        handle
            .write_slice("slab", &[1, 0], &[1, 3], &[1.0, 2.0, 3.0])
            .unwrap();
        assert_eq!(handle.dimension_len("time").unwrap(), 2);
        assert_eq!(handle.dimension_len("height").unwrap(), 3);
        assert_eq!(handle.read_slice("slab", &[1, 1], &[1, 2]).unwrap(), vec![2.0, 3.0]);
        assert!(handle.read_scalar("hour", &[1]).unwrap().is_nan());
        assert_eq!(handle.read_scalar("bg", &[1]).unwrap(), -9_999.0);
    }

    #[test]
    fn values_take_the_variable_type() {
        let mut store = MemoryStore::new();
        let mut handle = store.create(Path::new("a.cdf"), &schema()).unwrap();
        handle.write_scalar("base", &[], Value::Double(12.9)).unwrap();
        assert_eq!(handle.read_scalar("base", &[]).unwrap(), 12.0);
        handle
            .write_scalar("hour", &[0], Value::Double(1.0 / 3.0))
            .unwrap();
        assert_eq!(handle.read_scalar("hour", &[0]).unwrap(), f64::from(1.0f32 / 3.0));
    }

    #[test]
    fn fixed_dimension_is_bounded_and_fields_must_exist() {
        let mut store = MemoryStore::new();
        let mut handle = store.create(Path::new("a.cdf"), &schema()).unwrap();
        assert!(matches!(
            handle.write_slice("slab", &[0, 1], &[1, 3], &[0.0; 3]),
            Err(StoreError::Access { .. })
        ));
        assert!(matches!(
            handle.write_scalar("nope", &[0], Value::Int(1)),
            Err(StoreError::MissingField(_))
        ));
        assert!(matches!(
            handle.dimension_len("range"),
            Err(StoreError::MissingDimension(_))
        ));
    }

    #[test]
    fn reopened_files_share_contents() {
        let mut store = MemoryStore::new();
        let path = Path::new("day.cdf");
        assert!(store.open(path).is_err());
        let mut handle = store.create(path, &schema()).unwrap();
        handle.write_scalar("hour", &[0], Value::Float(0.25)).unwrap();
        handle.flush().unwrap();
        handle.close().unwrap();

        let mut clone = store.clone();
        let reopened = clone.open(path).unwrap();
        assert_eq!(reopened.read_scalar("hour", &[0]).unwrap(), 0.25);
        assert_eq!(store.flush_count(path), Some(1));
        assert_eq!(store.global_attribute(path, "comment").as_deref(), Some("test"));
    }

    #[test]
    fn hyperslab_is_row_major() {
        assert_eq!(
            hyperslab(&[1, 2], &[2, 2]),
            vec![vec![1, 2], vec![1, 3], vec![2, 2], vec![2, 3]]
        );
        assert_eq!(hyperslab(&[], &[]), vec![Vec::<usize>::new()]);
    }
}
