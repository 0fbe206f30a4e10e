//! netCDF-backed archive store.

use std::path::{Path, PathBuf};

use super::{ArchiveHandle, ArchiveStore, DimSize, Schema, Value, VarType};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct NetcdfStore;

impl NetcdfStore {
    pub fn new() -> Self {
        Self
    }
}

fn access(field: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::Access {
        field: field.to_string(),
        reason: e.to_string(),
    }
}

fn rank_error(field: &str, rank: usize) -> StoreError {
    StoreError::Access {
        field: field.to_string(),
        reason: format!("rank {rank} access is not supported"),
    }
}

impl ArchiveStore for NetcdfStore {
    type Handle = NetcdfHandle;

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn create(&mut self, path: &Path, schema: &Schema) -> StoreResult<NetcdfHandle> {
        let create_error = |e: netcdf::Error| StoreError::Create {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let mut nc = netcdf::create(path).map_err(create_error)?;

        for dim in &schema.dimensions {
            let added = match dim.size {
                DimSize::Unlimited => nc.add_unlimited_dimension(&dim.name).map(|_| ()),
                DimSize::Fixed(len) => nc.add_dimension(&dim.name, len).map(|_| ()),
            };
            added.map_err(create_error)?;
        }

        for def in &schema.variables {
            let dims: Vec<&str> = def.dims.iter().map(String::as_str).collect();
            let mut var = match def.var_type {
                VarType::Int => nc.add_variable::<i32>(&def.name, &dims),
                VarType::Float => nc.add_variable::<f32>(&def.name, &dims),
                VarType::Double => nc.add_variable::<f64>(&def.name, &dims),
            }
            .map_err(create_error)?;
            if let (VarType::Float, Some(fill)) = (def.var_type, def.fill_value) {
                var.set_fill_value(fill).map_err(create_error)?;
            }
            for (key, value) in &def.attributes {
                var.put_attribute(key, value.as_str())
                    .map_err(create_error)?;
            }
        }

        for (key, value) in &schema.global_attributes {
            nc.add_attribute(key, value.as_str())
                .map_err(create_error)?;
        }

        Ok(NetcdfHandle {
            path: path.to_path_buf(),
            file: nc,
        })
    }

    fn open(&mut self, path: &Path) -> StoreResult<NetcdfHandle> {
        let nc = netcdf::append(path).map_err(|e| StoreError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(NetcdfHandle {
            path: path.to_path_buf(),
            file: nc,
        })
    }
}

pub struct NetcdfHandle {
    path: PathBuf,
    file: netcdf::FileMut,
}

impl NetcdfHandle {
    fn variable_mut(&mut self, field: &str) -> StoreResult<netcdf::VariableMut<'_>> {
        self.file
            .variable_mut(field)
            .ok_or_else(|| StoreError::MissingField(field.to_string()))
    }

    fn variable(&self, field: &str) -> StoreResult<netcdf::Variable<'_>> {
        self.file
            .variable(field)
            .ok_or_else(|| StoreError::MissingField(field.to_string()))
    }
}

impl ArchiveHandle for NetcdfHandle {
    fn path(&self) -> &Path {
        &self.path
    }

    fn dimension_len(&self, name: &str) -> StoreResult<usize> {
        self.file
            .dimension(name)
            .map(|d| d.len())
            .ok_or_else(|| StoreError::MissingDimension(name.to_string()))
    }

    fn write_scalar(&mut self, field: &str, index: &[usize], value: Value) -> StoreResult<()> {
        let mut var = self.variable_mut(field)?;
        let written = match (index, value) {
            ([], Value::Int(v)) => var.put_value(v, ..),
            ([], Value::Float(v)) => var.put_value(v, ..),
            ([], Value::Double(v)) => var.put_value(v, ..),
            (&[i], Value::Int(v)) => var.put_value(v, (i,)),
            (&[i], Value::Float(v)) => var.put_value(v, (i,)),
            (&[i], Value::Double(v)) => var.put_value(v, (i,)),
            _ => return Err(rank_error(field, index.len())),
        };
        written.map_err(|e| access(field, e))
    }

    fn write_slice(
        &mut self,
        field: &str,
        start: &[usize],
        count: &[usize],
        data: &[f32],
    ) -> StoreResult<()> {
        let mut var = self.variable_mut(field)?;
        let written = match (start, count) {
            (&[s], &[c]) => var.put_values(data, (&[s], &[c])),
            (&[s0, s1], &[c0, c1]) => var.put_values(data, (&[s0, s1], &[c0, c1])),
            _ => return Err(rank_error(field, start.len())),
        };
        written.map_err(|e| access(field, e))
    }

    fn read_scalar(&self, field: &str, index: &[usize]) -> StoreResult<f64> {
        let var = self.variable(field)?;
        let value = match index {
            [] => var.get_value::<f64, _>(..),
            &[i] => var.get_value::<f64, _>((i,)),
            _ => return Err(rank_error(field, index.len())),
        };
        value.map_err(|e| access(field, e))
    }

    fn read_slice(&self, field: &str, start: &[usize], count: &[usize]) -> StoreResult<Vec<f32>> {
        let var = self.variable(field)?;
        let values = match (start, count) {
            (&[s], &[c]) => var.get_values::<f32, _>((&[s], &[c])),
            (&[s0, s1], &[c0, c1]) => var.get_values::<f32, _>((&[s0, s1], &[c0, c1])),
            _ => return Err(rank_error(field, start.len())),
        };
        values.map_err(|e| access(field, e))
    }

    /// `nc_sync`: pushes buffered data and the grown `time` dimension to disk.
    fn flush(&mut self) -> StoreResult<()> {
        self.file.sync().map_err(|e| StoreError::Sync {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn close(self) -> StoreResult<()> {
        drop(self.file);
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
            .dimension("height", DimSize::Fixed(4))
            .variable("base_time", VarType::Double, &[], &[("units", "seconds")])
            .variable("hour", VarType::Float, &["time"], &[("units", "UTC")])
            .variable("background", VarType::Float, &["time"], &[])
            .fill_value("background", -9_999.0)
            .variable("height", VarType::Float, &["height"], &[])
            .variable("backscatter", VarType::Float, &["time", "height"], &[])
            .global("comment", "netcdf store test");
        schema
    }

    #[test]
    fn create_write_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.a1.20240101.000000.cdf");
        let mut store = NetcdfStore::new();
        assert!(!store.exists(&path));

        let mut handle = store.create(&path, &schema()).unwrap();
        handle
            .write_scalar("base_time", &[], Value::Double(1_704_067_200.0))
            .unwrap();
        handle
            .write_slice("height", &[0], &[4], &[0.0, 0.03, 0.06, 0.09])
            .unwrap();
        handle.write_scalar("hour", &[0], Value::Float(0.5)).unwrap();
        handle
            .write_slice("backscatter", &[0, 0], &[1, 4], &[1.0, 2.0, 3.0, 4.0])
            .unwrap();
        handle.flush().unwrap();
        handle.close().unwrap();

        assert!(store.exists(&path));
        let handle = store.open(&path).unwrap();
        assert_eq!(handle.dimension_len("time").unwrap(), 1);
        assert_eq!(handle.dimension_len("height").unwrap(), 4);
        assert_eq!(handle.read_scalar("base_time", &[]).unwrap(), 1_704_067_200.0);
        assert_eq!(handle.read_scalar("hour", &[0]).unwrap(), 0.5);
        assert_eq!(handle.read_scalar("background", &[0]).unwrap(), -9_999.0);
        assert_eq!(
            handle.read_slice("backscatter", &[0, 1], &[1, 2]).unwrap(),
            vec![2.0, 3.0]
        );
        assert!(matches!(
            handle.read_scalar("missing", &[0]),
            Err(StoreError::MissingField(_))
        ));
    }
}
