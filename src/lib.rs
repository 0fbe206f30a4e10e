//! Raw Micropulse Lidar (MPL) records to daily netCDF files.
//!
//! Records are decoded by [`record`], routed to the day-file of their UTC
//! date by [`dayfile`] and appended by [`writer`]. [`ingest::IngestContext`]
//! ties these together for one run over a list of raw files.

pub mod config;
pub mod dayfile;
pub mod error;
pub mod height;
pub mod ingest;
pub mod record;
pub mod schema;
pub mod store;
pub mod swap;
pub mod writer;

pub use config::SiteConfig;
pub use error::{ConfigError, DecodeError, IngestError, StoreError};
pub use ingest::{Disposition, IngestContext, IngestStats};
pub use record::{RawHeader, RawSample, Record, RecordFormat, RecordReader};
