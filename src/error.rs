use std::path::PathBuf;

use chrono::NaiveDate;

/// Errors raised while decoding a raw MPL record.
///
/// A truncated record is not an error: the reader reports it as the end of
/// the input file (see [`crate::record::ReadOutcome`]).
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("I/O error while reading record: {0}")]
    Io(#[from] std::io::Error),

    /// Software version below the oldest layout this decoder understands.
    #[error("unsupported MPL software version {version} (minimum is {minimum})")]
    UnsupportedVersion { version: i16, minimum: i16 },

    #[error("declared bin count {0} is outside 1..={max}", max = crate::record::MAX_BIN_COUNT)]
    BinCount(i64),

    #[error("record timestamp {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02} is not a valid date")]
    InvalidTimestamp {
        year: i32,
        month: i64,
        day: i64,
        hour: i64,
        minute: i64,
        second: i64,
    },

    #[error("range gate altitude {0} km is not positive")]
    RangeGate(f64),
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors raised by an archive store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unable to create {path}: {reason}")]
    Create { path: PathBuf, reason: String },

    #[error("unable to open {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("unable to find the field `{0}` in the archive file")]
    MissingField(String),

    #[error("unable to find the dimension `{0}` in the archive file")]
    MissingDimension(String),

    #[error("unable to write {path} to disk: {reason}")]
    Sync { path: PathBuf, reason: String },

    #[error("field `{field}`: {reason}")]
    Access { field: String, reason: String },

    #[error("archive file is closed")]
    Closed,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while appending decoded records to day-files.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unable to open the input file {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("the height dimension changed on {date} (file has {stored} bins, record has {current})")]
    HeightCountMismatch {
        date: NaiveDate,
        stored: usize,
        current: usize,
    },

    #[error("the vertical resolution changed on {date} (file: {stored_m:.3} m, record: {current_m:.3} m)")]
    ResolutionMismatch {
        date: NaiveDate,
        stored_m: f64,
        current_m: f64,
    },

    #[error("no range bin of the record on {date} lies below the {ceiling_km} km ceiling")]
    EmptyHeightGrid { date: NaiveDate, ceiling_km: f64 },
}

impl IngestError {
    /// True for the schema-violation family of errors.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(
            self,
            IngestError::HeightCountMismatch { .. } | IngestError::ResolutionMismatch { .. }
        )
    }
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Errors raised while loading a site configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to read the site configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid site configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown site `{0}` (expected one of: {known})", known = crate::config::PRESETS.join(", "))]
    UnknownSite(String),

    #[error("invalid site configuration: {0}")]
    Invalid(String),
}
