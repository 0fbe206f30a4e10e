//! Day-file selection and validation.
//!
//! One archive file holds every sample of one UTC day. The first record of a
//! day creates it and fixes its height grid; later records, in this run or a
//! later one, must match that grid exactly.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tracing::{debug, info};

use crate::config::SiteConfig;
use crate::error::{IngestError, IngestResult};
use crate::height::HeightGrid;
use crate::record::RawHeader;
use crate::schema::{self, Field, HEIGHT_DIM, TIME_DIM};
use crate::store::{ArchiveHandle, ArchiveStore, Value};

/// An open day-file and the append state derived from it.
#[derive(Debug)]
pub struct DayFile<H> {
    date: NaiveDate,
    handle: H,
    next_index: usize,
    last_hour: Option<f32>,
    base_time: i64,
    grid_len: usize,
    step_km: f64,
    created: bool,
}

impl<H: ArchiveHandle> DayFile<H> {
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn path(&self) -> &Path {
        self.handle.path()
    }

    /// Index the next appended sample is written at.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// `hour` of the newest stored sample, `None` while the file is empty.
    pub fn last_hour(&self) -> Option<f32> {
        self.last_hour
    }

    /// Epoch seconds every `time_offset` in the file is relative to.
    pub fn base_time(&self) -> i64 {
        self.base_time
    }

    pub fn grid_len(&self) -> usize {
        self.grid_len
    }

    pub fn step_km(&self) -> f64 {
        self.step_km
    }

    /// True when this run created the file.
    pub fn was_created(&self) -> bool {
        self.created
    }

    pub(crate) fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    /// Rejects a record whose height grid differs from the stored one.
    pub fn check_grid(&self, grid: &HeightGrid) -> IngestResult<()> {
        if grid.len() != self.grid_len {
            return Err(IngestError::HeightCountMismatch {
                date: self.date,
                stored: self.grid_len,
                current: grid.len(),
            });
        }
        // A single-bin grid carries no step.
        if self.grid_len >= 2 && !grid.same_step(self.step_km) {
            return Err(IngestError::ResolutionMismatch {
                date: self.date,
                stored_m: 1000.0 * self.step_km,
                current_m: 1000.0 * grid.step_km(),
            });
        }
        Ok(())
    }

    /// Whether a sample at `hour` is newer than everything stored.
    pub fn accepts(&self, hour: f32) -> bool {
        self.last_hour.map_or(true, |last| hour > last)
    }

    pub(crate) fn advance(&mut self, hour: f32) {
        self.next_index += 1;
        self.last_hour = Some(hour);
    }

    pub fn close(self) -> IngestResult<()> {
        debug!(path = %self.handle.path().display(), samples = self.next_index, "closing day-file");
        self.handle.close()?;
        Ok(())
    }
}

/// Maps record dates to day-files inside one output directory.
pub struct DayFileManager<S> {
    store: S,
    site: SiteConfig,
    output_dir: PathBuf,
}

impl<S: ArchiveStore> DayFileManager<S> {
    pub fn new(store: S, site: SiteConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            site,
            output_dir: output_dir.into(),
        }
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.output_dir.join(self.site.day_file_name(date))
    }

    /// Create the day-file for `header`'s date, or open and validate the
    /// existing one against `grid`.
    pub fn resolve(&mut self, header: &RawHeader, grid: &HeightGrid) -> IngestResult<DayFile<S::Handle>> {
        let date = header.timestamp().date();
        if grid.is_empty() {
            return Err(IngestError::EmptyHeightGrid {
                date,
                ceiling_km: self.site.ceiling_km(),
            });
        }

        let path = self.path_for(date);
        if self.store.exists(&path) {
            self.open(&path, date, grid)
        } else {
            self.create(&path, header, grid)
        }
    }

    fn create(&mut self, path: &Path, header: &RawHeader, grid: &HeightGrid) -> IngestResult<DayFile<S::Handle>> {
        let schema = schema::day_file_schema(&self.site, header, grid.len(), Local::now());
        let mut handle = self.store.create(path, &schema)?;

        let base_time = header.timestamp().epoch_seconds();
        handle.write_scalar(Field::BaseTime.name(), &[], Value::Double(base_time as f64))?;
        handle.write_slice(Field::Height.name(), &[0], &[grid.len()], grid.heights())?;
        handle.write_scalar(Field::Lat.name(), &[], Value::Float(self.site.latitude))?;
        handle.write_scalar(Field::Lon.name(), &[], Value::Float(self.site.longitude))?;
        handle.write_scalar(Field::Alt.name(), &[], Value::Float(self.site.altitude))?;
        handle.flush()?;

        info!(path = %path.display(), bins = grid.len(), base_time, "created day-file");
        Ok(DayFile {
            date: header.timestamp().date(),
            handle,
            next_index: 0,
            last_hour: None,
            base_time,
            grid_len: grid.len(),
            step_km: grid.step_km(),
            created: true,
        })
    }

    fn open(&mut self, path: &Path, date: NaiveDate, grid: &HeightGrid) -> IngestResult<DayFile<S::Handle>> {
        let handle = self.store.open(path)?;

        let grid_len = handle.dimension_len(HEIGHT_DIM)?;
        let stored = if grid_len >= 2 {
            handle.read_slice(Field::Height.name(), &[0], &[2])?
        } else {
            Vec::new()
        };
        let step_km = match stored.as_slice() {
            [h0, h1, ..] => f64::from(h1 - h0),
            _ => grid.step_km(),
        };

        let samples = handle.dimension_len(TIME_DIM)?;
        let last_hour = match samples {
            0 => None,
            n => Some(handle.read_scalar(Field::Hour.name(), &[n - 1])? as f32),
        };
        let base_time = handle.read_scalar(Field::BaseTime.name(), &[])? as i64;

        let day = DayFile {
            date,
            handle,
            next_index: samples,
            last_hour,
            base_time,
            grid_len,
            step_km,
            created: false,
        };
        day.check_grid(grid)?;

        info!(
            path = %path.display(),
            samples,
            last_hour = ?last_hour,
            "opened day-file for append"
        );
        Ok(day)
    }
}
