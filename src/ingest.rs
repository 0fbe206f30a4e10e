//! Drives records from raw files into day-files.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{debug, info, warn};

use crate::config::SiteConfig;
use crate::dayfile::{DayFile, DayFileManager};
use crate::error::{IngestError, IngestResult};
use crate::height::HeightGrid;
use crate::record::{ReadOutcome, Record, RecordReader};
use crate::store::ArchiveStore;
use crate::writer;

/// Running totals of one invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub files: usize,
    pub records: usize,
    pub appended: usize,
    /// Records dropped by the out-of-order guard.
    pub skipped: usize,
    /// Input files that ended inside a record.
    pub truncated_files: usize,
    pub day_files_created: usize,
    pub day_files_opened: usize,
}

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Appended { index: usize },
    Skipped,
}

/// State of one ingest run: the open day-file and the totals so far.
pub struct IngestContext<S: ArchiveStore> {
    manager: DayFileManager<S>,
    current: Option<DayFile<S::Handle>>,
    stats: IngestStats,
}

impl<S: ArchiveStore> IngestContext<S> {
    pub fn new(store: S, site: SiteConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            manager: DayFileManager::new(store, site, output_dir),
            current: None,
            stats: IngestStats::default(),
        }
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Ingests one raw file. A `.gz` file is decompressed as it is read.
    pub fn ingest_path(&mut self, path: &Path) -> IngestResult<()> {
        let file = File::open(path).map_err(|source| IngestError::Input {
            path: path.to_path_buf(),
            source,
        })?;
        let label = path.display().to_string();
        if path.extension().is_some_and(|ext| ext == "gz") {
            self.ingest_reader(BufReader::new(GzDecoder::new(file)), &label)
        } else {
            self.ingest_reader(BufReader::new(file), &label)
        }
    }

    /// Reads records from `reader` until it is exhausted. `label` names the
    /// source in log events.
    pub fn ingest_reader<R: BufRead>(&mut self, reader: R, label: &str) -> IngestResult<()> {
        let site = self.manager.site();
        let mut records = RecordReader::new(reader, site.format, site.stream_byte_order());
        let before = self.stats;
        self.stats.files += 1;

        loop {
            match records.next_record()? {
                ReadOutcome::Record(record) => {
                    self.ingest_record(&record)?;
                }
                ReadOutcome::End => break,
                ReadOutcome::Truncated { offset, consumed } => {
                    warn!(
                        input = label,
                        offset,
                        consumed,
                        "input ends inside a record, ignoring the partial record"
                    );
                    self.stats.truncated_files += 1;
                    break;
                }
            }
        }

        info!(
            input = label,
            records = self.stats.records - before.records,
            appended = self.stats.appended - before.appended,
            skipped = self.stats.skipped - before.skipped,
            "finished input"
        );
        Ok(())
    }

    /// Routes one record to its day-file and appends it unless it is not
    /// newer than the file's last sample.
    pub fn ingest_record(&mut self, record: &Record) -> IngestResult<Disposition> {
        self.stats.records += 1;
        let header = &record.header;
        let grid = HeightGrid::for_header(header, self.manager.site().ceiling_km());
        let date = header.timestamp().date();

        let mut day = match self.current.take() {
            Some(day) if day.date() == date => day,
            Some(day) => {
                day.close()?;
                self.resolve(record, &grid)?
            }
            None => self.resolve(record, &grid)?,
        };
        let outcome = self.append_to(&mut day, record, &grid);
        self.current = Some(day);
        outcome
    }

    fn resolve(&mut self, record: &Record, grid: &HeightGrid) -> IngestResult<DayFile<S::Handle>> {
        let day = self.manager.resolve(&record.header, grid)?;
        if day.was_created() {
            self.stats.day_files_created += 1;
        } else {
            self.stats.day_files_opened += 1;
        }
        Ok(day)
    }

    fn append_to(&mut self, day: &mut DayFile<S::Handle>, record: &Record, grid: &HeightGrid) -> IngestResult<Disposition> {
        day.check_grid(grid)?;

        let hour = writer::hour_value(&record.header);
        if !day.accepts(hour) {
            debug!(
                time = %record.header.timestamp().datetime(),
                hour,
                last_hour = ?day.last_hour(),
                "record is not newer than the day-file, skipping"
            );
            self.stats.skipped += 1;
            return Ok(Disposition::Skipped);
        }

        let index = day.next_index();
        writer::append(day, index, &record.header, &record.sample)?;
        day.advance(hour);
        self.stats.appended += 1;
        debug!(time = %record.header.timestamp().datetime(), index, "appended record");
        Ok(Disposition::Appended { index })
    }

    /// Closes the open day-file and returns the run totals.
    pub fn finish(mut self) -> IngestResult<IngestStats> {
        if let Some(day) = self.current.take() {
            day.close()?;
        }
        Ok(self.stats)
    }
}
