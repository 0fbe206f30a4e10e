//! Raw MPL record decoding.
//!
//! A raw file is a plain concatenation of records. Each record is a fixed
//! header followed by `bin_count` counts per channel. The header layout is
//! chosen by [`RecordFormat`]; nothing in the stream identifies it.

mod fields;
pub mod legacy;
pub mod polarization;

use std::io::{BufRead, Read};

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::Deserialize;

use crate::error::{DecodeError, DecodeResult};
use crate::swap::ByteOrder;

pub use legacy::LegacyHeader;
pub use polarization::{PolarizationHeader, PolarizationTail};

/// Speed of light (m / s).
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Largest bin count a record may declare.
pub const MAX_BIN_COUNT: usize = 4000;

/// Index of each temperature slot in [`RawHeader::temperatures`].
pub const TEMP_DETECTOR: usize = 0;
pub const TEMP_TELESCOPE: usize = 2;
pub const TEMP_LASER: usize = 3;

/// Header layout of an instrument's raw stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
    /// Single channel, 44-byte header, fixed-point counts.
    Legacy,
    /// Two polarization channels, 128-byte header, float counts.
    Polarization,
}

impl RecordFormat {
    pub fn name(self) -> &'static str {
        match self {
            RecordFormat::Legacy => "legacy",
            RecordFormat::Polarization => "polarization",
        }
    }

    pub fn channels(self) -> usize {
        match self {
            RecordFormat::Legacy => 1,
            RecordFormat::Polarization => 2,
        }
    }

    /// Byte order the instruments of this family write.
    pub fn default_byte_order(self) -> ByteOrder {
        match self {
            RecordFormat::Legacy => ByteOrder::Big,
            RecordFormat::Polarization => ByteOrder::Little,
        }
    }
}

/// UTC time of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    datetime: NaiveDateTime,
    decisecond: Option<u8>,
}

impl Timestamp {
    pub fn new(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        decisecond: Option<u8>,
    ) -> DecodeResult<Self> {
        let datetime = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .ok_or(DecodeError::InvalidTimestamp {
                year,
                month: month.into(),
                day: day.into(),
                hour: hour.into(),
                minute: minute.into(),
                second: second.into(),
            })?;
        Ok(Self {
            datetime,
            decisecond,
        })
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.datetime
    }

    pub fn date(&self) -> NaiveDate {
        self.datetime.date()
    }

    pub fn year(&self) -> i32 {
        self.datetime.year()
    }

    pub fn month(&self) -> u32 {
        self.datetime.month()
    }

    pub fn day(&self) -> u32 {
        self.datetime.day()
    }

    pub fn hour(&self) -> u32 {
        self.datetime.hour()
    }

    pub fn minute(&self) -> u32 {
        self.datetime.minute()
    }

    pub fn second(&self) -> u32 {
        self.datetime.second()
    }

    pub fn decisecond(&self) -> Option<u8> {
        self.decisecond
    }

    /// Seconds since 1970-01-01 00:00:00 UTC, whole seconds only.
    pub fn epoch_seconds(&self) -> i64 {
        self.datetime.and_utc().timestamp()
    }

    /// `h + min / 60 + s / 3600`.
    pub fn hour_of_day(&self) -> f64 {
        f64::from(self.hour()) + f64::from(self.minute()) / 60.0 + f64::from(self.second()) / 3600.0
    }
}

/// Background statistics carried by a header.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Backgrounds {
    pub mean_1: f32,
    pub stdev_1: Option<f32>,
    pub mean_2: Option<f32>,
    pub stdev_2: Option<f32>,
}

/// Decoded header of either layout.
#[derive(Debug, Clone, PartialEq)]
pub enum RawHeader {
    Legacy(LegacyHeader),
    Polarization(PolarizationHeader),
}

impl RawHeader {
    pub fn format(&self) -> RecordFormat {
        match self {
            RawHeader::Legacy(_) => RecordFormat::Legacy,
            RawHeader::Polarization(_) => RecordFormat::Polarization,
        }
    }

    pub fn unit(&self) -> i16 {
        match self {
            RawHeader::Legacy(h) => i16::from(h.unit),
            RawHeader::Polarization(h) => h.unit,
        }
    }

    pub fn version(&self) -> Option<i16> {
        match self {
            RawHeader::Legacy(_) => None,
            RawHeader::Polarization(h) => Some(h.version),
        }
    }

    pub fn timestamp(&self) -> &Timestamp {
        match self {
            RawHeader::Legacy(h) => &h.timestamp,
            RawHeader::Polarization(h) => &h.timestamp,
        }
    }

    pub fn shots(&self) -> i32 {
        match self {
            RawHeader::Legacy(h) => h.shots,
            RawHeader::Polarization(h) => h.shots,
        }
    }

    pub fn rep_rate(&self) -> i32 {
        match self {
            RawHeader::Legacy(h) => i32::from(h.rep_rate),
            RawHeader::Polarization(h) => h.rep_rate,
        }
    }

    pub fn energy_monitor(&self) -> i32 {
        match self {
            RawHeader::Legacy(h) => i32::from(h.energy_monitor),
            RawHeader::Polarization(h) => h.energy_monitor,
        }
    }

    /// Temperatures in hundredths of a degree C. The legacy layout has no
    /// fifth slot; it reads as zero.
    pub fn temperatures(&self) -> [i32; 5] {
        match self {
            RawHeader::Legacy(h) => {
                let mut out = [0; 5];
                for (slot, t) in out.iter_mut().zip(h.temperatures) {
                    *slot = i32::from(t);
                }
                out
            }
            RawHeader::Polarization(h) => h.temperatures,
        }
    }

    pub fn backgrounds(&self) -> Backgrounds {
        match self {
            RawHeader::Legacy(h) => Backgrounds {
                mean_1: h.background(),
                ..Backgrounds::default()
            },
            RawHeader::Polarization(h) => {
                let (mean_2, stdev_2) = match h.tail {
                    PolarizationTail::Extended {
                        background_2,
                        background_sd_2,
                        ..
                    } => (Some(background_2), Some(background_sd_2)),
                    PolarizationTail::Original { .. } => (None, None),
                };
                Backgrounds {
                    mean_1: h.background_1,
                    stdev_1: Some(h.background_sd_1),
                    mean_2,
                    stdev_2,
                }
            }
        }
    }

    pub fn cloud_base(&self) -> f32 {
        match self {
            RawHeader::Legacy(h) => f32::from(h.cloud_base),
            RawHeader::Polarization(h) => h.cloud_base,
        }
    }

    pub fn bin_count(&self) -> usize {
        match self {
            RawHeader::Legacy(h) => h.bin_count,
            RawHeader::Polarization(h) => h.bin_count,
        }
    }

    /// Vertical size of one range bin in km.
    pub fn range_gate_km(&self) -> f64 {
        match self {
            RawHeader::Legacy(h) => h.range_gate_km(),
            RawHeader::Polarization(h) => h.range_gate_km(),
        }
    }

    /// Bin holding the zero-altitude return. Zero for layouts without one.
    pub fn first_data_bin(&self) -> i16 {
        match self {
            RawHeader::Legacy(_) => 0,
            RawHeader::Polarization(h) => h.first_data_bin(),
        }
    }
}

/// Per-bin counts following a header.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSample {
    /// Legacy counts, fixed point with eight decimal places.
    FixedPoint(Vec<i32>),
    /// Polarization channels 1 and 2.
    Dual(Vec<f32>, Vec<f32>),
}

impl RawSample {
    /// Counts of each channel as floats.
    pub fn channels(&self) -> Vec<Vec<f32>> {
        match self {
            RawSample::FixedPoint(counts) => vec![legacy::scale_counts(counts)],
            RawSample::Dual(channel_1, channel_2) => vec![channel_1.clone(), channel_2.clone()],
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RawSample::FixedPoint(counts) => counts.len(),
            RawSample::Dual(channel_1, _) => channel_1.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub header: RawHeader,
    pub sample: RawSample,
}

/// Result of one read attempt on a raw stream.
#[derive(Debug)]
pub enum ReadOutcome {
    Record(Record),
    /// No bytes remained before the next header.
    End,
    /// The stream ended inside the record starting at `offset`.
    Truncated { offset: u64, consumed: usize },
}

/// Checks a declared bin count against [`MAX_BIN_COUNT`].
pub(crate) fn checked_bin_count(declared: i64) -> DecodeResult<usize> {
    match usize::try_from(declared) {
        Ok(count) if (1..=MAX_BIN_COUNT).contains(&count) => Ok(count),
        _ => Err(DecodeError::BinCount(declared)),
    }
}

struct CountingReader<'a, R> {
    inner: &'a mut R,
    count: usize,
}

impl<R: Read> Read for CountingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n;
        Ok(n)
    }
}

/// Reads consecutive records of one format from a raw stream.
pub struct RecordReader<R> {
    inner: R,
    format: RecordFormat,
    order: ByteOrder,
    offset: u64,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(inner: R, format: RecordFormat, order: ByteOrder) -> Self {
        Self {
            inner,
            format,
            order,
            offset: 0,
        }
    }

    pub fn next_record(&mut self) -> DecodeResult<ReadOutcome> {
        if self.inner.fill_buf()?.is_empty() {
            return Ok(ReadOutcome::End);
        }

        let start = self.offset;
        let mut counting = CountingReader {
            inner: &mut self.inner,
            count: 0,
        };
        let result = match self.format {
            RecordFormat::Legacy => legacy::decode(&mut counting, self.order),
            RecordFormat::Polarization => polarization::decode(&mut counting, self.order),
        };
        let consumed = counting.count;
        self.offset += consumed as u64;

        match result {
            Ok(record) => Ok(ReadOutcome::Record(record)),
            Err(DecodeError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Ok(ReadOutcome::Truncated {
                    offset: start,
                    consumed,
                })
            }
            Err(e) => Err(e),
        }
    }
}
