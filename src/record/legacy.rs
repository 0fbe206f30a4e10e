//! Single-channel MPL records.
//!
//! Header layout (44 bytes, multi-byte fields in the stream's byte order):
//!
//! | bytes | field                                                        |
//! |-------|--------------------------------------------------------------|
//! | 8     | unit, year, month, day, hour, minute, second, decisecond    |
//! | 4     | shot count                                                   |
//! | 20    | rep rate, energy, 4 temperatures, 3 A/D slots, cloud base    |
//! | 8     | background x 1e8, nanoseconds per bin                        |
//! | 4     | max range (km), dead-time flag                               |
//!
//! followed by `bin_count` i32 counts scaled by 1e8.

use std::io::Read;

use super::fields::{FieldReader, FieldWriter};
use super::{checked_bin_count, RawHeader, RawSample, Record, Timestamp, SPEED_OF_LIGHT};
use crate::error::{DecodeError, DecodeResult};
use crate::swap::ByteOrder;

pub const HEADER_LEN: usize = 44;

/// Fixed-point scale of counts and background.
pub const COUNT_SCALE: f64 = 1e8;

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyHeader {
    pub unit: u8,
    pub timestamp: Timestamp,
    pub shots: i32,
    pub rep_rate: i16,
    pub energy_monitor: i16,
    /// Detector, unused, telescope and laser temperature.
    pub temperatures: [i16; 4],
    pub ad_readings: [i16; 3],
    pub cloud_base: i16,
    pub background_fixed: i32,
    pub bin_time_ns: i32,
    pub max_range: i16,
    pub dead_time_flag: i16,
    /// Derived from `max_range` and the range gate; not stored in the stream.
    pub bin_count: usize,
}

impl LegacyHeader {
    pub fn range_gate_km(&self) -> f64 {
        range_gate_km(self.bin_time_ns)
    }

    pub fn background(&self) -> f32 {
        (f64::from(self.background_fixed) / COUNT_SCALE) as f32
    }
}

/// Range gate altitude in km for a bin time in nanoseconds.
pub fn range_gate_km(bin_time_ns: i32) -> f64 {
    0.5 * SPEED_OF_LIGHT * f64::from(bin_time_ns) * 1.0e-9 * 1.0e-3
}

/// Number of bins per channel, rounded half up.
pub fn bin_count_for(max_range_km: f64, range_gate_km: f64) -> i64 {
    (max_range_km / range_gate_km + 0.5).floor() as i64
}

/// Two-digit year byte to calendar year: `< 100` is 19xx, `>= 100` is 20xx.
pub fn expand_year(byte: u8) -> i32 {
    let y = i32::from(byte);
    if y >= 100 {
        (y - 100) + 2000
    } else {
        y + 1900
    }
}

/// Inverse of [`expand_year`]; `None` outside 1900..=2155.
pub fn compact_year(year: i32) -> Option<u8> {
    let byte = if year >= 2000 { year - 2000 + 100 } else { year - 1900 };
    u8::try_from(byte).ok()
}

pub fn scale_counts(counts: &[i32]) -> Vec<f32> {
    counts
        .iter()
        .map(|&c| (f64::from(c) / COUNT_SCALE) as f32)
        .collect()
}

pub fn decode<R: Read>(reader: &mut R, order: ByteOrder) -> DecodeResult<Record> {
    let mut fields = FieldReader::new(reader, order);

    let date: [u8; 8] = fields.read_array()?;
    let shots: i32 = fields.read_one()?;
    let shorts: [i16; 10] = fields.read_array()?;
    let longs: [i32; 2] = fields.read_array()?;
    let tail: [i16; 2] = fields.read_array()?;

    let timestamp = Timestamp::new(
        expand_year(date[1]),
        u32::from(date[2]),
        u32::from(date[3]),
        u32::from(date[4]),
        u32::from(date[5]),
        u32::from(date[6]),
        Some(date[7]),
    )?;

    let bin_time_ns = longs[1];
    let gate = range_gate_km(bin_time_ns);
    if gate <= 0.0 {
        return Err(DecodeError::RangeGate(gate));
    }
    let max_range = tail[0];
    let bin_count = checked_bin_count(bin_count_for(f64::from(max_range), gate))?;

    let header = LegacyHeader {
        unit: date[0],
        timestamp,
        shots,
        rep_rate: shorts[0],
        energy_monitor: shorts[1],
        temperatures: [shorts[2], shorts[3], shorts[4], shorts[5]],
        ad_readings: [shorts[6], shorts[7], shorts[8]],
        cloud_base: shorts[9],
        background_fixed: longs[0],
        bin_time_ns,
        max_range,
        dead_time_flag: tail[1],
        bin_count,
    };

    let counts = fields.read_vec::<i32>(bin_count)?;

    Ok(Record {
        header: RawHeader::Legacy(header),
        sample: RawSample::FixedPoint(counts),
    })
}

/// Serialize a header and its counts in `order`. `None` if the year has no
/// two-digit representation.
pub fn encode(header: &LegacyHeader, counts: &[i32], order: ByteOrder) -> Option<Vec<u8>> {
    let ts = &header.timestamp;
    let mut out = FieldWriter::new(order);
    out.put(&[
        header.unit,
        compact_year(ts.year())?,
        ts.month() as u8,
        ts.day() as u8,
        ts.hour() as u8,
        ts.minute() as u8,
        ts.second() as u8,
        ts.decisecond().unwrap_or(0),
    ]);
    out.put_one(header.shots);
    let t = header.temperatures;
    let ad = header.ad_readings;
    out.put(&[
        header.rep_rate,
        header.energy_monitor,
        t[0],
        t[1],
        t[2],
        t[3],
        ad[0],
        ad[1],
        ad[2],
        header.cloud_base,
    ]);
    out.put(&[header.background_fixed, header.bin_time_ns]);
    out.put(&[header.max_range, header.dead_time_flag]);
    out.put(counts);
    Some(out.into_bytes())
}
