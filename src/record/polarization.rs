//! Dual-channel (polarization) MPL records.
//!
//! The 128-byte header ends in a 19-byte tail whose layout depends on the
//! software version: versions before 253 leave it reserved, later versions
//! carry the second channel's background statistics and the first data bin.
//! Counts follow as two f32 arrays, channel 1 then channel 2.

use std::io::Read;

use super::fields::{FieldReader, FieldWriter};
use super::{checked_bin_count, RawHeader, RawSample, Record, Timestamp, SPEED_OF_LIGHT};
use crate::error::{DecodeError, DecodeResult};
use crate::swap::ByteOrder;

pub const HEADER_LEN: usize = 128;

/// Oldest software version with this header layout.
pub const MIN_VERSION: i16 = 250;

/// First software version writing the extended tail.
pub const EXTENDED_TAIL_VERSION: i16 = 253;

const TAIL_LEN: usize = 19;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PolarizationTail {
    Original {
        reserved: [u8; TAIL_LEN],
    },
    Extended {
        data_file_version: u8,
        background_2: f32,
        background_sd_2: f32,
        mcs_mode: u8,
        first_data_bin: i16,
        reserved: [u8; 7],
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolarizationHeader {
    pub unit: i16,
    pub version: i16,
    pub timestamp: Timestamp,
    pub shots: i32,
    pub rep_rate: i32,
    pub energy_monitor: i32,
    /// Detector, unused, telescope, laser, unused.
    pub temperatures: [i32; 5],
    pub background_1: f32,
    pub background_sd_1: f32,
    pub channel_count: i16,
    pub bin_count: usize,
    /// Seconds per bin.
    pub bin_time: f32,
    pub max_range: f32,
    pub dead_time_flag: i16,
    pub scan_flag: i16,
    pub polarization_flag: i16,
    pub azimuth: f32,
    pub elevation: f32,
    pub compass: f32,
    pub polarization_voltages: [f32; 4],
    pub cloud_base: f32,
    /// Non-zero when the A/D conversion failed.
    pub ad_quality_flag: u8,
    pub tail: PolarizationTail,
}

impl PolarizationHeader {
    pub fn range_gate_km(&self) -> f64 {
        range_gate_km(self.bin_time)
    }

    pub fn first_data_bin(&self) -> i16 {
        match self.tail {
            PolarizationTail::Extended { first_data_bin, .. } => first_data_bin,
            PolarizationTail::Original { .. } => 0,
        }
    }
}

/// Range gate altitude in km for a bin time in seconds.
pub fn range_gate_km(bin_time: f32) -> f64 {
    0.5 * SPEED_OF_LIGHT * f64::from(bin_time) * 1.0e-3
}

fn read_tail<R: Read>(fields: &mut FieldReader<'_, R>, version: i16) -> DecodeResult<PolarizationTail> {
    if version < EXTENDED_TAIL_VERSION {
        return Ok(PolarizationTail::Original {
            reserved: fields.read_array()?,
        });
    }
    let data_file_version = fields.read_one()?;
    let [background_2, background_sd_2]: [f32; 2] = fields.read_array()?;
    let mcs_mode = fields.read_one()?;
    let first_data_bin = fields.read_one()?;
    let reserved = fields.read_array()?;
    Ok(PolarizationTail::Extended {
        data_file_version,
        background_2,
        background_sd_2,
        mcs_mode,
        first_data_bin,
        reserved,
    })
}

pub fn decode<R: Read>(reader: &mut R, order: ByteOrder) -> DecodeResult<Record> {
    let mut fields = FieldReader::new(reader, order);

    let [unit, version, year, month, day, hour, minute, second]: [i16; 8] = fields.read_array()?;
    if version < MIN_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            version,
            minimum: MIN_VERSION,
        });
    }

    let longs: [i32; 8] = fields.read_array()?;
    let [background_1, background_sd_1]: [f32; 2] = fields.read_array()?;
    let channel_count: i16 = fields.read_one()?;
    let declared_bins: i32 = fields.read_one()?;
    let [bin_time, max_range]: [f32; 2] = fields.read_array()?;
    let [dead_time_flag, scan_flag, polarization_flag]: [i16; 3] = fields.read_array()?;
    let pointing: [f32; 7] = fields.read_array()?;
    let cloud_base: f32 = fields.read_one()?;
    let ad_quality_flag: u8 = fields.read_one()?;
    let tail = read_tail(&mut fields, version)?;

    let invalid = || DecodeError::InvalidTimestamp {
        year: year.into(),
        month: month.into(),
        day: day.into(),
        hour: hour.into(),
        minute: minute.into(),
        second: second.into(),
    };
    let part = |v: i16| u32::try_from(v).map_err(|_| invalid());
    let timestamp = Timestamp::new(
        i32::from(year),
        part(month)?,
        part(day)?,
        part(hour)?,
        part(minute)?,
        part(second)?,
        None,
    )?;

    let gate = range_gate_km(bin_time);
    if !(gate > 0.0) {
        return Err(DecodeError::RangeGate(gate));
    }
    let bin_count = checked_bin_count(i64::from(declared_bins))?;

    let header = PolarizationHeader {
        unit,
        version,
        timestamp,
        shots: longs[0],
        rep_rate: longs[1],
        energy_monitor: longs[2],
        temperatures: [longs[3], longs[4], longs[5], longs[6], longs[7]],
        background_1,
        background_sd_1,
        channel_count,
        bin_count,
        bin_time,
        max_range,
        dead_time_flag,
        scan_flag,
        polarization_flag,
        azimuth: pointing[0],
        elevation: pointing[1],
        compass: pointing[2],
        polarization_voltages: [pointing[3], pointing[4], pointing[5], pointing[6]],
        cloud_base,
        ad_quality_flag,
        tail,
    };

    let channel_1 = fields.read_vec::<f32>(bin_count)?;
    let channel_2 = fields.read_vec::<f32>(bin_count)?;

    Ok(Record {
        header: RawHeader::Polarization(header),
        sample: RawSample::Dual(channel_1, channel_2),
    })
}

/// Serialize a header and both channels in `order`.
pub fn encode(header: &PolarizationHeader, channel_1: &[f32], channel_2: &[f32], order: ByteOrder) -> Vec<u8> {
    let ts = &header.timestamp;
    let mut out = FieldWriter::new(order);
    out.put(&[
        header.unit,
        header.version,
        ts.year() as i16,
        ts.month() as i16,
        ts.day() as i16,
        ts.hour() as i16,
        ts.minute() as i16,
        ts.second() as i16,
    ]);
    out.put(&[header.shots, header.rep_rate, header.energy_monitor]);
    out.put(&header.temperatures);
    out.put(&[header.background_1, header.background_sd_1]);
    out.put_one(header.channel_count);
    out.put_one(header.bin_count as i32);
    out.put(&[header.bin_time, header.max_range]);
    out.put(&[header.dead_time_flag, header.scan_flag, header.polarization_flag]);
    out.put(&[header.azimuth, header.elevation, header.compass]);
    out.put(&header.polarization_voltages);
    out.put_one(header.cloud_base);
    out.put_one(header.ad_quality_flag);
    match header.tail {
        PolarizationTail::Original { reserved } => out.put(&reserved),
        PolarizationTail::Extended {
            data_file_version,
            background_2,
            background_sd_2,
            mcs_mode,
            first_data_bin,
            reserved,
        } => {
            out.put_one(data_file_version);
            out.put(&[background_2, background_sd_2]);
            out.put_one(mcs_mode);
            out.put_one(first_data_bin);
            out.put(&reserved);
        }
    }
    out.put(channel_1);
    out.put(channel_2);
    out.into_bytes()
}
