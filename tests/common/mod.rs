//! Synthetic raw records for the scenario tests.
#![allow(dead_code)]

use std::path::PathBuf;

use chrono::NaiveDate;
use mpl_to_netcdf::record::{legacy, polarization, LegacyHeader, PolarizationHeader, PolarizationTail, Timestamp};
use mpl_to_netcdf::store::{ArchiveHandle, ArchiveStore, MemoryStore};
use mpl_to_netcdf::swap::ByteOrder;
use mpl_to_netcdf::{IngestContext, SiteConfig};

pub const POL_BINS: usize = 40;
pub const LEGACY_BINS: usize = 500;

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2011, 5, 14).unwrap()
}

pub fn polarization_header(version: i16, day: u32, hour: u32, minute: u32, second: u32) -> PolarizationHeader {
    let tail = if version >= polarization::EXTENDED_TAIL_VERSION {
        PolarizationTail::Extended {
            data_file_version: 1,
            background_2: 0.8,
            background_sd_2: 0.04,
            mcs_mode: 0,
            first_data_bin: 2,
            reserved: [0; 7],
        }
    } else {
        PolarizationTail::Original { reserved: [0; 19] }
    };
    PolarizationHeader {
        unit: 1041,
        version,
        timestamp: Timestamp::new(2011, 5, day, hour, minute, second, None).unwrap(),
        shots: 37_500,
        rep_rate: 2500,
        energy_monitor: 7900,
        temperatures: [2150, 0, 2480, 3105, 0],
        background_1: 0.6,
        background_sd_1: 0.03,
        channel_count: 2,
        bin_count: POL_BINS,
        bin_time: 1.0e-7,
        max_range: 0.6,
        dead_time_flag: 1,
        scan_flag: 0,
        polarization_flag: 1,
        azimuth: 0.0,
        elevation: 90.0,
        compass: 0.0,
        polarization_voltages: [0.0, 0.0, 0.0, 0.0],
        cloud_base: 2.5,
        ad_quality_flag: 0,
        tail,
    }
}

/// Channel 1 counts are `minute + bin / 100`, channel 2 their negation.
pub fn polarization_bytes(header: &PolarizationHeader) -> Vec<u8> {
    let minute = header.timestamp.minute() as f32;
    let ch1: Vec<f32> = (0..header.bin_count).map(|i| minute + i as f32 / 100.0).collect();
    let ch2: Vec<f32> = ch1.iter().map(|v| -v).collect();
    polarization::encode(header, &ch1, &ch2, ByteOrder::Little)
}

/// A polarization stream with one record per `(hour, minute)` on 2011-05-14.
pub fn polarization_stream(version: i16, times: &[(u32, u32)]) -> Vec<u8> {
    times
        .iter()
        .flat_map(|&(hour, minute)| polarization_bytes(&polarization_header(version, 14, hour, minute, 0)))
        .collect()
}

pub fn legacy_header(hour: u32, minute: u32) -> LegacyHeader {
    LegacyHeader {
        unit: 9,
        timestamp: Timestamp::new(2010, 10, 19, hour, minute, 0, Some(5)).unwrap(),
        shots: 2500,
        rep_rate: 2500,
        energy_monitor: 6000,
        temperatures: [2200, 0, 2500, 2800],
        ad_readings: [0, 0, 0],
        cloud_base: 3,
        background_fixed: 150_000_000,
        bin_time_ns: 200,
        max_range: 15,
        dead_time_flag: 1,
        bin_count: LEGACY_BINS,
    }
}

/// Bin `i` holds `i / 100` counts, stored as fixed point.
pub fn legacy_bytes(header: &LegacyHeader) -> Vec<u8> {
    let counts: Vec<i32> = (0..header.bin_count as i32).map(|i| i * 1_000_000).collect();
    legacy::encode(header, &counts, ByteOrder::Big).unwrap()
}

pub fn summit(store: &MemoryStore) -> IngestContext<MemoryStore> {
    IngestContext::new(store.clone(), SiteConfig::summit(), "/archive")
}

pub fn rhubc(store: &MemoryStore) -> IngestContext<MemoryStore> {
    IngestContext::new(store.clone(), SiteConfig::rhubc(), "/archive")
}

pub fn summit_path(date: NaiveDate) -> PathBuf {
    PathBuf::from("/archive").join(SiteConfig::summit().day_file_name(date))
}

pub fn sample_count(store: &MemoryStore, path: &std::path::Path) -> usize {
    let mut store = store.clone();
    store.open(path).unwrap().dimension_len("time").unwrap()
}
