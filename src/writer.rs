//! Turns a decoded record into one sample of a day-file.

use crate::dayfile::DayFile;
use crate::error::IngestResult;
use crate::record::{RawHeader, RawSample, TEMP_DETECTOR, TEMP_LASER, TEMP_TELESCOPE};
use crate::schema::{self, Field};
use crate::store::{ArchiveHandle, Value};

/// Seconds between the record and the day-file's `base_time`.
pub fn time_offset(header: &RawHeader, base_time: i64) -> f64 {
    (header.timestamp().epoch_seconds() - base_time) as f64
}

/// Fractional hour of day, at the precision the `hour` variable stores.
pub fn hour_value(header: &RawHeader) -> f32 {
    header.timestamp().hour_of_day() as f32
}

/// Scalar values of one sample, in file order.
pub fn sample_scalars(header: &RawHeader, base_time: i64) -> Vec<(Field, Value)> {
    let temps = header.temperatures();
    let celsius = |raw: i32| Value::Float(raw as f32 / 100.0);

    let mut out = vec![
        (Field::TimeOffset, Value::Double(time_offset(header, base_time))),
        (Field::Hour, Value::Float(hour_value(header))),
        (Field::Shots, Value::Int(header.shots())),
        (Field::RepRate, Value::Int(header.rep_rate())),
        (Field::Energy, Value::Float(header.energy_monitor() as f32 / 1000.0)),
        (Field::TempDetector, celsius(temps[TEMP_DETECTOR])),
        (Field::TempTelescope, celsius(temps[TEMP_TELESCOPE])),
        (Field::TempLaser, celsius(temps[TEMP_LASER])),
    ];

    let bg = header.backgrounds();
    match header {
        RawHeader::Legacy(_) => out.push((Field::Background, Value::Float(bg.mean_1))),
        RawHeader::Polarization(_) => {
            // Channel 2 statistics only exist in the extended tail; without
            // them the variables keep their fill value.
            let values = [Some(bg.mean_1), bg.stdev_1, bg.mean_2, bg.stdev_2];
            for (&field, value) in schema::background_fields(header.format()).iter().zip(values) {
                if let Some(v) = value {
                    out.push((field, Value::Float(v)));
                }
            }
        }
    }

    out.push((Field::InitialCbh, Value::Float(header.cloud_base())));
    out
}

/// Writes `header` and `sample` at `index`, flushing the file after every
/// variable so an interrupted run leaves whole variables behind.
///
/// Writing the same index twice overwrites in place; callers keep indices
/// gap-free.
pub fn append<H: ArchiveHandle>(
    day: &mut DayFile<H>,
    index: usize,
    header: &RawHeader,
    sample: &RawSample,
) -> IngestResult<()> {
    let scalars = sample_scalars(header, day.base_time());
    let grid_len = day.grid_len();
    let handle = day.handle_mut();

    for (field, value) in scalars {
        handle.write_scalar(field.name(), &[index], value)?;
        handle.flush()?;
    }

    let slabs = schema::backscatter_fields(header.format());
    for (field, counts) in slabs.iter().zip(sample.channels()) {
        let kept = &counts[..grid_len.min(counts.len())];
        handle.write_slice(field.name(), &[index, 0], &[1, kept.len()], kept)?;
        handle.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::dayfile::DayFileManager;
    use crate::height::HeightGrid;
    use crate::record::{legacy, polarization, PolarizationTail, Timestamp};
    use crate::store::MemoryStore;

    fn value_of(scalars: &[(Field, Value)], field: Field) -> Option<Value> {
        scalars.iter().find(|(f, _)| *f == field).map(|(_, v)| *v)
    }

    #[test]
    fn offset_and_hour() {
        let mut h = polarization::tests::header(255);
        let header = RawHeader::Polarization(h.clone());
        let base = header.timestamp().epoch_seconds();
        assert_eq!(time_offset(&header, base), 0.0);

        h.timestamp = Timestamp::new(2011, 5, 14, 1, 30, 0, None).unwrap();
        let later = RawHeader::Polarization(h);
        assert_eq!(time_offset(&later, base), 5100.0);
        assert_eq!(hour_value(&later), 1.5);
    }

    #[test]
    fn scalars_are_converted() {
        let header = RawHeader::Legacy(legacy::tests::header());
        let scalars = sample_scalars(&header, 0);
        assert_eq!(value_of(&scalars, Field::Energy), Some(Value::Float(6.15)));
        assert_eq!(value_of(&scalars, Field::TempDetector), Some(Value::Float(22.1)));
        assert_eq!(value_of(&scalars, Field::TempTelescope), Some(Value::Float(25.34)));
        assert_eq!(value_of(&scalars, Field::TempLaser), Some(Value::Float(28.01)));
        assert_eq!(value_of(&scalars, Field::Shots), Some(Value::Int(2500)));
        assert!(value_of(&scalars, Field::Background).is_some());
        assert!(value_of(&scalars, Field::MeanBackground1).is_none());
    }

    #[test]
    fn original_tail_leaves_channel_2_background_unwritten() {
        let mut h = polarization::tests::header(252);
        assert!(matches!(h.tail, PolarizationTail::Original { .. }));
        h.background_1 = 0.5;
        let scalars = sample_scalars(&RawHeader::Polarization(h), 0);
        assert_eq!(value_of(&scalars, Field::MeanBackground1), Some(Value::Float(0.5)));
        assert!(value_of(&scalars, Field::SdBackground1).is_some());
        assert!(value_of(&scalars, Field::MeanBackground2).is_none());
        assert!(value_of(&scalars, Field::SdBackground2).is_none());

        let extended = sample_scalars(&RawHeader::Polarization(polarization::tests::header(255)), 0);
        assert_eq!(value_of(&extended, Field::MeanBackground2), Some(Value::Float(0.75)));
    }

    #[test]
    fn append_writes_one_sample_and_flushes() {
        let store = MemoryStore::new();
        let mut manager = DayFileManager::new(store.clone(), SiteConfig::summit(), "out");
        let h = polarization::tests::header(255);
        let header = RawHeader::Polarization(h.clone());
        let grid = HeightGrid::new(h.bin_count, 4, h.range_gate_km(), 0.1);
        assert!(grid.len() < h.bin_count);

        let ch1: Vec<f32> = (0..h.bin_count).map(|i| i as f32).collect();
        let ch2: Vec<f32> = ch1.iter().map(|v| v * 2.0).collect();
        let sample = RawSample::Dual(ch1, ch2);

        let mut day = manager.resolve(&header, &grid).unwrap();
        let created_flushes = store.flush_count(day.path()).unwrap();
        append(&mut day, 0, &header, &sample).unwrap();

        let handle = day.handle_mut();
        assert_eq!(handle.dimension_len("time").unwrap(), 1);
        let n = grid.len();
        let stored = handle.read_slice("backscatter_2", &[0, 0], &[1, n]).unwrap();
        assert_eq!(stored, (0..n).map(|i| i as f32 * 2.0).collect::<Vec<_>>());
        assert!(handle.read_scalar("mn_background_2", &[0]).unwrap() > 0.0);
        // One flush per scalar and per slab.
        let writes = sample_scalars(&header, day.base_time()).len() + 2;
        assert_eq!(writes, 15);
        assert_eq!(store.flush_count(day.path()), Some(created_flushes + writes));
    }

    #[test]
    fn same_index_overwrites_in_place() {
        let store = MemoryStore::new();
        let mut manager = DayFileManager::new(store.clone(), SiteConfig::summit(), "out");
        let mut h = polarization::tests::header(255);
        let grid = HeightGrid::for_header(&RawHeader::Polarization(h.clone()), 15.0);
        let n = grid.len();

        let first = RawHeader::Polarization(h.clone());
        let mut day = manager.resolve(&first, &grid).unwrap();
        append(&mut day, 0, &first, &RawSample::Dual(vec![1.0; h.bin_count], vec![2.0; h.bin_count])).unwrap();

        h.shots = 12_345;
        h.timestamp = Timestamp::new(2011, 5, 14, 0, 10, 0, None).unwrap();
        let second = RawHeader::Polarization(h.clone());
        append(&mut day, 0, &second, &RawSample::Dual(vec![7.0; h.bin_count], vec![8.0; h.bin_count])).unwrap();

        let handle = day.handle_mut();
        assert_eq!(handle.dimension_len("time").unwrap(), 1);
        assert_eq!(handle.read_scalar("nshots", &[0]).unwrap(), 12_345.0);
        assert_eq!(handle.read_scalar("time_offset", &[0]).unwrap(), 300.0);
        assert_eq!(handle.read_slice("backscatter_1", &[0, 0], &[1, n]).unwrap(), vec![7.0; n]);
        assert_eq!(handle.read_slice("backscatter_2", &[0, 0], &[1, n]).unwrap(), vec![8.0; n]);
    }
}
