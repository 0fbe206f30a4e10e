use crate::record::RawHeader;

/// Largest allowed difference between two vertical resolutions, in metres.
pub const RESOLUTION_TOLERANCE_M: f64 = 1.0;

/// Altitudes (km AGL) of the range bins kept in a day-file.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightGrid {
    heights: Vec<f32>,
    step_km: f64,
}

impl HeightGrid {
    /// Bin `i` sits at `(i - first_data_bin) * step_km`; only the leading bins
    /// strictly below `ceiling_km` are kept.
    pub fn new(bin_count: usize, first_data_bin: i16, step_km: f64, ceiling_km: f64) -> Self {
        let first = i64::from(first_data_bin);
        let heights = (0..bin_count as i64)
            .map(|i| ((i - first) as f64 * step_km) as f32)
            .take_while(|&h| f64::from(h) < ceiling_km)
            .collect();
        Self { heights, step_km }
    }

    pub fn for_header(header: &RawHeader, ceiling_km: f64) -> Self {
        Self::new(
            header.bin_count(),
            header.first_data_bin(),
            header.range_gate_km(),
            ceiling_km,
        )
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    pub fn step_km(&self) -> f64 {
        self.step_km
    }

    /// Whether `other_step_km` is the same vertical resolution to within
    /// [`RESOLUTION_TOLERANCE_M`].
    pub fn same_step(&self, other_step_km: f64) -> bool {
        (1000.0 * other_step_km - 1000.0 * self.step_km).abs() <= RESOLUTION_TOLERANCE_M
    }
}
