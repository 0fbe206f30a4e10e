//! Site configuration: which raw layout an instrument writes and the static
//! metadata stamped into each of its day-files.
//!
//! A configuration is either one of the built-in deployments or a TOML file:
//!
//! ```toml
//! name = "summit"
//! format = "polarization"
//! byte_order = "little"        # optional, defaults per format
//! file_prefix = "smtmplpolC1.a1"
//! latitude = 72.596
//! longitude = -38.422
//! altitude = 3200.0
//! ceiling_km = 15.0            # optional, defaults per format
//! comment = "..."
//! author = "..."
//! ```

use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::record::RecordFormat;
use crate::swap::ByteOrder;

/// Names accepted by [`SiteConfig::preset`].
pub const PRESETS: [&str; 2] = ["rhubc", "summit"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    pub name: String,
    pub format: RecordFormat,
    #[serde(default)]
    pub byte_order: Option<ByteOrder>,
    pub file_prefix: String,
    pub latitude: f32,
    pub longitude: f32,
    /// Metres above mean sea level.
    pub altitude: f32,
    #[serde(default)]
    pub ceiling_km: Option<f64>,
    pub comment: String,
    pub author: String,
}

impl SiteConfig {
    /// Single-channel MPL at Cerro Toco, Chile (RHUBC-II).
    pub fn rhubc() -> Self {
        Self {
            name: "rhubc".into(),
            format: RecordFormat::Legacy,
            byte_order: None,
            file_prefix: "cjcmplM1.a1".into(),
            latitude: -22.957,
            longitude: -67.771,
            altitude: 5322.0,
            ceiling_km: None,
            comment: "DOE Atmospheric Radiation Measurement (ARM) Micropulse Lidar (MPL) \
                      deployed to Cerro Toco, Chile, as part of the ARM-funded RHUBC-II project"
                .into(),
            author: "Dave Turner, NOAA National Severe Storms Laboratory, dave.turner@noaa.gov".into(),
        }
    }

    /// Polarization MPL at Summit, Greenland (ICECAPS).
    pub fn summit() -> Self {
        Self {
            name: "summit".into(),
            format: RecordFormat::Polarization,
            byte_order: None,
            file_prefix: "smtmplpolC1.a1".into(),
            latitude: (72.0 + 35.0 / 60.0 + 46.4 / 3600.0) as f32,
            longitude: -(38.0 + 25.0 / 60.0 + 19.1 / 3600.0) as f32,
            altitude: 3200.0,
            ceiling_km: None,
            comment: "DOE Atmospheric Radiation Measurement (ARM) Micropulse Lidar (MPL) \
                      deployed to Summit, Greenland, as part of the NSF-funded ICECAPS project"
                .into(),
            author: "Dave Turner, NOAA National Severe Storms Laboratory, dave.turner@noaa.gov".into(),
        }
    }

    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "rhubc" => Ok(Self::rhubc()),
            "summit" => Ok(Self::summit()),
            other => Err(ConfigError::UnknownSite(other.to_string())),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.file_prefix.is_empty() || self.file_prefix.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "file_prefix `{}` must be a non-empty file name",
                self.file_prefix
            )));
        }
        if let Some(ceiling) = self.ceiling_km {
            if !(ceiling > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "ceiling_km must be positive, got {ceiling}"
                )));
            }
        }
        Ok(())
    }

    pub fn stream_byte_order(&self) -> ByteOrder {
        self.byte_order
            .unwrap_or_else(|| self.format.default_byte_order())
    }

    /// Height above which bins are dropped: 16 km for the single-channel
    /// system, 15 km for the polarization system.
    pub fn ceiling_km(&self) -> f64 {
        self.ceiling_km.unwrap_or(match self.format {
            RecordFormat::Legacy => 16.0,
            RecordFormat::Polarization => 15.0,
        })
    }

    /// `<prefix>.YYYYMMDD.000000.cdf`
    pub fn day_file_name(&self, date: NaiveDate) -> String {
        format!("{}.{}.000000.cdf", self.file_prefix, date.format("%Y%m%d"))
    }
}
