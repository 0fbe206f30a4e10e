//! Fixed layout of an MPL day-file.
//!
//! The ingest core refers to variables through [`Field`]; only the archive
//! store resolves the names.

use chrono::{DateTime, Local};

use crate::config::SiteConfig;
use crate::record::{RawHeader, RecordFormat};
use crate::store::{DimSize, Schema, VarType};

pub const TIME_DIM: &str = "time";
pub const HEIGHT_DIM: &str = "height";

/// Fill value of every float variable.
pub const FILL_F32: f32 = -9_999.0;

/// Value of the `Ingest_version` global attribute.
pub const INGEST_VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

const RAW_COUNTS_COMMENT: &str = "This field literally contains the counts detected by the \
    detector for each range bin.  No corrections of any kind have been applied to this field.  \
    In order to make proper use of the data, one should correct for detector non-linearity, \
    subtract the afterpulse, subtract background counts, apply a range-squared correction, and \
    correct for optical overlap and collimation effects";

const CHANNEL_1_INTERPRETATION: &str = "This is the linear cross-polarization channel.  It is \
    sensitive to the depolarized backscatter from the atmosphere";

const CHANNEL_2_INTERPRETATION: &str = "This is the circular polarization channel.  It is \
    sensitive to the unpolarized backscatter from the atmosphere";

const BACKSCATTER_COMMENT: &str = "See Flynn et al. 2007 Optics Express paper for details on how \
    to interpret the two backscatter profiles";

/// Every variable a day-file can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    BaseTime,
    TimeOffset,
    Hour,
    Height,
    Shots,
    RepRate,
    Energy,
    TempDetector,
    TempTelescope,
    TempLaser,
    Background,
    MeanBackground1,
    SdBackground1,
    MeanBackground2,
    SdBackground2,
    InitialCbh,
    Backscatter,
    Backscatter1,
    Backscatter2,
    Lat,
    Lon,
    Alt,
}

/// Dimensions a field is laid out on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    Time,
    Height,
    TimeHeight,
}

impl Shape {
    fn dims(self) -> &'static [&'static str] {
        match self {
            Shape::Scalar => &[],
            Shape::Time => &[TIME_DIM],
            Shape::Height => &[HEIGHT_DIM],
            Shape::TimeHeight => &[TIME_DIM, HEIGHT_DIM],
        }
    }
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::BaseTime => "base_time",
            Field::TimeOffset => "time_offset",
            Field::Hour => "hour",
            Field::Height => "height",
            Field::Shots => "nshots",
            Field::RepRate => "rep_rate",
            Field::Energy => "energy",
            Field::TempDetector => "temp_detector",
            Field::TempTelescope => "temp_telescope",
            Field::TempLaser => "temp_laser",
            Field::Background => "background",
            Field::MeanBackground1 => "mn_background_1",
            Field::SdBackground1 => "sd_background_1",
            Field::MeanBackground2 => "mn_background_2",
            Field::SdBackground2 => "sd_background_2",
            Field::InitialCbh => "initial_cbh",
            Field::Backscatter => "backscatter",
            Field::Backscatter1 => "backscatter_1",
            Field::Backscatter2 => "backscatter_2",
            Field::Lat => "lat",
            Field::Lon => "lon",
            Field::Alt => "alt",
        }
    }

    pub fn var_type(self) -> VarType {
        match self {
            Field::BaseTime | Field::TimeOffset => VarType::Double,
            Field::Shots | Field::RepRate => VarType::Int,
            _ => VarType::Float,
        }
    }

    pub fn shape(self) -> Shape {
        match self {
            Field::BaseTime | Field::Lat | Field::Lon | Field::Alt => Shape::Scalar,
            Field::Height => Shape::Height,
            Field::Backscatter | Field::Backscatter1 | Field::Backscatter2 => Shape::TimeHeight,
            _ => Shape::Time,
        }
    }

    fn long_name(self) -> &'static str {
        match self {
            Field::BaseTime => "Base time in Epoch",
            Field::TimeOffset => "Time offset from base_time",
            Field::Hour => "Hour of the day",
            Field::Height => "height",
            Field::Shots => "number of laser shots",
            Field::RepRate => "laser pulse repetition frequency",
            Field::Energy => "laser energy",
            Field::TempDetector => "detector temperature",
            Field::TempTelescope => "telescope temperature",
            Field::TempLaser => "laser temperature",
            Field::Background => "mean background",
            Field::MeanBackground1 => "mean background in channel 1",
            Field::SdBackground1 => "standard deviation of the background in channel 1",
            Field::MeanBackground2 => "mean background in channel 2",
            Field::SdBackground2 => "standard deviation of the background in channel 2",
            Field::InitialCbh => "initial cloud base height from MPL software",
            Field::Backscatter => "attenuated backscatter",
            Field::Backscatter1 => "attenuated backscatter in channel 1",
            Field::Backscatter2 => "attenuated backscatter in channel 2",
            Field::Lat => "north latitude",
            Field::Lon => "east longitude",
            Field::Alt => "altitude",
        }
    }

    fn units(self) -> &'static str {
        match self {
            Field::BaseTime => "seconds since 1970-1-1 0:00:00 0:00",
            Field::TimeOffset => "seconds",
            Field::Hour => "UTC",
            Field::Height | Field::InitialCbh => "km AGL",
            Field::Shots => "unitless",
            Field::RepRate => "Hz",
            Field::Energy => "microJoules",
            Field::TempDetector | Field::TempTelescope | Field::TempLaser => "C",
            Field::Background
            | Field::MeanBackground1
            | Field::SdBackground1
            | Field::MeanBackground2
            | Field::SdBackground2
            | Field::Backscatter
            | Field::Backscatter1
            | Field::Backscatter2 => "counts / microsecond",
            Field::Lat | Field::Lon => "deg",
            Field::Alt => "m MSL",
        }
    }

    fn attributes(self) -> Vec<(&'static str, &'static str)> {
        let mut attrs = vec![("long_name", self.long_name()), ("units", self.units())];
        match self {
            Field::Backscatter1 => attrs.push(("channel_interpretation", CHANNEL_1_INTERPRETATION)),
            Field::Backscatter2 => attrs.push(("channel_interpretation", CHANNEL_2_INTERPRETATION)),
            _ => {}
        }
        if self.shape() == Shape::TimeHeight {
            attrs.push(("comment", RAW_COUNTS_COMMENT));
        }
        attrs
    }
}

/// Background variables of a format, in file order.
pub fn background_fields(format: RecordFormat) -> &'static [Field] {
    match format {
        RecordFormat::Legacy => &[Field::Background],
        RecordFormat::Polarization => &[
            Field::MeanBackground1,
            Field::SdBackground1,
            Field::MeanBackground2,
            Field::SdBackground2,
        ],
    }
}

/// Count slabs of a format, one per channel.
pub fn backscatter_fields(format: RecordFormat) -> &'static [Field] {
    match format {
        RecordFormat::Legacy => &[Field::Backscatter],
        RecordFormat::Polarization => &[Field::Backscatter1, Field::Backscatter2],
    }
}

/// All variables of a format's day-file, in file order.
pub fn fields(format: RecordFormat) -> Vec<Field> {
    let mut out = vec![
        Field::BaseTime,
        Field::TimeOffset,
        Field::Hour,
        Field::Height,
        Field::Shots,
        Field::RepRate,
        Field::Energy,
        Field::TempDetector,
        Field::TempTelescope,
        Field::TempLaser,
    ];
    out.extend_from_slice(background_fields(format));
    out.push(Field::InitialCbh);
    out.extend_from_slice(backscatter_fields(format));
    out.extend_from_slice(&[Field::Lat, Field::Lon, Field::Alt]);
    out
}

/// Layout of a new day-file whose height dimension holds `grid_len` bins.
pub fn day_file_schema(
    site: &SiteConfig,
    header: &RawHeader,
    grid_len: usize,
    created: DateTime<Local>,
) -> Schema {
    let format = header.format();
    let mut schema = Schema::default();
    schema
        .dimension(TIME_DIM, DimSize::Unlimited)
        .dimension(HEIGHT_DIM, DimSize::Fixed(grid_len));

    for field in fields(format) {
        schema.variable(
            field.name(),
            field.var_type(),
            field.shape().dims(),
            &field.attributes(),
        );
        if field.var_type() == VarType::Float {
            schema.fill_value(field.name(), FILL_F32);
        }
    }

    let serial = header.unit().to_string();
    schema
        .global("Date_created", &created.format("%a %b %d %H:%M:%S %Y %Z").to_string())
        .global("Ingest_version", INGEST_VERSION)
        .global("comment", &site.comment)
        .global("Author", &site.author)
        .global("instrument_serial_number", &serial);

    if let Some(version) = header.version() {
        schema
            .global("instrument_version", &version.to_string())
            .global("backscatter_comment", BACKSCATTER_COMMENT);
    }
    schema
}
