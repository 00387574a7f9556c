//! Store-shaped views, as read back for consumers.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

/// One row of the station list, enough to place a marker on a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationListView {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
}

/// Full station details for a detail panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationDetailsView {
    pub id: i64,
    pub codename: String,
    pub name: String,
    pub district: String,
    pub voivodeship: String,
    pub city: String,
    pub address: Option<String>,
}

/// Stored station metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationMetaView {
    pub station_id: i64,
    pub international_codename: Option<String>,
    pub launch_date: Date,
    pub close_date: Option<Date>,
    pub station_type: String,
}

/// A stored air-quality index joined with its category name.
///
/// `value` and `category` are absent together when the source reported no
/// index for the sensor type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityIndexView {
    pub codename: String,
    pub value: Option<i64>,
    pub category: Option<String>,
}

/// A sensor as stored, reduced to what consumers select by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorView {
    pub id: i64,
    pub codename: String,
}

/// One stored measurement within a requested range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorValueView {
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
    pub value: f64,
}
