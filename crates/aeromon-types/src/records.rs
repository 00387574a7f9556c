//! API-shaped records, as received from the remote service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

/// A measuring station from the station catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Stable numeric identifier assigned by the remote source.
    pub id: i64,
    /// Unique station codename, e.g. `MzWarAlNiepo`.
    pub codename: String,
    /// Display name.
    pub name: String,
    /// District the station is located in.
    pub district: String,
    /// Voivodeship (region) the station is located in.
    pub voivodeship: String,
    /// City name; stations sharing a city share one city row in the store.
    pub city: String,
    /// Street address, absent for some rural stations.
    pub address: Option<String>,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
}

/// One-to-one metadata extension for a station, keyed by codename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationMeta {
    /// Codename of the station this record extends.
    pub codename: String,
    /// International (EU) station code.
    pub international_codename: Option<String>,
    /// Date the station was launched.
    pub launch_date: Date,
    /// Date the station was closed; absent while the station is active.
    pub close_date: Option<Date>,
    /// Station type, e.g. background or traffic.
    pub station_type: String,
}

/// A single categorical index observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexValue {
    /// When the remote source computed the index.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub computed_at: Option<OffsetDateTime>,
    /// Categorical index value, `None` when the source has no value.
    pub value: Option<i64>,
}

/// The full air-quality index payload for one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityIndexes {
    /// The overall station index.
    pub overall: IndexValue,
    /// Per-pollutant sub-indexes, keyed by pollutant codename.
    pub pollutants: BTreeMap<String, IndexValue>,
    /// Whether the overall index is currently valid.
    pub index_status: Option<bool>,
    /// Codename of the pollutant driving the overall index.
    pub critical_pollutant: Option<String>,
}

/// A measurement position installed at a station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sensor {
    /// Numeric identifier assigned by the remote source.
    pub id: i64,
    /// Codename of the measured pollutant, e.g. `PM10`.
    pub codename: String,
    /// Human-readable pollutant name.
    pub name: String,
}

/// A single time-series measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorDataPoint {
    /// When the measurement was taken.
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
    /// Measured value.
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn data_point_serde_round_trip() {
        let point = SensorDataPoint {
            recorded_at: datetime!(2024-03-01 12:00 UTC),
            value: 17.4,
        };
        let json = serde_json::to_string(&point).unwrap();
        let back: SensorDataPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(point, back);
    }

    #[test]
    fn index_value_defaults_to_no_observation() {
        let idx: IndexValue = serde_json::from_str(r#"{"value": null}"#).unwrap();
        assert_eq!(idx.computed_at, None);
        assert_eq!(idx.value, None);
    }
}
