//! Wire-format mapping for remote payloads.
//!
//! The service names its JSON fields in Polish, verbatim from the public
//! contract; the structs here own those names so the shared record types
//! stay wire-agnostic.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use aeromon_types::{Sensor, SensorDataPoint, Station, StationMeta};

use crate::error::{Error, Result};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const DATETIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const DATETIME_MINUTE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// Parse a payload timestamp. The service writes `2024-03-01 12:00:00`,
/// occasionally with a `T` separator or without seconds.
pub(crate) fn parse_datetime(raw: &str) -> Result<OffsetDateTime> {
    let normalized = raw.trim().replace('T', " ");
    PrimitiveDateTime::parse(&normalized, DATETIME_FORMAT)
        .or_else(|_| PrimitiveDateTime::parse(&normalized, DATETIME_MINUTE_FORMAT))
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| Error::Integrity(format!("invalid timestamp '{raw}': {e}")))
}

/// Parse a payload calendar date, tolerating a trailing time-of-day part.
pub(crate) fn parse_date(raw: &str) -> Result<Date> {
    let day = raw.trim().split([' ', 'T']).next().unwrap_or_default();
    Date::parse(day, DATE_FORMAT).map_err(|e| Error::Integrity(format!("invalid date '{raw}': {e}")))
}

/// Format a timestamp for `dateFrom`/`dateTo` query parameters.
pub(crate) fn format_query_datetime(value: OffsetDateTime) -> String {
    value
        .format(DATETIME_MINUTE_FORMAT)
        .expect("query datetime format is infallible for valid timestamps")
}

/// Coordinates arrive as JSON numbers or numeric strings depending on the
/// endpoint revision; accept both.
fn de_coordinate<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    struct CoordinateVisitor;

    impl de::Visitor<'_> for CoordinateVisitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a WGS84 coordinate as a number or numeric string")
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<f64, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<f64, E> {
            value.trim().parse().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(CoordinateVisitor)
}

/// Structured HTTP error body.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireFault {
    pub error_code: Option<String>,
    pub error_reason: Option<String>,
    pub error_result: Option<String>,
    pub error_solution: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireStation {
    #[serde(rename = "Identyfikator stacji")]
    id: i64,
    #[serde(rename = "Kod stacji")]
    codename: String,
    #[serde(rename = "Nazwa stacji")]
    name: String,
    #[serde(rename = "Powiat")]
    district: String,
    #[serde(rename = "Województwo")]
    voivodeship: String,
    #[serde(rename = "Nazwa miasta")]
    city: String,
    #[serde(rename = "Ulica")]
    address: Option<String>,
    #[serde(rename = "WGS84 φ N", deserialize_with = "de_coordinate")]
    latitude: f64,
    #[serde(rename = "WGS84 λ E", deserialize_with = "de_coordinate")]
    longitude: f64,
}

impl From<WireStation> for Station {
    fn from(wire: WireStation) -> Self {
        Station {
            id: wire.id,
            codename: wire.codename,
            name: wire.name,
            district: wire.district,
            voivodeship: wire.voivodeship,
            city: wire.city,
            address: wire.address,
            latitude: wire.latitude,
            longitude: wire.longitude,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireStationMeta {
    #[serde(rename = "Kod stacji")]
    codename: String,
    #[serde(rename = "Kod międzynarodowy")]
    international_codename: Option<String>,
    #[serde(rename = "Data uruchomienia")]
    launch_date: String,
    #[serde(rename = "Data zamknięcia")]
    close_date: Option<String>,
    #[serde(rename = "Rodzaj stacji")]
    station_type: String,
}

impl TryFrom<WireStationMeta> for StationMeta {
    type Error = Error;

    fn try_from(wire: WireStationMeta) -> Result<Self> {
        Ok(StationMeta {
            launch_date: parse_date(&wire.launch_date)?,
            close_date: wire
                .close_date
                .as_deref()
                .filter(|raw| !raw.trim().is_empty())
                .map(parse_date)
                .transpose()?,
            codename: wire.codename,
            international_codename: wire.international_codename,
            station_type: wire.station_type,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireSensor {
    #[serde(rename = "Identyfikator stanowiska")]
    id: i64,
    #[serde(rename = "Wskaźnik - kod")]
    codename: String,
    #[serde(rename = "Wskaźnik")]
    name: String,
}

impl From<WireSensor> for Sensor {
    fn from(wire: WireSensor) -> Self {
        Sensor {
            id: wire.id,
            codename: wire.codename,
            name: wire.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireDataPoint {
    #[serde(rename = "Data")]
    date: String,
    #[serde(rename = "Wartość", default)]
    value: Option<f64>,
}

impl WireDataPoint {
    /// Map to a data point, dropping entries the source has no value for.
    pub(crate) fn into_point(self) -> Result<Option<SensorDataPoint>> {
        let Some(value) = self.value else {
            return Ok(None);
        };
        Ok(Some(SensorDataPoint {
            recorded_at: parse_datetime(&self.date)?,
            value,
        }))
    }
}
