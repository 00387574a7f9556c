//! Blocking client for the GIOŚ REST API.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info};

use aeromon_types::{
    AirQualityIndexes, INDEX_POLLUTANTS, IndexValue, Sensor, SensorDataPoint, Station, StationMeta,
};

use crate::connectivity::ConnectivityMonitor;
use crate::error::{Error, RemoteFault, Result};
use crate::wire::{
    WireDataPoint, WireFault, WireSensor, WireStation, WireStationMeta, format_query_datetime,
    parse_datetime,
};

/// Production base URL of the service.
pub const DEFAULT_BASE_URL: &str = "https://api.gios.gov.pl";

/// Default page size for catalog endpoints.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Server-side maximum page size, used by the measurement endpoints to
/// minimize round-trips.
pub const STREAM_PAGE_SIZE: u32 = 500;

/// Error code the service uses to signal the archival endpoint's rate limit.
pub const RATE_LIMIT_ERROR_CODE: &str = "API-ERR-100003";

const STATIONS_ENDPOINT: &str = "pjp-api/v1/rest/station/findAll";
const STATION_META_ENDPOINT: &str = "pjp-api/v1/rest/metadata/stations";

const STATIONS_KEY: &str = "Lista stacji pomiarowych";
const STATION_META_KEY: &str = "Lista metadanych stacji pomiarowych";
const AQ_INDEX_KEY: &str = "AqIndex";
const SENSORS_KEY: &str = "Lista stanowisk pomiarowych dla podanej stacji";
const SENSOR_DATA_KEY: &str = "Lista danych pomiarowych";
const ARCHIVAL_DATA_KEY: &str = "Lista archiwalnych wyników pomiarów";

/// Blocking HTTP client for the air-quality service.
///
/// Handles pagination, maps payloads into typed records, classifies failures
/// into the [`Error`] taxonomy, and tracks reachability in a shared
/// [`ConnectivityMonitor`]. Cloning is cheap and shares both the connection
/// pool and the connectivity state, so one client instance can serve any
/// number of worker threads.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::blocking::Client,
    base_url: String,
    page_size: u32,
    stream_page_size: u32,
    connectivity: Arc<ConnectivityMonitor>,
}

impl Client {
    /// Client against the production service.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Client against a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::with_settings(base_url, DEFAULT_PAGE_SIZE, STREAM_PAGE_SIZE)
    }

    /// Client with explicit page sizes, for embedders that tune them.
    pub fn with_settings(
        base_url: impl Into<String>,
        page_size: u32,
        stream_page_size: u32,
    ) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            base_url: base_url.into(),
            page_size,
            stream_page_size,
            connectivity: Arc::new(ConnectivityMonitor::new()),
        }
    }

    /// Shared connectivity state; subscribe here for change notifications.
    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    fn make_url(&self, endpoint: &str, page: u32, size: u32, extra: &[(&str, String)]) -> String {
        let mut url = format!("{}/{}?page={}&size={}", self.base_url, endpoint, page, size);
        for (key, value) in extra {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(value);
        }
        url
    }

    /// One GET request; returns the decoded JSON envelope.
    fn get(&self, endpoint: &str, page: u32, size: u32, extra: &[(&str, String)]) -> Result<Value> {
        let url = self.make_url(endpoint, page, size, extra);
        info!("API request: {}", url);

        let response = match self.http.get(&url).send() {
            Ok(response) => {
                self.connectivity.set_reachable(true);
                response
            }
            Err(e) => {
                self.connectivity.set_reachable(false);
                return Err(Error::Connectivity(e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let fault = response.json::<WireFault>().unwrap_or_default();
            return Err(Error::Remote(RemoteFault {
                code: fault.error_code,
                reason: fault.error_reason,
                result: fault.error_result,
                solution: fault.error_solution,
            }));
        }

        response
            .json::<Value>()
            .map_err(|e| Error::Integrity(format!("invalid JSON payload: {e}")))
    }

    /// Fetch every page and merge the fragments under `target`.
    ///
    /// List fragments concatenate in page order; map fragments merge keys
    /// with later pages winning. Any other fragment shape is a contract
    /// break.
    fn get_collected(
        &self,
        endpoint: &str,
        target: &str,
        size: u32,
        extra: &[(&str, String)],
    ) -> Result<Value> {
        let first = self.get(endpoint, 0, size, extra)?;
        let total_pages = total_pages(&first);

        let mut merged = match first.get(target) {
            Some(Value::Array(items)) => Value::Array(items.clone()),
            Some(Value::Object(map)) => Value::Object(map.clone()),
            fragment => return Err(unexpected_fragment(target, fragment)),
        };

        for page in 1..total_pages {
            debug!("Collecting page {}/{} of {}", page + 1, total_pages, endpoint);
            let response = self.get(endpoint, page, size, extra)?;
            match (&mut merged, response.get(target)) {
                (Value::Array(all), Some(Value::Array(items))) => {
                    all.extend(items.iter().cloned());
                }
                (Value::Object(all), Some(Value::Object(map))) => {
                    for (key, value) in map {
                        all.insert(key.clone(), value.clone());
                    }
                }
                (_, fragment) => return Err(unexpected_fragment(target, fragment)),
            }
        }

        Ok(merged)
    }

    /// Visit every page's list fragment under `target` without building one
    /// merged payload. The measurement endpoints are list-shaped only, and
    /// their result sets are large enough that per-page accumulation pays.
    fn get_each<F>(
        &self,
        endpoint: &str,
        target: &str,
        size: u32,
        extra: &[(&str, String)],
        mut visit: F,
    ) -> Result<()>
    where
        F: FnMut(&[Value]) -> Result<()>,
    {
        let mut response = self.get(endpoint, 0, size, extra)?;
        let total_pages = total_pages(&response);

        for page in 0..total_pages {
            if page > 0 {
                debug!("Streaming page {}/{} of {}", page + 1, total_pages, endpoint);
                response = self.get(endpoint, page, size, extra)?;
            }
            match response.get(target) {
                Some(Value::Array(items)) => visit(items)?,
                fragment => return Err(unexpected_fragment(target, fragment)),
            }
        }

        Ok(())
    }

    /// Retrieve the full station catalog, merging all pages.
    pub fn fetch_stations(&self) -> Result<Vec<Station>> {
        let merged = self.get_collected(STATIONS_ENDPOINT, STATIONS_KEY, self.page_size, &[])?;
        let wire: Vec<WireStation> = serde_json::from_value(merged)
            .map_err(|e| Error::Integrity(format!("malformed station entry: {e}")))?;
        Ok(wire.into_iter().map(Station::from).collect())
    }

    /// Retrieve station metadata, optionally filtered by city and/or
    /// station codename (passed through as equality filters).
    pub fn fetch_station_meta(
        &self,
        city: Option<&str>,
        station_codename: Option<&str>,
    ) -> Result<Vec<StationMeta>> {
        let mut params = Vec::new();
        if let Some(city) = city {
            params.push(("filter[miasto]", city.to_string()));
        }
        if let Some(codename) = station_codename {
            params.push(("filter[kod-stacji]", codename.to_string()));
        }

        let merged =
            self.get_collected(STATION_META_ENDPOINT, STATION_META_KEY, self.page_size, &params)?;
        let wire: Vec<WireStationMeta> = serde_json::from_value(merged)
            .map_err(|e| Error::Integrity(format!("malformed station metadata entry: {e}")))?;
        wire.into_iter().map(StationMeta::try_from).collect()
    }

    /// Retrieve the current air-quality indexes for one station.
    ///
    /// Absent payload fields map to "no value", not an error: a station
    /// without a computed index is a normal state.
    pub fn fetch_air_quality_indexes(&self, station_id: i64) -> Result<AirQualityIndexes> {
        let endpoint = format!("pjp-api/v1/rest/aqindex/getIndex/{station_id}");
        let merged = self.get_collected(&endpoint, AQ_INDEX_KEY, self.page_size, &[])?;
        let map = match merged {
            Value::Object(map) => map,
            other => return Err(unexpected_fragment(AQ_INDEX_KEY, Some(&other))),
        };

        let index_at = |date_key: &str, value_key: &str| -> Result<IndexValue> {
            let computed_at = match map.get(date_key).and_then(Value::as_str) {
                Some(raw) if !raw.trim().is_empty() => Some(parse_datetime(raw)?),
                _ => None,
            };
            Ok(IndexValue {
                computed_at,
                value: map.get(value_key).and_then(Value::as_i64),
            })
        };

        let overall = index_at("Data wykonania obliczeń indeksu", "Wartość indeksu")?;
        let mut pollutants = BTreeMap::new();
        for pollutant in INDEX_POLLUTANTS {
            pollutants.insert(
                pollutant.to_string(),
                index_at(
                    &format!("Data wykonania obliczeń indeksu dla wskaźnika {pollutant}"),
                    &format!("Wartość indeksu dla wskaźnika {pollutant}"),
                )?,
            );
        }

        Ok(AirQualityIndexes {
            overall,
            pollutants,
            index_status: map
                .get("Status indeksu ogólnego dla stacji pomiarowej")
                .and_then(Value::as_bool),
            critical_pollutant: map
                .get("Kod zanieczyszczenia krytycznego")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    /// Retrieve the sensors installed at one station.
    pub fn fetch_station_sensors(&self, station_id: i64) -> Result<Vec<Sensor>> {
        let endpoint = format!("pjp-api/v1/rest/station/sensors/{station_id}");
        let merged = self.get_collected(&endpoint, SENSORS_KEY, self.page_size, &[])?;
        let wire: Vec<WireSensor> = serde_json::from_value(merged)
            .map_err(|e| Error::Integrity(format!("malformed sensor entry: {e}")))?;
        Ok(wire.into_iter().map(Sensor::from).collect())
    }

    /// Retrieve the sensor's current measurement window, accumulating page
    /// by page. Entries without a value are dropped.
    pub fn fetch_sensor_data(&self, sensor_id: i64) -> Result<Vec<SensorDataPoint>> {
        let endpoint = format!("pjp-api/v1/rest/data/getData/{sensor_id}");
        let mut points = Vec::new();
        self.get_each(&endpoint, SENSOR_DATA_KEY, self.stream_page_size, &[], |items| {
            collect_points(items, &mut points)
        })?;
        Ok(points)
    }

    /// Retrieve historical measurements, optionally bounded by
    /// `date_from`/`date_to` or a trailing number of days.
    ///
    /// The archival endpoint is rate limited to 2 requests per minute; the
    /// service's rate-limit error code maps to [`Error::TooManyRequests`] so
    /// callers can tell "back off" apart from a malformed request.
    pub fn fetch_sensor_archival_data(
        &self,
        sensor_id: i64,
        date_from: Option<OffsetDateTime>,
        date_to: Option<OffsetDateTime>,
        days: Option<u32>,
    ) -> Result<Vec<SensorDataPoint>> {
        let endpoint = format!("pjp-api/v1/rest/archivalData/getDataBySensor/{sensor_id}");
        let mut params = Vec::new();
        if let Some(from) = date_from {
            params.push(("dateFrom", format_query_datetime(from)));
        }
        if let Some(to) = date_to {
            params.push(("dateTo", format_query_datetime(to)));
        }
        if let Some(days) = days {
            params.push(("dayNumber", days.to_string()));
        }

        let mut points = Vec::new();
        let result = self.get_each(
            &endpoint,
            ARCHIVAL_DATA_KEY,
            self.stream_page_size,
            &params,
            |items| collect_points(items, &mut points),
        );

        match result {
            Ok(()) => Ok(points),
            Err(Error::Remote(fault)) if fault.code.as_deref() == Some(RATE_LIMIT_ERROR_CODE) => {
                Err(Error::TooManyRequests)
            }
            Err(e) => Err(e),
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

fn total_pages(envelope: &Value) -> u32 {
    envelope
        .get("totalPages")
        .and_then(Value::as_u64)
        .unwrap_or(1) as u32
}

fn unexpected_fragment(target: &str, fragment: Option<&Value>) -> Error {
    let shape = match fragment {
        None => "missing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "a boolean",
        Some(Value::Number(_)) => "a number",
        Some(Value::String(_)) => "a string",
        Some(Value::Array(_)) => "a list",
        Some(Value::Object(_)) => "a map",
    };
    Error::Integrity(format!("fragment under '{target}' is {shape}"))
}

fn collect_points(items: &[Value], points: &mut Vec<SensorDataPoint>) -> Result<()> {
    for item in items {
        let wire: WireDataPoint = serde_json::from_value(item.clone())
            .map_err(|e| Error::Integrity(format!("malformed measurement entry: {e}")))?;
        if let Some(point) = wire.into_point()? {
            points.push(point);
        }
    }
    Ok(())
}
