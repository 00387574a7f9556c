//! Refresh-then-serve synchronization policy.

use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use aeromon_api::Client;
use aeromon_store::Store;
use aeromon_types::{
    AirQualityIndexView, SensorValueView, SensorView, StationDetailsView, StationListView,
    StationMetaView,
};

use crate::config::{Config, SyncConfig};
use crate::error::{Error, Result};

/// Ranges reaching further back than this cutoff are served by the archival
/// endpoint; ranges ending within it also carry the current-data window.
const ARCHIVE_CUTOFF: Duration = Duration::hours(3 * 24 + 1);

/// Synchronization orchestrator: decides, per entity and per time range,
/// whether the store is fresh enough to serve or must be refreshed first.
///
/// Every read follows the same shape: compare the store's staleness stamp
/// against the configured interval, opportunistically refresh through the
/// API client, then answer from the store. A connectivity failure during
/// refresh is logged and swallowed (stale local data beats no data); every
/// other failure propagates.
///
/// The repository holds no synchronization state of its own; staleness
/// lives in the store, reachability in the shared client.
pub struct Repository {
    api: Client,
    store: Store,
    config: SyncConfig,
}

impl Repository {
    /// Repository over an API client and an open store.
    pub fn new(api: Client, store: Store, config: SyncConfig) -> Self {
        Self { api, store, config }
    }

    /// Build the client and store described by a [`Config`].
    pub fn from_config(config: &Config) -> Result<Self> {
        let api = Client::with_settings(
            config.api.base_url.clone(),
            config.api.page_size,
            config.api.stream_page_size,
        );
        let store = Store::open(&config.storage.path)?;
        Ok(Self::new(api, store, config.sync.clone()))
    }

    /// An independent handle for a parallel worker: its own store
    /// connection, the shared API client and connectivity state.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            api: self.api.clone(),
            store: self.store.duplicate_connection()?,
            config: self.config.clone(),
        })
    }

    /// The shared API client, e.g. to subscribe to connectivity changes.
    pub fn api_client(&self) -> &Client {
        &self.api
    }
}

// Station list
impl Repository {
    /// Force-refresh the station catalog, regardless of staleness.
    pub fn update_stations(&mut self) -> Result<()> {
        let stations = self.api.fetch_stations()?;
        self.store.update_stations(&stations)?;
        Ok(())
    }

    /// The station list, refreshed first when stale.
    pub fn get_station_list_view(&mut self) -> Result<Vec<StationListView>> {
        self.refresh_stations_if_stale()?;
        Ok(self.store.get_station_list_view()?)
    }

    /// One station's details, refreshed first when the station list is stale.
    pub fn fetch_station_details_view(
        &mut self,
        station_id: i64,
    ) -> Result<Option<StationDetailsView>> {
        self.refresh_stations_if_stale()?;
        Ok(self.store.fetch_station_detail_view(station_id)?)
    }

    fn refresh_stations_if_stale(&mut self) -> Result<()> {
        let last_update = self.store.get_last_stations_update()?;
        if is_stale(last_update, self.config.station_list_refresh()) {
            allow_stale(self.update_stations(), "stations")?;
        }
        Ok(())
    }
}

// Station metadata
impl Repository {
    /// Force-refresh one station's metadata, regardless of staleness.
    ///
    /// The metadata endpoint is keyed by station codename; a station the
    /// store has never seen cannot be refreshed and is left as-is.
    pub fn update_station_meta(&mut self, station_id: i64) -> Result<()> {
        let Some(details) = self.store.fetch_station_detail_view(station_id)? else {
            debug!("No local station {station_id}, skipping meta refresh");
            return Ok(());
        };
        let meta = self.api.fetch_station_meta(None, Some(&details.codename))?;
        self.store.update_station_meta(&meta)?;
        Ok(())
    }

    /// One station's metadata, refreshed first when stale.
    pub fn fetch_station_meta_view(&mut self, station_id: i64) -> Result<Option<StationMetaView>> {
        let last_update = self.store.fetch_last_station_meta_update(station_id)?;
        if is_stale(last_update, self.config.meta_refresh()) {
            allow_stale(self.update_station_meta(station_id), "station meta")?;
        }
        Ok(self.store.fetch_station_meta_view(station_id)?)
    }
}

// Air-quality indexes
impl Repository {
    /// Force-refresh one station's indexes, regardless of staleness.
    pub fn update_station_air_quality_indexes(&mut self, station_id: i64) -> Result<()> {
        let indexes = self.api.fetch_air_quality_indexes(station_id)?;
        self.store
            .update_station_air_quality_indexes(station_id, &indexes)?;
        Ok(())
    }

    /// The current index value for one (station, sensor type) pair,
    /// refreshed first when stale.
    pub fn fetch_station_air_quality_index_value(
        &mut self,
        station_id: i64,
        type_codename: &str,
    ) -> Result<Option<i64>> {
        self.refresh_indexes_if_stale(station_id)?;
        Ok(self
            .store
            .fetch_station_air_quality_index_value(station_id, type_codename)?)
    }

    /// All of a station's indexes with category names, refreshed first when
    /// stale.
    pub fn fetch_station_air_quality_indexes(
        &mut self,
        station_id: i64,
    ) -> Result<Vec<AirQualityIndexView>> {
        self.refresh_indexes_if_stale(station_id)?;
        Ok(self.store.fetch_station_air_quality_indexes(station_id)?)
    }

    fn refresh_indexes_if_stale(&mut self, station_id: i64) -> Result<()> {
        let last_update = self
            .store
            .fetch_last_station_air_quality_indexes_update(station_id)?;
        if is_stale(last_update, self.config.indexes_refresh()) {
            allow_stale(
                self.update_station_air_quality_indexes(station_id),
                "air quality index values",
            )?;
        }
        Ok(())
    }
}

// Sensor catalog
impl Repository {
    /// Force-refresh one station's sensor catalog, regardless of staleness.
    pub fn update_station_sensors(&mut self, station_id: i64) -> Result<()> {
        let sensors = self.api.fetch_station_sensors(station_id)?;
        self.store.update_station_sensors(station_id, &sensors)?;
        Ok(())
    }

    /// One station's sensors, refreshed first when stale.
    pub fn fetch_station_sensors(&mut self, station_id: i64) -> Result<Vec<SensorView>> {
        let last_update = self.store.fetch_last_station_sensors_update(station_id)?;
        if is_stale(last_update, self.config.sensors_refresh()) {
            allow_stale(self.update_station_sensors(station_id), "station sensors")?;
        }
        Ok(self.store.fetch_station_sensors(station_id)?)
    }
}

// Time series
impl Repository {
    /// Pull measurements covering `[date_from, date_to]` into the store.
    ///
    /// The archival endpoint serves any range starting before the archive
    /// cutoff; the current-data endpoint serves any range ending within it.
    /// A range spanning the cutoff uses both.
    pub fn update_sensor_data(
        &mut self,
        sensor_id: i64,
        date_from: OffsetDateTime,
        date_to: OffsetDateTime,
    ) -> Result<()> {
        let now = OffsetDateTime::now_utc();

        if now - date_from >= ARCHIVE_CUTOFF {
            let data =
                self.api
                    .fetch_sensor_archival_data(sensor_id, Some(date_from), Some(date_to), None)?;
            self.store.update_sensor_data(sensor_id, &data)?;
        }

        if now - date_to <= ARCHIVE_CUTOFF {
            let data = self.api.fetch_sensor_data(sensor_id)?;
            self.store.update_sensor_data(sensor_id, &data)?;
        }

        Ok(())
    }

    /// Measurements for `[date_from, date_to]` (`date_to` defaults to now),
    /// extending the stored range at either edge first when needed.
    ///
    /// The recent edge refreshes when `date_to` and the latest stored point
    /// fall in different hours; the historical edge when `date_from` is at
    /// least an hour older than the oldest stored point. Both may fire for
    /// one request. After any refresh attempts the store's range query is
    /// the answer; on a dead connection that means the best coverage
    /// already persisted, which self-heals on a later call.
    pub fn fetch_sensor_data(
        &mut self,
        sensor_id: i64,
        date_from: OffsetDateTime,
        date_to: Option<OffsetDateTime>,
    ) -> Result<Vec<SensorValueView>> {
        let date_to = date_to.unwrap_or_else(OffsetDateTime::now_utc);

        let latest = self.store.fetch_latest_sensor_record_date(sensor_id)?;
        let oldest = self.store.fetch_oldest_sensor_record_date(sensor_id)?;

        let refreshed = match (oldest, latest) {
            (Some(oldest), Some(latest)) => {
                let mut result = Ok(());
                if truncate_to_hour(date_to) != truncate_to_hour(latest) {
                    result = self.update_sensor_data(sensor_id, date_from.max(latest), date_to);
                }
                if result.is_ok() && date_from <= oldest - Duration::hours(1) {
                    result = self.update_sensor_data(sensor_id, date_from, date_to.min(oldest));
                }
                result
            }
            // Nothing stored yet: pull the whole requested range.
            _ => self.update_sensor_data(sensor_id, date_from, date_to),
        };
        allow_stale(refreshed, "sensor data")?;

        Ok(self.store.fetch_sensor_data(sensor_id, date_from, date_to)?)
    }
}

/// Exactly-at-interval counts as stale.
fn is_stale(last_update: OffsetDateTime, interval: Duration) -> bool {
    OffsetDateTime::now_utc() - last_update >= interval
}

/// Let opportunistic refresh fall back to local data on transport failure.
fn allow_stale(result: Result<()>, what: &str) -> Result<()> {
    match result {
        Err(e) if e.is_connectivity() => {
            warn!("Error while updating {what}: {e}");
            Ok(())
        }
        other => other,
    }
}

/// Truncate to the top of the hour, so sub-minute clock drift between "now"
/// and the last recorded point cannot cause refresh storms.
fn truncate_to_hour(at: OffsetDateTime) -> OffsetDateTime {
    at.replace_minute(0)
        .unwrap()
        .replace_second(0)
        .unwrap()
        .replace_nanosecond(0)
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn hour_truncation_drops_sub_hour_precision() {
        assert_eq!(
            truncate_to_hour(datetime!(2024-03-01 12:59:59.5 UTC)),
            datetime!(2024-03-01 12:00 UTC)
        );
        assert_eq!(
            truncate_to_hour(datetime!(2024-03-01 12:00 UTC)),
            datetime!(2024-03-01 12:00 UTC)
        );
    }

    #[test]
    fn staleness_comparison_is_inclusive() {
        let now = OffsetDateTime::now_utc();
        // Zero interval: anything at or before now is stale.
        assert!(is_stale(now - Duration::seconds(1), Duration::ZERO));
        // Never updated is maximally stale.
        assert!(is_stale(
            OffsetDateTime::UNIX_EPOCH,
            Duration::days(365 * 10)
        ));
        // Fresh data under a generous interval is not stale.
        assert!(!is_stale(now, Duration::days(1)));
    }
}
