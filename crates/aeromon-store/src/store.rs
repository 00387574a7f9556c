//! Main store implementation.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::{debug, info};

use aeromon_types::{
    AirQualityIndexView, AirQualityIndexes, OVERALL_INDEX_CODE, Sensor, SensorDataPoint,
    SensorValueView, SensorView, Station, StationDetailsView, StationListView, StationMeta,
    StationMetaView,
};

use crate::error::{Error, Result};
use crate::schema::{self, STATION_LIST_UPDATE_ID};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// SQLite-based replica of the air-quality data set.
///
/// Owns all persisted state. Every `update_*` call commits its upserts and
/// the matching staleness stamp as one transaction, so a crash mid-write can
/// never leave the bookkeeping inconsistent with the data it describes. The
/// store never touches the network.
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::initialize(&conn)?;
        Ok(Self { conn, path: None })
    }

    /// Open an independent connection to the same backing file.
    ///
    /// Each worker thread gets its own handle this way; handles observe each
    /// other's data only after commit.
    pub fn duplicate_connection(&self) -> Result<Self> {
        match &self.path {
            Some(path) => Self::open(path),
            None => Err(Error::InMemoryNotDuplicable),
        }
    }
}

// Station operations
impl Store {
    /// Upsert the station catalog and the cities it references, stamping the
    /// station-list staleness record in the same commit.
    ///
    /// Cities are created implicitly on first sight and never deleted.
    pub fn update_stations(&mut self, stations: &[Station]) -> Result<()> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let tx = self.conn.transaction()?;
        {
            let mut insert_city = tx.prepare(
                "INSERT OR IGNORE INTO city (district, voivodeship, city) VALUES (?1, ?2, ?3)",
            )?;
            let mut upsert_station = tx.prepare(
                "INSERT INTO station (id, codename, name, city_id, address, latitude, longitude)
                 VALUES (?1, ?2, ?3, (SELECT id FROM city WHERE city = ?4), ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    codename = excluded.codename,
                    name = excluded.name,
                    city_id = excluded.city_id,
                    address = excluded.address,
                    latitude = excluded.latitude,
                    longitude = excluded.longitude",
            )?;

            for station in stations {
                insert_city.execute(rusqlite::params![
                    station.district,
                    station.voivodeship,
                    station.city,
                ])?;
                upsert_station.execute(rusqlite::params![
                    station.id,
                    station.codename,
                    station.name,
                    station.city,
                    station.address,
                    station.latitude,
                    station.longitude,
                ])?;
            }

            tx.execute(
                "UPDATE global_update SET last_update_at = ?1 WHERE id = ?2",
                rusqlite::params![now, STATION_LIST_UPDATE_ID],
            )?;
        }
        tx.commit()?;

        debug!("Upserted {} stations", stations.len());
        Ok(())
    }

    /// When the station list was last refreshed; epoch zero when never.
    pub fn get_last_stations_update(&self) -> Result<OffsetDateTime> {
        let ts: Option<i64> = self
            .conn
            .query_row(
                "SELECT last_update_at FROM global_update WHERE id = ?",
                [STATION_LIST_UPDATE_ID],
                |row| row.get(0),
            )
            .optional()?;
        Ok(OffsetDateTime::from_unix_timestamp(ts.unwrap_or(0)).unwrap())
    }

    /// All stations with their map coordinates and city.
    pub fn get_station_list_view(&self) -> Result<Vec<StationListView>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.name, s.latitude, s.longitude, c.city
             FROM station AS s
             JOIN city AS c ON c.id = s.city_id",
        )?;

        let stations = stmt
            .query_map([], |row| {
                Ok(StationListView {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    latitude: row.get(2)?,
                    longitude: row.get(3)?,
                    city: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(stations)
    }

    /// Full details of one station, `None` when the id is unknown.
    pub fn fetch_station_detail_view(&self, station_id: i64) -> Result<Option<StationDetailsView>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.codename, s.name, c.district, c.voivodeship, c.city, s.address
             FROM station AS s
             JOIN city AS c ON s.city_id = c.id
             WHERE s.id = ?",
        )?;

        let view = stmt
            .query_row([station_id], |row| {
                Ok(StationDetailsView {
                    id: station_id,
                    codename: row.get(0)?,
                    name: row.get(1)?,
                    district: row.get(2)?,
                    voivodeship: row.get(3)?,
                    city: row.get(4)?,
                    address: row.get(5)?,
                })
            })
            .optional()?;

        Ok(view)
    }
}

// Station metadata operations
impl Store {
    /// Upsert station metadata, stamping each affected station's meta
    /// staleness record in the same commit.
    ///
    /// The remote payload keys metadata by station codename; records whose
    /// codename matches no known station are skipped.
    pub fn update_station_meta(&mut self, meta: &[StationMeta]) -> Result<()> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let tx = self.conn.transaction()?;
        {
            let mut resolve =
                tx.prepare("SELECT id FROM station WHERE codename = ?")?;
            let mut upsert = tx.prepare(
                "INSERT INTO station_meta
                   (station_id, international_codename, launch_date, close_date, station_type)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(station_id) DO UPDATE SET
                    international_codename = excluded.international_codename,
                    launch_date = excluded.launch_date,
                    close_date = excluded.close_date,
                    station_type = excluded.station_type",
            )?;

            for record in meta {
                let station_id: Option<i64> = resolve
                    .query_row([&record.codename], |row| row.get(0))
                    .optional()?;
                let Some(station_id) = station_id else {
                    debug!("No station for meta codename {}, skipping", record.codename);
                    continue;
                };

                upsert.execute(rusqlite::params![
                    station_id,
                    record.international_codename,
                    format_date(record.launch_date),
                    record.close_date.map(format_date),
                    record.station_type,
                ])?;
                stamp_station_update(&tx, station_id, StationStamp::Meta, now)?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    /// When a station's metadata was last refreshed; epoch zero when never.
    pub fn fetch_last_station_meta_update(&self, station_id: i64) -> Result<OffsetDateTime> {
        self.fetch_station_stamp(station_id, StationStamp::Meta)
    }

    /// The stored metadata record, `None` when never synced.
    pub fn fetch_station_meta_view(&self, station_id: i64) -> Result<Option<StationMetaView>> {
        let mut stmt = self.conn.prepare(
            "SELECT international_codename, launch_date, close_date, station_type
             FROM station_meta WHERE station_id = ?",
        )?;

        let row = stmt
            .query_row([station_id], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .optional()?;

        let Some((international_codename, launch, close, station_type)) = row else {
            return Ok(None);
        };

        Ok(Some(StationMetaView {
            station_id,
            international_codename,
            launch_date: parse_date(&launch)?,
            close_date: close.as_deref().map(parse_date).transpose()?,
            station_type,
        }))
    }
}

// Air-quality index operations
impl Store {
    /// Upsert the current indexes for one station (the overall index plus
    /// every per-pollutant sub-index), stamping the station's index
    /// staleness record in the same commit. A new observation replaces the
    /// prior one.
    pub fn update_station_air_quality_indexes(
        &mut self,
        station_id: i64,
        indexes: &AirQualityIndexes,
    ) -> Result<()> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let tx = self.conn.transaction()?;
        {
            let mut insert_type =
                tx.prepare("INSERT OR IGNORE INTO sensor_type (codename) VALUES (?)")?;
            let mut upsert = tx.prepare(
                "INSERT INTO aq_index (station_id, sensor_type_id, value, computed_at)
                 VALUES (?1, (SELECT id FROM sensor_type WHERE codename = ?2), ?3, ?4)
                 ON CONFLICT(station_id, sensor_type_id) DO UPDATE SET
                    value = excluded.value,
                    computed_at = excluded.computed_at",
            )?;

            let entries = std::iter::once((OVERALL_INDEX_CODE, &indexes.overall)).chain(
                indexes
                    .pollutants
                    .iter()
                    .map(|(codename, index)| (codename.as_str(), index)),
            );
            for (codename, index) in entries {
                insert_type.execute([codename])?;
                upsert.execute(rusqlite::params![
                    station_id,
                    codename,
                    index.value,
                    index.computed_at.map(OffsetDateTime::unix_timestamp),
                ])?;
            }

            stamp_station_update(&tx, station_id, StationStamp::Indexes, now)?;
        }
        tx.commit()?;

        Ok(())
    }

    /// When a station's indexes were last refreshed; epoch zero when never.
    pub fn fetch_last_station_air_quality_indexes_update(
        &self,
        station_id: i64,
    ) -> Result<OffsetDateTime> {
        self.fetch_station_stamp(station_id, StationStamp::Indexes)
    }

    /// The current index value for one (station, sensor type) pair.
    pub fn fetch_station_air_quality_index_value(
        &self,
        station_id: i64,
        type_codename: &str,
    ) -> Result<Option<i64>> {
        let value: Option<Option<i64>> = self
            .conn
            .query_row(
                "SELECT aq.value
                 FROM aq_index AS aq
                 JOIN sensor_type AS st ON aq.sensor_type_id = st.id
                 WHERE aq.station_id = ?1 AND st.codename = ?2",
                rusqlite::params![station_id, type_codename],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value.flatten())
    }

    /// All stored indexes for a station, joined with their category names.
    pub fn fetch_station_air_quality_indexes(
        &self,
        station_id: i64,
    ) -> Result<Vec<AirQualityIndexView>> {
        let mut stmt = self.conn.prepare(
            "SELECT st.codename, aq.value, cat.name
             FROM aq_index AS aq
             JOIN sensor_type AS st ON aq.sensor_type_id = st.id
             LEFT JOIN aq_index_category AS cat ON aq.value = cat.value
             WHERE aq.station_id = ?
             ORDER BY st.codename",
        )?;

        let views = stmt
            .query_map([station_id], |row| {
                Ok(AirQualityIndexView {
                    codename: row.get(0)?,
                    value: row.get(1)?,
                    category: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(views)
    }
}

// Sensor operations
impl Store {
    /// Upsert the sensor catalog of one station, stamping the station's
    /// sensors staleness record in the same commit. Sensor types missing
    /// from the catalog are added on the fly.
    pub fn update_station_sensors(&mut self, station_id: i64, sensors: &[Sensor]) -> Result<()> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let tx = self.conn.transaction()?;
        {
            let mut insert_type =
                tx.prepare("INSERT OR IGNORE INTO sensor_type (codename) VALUES (?)")?;
            let mut insert_sensor = tx.prepare(
                "INSERT OR IGNORE INTO sensor (id, station_id, sensor_type_id)
                 VALUES (?1, ?2, (SELECT id FROM sensor_type WHERE codename = ?3))",
            )?;

            for sensor in sensors {
                insert_type.execute([&sensor.codename])?;
                insert_sensor.execute(rusqlite::params![
                    sensor.id,
                    station_id,
                    sensor.codename,
                ])?;
            }

            stamp_station_update(&tx, station_id, StationStamp::Sensors, now)?;
        }
        tx.commit()?;

        debug!("Upserted {} sensors for station {}", sensors.len(), station_id);
        Ok(())
    }

    /// When a station's sensor catalog was last refreshed; epoch zero when
    /// never.
    pub fn fetch_last_station_sensors_update(&self, station_id: i64) -> Result<OffsetDateTime> {
        self.fetch_station_stamp(station_id, StationStamp::Sensors)
    }

    /// The stored sensor catalog of one station.
    pub fn fetch_station_sensors(&self, station_id: i64) -> Result<Vec<SensorView>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, st.codename
             FROM sensor AS s
             JOIN sensor_type AS st ON s.sensor_type_id = st.id
             WHERE s.station_id = ?",
        )?;

        let sensors = stmt
            .query_map([station_id], |row| {
                Ok(SensorView {
                    id: row.get(0)?,
                    codename: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sensors)
    }
}

// Time-series operations
impl Store {
    /// Upsert measurements for one sensor. Re-ingesting a timestamp
    /// overwrites the value; rows are never duplicated or deleted.
    pub fn update_sensor_data(&mut self, sensor_id: i64, data: &[SensorDataPoint]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut upsert = tx.prepare(
                "INSERT INTO sensor_data (sensor_id, recorded_at, value)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(sensor_id, recorded_at) DO UPDATE SET value = excluded.value",
            )?;

            for point in data {
                upsert.execute(rusqlite::params![
                    sensor_id,
                    point.recorded_at.unix_timestamp(),
                    point.value,
                ])?;
            }
        }
        tx.commit()?;

        debug!("Upserted {} measurements for sensor {}", data.len(), sensor_id);
        Ok(())
    }

    /// Timestamp of the newest stored measurement, `None` when there are no
    /// rows.
    pub fn fetch_latest_sensor_record_date(&self, sensor_id: i64) -> Result<Option<OffsetDateTime>> {
        let ts: Option<i64> = self.conn.query_row(
            "SELECT MAX(recorded_at) FROM sensor_data WHERE sensor_id = ?",
            [sensor_id],
            |row| row.get(0),
        )?;
        Ok(ts.map(|ts| OffsetDateTime::from_unix_timestamp(ts).unwrap()))
    }

    /// Timestamp of the oldest stored measurement, `None` when there are no
    /// rows.
    pub fn fetch_oldest_sensor_record_date(&self, sensor_id: i64) -> Result<Option<OffsetDateTime>> {
        let ts: Option<i64> = self.conn.query_row(
            "SELECT MIN(recorded_at) FROM sensor_data WHERE sensor_id = ?",
            [sensor_id],
            |row| row.get(0),
        )?;
        Ok(ts.map(|ts| OffsetDateTime::from_unix_timestamp(ts).unwrap()))
    }

    /// Stored measurements within `[date_from, date_to]`, both ends
    /// inclusive, ascending by time.
    pub fn fetch_sensor_data(
        &self,
        sensor_id: i64,
        date_from: OffsetDateTime,
        date_to: OffsetDateTime,
    ) -> Result<Vec<SensorValueView>> {
        let mut stmt = self.conn.prepare(
            "SELECT recorded_at, value FROM sensor_data
             WHERE sensor_id = ?1 AND recorded_at >= ?2 AND recorded_at <= ?3
             ORDER BY recorded_at ASC",
        )?;

        let values = stmt
            .query_map(
                rusqlite::params![
                    sensor_id,
                    date_from.unix_timestamp(),
                    date_to.unix_timestamp()
                ],
                |row| {
                    Ok(SensorValueView {
                        recorded_at: OffsetDateTime::from_unix_timestamp(row.get(0)?).unwrap(),
                        value: row.get(1)?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(values)
    }
}

// Staleness bookkeeping internals
impl Store {
    fn fetch_station_stamp(&self, station_id: i64, stamp: StationStamp) -> Result<OffsetDateTime> {
        let sql = format!(
            "SELECT {} FROM station_update WHERE station_id = ?",
            stamp.column()
        );
        let ts: Option<i64> = self
            .conn
            .query_row(&sql, [station_id], |row| row.get(0))
            .optional()?;
        // A missing row means "never updated", indistinguishable from
        // maximally stale.
        Ok(OffsetDateTime::from_unix_timestamp(ts.unwrap_or(0)).unwrap())
    }
}

#[derive(Debug, Clone, Copy)]
enum StationStamp {
    Sensors,
    Indexes,
    Meta,
}

impl StationStamp {
    fn column(self) -> &'static str {
        match self {
            StationStamp::Sensors => "last_sensors_update_at",
            StationStamp::Indexes => "last_indexes_update_at",
            StationStamp::Meta => "last_meta_update_at",
        }
    }
}

/// Stamp one staleness column for a station, leaving the siblings untouched.
fn stamp_station_update(
    tx: &Connection,
    station_id: i64,
    stamp: StationStamp,
    at: i64,
) -> Result<()> {
    let sql = format!(
        "INSERT INTO station_update (station_id, {col}) VALUES (?1, ?2)
         ON CONFLICT(station_id) DO UPDATE SET {col} = excluded.{col}",
        col = stamp.column()
    );
    tx.execute(&sql, rusqlite::params![station_id, at])?;
    Ok(())
}

fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT)
        .expect("calendar date formatting is infallible")
}

fn parse_date(raw: &str) -> Result<Date> {
    Date::parse(raw, DATE_FORMAT).map_err(|e| Error::InvalidTimestamp(format!("{raw}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use aeromon_types::IndexValue;
    use time::macros::{date, datetime};

    fn sample_station(id: i64) -> Station {
        Station {
            id,
            codename: format!("ST{id:04}"),
            name: format!("Stacja {id}"),
            district: "Opole".into(),
            voivodeship: "OPOLSKIE".into(),
            city: "Opole".into(),
            address: Some("ul. Testowa 1".into()),
            latitude: 50.675,
            longitude: 17.925,
        }
    }

    fn store_with_station(id: i64) -> Store {
        let mut store = Store::open_in_memory().unwrap();
        store.update_stations(&[sample_station(id)]).unwrap();
        store
    }

    #[test]
    fn open_in_memory_is_empty() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.get_station_list_view().unwrap().is_empty());
    }

    #[test]
    fn station_upsert_is_idempotent() {
        let mut store = Store::open_in_memory().unwrap();

        store.update_stations(&[sample_station(1)]).unwrap();
        store.update_stations(&[sample_station(1)]).unwrap();

        let list = store.get_station_list_view().unwrap();
        assert_eq!(list.len(), 1);

        // Last write wins.
        let mut renamed = sample_station(1);
        renamed.name = "Stacja przemianowana".into();
        store.update_stations(&[renamed]).unwrap();
        let list = store.get_station_list_view().unwrap();
        assert_eq!(list[0].name, "Stacja przemianowana");
    }

    #[test]
    fn cities_are_created_implicitly_and_shared() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .update_stations(&[sample_station(1), sample_station(2)])
            .unwrap();

        let cities: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM city", [], |row| row.get(0))
            .unwrap();
        assert_eq!(cities, 1);

        let details = store.fetch_station_detail_view(2).unwrap().unwrap();
        assert_eq!(details.city, "Opole");
        assert_eq!(details.voivodeship, "OPOLSKIE");
    }

    #[test]
    fn unknown_station_detail_is_none() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.fetch_station_detail_view(999).unwrap().is_none());
    }

    #[test]
    fn station_list_staleness_is_stamped_on_write() {
        let mut store = Store::open_in_memory().unwrap();

        let never = store.get_last_stations_update().unwrap();
        assert_eq!(never.unix_timestamp(), 0);

        store.update_stations(&[sample_station(1)]).unwrap();
        let stamped = store.get_last_stations_update().unwrap();
        assert!(stamped >= never);
        assert!(OffsetDateTime::now_utc() - stamped < time::Duration::minutes(1));
    }

    #[test]
    fn empty_batch_still_stamps() {
        let mut store = Store::open_in_memory().unwrap();
        store.update_stations(&[]).unwrap();
        assert!(store.get_last_stations_update().unwrap().unix_timestamp() > 0);
    }

    #[test]
    fn never_synced_station_stamps_are_epoch_zero() {
        let store = Store::open_in_memory().unwrap();
        for stamp in [
            store.fetch_last_station_sensors_update(1).unwrap(),
            store.fetch_last_station_air_quality_indexes_update(1).unwrap(),
            store.fetch_last_station_meta_update(1).unwrap(),
        ] {
            assert_eq!(stamp.unix_timestamp(), 0);
        }
    }

    #[test]
    fn stamps_do_not_clobber_siblings() {
        let mut store = store_with_station(1);

        store
            .update_station_sensors(
                1,
                &[Sensor {
                    id: 10,
                    codename: "PM10".into(),
                    name: "pył zawieszony PM10".into(),
                }],
            )
            .unwrap();
        let sensors_stamp = store.fetch_last_station_sensors_update(1).unwrap();
        assert!(sensors_stamp.unix_timestamp() > 0);

        store
            .update_station_meta(&[StationMeta {
                codename: "ST0001".into(),
                international_codename: Some("PL0001A".into()),
                launch_date: date!(2001 - 01 - 01),
                close_date: None,
                station_type: "tło miejskie".into(),
            }])
            .unwrap();

        // The meta stamp landed without touching the sensors stamp.
        assert!(store.fetch_last_station_meta_update(1).unwrap().unix_timestamp() > 0);
        assert_eq!(
            store.fetch_last_station_sensors_update(1).unwrap(),
            sensors_stamp
        );
        assert_eq!(
            store
                .fetch_last_station_air_quality_indexes_update(1)
                .unwrap()
                .unix_timestamp(),
            0
        );
    }

    #[test]
    fn meta_round_trips_and_skips_unknown_codenames() {
        let mut store = store_with_station(1);

        store
            .update_station_meta(&[
                StationMeta {
                    codename: "ST0001".into(),
                    international_codename: Some("PL0001A".into()),
                    launch_date: date!(2001 - 01 - 01),
                    close_date: Some(date!(2020 - 06 - 30)),
                    station_type: "przemysłowa".into(),
                },
                StationMeta {
                    codename: "NOPE".into(),
                    international_codename: None,
                    launch_date: date!(1999 - 01 - 01),
                    close_date: None,
                    station_type: "tło miejskie".into(),
                },
            ])
            .unwrap();

        let view = store.fetch_station_meta_view(1).unwrap().unwrap();
        assert_eq!(view.international_codename.as_deref(), Some("PL0001A"));
        assert_eq!(view.launch_date, date!(2001 - 01 - 01));
        assert_eq!(view.close_date, Some(date!(2020 - 06 - 30)));

        let rows: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM station_meta", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    fn sample_indexes(overall: Option<i64>, pm10: Option<i64>) -> AirQualityIndexes {
        let mut pollutants = BTreeMap::new();
        pollutants.insert(
            "PM10".to_string(),
            IndexValue {
                computed_at: Some(datetime!(2024-03-01 12:20 UTC)),
                value: pm10,
            },
        );
        AirQualityIndexes {
            overall: IndexValue {
                computed_at: Some(datetime!(2024-03-01 12:20 UTC)),
                value: overall,
            },
            pollutants,
            index_status: Some(true),
            critical_pollutant: Some("PM10".into()),
        }
    }

    #[test]
    fn index_observation_replaces_prior_one() {
        let mut store = store_with_station(1);

        store
            .update_station_air_quality_indexes(1, &sample_indexes(Some(1), Some(2)))
            .unwrap();
        store
            .update_station_air_quality_indexes(1, &sample_indexes(Some(3), Some(0)))
            .unwrap();

        assert_eq!(
            store
                .fetch_station_air_quality_index_value(1, OVERALL_INDEX_CODE)
                .unwrap(),
            Some(3)
        );
        assert_eq!(
            store.fetch_station_air_quality_index_value(1, "PM10").unwrap(),
            Some(0)
        );

        // One row per (station, sensor type) pair.
        let rows: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM aq_index WHERE station_id = 1", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(rows, 2);
    }

    #[test]
    fn index_views_join_category_names() {
        let mut store = store_with_station(1);
        store
            .update_station_air_quality_indexes(1, &sample_indexes(Some(1), None))
            .unwrap();

        let views = store.fetch_station_air_quality_indexes(1).unwrap();
        let overall = views
            .iter()
            .find(|v| v.codename == OVERALL_INDEX_CODE)
            .unwrap();
        assert_eq!(overall.value, Some(1));
        assert_eq!(overall.category.as_deref(), Some("Dobry"));

        let pm10 = views.iter().find(|v| v.codename == "PM10").unwrap();
        assert_eq!(pm10.value, None);
        assert_eq!(pm10.category, None);
    }

    #[test]
    fn missing_index_value_is_none() {
        let store = store_with_station(1);
        assert_eq!(
            store.fetch_station_air_quality_index_value(1, "PM10").unwrap(),
            None
        );
    }

    #[test]
    fn sensors_upsert_extends_type_catalog() {
        let mut store = store_with_station(1);

        let sensors = [
            Sensor {
                id: 10,
                codename: "PM10".into(),
                name: "pył zawieszony PM10".into(),
            },
            Sensor {
                id: 11,
                codename: "C6H6".into(), // not in the seeded catalog
                name: "benzen".into(),
            },
        ];
        store.update_station_sensors(1, &sensors).unwrap();
        store.update_station_sensors(1, &sensors).unwrap();

        let mut views = store.fetch_station_sensors(1).unwrap();
        views.sort_by_key(|v| v.id);
        assert_eq!(views.len(), 2);
        assert_eq!(views[1].codename, "C6H6");
    }

    #[test]
    fn sensor_data_upsert_is_idempotent() {
        let mut store = store_with_station(1);
        store
            .update_station_sensors(
                1,
                &[Sensor {
                    id: 10,
                    codename: "PM10".into(),
                    name: "pył zawieszony PM10".into(),
                }],
            )
            .unwrap();

        let at = datetime!(2024-03-01 10:00 UTC);
        store
            .update_sensor_data(
                10,
                &[SensorDataPoint {
                    recorded_at: at,
                    value: 11.0,
                }],
            )
            .unwrap();
        store
            .update_sensor_data(
                10,
                &[SensorDataPoint {
                    recorded_at: at,
                    value: 12.5,
                }],
            )
            .unwrap();

        let values = store
            .fetch_sensor_data(10, at - time::Duration::hours(1), at)
            .unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value, 12.5);
    }

    #[test]
    fn range_query_is_inclusive_and_ascending() {
        let mut store = store_with_station(1);
        store
            .update_station_sensors(
                1,
                &[Sensor {
                    id: 10,
                    codename: "PM10".into(),
                    name: "pył zawieszony PM10".into(),
                }],
            )
            .unwrap();

        let base = datetime!(2024-03-01 10:00 UTC);
        let points: Vec<SensorDataPoint> = (0..5)
            .map(|h| SensorDataPoint {
                recorded_at: base + time::Duration::hours(h),
                value: h as f64,
            })
            .rev()
            .collect();
        store.update_sensor_data(10, &points).unwrap();

        assert_eq!(
            store.fetch_oldest_sensor_record_date(10).unwrap(),
            Some(base)
        );
        assert_eq!(
            store.fetch_latest_sensor_record_date(10).unwrap(),
            Some(base + time::Duration::hours(4))
        );

        let values = store
            .fetch_sensor_data(10, base + time::Duration::hours(1), base + time::Duration::hours(3))
            .unwrap();
        let got: Vec<f64> = values.iter().map(|v| v.value).collect();
        assert_eq!(got, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn empty_sensor_series_has_no_bounds() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.fetch_latest_sensor_record_date(10).unwrap(), None);
        assert_eq!(store.fetch_oldest_sensor_record_date(10).unwrap(), None);
    }

    #[test]
    fn duplicated_connection_sees_committed_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::open(dir.path().join("replica.db")).unwrap();
        store.update_stations(&[sample_station(1)]).unwrap();

        let duplicate = store.duplicate_connection().unwrap();
        assert_eq!(duplicate.get_station_list_view().unwrap().len(), 1);
    }

    #[test]
    fn in_memory_store_cannot_be_duplicated() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            store.duplicate_connection(),
            Err(Error::InMemoryNotDuplicable)
        ));
    }
}
