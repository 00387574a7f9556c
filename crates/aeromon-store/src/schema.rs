//! Database schema, migrations, and static catalog seeds.

use rusqlite::Connection;

use aeromon_types::{INDEX_CATEGORIES, SENSOR_TYPE_CATALOG};

use crate::error::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Row id of the station-list entry in `global_update`.
pub const STATION_LIST_UPDATE_ID: i64 = 0;

/// Initialize the database schema and seed the static catalogs.
pub fn initialize(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;

    if version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if version < SCHEMA_VERSION {
        migrate(conn, version)?;
    }

    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 =
        conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;

    Ok(version)
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
        [version],
    )?;
    Ok(())
}

/// Create the initial schema (version 1).
///
/// Every statement is idempotent; re-running against an existing database is
/// a no-op, including the catalog seeds.
fn create_schema_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        -- Cities, created implicitly when a station referencing them is first seen
        CREATE TABLE IF NOT EXISTS city (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            district TEXT NOT NULL,
            voivodeship TEXT NOT NULL,
            city TEXT NOT NULL UNIQUE
        );

        -- Measuring stations; ids are assigned by the remote source
        CREATE TABLE IF NOT EXISTS station (
            id INTEGER PRIMARY KEY,
            codename TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            city_id INTEGER REFERENCES city(id),
            address TEXT,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL
        );

        -- One-to-one metadata extension per station
        CREATE TABLE IF NOT EXISTS station_meta (
            station_id INTEGER PRIMARY KEY REFERENCES station(id),
            international_codename TEXT,
            launch_date TEXT NOT NULL,
            close_date TEXT,
            station_type TEXT NOT NULL
        );

        -- Catalog of measurable sensor types, extended on the fly
        CREATE TABLE IF NOT EXISTS sensor_type (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            codename TEXT NOT NULL UNIQUE
        );

        -- Index category names as published by the source
        CREATE TABLE IF NOT EXISTS aq_index_category (
            value INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        );

        -- Current index per (station, sensor type); overwritten, never appended
        CREATE TABLE IF NOT EXISTS aq_index (
            station_id INTEGER NOT NULL REFERENCES station(id),
            sensor_type_id INTEGER NOT NULL REFERENCES sensor_type(id),
            value INTEGER REFERENCES aq_index_category(value),
            computed_at INTEGER,
            PRIMARY KEY (station_id, sensor_type_id)
        );

        -- Measurement positions
        CREATE TABLE IF NOT EXISTS sensor (
            id INTEGER PRIMARY KEY,
            station_id INTEGER NOT NULL REFERENCES station(id),
            sensor_type_id INTEGER NOT NULL REFERENCES sensor_type(id)
        );

        -- Time series; rows accumulate monotonically
        CREATE TABLE IF NOT EXISTS sensor_data (
            sensor_id INTEGER NOT NULL REFERENCES sensor(id),
            recorded_at INTEGER NOT NULL,
            value REAL NOT NULL,
            PRIMARY KEY (sensor_id, recorded_at)
        );

        -- Staleness bookkeeping, stamped inside every write transaction
        CREATE TABLE IF NOT EXISTS global_update (
            id INTEGER PRIMARY KEY,
            last_update_at INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS station_update (
            station_id INTEGER PRIMARY KEY REFERENCES station(id),
            last_sensors_update_at INTEGER NOT NULL DEFAULT 0,
            last_indexes_update_at INTEGER NOT NULL DEFAULT 0,
            last_meta_update_at INTEGER NOT NULL DEFAULT 0
        );
        "#,
    )?;

    seed_catalogs(conn)?;

    Ok(())
}

/// Seed the static catalogs. Duplicate seeding is a no-op.
fn seed_catalogs(conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO global_update (id) VALUES (?)",
        [STATION_LIST_UPDATE_ID],
    )?;

    let mut insert_category =
        conn.prepare("INSERT OR IGNORE INTO aq_index_category (value, name) VALUES (?1, ?2)")?;
    for (value, name) in INDEX_CATEGORIES {
        insert_category.execute(rusqlite::params![value, name])?;
    }

    let mut insert_type =
        conn.prepare("INSERT OR IGNORE INTO sensor_type (codename) VALUES (?)")?;
    for codename in SENSOR_TYPE_CATALOG {
        insert_type.execute([codename])?;
    }

    Ok(())
}

/// Run migrations from old_version to current.
fn migrate(conn: &Connection, old_version: i32) -> Result<()> {
    // No migrations yet; v1 is the first released schema.
    let _ = old_version;
    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_fresh_database() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "city",
            "station",
            "station_meta",
            "sensor_type",
            "aq_index_category",
            "aq_index",
            "sensor",
            "sensor_data",
            "global_update",
            "station_update",
            "schema_version",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn schema_version_tracking() {
        let conn = Connection::open_in_memory().unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), 0);

        initialize(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn seeding_twice_leaves_one_copy() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        create_schema_v1(&conn).unwrap(); // forced re-run

        let types: i64 = conn
            .query_row("SELECT COUNT(*) FROM sensor_type", [], |row| row.get(0))
            .unwrap();
        assert_eq!(types as usize, aeromon_types::SENSOR_TYPE_CATALOG.len());

        let categories: i64 = conn
            .query_row("SELECT COUNT(*) FROM aq_index_category", [], |row| row.get(0))
            .unwrap();
        assert_eq!(categories as usize, aeromon_types::INDEX_CATEGORIES.len());

        let globals: i64 = conn
            .query_row("SELECT COUNT(*) FROM global_update", [], |row| row.get(0))
            .unwrap();
        assert_eq!(globals, 1);
    }
}
