//! Local SQLite replica of the air-quality data set.
//!
//! This crate owns the persistent schema (stations, cities, sensors, sensor
//! types, indexes, time-series measurements) and the staleness bookkeeping
//! that the synchronization layer reads its decisions from. Every write
//! commits its rows and the matching "last updated at" stamp as one
//! transaction; staleness can never drift from the data it describes, and
//! callers never track it by hand.
//!
//! The store is purely local and never calls the network.
//!
//! # Example
//!
//! ```no_run
//! use aeromon_store::Store;
//!
//! let store = Store::open_default()?;
//! for station in store.get_station_list_view()? {
//!     println!("{} ({})", station.name, station.city);
//! }
//! # Ok::<(), aeromon_store::Error>(())
//! ```

mod error;
mod schema;
mod store;

pub use error::{Error, Result};
pub use schema::{SCHEMA_VERSION, STATION_LIST_UPDATE_ID};
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/aeromon/replica.db`
/// - macOS: `~/Library/Application Support/aeromon/replica.db`
/// - Windows: `C:\Users\<user>\AppData\Local\aeromon\replica.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("aeromon")
        .join("replica.db")
}
