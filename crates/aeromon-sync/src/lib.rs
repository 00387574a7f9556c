//! Synchronization policy between the remote air-quality API and the local
//! replica.
//!
//! The [`Repository`] is the only entry point consumers call. Per entity it
//! keeps the replica fresh against configured intervals; per sensor time
//! range it extends the stored coverage at either edge. All queries answer
//! from the store, so consumers keep working on whatever was last synced
//! while the remote service is unreachable.
//!
//! Concurrency is structural: each worker thread takes its own repository
//! via [`Repository::try_clone`], which duplicates the store connection and
//! shares the API client. No locks, no internal threads.
//!
//! # Example
//!
//! ```no_run
//! use aeromon_sync::{Config, Repository};
//!
//! let config = Config::load_default()?;
//! let mut repository = Repository::from_config(&config)?;
//!
//! for station in repository.get_station_list_view()? {
//!     println!("{} ({})", station.name, station.city);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod error;
mod repository;

pub use config::{
    ApiConfig, Config, ConfigError, StorageConfig, SyncConfig, ValidationError,
    default_config_path,
};
pub use error::{Error, Result};
pub use repository::Repository;
