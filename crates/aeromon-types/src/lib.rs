//! Shared types for the aeromon air-quality data replica.
//!
//! This crate holds the plain value records exchanged between the remote API
//! client, the persistent store, and the synchronization layer. Two separate
//! families are kept on purpose:
//!
//! - [`records`]: API-shaped records, as received from the remote service
//! - [`views`]: store-shaped views, as read back for consumers
//!
//! A change in the remote field set never silently changes the store's
//! contract, and vice versa.

pub mod catalog;
pub mod records;
pub mod views;

pub use catalog::{INDEX_CATEGORIES, INDEX_POLLUTANTS, OVERALL_INDEX_CODE, SENSOR_TYPE_CATALOG};
pub use records::{AirQualityIndexes, IndexValue, Sensor, SensorDataPoint, Station, StationMeta};
pub use views::{
    AirQualityIndexView, SensorValueView, SensorView, StationDetailsView, StationListView,
    StationMetaView,
};
