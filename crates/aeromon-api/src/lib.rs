//! Blocking client for the GIOŚ (api.gios.gov.pl) air-quality REST API.
//!
//! This crate is the replica's only window to the network. It issues
//! paginated GET requests, merges pages, maps the service's payloads into
//! the shared record types, and classifies failures:
//!
//! - [`Error::Connectivity`]: the transport failed; retry later, serve cache
//! - [`Error::Remote`]: the service returned a structured error body
//! - [`Error::TooManyRequests`]: the archival endpoint's rate limit
//! - [`Error::Integrity`]: the payload broke the contract; never swallowed
//!
//! A shared [`ConnectivityMonitor`] tracks reachability and notifies
//! subscribers on every flip.
//!
//! # Example
//!
//! ```no_run
//! use aeromon_api::Client;
//!
//! let client = Client::new();
//! client.connectivity().subscribe(|reachable| {
//!     eprintln!("remote service reachable: {reachable}");
//! });
//!
//! let stations = client.fetch_stations()?;
//! println!("{} stations", stations.len());
//! # Ok::<(), aeromon_api::Error>(())
//! ```

mod client;
mod connectivity;
mod error;
mod wire;

pub use client::{
    Client, DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE, RATE_LIMIT_ERROR_CODE, STREAM_PAGE_SIZE,
};
pub use connectivity::ConnectivityMonitor;
pub use error::{Error, RemoteFault, Result};
