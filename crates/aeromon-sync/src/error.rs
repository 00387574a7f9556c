//! Error types for aeromon-sync.

/// Result type for aeromon-sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the synchronization layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The remote API client failed.
    #[error("Remote API failure: {0}")]
    Api(#[from] aeromon_api::Error),

    /// The local store failed.
    #[error("Store failure: {0}")]
    Store(#[from] aeromon_store::Error),
}

impl Error {
    /// Whether this is a transport-level failure that opportunistic refresh
    /// is allowed to swallow. Everything else propagates: a structural
    /// mismatch or rate limit is a fact the caller must see.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Error::Api(aeromon_api::Error::Connectivity(_)))
    }
}
