//! Error types for aeromon-api.

use std::fmt;

/// Result type for aeromon-api operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the remote API client.
///
/// The client only classifies and re-raises; it never swallows errors.
/// Callers decide per variant whether to retry, back off, or fall back to
/// cached data.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The transport itself failed (DNS, connect, timeout). Always retryable
    /// later; flips the client's connectivity flag to unreachable.
    #[error("Remote service unreachable: {0}")]
    Connectivity(#[source] reqwest::Error),

    /// The service answered with a structured HTTP error body.
    #[error("Remote service error: {0}")]
    Remote(RemoteFault),

    /// The archival endpoint's rate limit was hit (max 2 requests per
    /// minute). Distinguished from [`Error::Remote`] so callers can show a
    /// "slow down" message instead of a generic failure.
    #[error("Remote service rate limit exceeded (max 2 archival requests per minute)")]
    TooManyRequests,

    /// The payload did not have the shape the API contract promises.
    /// Indicates a contract break, not unavailability; never swallowed.
    #[error("Unexpected payload shape: {0}")]
    Integrity(String),
}

/// Structured error body returned by the service.
///
/// Every field is optional; the service omits what it cannot say.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteFault {
    pub code: Option<String>,
    pub reason: Option<String>,
    pub result: Option<String>,
    pub solution: Option<String>,
}

impl fmt::Display for RemoteFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.code.as_deref().unwrap_or("unknown"))?;
        for part in [&self.reason, &self.result, &self.solution]
            .into_iter()
            .flatten()
        {
            write!(f, " {part}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_fault_display_skips_missing_fields() {
        let fault = RemoteFault {
            code: Some("API-ERR-000001".into()),
            reason: Some("bad request".into()),
            result: None,
            solution: None,
        };
        assert_eq!(fault.to_string(), "[API-ERR-000001] bad request");

        let empty = RemoteFault::default();
        assert_eq!(empty.to_string(), "[unknown]");
    }

    #[test]
    fn error_display() {
        let err = Error::Integrity("fragment is a string".into());
        assert!(err.to_string().contains("fragment is a string"));

        let err = Error::TooManyRequests;
        assert!(err.to_string().contains("rate limit"));
    }
}
