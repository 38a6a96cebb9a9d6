//! Error taxonomy for tile loading.
//!
//! The engine distinguishes three failure classes:
//!
//! - [`LoadError::Network`] — the fetch failed (DNS, timeout, HTTP status).
//!   Retryable, but only by explicit host action (`Tileset::refresh`).
//! - [`LoadError::Parse`] — the payload was fetched but is malformed.
//!   Terminal for that tile; re-fetching the same bytes cannot help.
//! - [`LoadError::Cancelled`] — the request was discarded because the tile
//!   was evicted or the tileset torn down. Never surfaced to the host.
//!
//! Budget pressure is deliberately *not* an error: eviction is a soft
//! constraint handled by the cache, and required tiles are never evicted.

use thiserror::Error;

/// A failure while fetching or parsing one tile's content.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// The fetch failed before producing usable bytes.
    ///
    /// `status` carries the HTTP-like status code when one exists
    /// (e.g. 404 from a tile server); transport-level failures have none.
    #[error("network error{}: {message}", status_suffix(.status))]
    Network {
        /// HTTP-like status code, if the failure carried one.
        status: Option<u16>,
        /// Human-readable description for the host's failure notification.
        message: String,
    },

    /// The payload was fetched but could not be parsed into content.
    #[error("malformed content: {0}")]
    Parse(String),

    /// The request was discarded due to eviction or teardown.
    #[error("load cancelled")]
    Cancelled,
}

impl LoadError {
    /// Convenience constructor for a status-carrying network failure.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Network {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Returns the HTTP-like status code, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network { status, .. } => *status,
            _ => None,
        }
    }

    /// True for [`LoadError::Cancelled`], which is silent by contract.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" ({code})"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_error_displays_status_code() {
        let err = LoadError::http(404, "tile not found");
        assert_eq!(err.to_string(), "network error (404): tile not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn transport_error_has_no_status() {
        let err = LoadError::Network {
            status: None,
            message: "connection reset".into(),
        };
        assert_eq!(err.to_string(), "network error: connection reset");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn cancelled_is_silent_class() {
        assert!(LoadError::Cancelled.is_cancelled());
        assert!(!LoadError::Parse("bad magic".into()).is_cancelled());
    }
}
