//! Error types for the ticketkit library.
//!
//! ## Key Components
//!
//! - [`RaiseError`]: Domain validation failures on `raise` (bad item id, bad
//!   delta). Recovered locally and turned into a specific error reply.
//! - [`ProtocolError`]: Malformed request lines. Unknown commands and wrong
//!   token counts get the generic error reply; bad id and delta tokens get
//!   the same replies as the matching [`RaiseError`].
//! - [`SnapshotError`]: Snapshot file I/O. Fatal for the background syncer.
//! - [`InvariantError`]: Returned by `check_invariants` when the queue's
//!   bookkeeping no longer matches its indexes.
//! - [`ConfigError`]: Invalid server configuration.
//! - [`ServerError`]: Everything that can stop `ticketd`.
//!
//! ## Example Usage
//!
//! ```
//! use ticketkit::error::RaiseError;
//! use ticketkit::queue::PriorityQueue;
//!
//! let mut queue = PriorityQueue::new();
//! assert_eq!(queue.raise(0, 5), Err(RaiseError::InvalidItemId(0)));
//! assert_eq!(queue.raise(7, 0), Err(RaiseError::InvalidScore(0)));
//! assert!(queue.raise(7, 5).is_ok());
//! ```

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::ds::{ItemId, Score};

// ---------------------------------------------------------------------------
// RaiseError
// ---------------------------------------------------------------------------

/// Rejected `raise`: the request was well formed but a value is out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RaiseError {
    /// Item ids must be strictly positive.
    #[error("invalid item id {0}")]
    InvalidItemId(ItemId),
    /// Deltas must be at least 1.
    #[error("invalid score delta {0}")]
    InvalidScore(Score),
    /// `current + delta` does not fit in a score.
    #[error("raising item {item} from {current} by {delta} overflows")]
    ScoreOverflow {
        item: ItemId,
        current: Score,
        delta: Score,
    },
}

// ---------------------------------------------------------------------------
// ProtocolError
// ---------------------------------------------------------------------------

/// A request line that does not name a known command with the right shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty request")]
    Empty,
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("{command} takes {expected} argument(s), got {found}")]
    Arity {
        command: &'static str,
        expected: usize,
        found: usize,
    },
    /// Item id token is not a positive integer.
    #[error("invalid item id {0:?}")]
    InvalidItemId(String),
    /// Delta token is not an integer of at least 1.
    #[error("invalid score {0:?}")]
    InvalidScore(String),
}

// ---------------------------------------------------------------------------
// SnapshotError
// ---------------------------------------------------------------------------

/// Failure reading or writing the snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SnapshotError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Internal queue bookkeeping disagrees with the indexes.
///
/// Produced by [`PriorityQueue::check_invariants`](crate::queue::PriorityQueue::check_invariants).
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvariantError(String);

impl InvariantError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Server configuration parameter out of range.
///
/// Produced by `ServerConfig::validate`. Carries a human-readable
/// description of which parameter failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConfigError(String);

impl ConfigError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// ServerError
// ---------------------------------------------------------------------------

/// Fatal conditions for the `ticketd` process.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("network: {0}")]
    Io(#[from] io::Error),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raise_error_display() {
        assert_eq!(RaiseError::InvalidItemId(-3).to_string(), "invalid item id -3");
        assert_eq!(RaiseError::InvalidScore(0).to_string(), "invalid score delta 0");
        let overflow = RaiseError::ScoreOverflow {
            item: 1,
            current: i64::MAX,
            delta: 1,
        };
        assert!(overflow.to_string().contains("overflows"));
    }

    #[test]
    fn protocol_error_display() {
        let err = ProtocolError::Arity {
            command: "UPDATE",
            expected: 2,
            found: 1,
        };
        assert_eq!(err.to_string(), "UPDATE takes 2 argument(s), got 1");
        assert_eq!(
            ProtocolError::UnknownCommand("FLY".into()).to_string(),
            "unknown command \"FLY\""
        );
        assert_eq!(
            ProtocolError::InvalidItemId("abc".into()).to_string(),
            "invalid item id \"abc\""
        );
    }

    #[test]
    fn snapshot_error_names_path_and_keeps_source() {
        use std::error::Error as _;

        let err = SnapshotError::io(
            "/var/lib/ticketd.snapshot",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/var/lib/ticketd.snapshot"));
        assert!(err.source().is_some());
    }

    #[test]
    fn invariant_message_accessor() {
        let err = InvariantError::new("items stat 3 != indexed 2");
        assert_eq!(err.message(), "items stat 3 != indexed 2");
        assert_eq!(err.to_string(), "items stat 3 != indexed 2");
        assert_eq!(err.clone(), err);
    }

    #[test]
    fn config_message_accessor() {
        let err = ConfigError::new("port must be > 0");
        assert_eq!(err.message(), "port must be > 0");
        assert_eq!(err.to_string(), "port must be > 0");
    }

    #[test]
    fn server_error_wraps_sources() {
        let err: ServerError = ConfigError::new("sync interval must be > 0").into();
        assert_eq!(err.to_string(), "sync interval must be > 0");
        let err: ServerError = io::Error::new(io::ErrorKind::AddrInUse, "busy").into();
        assert!(err.to_string().starts_with("network:"));
    }
}
