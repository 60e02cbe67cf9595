//! Error types for the sync client.
//!
//! None of these are fatal. The sync engine recovers from every variant
//! locally and surfaces a plain `bool` to the application; the typed
//! variants exist for the `try_*` entry points and for logging.
//!
//! A read of a variable that was never written or pulled is *not* an
//! error: the typed readers resolve it to a zero value.

use core::fmt;

use crate::app::ports::StorageError;
use crate::config::ConfigError;

// ---------------------------------------------------------------------------
// Sync errors
// ---------------------------------------------------------------------------

/// Failure of a single sync operation (heartbeat, push or pull).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// The transport reported it is not ready; no request was attempted.
    TransportUnavailable,
    /// Every attempt returned an empty response.
    RequestFailed {
        /// Number of transport invocations made before giving up.
        attempts: u8,
    },
    /// The response body could not be decoded into the expected shape.
    /// The `&'static str` names what was missing or malformed.
    ParseFailed(&'static str),
    /// The server answered with `"success": false`.
    Rejected,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportUnavailable => write!(f, "transport unavailable"),
            Self::RequestFailed { attempts } => {
                write!(f, "request failed after {attempts} attempt(s)")
            }
            Self::ParseFailed(what) => write!(f, "parse failed: {what}"),
            Self::Rejected => write!(f, "rejected by server"),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Sync(SyncError),
    Config(ConfigError),
    Storage(StorageError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(e) => write!(f, "sync: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
        }
    }
}

impl From<SyncError> for Error {
    fn from(e: SyncError) -> Self {
        Self::Sync(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl std::error::Error for Error {}
impl std::error::Error for SyncError {}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
