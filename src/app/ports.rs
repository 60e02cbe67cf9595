//! Port traits — the hexagonal boundary between the sync core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SyncEngine (domain)
//! ```
//!
//! Driven adapters (HTTP, pub/sub messaging, NVS, system timer) implement
//! these traits.  The [`SyncEngine`](crate::sync::SyncEngine) borrows them
//! via generics, so the core never touches a socket or a flash page
//! directly and the same logic runs unchanged over every transport.

use core::fmt;

// ───────────────────────────────────────────────────────────────
// Transport port (driven adapter: domain ↔ server)
// ───────────────────────────────────────────────────────────────

/// Request verb.  The sync protocol only needs these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// A single request header.  Opaque to the core beyond construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

/// Maximum number of headers the engine attaches to a request.
pub const MAX_HEADERS: usize = 4;

/// Fixed-capacity header list.
pub type Headers<'a> = heapless::Vec<Header<'a>, MAX_HEADERS>;

/// One outbound request as seen by a [`Transport`].
#[derive(Debug, Clone)]
pub struct Request<'a> {
    pub method: Method,
    /// Server-relative path, e.g. `/api/device/heartbeat`.
    pub endpoint: &'a str,
    /// JSON body.  Empty for `GET`.
    pub body: &'a str,
    pub headers: Headers<'a>,
}

impl Request<'_> {
    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value)
    }
}

/// Synchronous request/response channel to the sync server.
///
/// Concrete implementations:
/// - HTTP client (request/response)
/// - Pub/sub messaging client, where `GET` returns the payload most
///   recently received on the matching topic
///
/// A failed exchange is reported as `None`.  An empty `Some("")` is
/// treated identically by the engine.
pub trait Transport {
    /// Perform one exchange.  Must not retry internally.
    fn request(&mut self, request: &Request<'_>) -> Option<String>;

    /// Background pumping (message queues, keep-alives).  Called once per
    /// engine tick.  Default: nothing to do.
    fn service(&mut self) {}

    /// Best-effort readiness check before a request is issued.
    fn connect_if_needed(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Small string key/value persistence that survives restarts.
///
/// Used at startup/shutdown only (credentials, config, cache snapshot),
/// never on the sync hot path.
pub trait Storage {
    /// Prepare the backend.  Returns `false` if it is unusable.
    fn initialize(&mut self) -> bool;

    /// Persist `value` under `key` atomically.
    fn save(&mut self, key: &str, value: &str) -> bool;

    /// Read the value stored under `key`.
    fn load(&self, key: &str) -> Option<String>;

    /// Check whether a key exists without reading it.
    fn exists(&self, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: domain ↔ system timer)
// ───────────────────────────────────────────────────────────────

/// Monotonic time source plus a blocking delay for retry backoff.
pub trait Clock {
    /// Milliseconds since boot.
    fn now_ms(&self) -> u64;

    /// Block the calling context for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from storage-backed helpers built on top of [`Storage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// The backend refused the write.
    WriteFailed,
    /// Key is empty or longer than the backend allows.
    InvalidKey,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::InvalidKey => write!(f, "invalid key"),
        }
    }
}
