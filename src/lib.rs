//! varsync — device-side variable synchronisation client.
//!
//! A device keeps a local cache of named, typed variables (int, float,
//! bool, text) mirrored from a server.  The [`SyncEngine`] sends periodic
//! heartbeats, pulls the full variable list, pushes local writes, and
//! fires per-variable change handlers.  Network and persistence are
//! reached only through the port traits in [`app::ports`].
//!
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module; host builds get simulation backends.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod sync;

pub use app::cache::VariableCache;
pub use app::dispatch::{CallbackDispatcher, Handler};
pub use app::ports::{Clock, Method, Request, Storage, Transport};
pub use app::variable::{VarType, Variable};
pub use config::ClientConfig;
pub use error::{Error, SyncError};
pub use sync::{SyncEngine, SyncStats, TickOutcome};
