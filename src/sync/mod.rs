//! Synchronisation subsystem.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       SyncEngine                         │
//! │                                                          │
//! │  service() ─▶ heartbeat ─▶ pull ─┐                       │
//! │  write()   ─▶ push ──────────────┤                       │
//! │                                  ▼                       │
//! │   ┌────────────┐   ┌────────┐   ┌──────────────────────┐ │
//! │   │   retry    │──▶│  wire  │──▶│ VariableCache        │ │
//! │   │ (backoff)  │   │ (JSON) │   │  └─ CallbackDispatch │ │
//! │   └─────┬──────┘   └────────┘   └──────────────────────┘ │
//! │         ▼                                                │
//! │   Transport (trait)                                      │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod engine;
pub mod retry;
pub mod wire;

pub use engine::{SyncEngine, SyncStats, TickOutcome};
pub use retry::RetryPolicy;
