//! Application core — pure domain logic, zero I/O.
//!
//! The typed variable model, the cache that holds it and the dispatcher
//! that notifies device logic of changes.  All interaction with the network,
//! flash and timers happens through the **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod cache;
pub mod dispatch;
pub mod ports;
pub mod variable;
