//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements | Connects to                              |
//! |-------------|------------|------------------------------------------|
//! | `http`      | Transport  | HTTP server (ESP-IDF client / reqwest)   |
//! | `pubsub`    | Transport  | Message broker via a [`pubsub::MessageLink`] |
//! | `nvs`       | Storage    | NVS / in-memory store                    |
//! | `time`      | Clock      | ESP32 system timer / `Instant`           |

pub mod http;
pub mod nvs;
pub mod pubsub;
pub mod time;
