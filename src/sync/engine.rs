//! Sync engine — the device-side client.
//!
//! [`SyncEngine`] owns the variable cache (and its dispatcher) and borrows
//! a [`Transport`] for its whole lifetime.  It is the only component that
//! mutates the cache in response to network activity.
//!
//! ```text
//!  host loop ──▶ service() ──▶ heartbeat ──▶ pull ──▶ cache.set ──▶ handler
//!  app write ──▶ virtual_write_*() ──▶ push ──▶ (ok) cache.set ──▶ handler
//! ```
//!
//! Everything is synchronous.  `service()` must be called frequently; a
//! heartbeat + pull cycle runs once per interval, and a failed cycle is
//! simply retried on the next interval.

use log::{debug, info, warn};

use crate::app::cache::VariableCache;
use crate::app::dispatch::Handler;
use crate::app::ports::{Clock, Header, Headers, Method, Request, Storage, Transport};
use crate::app::variable::{VarType, format_bool, format_float, format_int};
use crate::config::ClientConfig;
use crate::error::SyncError;

use super::retry::{RetryPolicy, request_with_retry};
use super::wire;

pub const HEARTBEAT_ENDPOINT: &str = "/api/device/heartbeat";
pub const VARIABLE_ENDPOINT: &str = "/api/device/variable";
pub const VARIABLES_ENDPOINT: &str = "/api/device/variables";

/// Storage key for the cache snapshot.
pub const SNAPSHOT_KEY: &str = "vars";

/// Header carrying the device credential.
pub const DEVICE_KEY_HEADER: &str = "X-DEVICE-KEY";

/// What a call to [`SyncEngine::service`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Interval not yet elapsed; no network activity.
    Idle,
    /// A heartbeat + pull cycle ran.
    Synced { heartbeat_ok: bool, pull_ok: bool },
}

/// Running counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub heartbeats_ok: u32,
    pub heartbeats_failed: u32,
    pub pushes_ok: u32,
    pub pushes_failed: u32,
    pub pulls_ok: u32,
    pub pulls_failed: u32,
    /// Variables written into the cache by pulls and snapshot restores.
    pub variables_applied: u32,
    /// Every transport invocation, including retries.
    pub transport_attempts: u32,
}

pub struct SyncEngine<'a, T: Transport + ?Sized, C: Clock> {
    transport: &'a mut T,
    clock: C,
    cache: VariableCache,
    device_key: String,
    heartbeat_interval_ms: u32,
    last_heartbeat_ms: u64,
    retry: RetryPolicy,
    stats: SyncStats,
}

impl<'a, T: Transport + ?Sized, C: Clock> SyncEngine<'a, T, C> {
    /// Construct the engine.  Call [`begin`](Self::begin) once the network
    /// is up to start the heartbeat timer.
    pub fn new(config: &ClientConfig, transport: &'a mut T, clock: C) -> Self {
        Self {
            transport,
            clock,
            cache: VariableCache::new(),
            device_key: config.device_key.clone(),
            heartbeat_interval_ms: config.heartbeat_interval_ms,
            last_heartbeat_ms: 0,
            retry: RetryPolicy::from(config),
            stats: SyncStats::default(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the heartbeat timer; the first cycle runs one interval later.
    pub fn begin(&mut self) -> bool {
        self.last_heartbeat_ms = self.clock.now_ms();
        info!(
            "Sync: started (heartbeat every {} ms, {} retr{})",
            self.heartbeat_interval_ms,
            self.retry.retries,
            if self.retry.retries == 1 { "y" } else { "ies" }
        );
        true
    }

    /// Service the engine.  Call from the host loop as often as possible.
    ///
    /// The transport is pumped every call.  Once the interval has elapsed a
    /// heartbeat is sent, a pull is attempted regardless of the heartbeat
    /// result, and the timer advances regardless of either.
    pub fn service(&mut self) -> TickOutcome {
        self.transport.service();

        let now = self.clock.now_ms();
        if now.wrapping_sub(self.last_heartbeat_ms) < u64::from(self.heartbeat_interval_ms) {
            return TickOutcome::Idle;
        }

        let heartbeat_ok = self.send_heartbeat();
        let pull_ok = self.sync_now();
        self.last_heartbeat_ms = now;
        debug!("Sync: cycle done, stats={:?}", self.stats);

        TickOutcome::Synced {
            heartbeat_ok,
            pull_ok,
        }
    }

    pub fn set_heartbeat_interval(&mut self, ms: u32) {
        self.heartbeat_interval_ms = ms;
        info!("Sync: heartbeat interval set to {} ms", ms);
    }

    pub fn heartbeat_interval_ms(&self) -> u32 {
        self.heartbeat_interval_ms
    }

    pub fn last_heartbeat_ms(&self) -> u64 {
        self.last_heartbeat_ms
    }

    /// Whether the transport is ready (connecting it if needed).
    pub fn is_connected(&mut self) -> bool {
        self.transport.connect_if_needed()
    }

    // ── Heartbeat ─────────────────────────────────────────────

    pub fn send_heartbeat(&mut self) -> bool {
        match self.try_heartbeat() {
            Ok(()) => {
                self.stats.heartbeats_ok += 1;
                true
            }
            Err(e) => {
                self.stats.heartbeats_failed += 1;
                warn!("Sync: heartbeat failed: {}", e);
                false
            }
        }
    }

    pub fn try_heartbeat(&mut self) -> Result<(), SyncError> {
        let body = wire::encode_heartbeat(self.clock.now_ms());
        let response = self.exchange(Method::Post, HEARTBEAT_ENDPOINT, &body)?;
        if wire::is_acknowledged(&response) {
            Ok(())
        } else {
            Err(SyncError::Rejected)
        }
    }

    // ── Push ──────────────────────────────────────────────────

    pub fn virtual_write_int(&mut self, name: &str, value: i32) -> bool {
        self.write(name, VarType::Int, &format_int(value))
    }

    pub fn virtual_write_float(&mut self, name: &str, value: f32) -> bool {
        self.write(name, VarType::Float, &format_float(value))
    }

    pub fn virtual_write_bool(&mut self, name: &str, value: bool) -> bool {
        self.write(name, VarType::Bool, &format_bool(value))
    }

    pub fn virtual_write_text(&mut self, name: &str, value: &str) -> bool {
        self.write(name, VarType::Text, value)
    }

    fn write(&mut self, name: &str, var_type: VarType, value: &str) -> bool {
        match self.try_write(name, var_type, value) {
            Ok(()) => true,
            Err(e) => {
                warn!("Sync: write '{}' failed: {}", name, e);
                false
            }
        }
    }

    /// Push one canonical-text value.  On success the cache is updated with
    /// the locally intended value (and its handler fires); on failure the
    /// cache is left untouched.
    pub fn try_write(&mut self, name: &str, var_type: VarType, value: &str) -> Result<(), SyncError> {
        let body = wire::encode_push(name, var_type, value);
        let result = self
            .exchange(Method::Post, VARIABLE_ENDPOINT, &body)
            .and_then(|response| {
                if wire::is_acknowledged(&response) {
                    Ok(())
                } else {
                    Err(SyncError::Rejected)
                }
            });

        match result {
            Ok(()) => {
                self.stats.pushes_ok += 1;
                self.cache.set(name, var_type, value);
                Ok(())
            }
            Err(e) => {
                self.stats.pushes_failed += 1;
                Err(e)
            }
        }
    }

    // ── Pull ──────────────────────────────────────────────────

    /// Fetch the full variable list and apply it.
    pub fn sync_now(&mut self) -> bool {
        match self.try_sync_now() {
            Ok(applied) => {
                debug!("Sync: pulled {} variable(s)", applied);
                true
            }
            Err(e) => {
                warn!("Sync: pull failed: {}", e);
                false
            }
        }
    }

    /// Returns the number of variables applied.  Every pulled variable is
    /// written and dispatched, changed or not.
    pub fn try_sync_now(&mut self) -> Result<usize, SyncError> {
        let result = self
            .exchange(Method::Get, VARIABLES_ENDPOINT, "")
            .and_then(|body| wire::decode_variables(&body));

        match result {
            Ok(vars) => {
                self.stats.pulls_ok += 1;
                Ok(self.apply(&vars))
            }
            Err(e) => {
                self.stats.pulls_failed += 1;
                Err(e)
            }
        }
    }

    fn apply(&mut self, vars: &[wire::PulledVariable]) -> usize {
        for v in vars {
            self.cache.set(&v.name, v.var_type, &v.value);
        }
        self.stats.variables_applied = self
            .stats
            .variables_applied
            .saturating_add(vars.len() as u32);
        vars.len()
    }

    // ── Reads (cache only, never fail) ────────────────────────

    pub fn virtual_read_int(&self, name: &str) -> i32 {
        self.cache.read_int(name)
    }

    pub fn virtual_read_float(&self, name: &str) -> f32 {
        self.cache.read_float(name)
    }

    pub fn virtual_read_bool(&self, name: &str) -> bool {
        self.cache.read_bool(name)
    }

    pub fn virtual_read_text(&self, name: &str) -> String {
        self.cache.read_text(name)
    }

    // ── Change handlers ───────────────────────────────────────

    pub fn on_write_int(&mut self, name: &str, f: impl FnMut(i32) + 'static) {
        self.on_write(name, Handler::int(f));
    }

    pub fn on_write_float(&mut self, name: &str, f: impl FnMut(f32) + 'static) {
        self.on_write(name, Handler::float(f));
    }

    pub fn on_write_bool(&mut self, name: &str, f: impl FnMut(bool) + 'static) {
        self.on_write(name, Handler::bool(f));
    }

    pub fn on_write_text(&mut self, name: &str, f: impl FnMut(&str) + 'static) {
        self.on_write(name, Handler::text(f));
    }

    /// Register `handler` for `name`, replacing any previous one.
    pub fn on_write(&mut self, name: &str, handler: Handler) {
        self.cache.on_change(name, handler);
    }

    // ── Snapshot persistence ──────────────────────────────────

    /// Persist the cache under [`SNAPSHOT_KEY`].
    pub fn save_snapshot(&self, storage: &mut impl Storage) -> bool {
        let json = wire::encode_variables(self.cache.iter());
        let ok = storage.save(SNAPSHOT_KEY, &json);
        if ok {
            info!("Sync: snapshot saved ({} variables)", self.cache.len());
        } else {
            warn!("Sync: snapshot save failed");
        }
        ok
    }

    /// Re-apply a stored snapshot through the cache (handlers fire).
    /// A missing or corrupt snapshot leaves the cache untouched.
    pub fn restore_snapshot(&mut self, storage: &impl Storage) -> bool {
        let Some(json) = storage.load(SNAPSHOT_KEY) else {
            debug!("Sync: no snapshot stored");
            return false;
        };
        match wire::decode_variables(&json) {
            Ok(vars) => {
                let n = self.apply(&vars);
                info!("Sync: restored {} variables from snapshot", n);
                true
            }
            Err(e) => {
                warn!("Sync: snapshot unreadable: {}", e);
                false
            }
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn cache(&self) -> &VariableCache {
        &self.cache
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn transport(&self) -> &T {
        &*self.transport
    }

    // ── Internal ──────────────────────────────────────────────

    /// One retried exchange carrying the standard headers.
    fn exchange(&mut self, method: Method, endpoint: &str, body: &str) -> Result<String, SyncError> {
        let request = build_request(method, endpoint, body, &self.device_key);
        let result = request_with_retry(&mut *self.transport, &mut self.clock, self.retry, &request);
        match result {
            Ok(response) => {
                self.stats.transport_attempts += u32::from(response.attempts);
                Ok(response.body)
            }
            Err(e) => {
                if let SyncError::RequestFailed { attempts } = e {
                    self.stats.transport_attempts += u32::from(attempts);
                }
                Err(e)
            }
        }
    }
}

fn build_request<'r>(method: Method, endpoint: &'r str, body: &'r str, device_key: &'r str) -> Request<'r> {
    let mut headers = Headers::new();
    // Capacity is MAX_HEADERS (4); two always fit.
    let _ = headers.push(Header {
        name: "Content-Type",
        value: "application/json",
    });
    let _ = headers.push(Header {
        name: DEVICE_KEY_HEADER,
        value: device_key,
    });
    Request {
        method,
        endpoint,
        body,
        headers,
    }
}
