//! Mock adapters for integration tests.
//!
//! Scripted transport, manual clock and in-memory storage.  Each records
//! what the engine did so tests can assert on the full request history
//! without a network or flash.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use varsync::app::ports::{Clock, Method, Request, Storage, Transport};
use varsync::sync::engine::DEVICE_KEY_HEADER;

pub const ACK: &str = r#"{"success":true}"#;
pub const NACK: &str = r#"{"success":false}"#;

// ── Transport ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: Method,
    pub endpoint: String,
    pub body: String,
    pub device_key: Option<String>,
}

/// Per-endpoint scripted transport.
///
/// Queued replies are consumed first; once a queue is empty the
/// endpoint's standing reply (if any) is returned.
pub struct MockTransport {
    pub ready: bool,
    queued: HashMap<String, VecDeque<Option<String>>>,
    standing: HashMap<String, String>,
    pub calls: Vec<RecordedCall>,
    pub services: u32,
    pub connect_checks: u32,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self {
            ready: true,
            queued: HashMap::new(),
            standing: HashMap::new(),
            calls: Vec::new(),
            services: 0,
            connect_checks: 0,
        }
    }

    /// Answer every request to `endpoint` with `body`.
    pub fn respond(&mut self, endpoint: &str, body: &str) -> &mut Self {
        self.standing.insert(endpoint.to_string(), body.to_string());
        self
    }

    /// Stop answering `endpoint` (every request gets no response).
    pub fn silence(&mut self, endpoint: &str) -> &mut Self {
        self.standing.remove(endpoint);
        self
    }

    /// Queue one-off replies for `endpoint`; `None` is "no response".
    pub fn script(&mut self, endpoint: &str, replies: &[Option<&str>]) -> &mut Self {
        self.queued
            .entry(endpoint.to_string())
            .or_default()
            .extend(replies.iter().map(|r| r.map(str::to_string)));
        self
    }

    pub fn calls_to(&self, endpoint: &str) -> usize {
        self.calls.iter().filter(|c| c.endpoint == endpoint).count()
    }

    pub fn endpoints(&self) -> Vec<&str> {
        self.calls.iter().map(|c| c.endpoint.as_str()).collect()
    }
}

impl Transport for MockTransport {
    fn request(&mut self, request: &Request<'_>) -> Option<String> {
        self.calls.push(RecordedCall {
            method: request.method,
            endpoint: request.endpoint.to_string(),
            body: request.body.to_string(),
            device_key: request.header(DEVICE_KEY_HEADER).map(str::to_string),
        });
        if let Some(reply) = self
            .queued
            .get_mut(request.endpoint)
            .and_then(VecDeque::pop_front)
        {
            return reply;
        }
        self.standing.get(request.endpoint).cloned()
    }

    fn service(&mut self) {
        self.services += 1;
    }

    fn connect_if_needed(&mut self) -> bool {
        self.connect_checks += 1;
        self.ready
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Manually advanced clock.  Clones share the same time and delay log.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
    delays: Rc<RefCell<Vec<u32>>>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    pub fn delays(&self) -> Vec<u32> {
        self.delays.borrow().clone()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays.borrow_mut().push(ms);
        self.advance(u64::from(ms));
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MemStorage {
    pub map: HashMap<String, String>,
    pub fail_writes: bool,
}

#[allow(dead_code)]
impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemStorage {
    fn initialize(&mut self) -> bool {
        true
    }

    fn save(&mut self, key: &str, value: &str) -> bool {
        if self.fail_writes {
            return false;
        }
        self.map.insert(key.to_string(), value.to_string());
        true
    }

    fn load(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn exists(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }
}

// ── Handler recorder ──────────────────────────────────────────

/// Shared log of handler invocations.
#[derive(Clone, Default)]
pub struct Seen<T>(pub Rc<RefCell<Vec<T>>>);

#[allow(dead_code)]
impl<T: Clone> Seen<T> {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(Vec::new())))
    }

    pub fn push(&self, v: T) {
        self.0.borrow_mut().push(v);
    }

    pub fn all(&self) -> Vec<T> {
        self.0.borrow().clone()
    }

    pub fn count(&self) -> usize {
        self.0.borrow().len()
    }
}
