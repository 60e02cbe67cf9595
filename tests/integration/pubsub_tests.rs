//! Integration tests for the SyncEngine over the pub/sub transport.
//!
//! A loopback `MessageLink` stands in for the broker: published messages
//! are recorded, inbound ones are queued by the test.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::mock_adapters::{ManualClock, Seen};

use varsync::adapters::pubsub::{InboundMessage, MessageLink, PubSubTransport};
use varsync::config::ClientConfig;
use varsync::error::SyncError;
use varsync::sync::{SyncEngine, TickOutcome};

#[derive(Default)]
struct BrokerState {
    connected: bool,
    connect_attempts: u32,
    accept_connect: bool,
    published: Vec<(String, String)>,
    inbox: VecDeque<InboundMessage>,
}

/// Link handle sharing state with the test body.
#[derive(Clone, Default)]
struct Loopback(Rc<RefCell<BrokerState>>);

impl Loopback {
    fn online() -> Self {
        let link = Self::default();
        link.0.borrow_mut().accept_connect = true;
        link
    }

    fn deliver(&self, topic: &str, payload: &str) {
        self.0.borrow_mut().inbox.push_back(InboundMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
        });
    }

    fn published(&self) -> Vec<(String, String)> {
        self.0.borrow().published.clone()
    }
}

impl MessageLink for Loopback {
    fn connect(&mut self) -> bool {
        let mut s = self.0.borrow_mut();
        s.connect_attempts += 1;
        s.connected = s.accept_connect;
        s.connected
    }

    fn is_connected(&self) -> bool {
        self.0.borrow().connected
    }

    fn publish(&mut self, topic: &str, payload: &str) -> bool {
        let mut s = self.0.borrow_mut();
        if !s.connected {
            return false;
        }
        s.published.push((topic.to_string(), payload.to_string()));
        true
    }

    fn poll(&mut self) -> Option<InboundMessage> {
        self.0.borrow_mut().inbox.pop_front()
    }
}

fn config() -> ClientConfig {
    ClientConfig {
        heartbeat_interval_ms: 1_000,
        ..ClientConfig::new("k", "http://unused")
    }
}

#[test]
fn writes_publish_on_variable_topic() {
    let link = Loopback::online();
    let mut transport = PubSubTransport::new(link.clone(), "devices/vs-test");
    let mut engine = SyncEngine::new(&config(), &mut transport, ManualClock::new());

    assert!(engine.virtual_write_int("speed", 3));
    assert_eq!(engine.virtual_read_int("speed"), 3);
    assert_eq!(
        link.published(),
        vec![(
            "devices/vs-test/variable".to_string(),
            r#"{"name":"speed","value":"3","type":"int"}"#.to_string()
        )]
    );
    assert_eq!(link.0.borrow().connect_attempts, 1);
}

#[test]
fn cycle_publishes_heartbeat_and_applies_latest_variables() {
    let link = Loopback::online();
    let mut transport = PubSubTransport::new(link.clone(), "d");
    let clock = ManualClock::new();
    let seen = Seen::new();
    let s = seen.clone();

    let mut engine = SyncEngine::new(&config(), &mut transport, clock.clone());
    engine.on_write_text("mode", move |m| s.push(m.to_string()));
    assert!(engine.is_connected());
    engine.begin();

    link.deliver("d/variables", r#"{"variables":[{"name":"mode","type":"string","value":"eco"}]}"#);
    link.deliver("d/variables", r#"{"variables":[{"name":"mode","type":"string","value":"boost"}]}"#);

    clock.set(1_000);
    assert_eq!(
        engine.service(),
        TickOutcome::Synced {
            heartbeat_ok: true,
            pull_ok: true
        }
    );
    assert_eq!(seen.all(), vec!["boost".to_string()]);
    assert_eq!(link.published()[0].0, "d/heartbeat");
}

#[test]
fn nothing_received_means_pull_fails_after_retries() {
    let link = Loopback::online();
    let mut transport = PubSubTransport::new(link, "d");
    let clock = ManualClock::new();
    let mut engine = SyncEngine::new(&config(), &mut transport, clock.clone());

    assert_eq!(
        engine.try_sync_now(),
        Err(SyncError::RequestFailed { attempts: 2 })
    );
    assert_eq!(clock.delays(), vec![100]);
}

#[test]
fn broker_down_is_transport_unavailable() {
    let link = Loopback::default();
    let mut transport = PubSubTransport::new(link.clone(), "d");
    let mut engine = SyncEngine::new(&config(), &mut transport, ManualClock::new());

    assert_eq!(engine.try_heartbeat(), Err(SyncError::TransportUnavailable));
    assert!(!engine.virtual_write_bool("x", true));
    assert!(link.published().is_empty());
    assert_eq!(link.0.borrow().connect_attempts, 2);
}
