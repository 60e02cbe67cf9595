//! Pub/sub transport adapter (message-broker variant).
//!
//! Maps the request/response contract onto topics:
//!
//! | Request                        | Effect                                   |
//! |--------------------------------|------------------------------------------|
//! | `POST /api/device/<leaf>`      | publish body on `<root>/<leaf>`          |
//! | `GET  /api/device/<leaf>`      | latest payload received on `<root>/<leaf>` |
//!
//! Inbound messages are drained from the [`MessageLink`] on every
//! `service()` call (and before each `GET`) and kept per topic, latest
//! wins.  Only topics under the root are kept, at most
//! [`MAX_TRACKED_TOPICS`] of them.  A publish accepted by the link is
//! acknowledged locally with `{"success":true}` since brokers do not reply
//! per message.
//!
//! The link itself (MQTT client, ESP-NOW bridge, ...) is supplied by the
//! caller; this adapter only does topic routing and buffering.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::app::ports::{Method, Request, Transport};

/// Local acknowledgement for a published message.
pub const PUBLISH_ACK: &str = r#"{"success":true}"#;

/// Path prefix stripped from endpoints before topic mapping.
const ENDPOINT_PREFIX: &str = "/api/device/";

/// Inbound messages handled per `service()` call.
pub const DEFAULT_MAX_DRAIN: usize = 16;

/// Distinct inbound topics buffered.  Messages on further topics are dropped.
pub const MAX_TRACKED_TOPICS: usize = 32;

/// Factory MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: `mac` is a valid 6-byte out-buffer for the duration of the call.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Default topic root `devices/vs-xxyyzz` from the last 3 MAC bytes.
pub fn default_topic_root(mac: &MacAddress) -> String {
    format!("devices/vs-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5])
}

/// One message received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: String,
}

/// Minimal broker connection the adapter drives.
pub trait MessageLink {
    /// (Re)establish the broker session.
    fn connect(&mut self) -> bool;

    fn is_connected(&self) -> bool;

    /// Publish `payload` on `topic`.  Returns `false` if not accepted.
    fn publish(&mut self, topic: &str, payload: &str) -> bool;

    /// Take the next pending inbound message, if any.
    fn poll(&mut self) -> Option<InboundMessage>;
}

pub struct PubSubTransport<L: MessageLink> {
    link: L,
    topic_root: String,
    latest: HashMap<String, String>,
    max_drain: usize,
}

impl<L: MessageLink> PubSubTransport<L> {
    /// Route under `topic_root` (trailing `/` ignored).
    pub fn new(link: L, topic_root: &str) -> Self {
        let topic_root = topic_root.trim_end_matches('/').to_string();
        info!("PubSub: topic root '{}'", topic_root);
        Self {
            link,
            topic_root,
            latest: HashMap::new(),
            max_drain: DEFAULT_MAX_DRAIN,
        }
    }

    /// Route under the device's default root (`devices/vs-xxyyzz`).
    pub fn for_device(link: L) -> Self {
        Self::new(link, &default_topic_root(&read_mac()))
    }

    pub fn with_max_drain(mut self, max_drain: usize) -> Self {
        self.max_drain = max_drain.max(1);
        self
    }

    pub fn topic_root(&self) -> &str {
        &self.topic_root
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Topic for a server-relative endpoint.
    pub fn topic_for(&self, endpoint: &str) -> String {
        let leaf = endpoint
            .strip_prefix(ENDPOINT_PREFIX)
            .unwrap_or_else(|| endpoint.trim_start_matches('/'));
        format!("{}/{}", self.topic_root, leaf)
    }

    /// Latest payload buffered for `topic`.
    pub fn latest(&self, topic: &str) -> Option<&str> {
        self.latest.get(topic).map(String::as_str)
    }

    fn is_own_topic(&self, topic: &str) -> bool {
        topic
            .strip_prefix(self.topic_root.as_str())
            .is_some_and(|rest| rest.len() > 1 && rest.starts_with('/'))
    }

    fn drain(&mut self) {
        for _ in 0..self.max_drain {
            let Some(msg) = self.link.poll() else {
                break;
            };
            if !self.is_own_topic(&msg.topic) {
                debug!("PubSub: ignoring foreign topic '{}'", msg.topic);
                continue;
            }
            if !self.latest.contains_key(&msg.topic) && self.latest.len() >= MAX_TRACKED_TOPICS {
                warn!("PubSub: topic table full, dropping '{}'", msg.topic);
                continue;
            }
            debug!("PubSub: {} <- {} bytes", msg.topic, msg.payload.len());
            self.latest.insert(msg.topic, msg.payload);
        }
    }
}

impl<L: MessageLink> Transport for PubSubTransport<L> {
    fn request(&mut self, request: &Request<'_>) -> Option<String> {
        let topic = self.topic_for(request.endpoint);
        match request.method {
            Method::Post => {
                if self.link.publish(&topic, request.body) {
                    Some(PUBLISH_ACK.to_string())
                } else {
                    warn!("PubSub: publish to '{}' refused", topic);
                    None
                }
            }
            Method::Get => {
                self.drain();
                self.latest.get(&topic).cloned()
            }
        }
    }

    fn service(&mut self) {
        if self.link.is_connected() {
            self.drain();
        }
    }

    fn connect_if_needed(&mut self) -> bool {
        if self.link.is_connected() {
            return true;
        }
        let ok = self.link.connect();
        if ok {
            info!("PubSub: link connected");
        } else {
            warn!("PubSub: link connect failed");
        }
        ok
    }
}
