//! HTTP transport adapter (request/response variant).
//!
//! Implements [`Transport`] by issuing one HTTP request per call against
//! the configured base URL.  Only 2xx responses yield a body; everything
//! else (non-2xx, socket error, timeout, oversized body) is reported as
//! `None` and left to the engine's retry policy.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::http::client::EspHttpConnection`
//!   (HTTPS via the ESP-IDF certificate bundle).
//! - **all other targets**: `reqwest::blocking::Client` (rustls) for
//!   host-side runs and tests.
//!
//! ## Connectivity
//!
//! The adapter does not manage the network link.  An optional link check
//! (e.g. "is WiFi associated?") can be installed with
//! [`with_link_check`](HttpTransport::with_link_check); when it reports the
//! link down, `connect_if_needed()` fails and no request is attempted.

use core::fmt;
use log::{debug, info, warn};
use url::Url;

use crate::app::ports::{Method, Request, Transport};

/// Default request timeout.
pub const DEFAULT_TIMEOUT_MS: u32 = 5_000;

/// Largest response body accepted.  A full variable list fits easily.
pub const MAX_BODY_BYTES: usize = 16 * 1024;

// ───────────────────────────────────────────────────────────────
// Error type
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// URL is not an absolute `http://` / `https://` URL with a host.
    InvalidUrl,
    /// The platform HTTP client could not be created.
    ClientInit,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl => write!(f, "invalid server URL"),
            Self::ClientInit => write!(f, "HTTP client init failed"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// HttpTransport
// ───────────────────────────────────────────────────────────────

pub struct HttpTransport {
    /// Base URL without trailing `/`; endpoints are appended verbatim.
    base: String,
    timeout_ms: u32,
    link_check: Option<Box<dyn Fn() -> bool>>,
    #[cfg(not(target_os = "espidf"))]
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Create a transport for `server_url` (e.g. `http://10.0.0.2:8080`).
    pub fn new(server_url: &str) -> Result<Self, HttpError> {
        let base = normalize_base(server_url)?;
        info!("HTTP: base {}", base);
        Ok(Self {
            base,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            link_check: None,
            #[cfg(not(target_os = "espidf"))]
            client: reqwest::blocking::Client::builder()
                .build()
                .map_err(|_| HttpError::ClientInit)?,
        })
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Install a network-link check consulted by `connect_if_needed()`.
    pub fn with_link_check(mut self, check: impl Fn() -> bool + 'static) -> Self {
        self.link_check = Some(Box::new(check));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Absolute URL for a server-relative endpoint.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base, endpoint)
    }

    // ── Platform helpers ──────────────────────────────────────

    #[cfg(not(target_os = "espidf"))]
    fn platform_request(&mut self, req: &Request<'_>) -> Option<String> {
        let url = self.endpoint_url(req.endpoint);
        let method = match req.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self
            .client
            .request(method, &url)
            .timeout(std::time::Duration::from_millis(u64::from(self.timeout_ms)));
        for h in &req.headers {
            builder = builder.header(h.name, h.value);
        }
        if req.method == Method::Post {
            builder = builder.body(req.body.to_string());
        }

        let response = match builder.send() {
            Ok(r) => r,
            Err(e) => {
                debug!("HTTP: {} {} failed: {}", req.method.as_str(), url, e);
                return None;
            }
        };
        if !response.status().is_success() {
            debug!("HTTP: {} {} -> {}", req.method.as_str(), url, response.status());
            return None;
        }
        if response
            .content_length()
            .is_some_and(|len| len > MAX_BODY_BYTES as u64)
        {
            warn!("HTTP: response from {} too large", url);
            return None;
        }
        read_capped(response)
    }

    #[cfg(target_os = "espidf")]
    fn platform_request(&mut self, req: &Request<'_>) -> Option<String> {
        use esp_idf_svc::http::Method as EspMethod;
        use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
        use esp_idf_svc::io::Write as _;

        let config = Configuration {
            timeout: Some(core::time::Duration::from_millis(u64::from(self.timeout_ms))),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let mut conn = match EspHttpConnection::new(&config) {
            Ok(c) => c,
            Err(e) => {
                warn!("HTTP: client init failed: {:?}", e);
                return None;
            }
        };

        let url = self.endpoint_url(req.endpoint);
        let content_length = req.body.len().to_string();
        let mut headers: Vec<(&str, &str)> =
            req.headers.iter().map(|h| (h.name, h.value)).collect();
        if req.method == Method::Post {
            headers.push(("Content-Length", &content_length));
        }
        let method = match req.method {
            Method::Get => EspMethod::Get,
            Method::Post => EspMethod::Post,
        };

        conn.initiate_request(method, &url, &headers).ok()?;
        if !req.body.is_empty() {
            conn.write_all(req.body.as_bytes()).ok()?;
        }
        conn.initiate_response().ok()?;

        let status = conn.status();
        if !(200..300).contains(&status) {
            debug!("HTTP: {} {} -> {}", req.method.as_str(), url, status);
            return None;
        }

        let mut body = Vec::new();
        let mut buf = [0u8; 256];
        loop {
            match conn.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if body.len() + n > MAX_BODY_BYTES {
                        warn!("HTTP: response from {} too large", url);
                        return None;
                    }
                    body.extend_from_slice(&buf[..n]);
                }
                Err(_) => return None,
            }
        }
        String::from_utf8(body).ok()
    }
}

impl Transport for HttpTransport {
    fn request(&mut self, request: &Request<'_>) -> Option<String> {
        debug!(
            "HTTP: {} {}{}",
            request.method.as_str(),
            self.base,
            request.endpoint
        );
        self.platform_request(request)
    }

    fn connect_if_needed(&mut self) -> bool {
        self.link_check.as_ref().is_none_or(|check| check())
    }
}

/// Validate `server_url` and strip any trailing `/`.
fn normalize_base(server_url: &str) -> Result<String, HttpError> {
    let parsed = Url::parse(server_url).map_err(|_| HttpError::InvalidUrl)?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(HttpError::InvalidUrl);
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Read a UTF-8 body of at most [`MAX_BODY_BYTES`].
#[cfg(not(target_os = "espidf"))]
fn read_capped(reader: impl std::io::Read) -> Option<String> {
    use std::io::Read as _;

    let mut body = String::new();
    reader
        .take(MAX_BODY_BYTES as u64 + 1)
        .read_to_string(&mut body)
        .ok()?;
    if body.len() > MAX_BODY_BYTES {
        warn!("HTTP: response body exceeds {} bytes", MAX_BODY_BYTES);
        return None;
    }
    Some(body)
}
