//! Bounded retry with linear backoff.
//!
//! Shared by heartbeat, push and pull.  An empty response counts as a
//! failed attempt; after attempt `n` fails the caller blocks for
//! `n * base_delay_ms` before trying again, up to `retries + 1` attempts.
//! There is no wait after the final attempt.

use log::debug;

use crate::app::ports::{Clock, Request, Transport};
use crate::config::ClientConfig;
use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first.
    pub retries: u8,
    /// Backoff unit in milliseconds.
    pub base_delay_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            base_delay_ms: 100,
        }
    }
}

impl From<&ClientConfig> for RetryPolicy {
    fn from(cfg: &ClientConfig) -> Self {
        Self {
            retries: cfg.retries,
            base_delay_ms: cfg.retry_base_delay_ms,
        }
    }
}

impl RetryPolicy {
    /// Total transport invocations allowed.
    pub fn max_attempts(&self) -> u8 {
        self.retries.saturating_add(1)
    }

    /// Wait after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u8) -> u32 {
        self.base_delay_ms.saturating_mul(u32::from(attempt))
    }
}

/// A non-empty response body plus the attempts it took to get it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub body: String,
    pub attempts: u8,
}

/// Issue `request` under `policy`.
///
/// Fails fast with [`SyncError::TransportUnavailable`] (zero attempts) if
/// the transport is not ready.
pub fn request_with_retry<T, C>(
    transport: &mut T,
    clock: &mut C,
    policy: RetryPolicy,
    request: &Request<'_>,
) -> Result<Response, SyncError>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
{
    if !transport.connect_if_needed() {
        return Err(SyncError::TransportUnavailable);
    }

    let max = policy.max_attempts();
    for attempt in 1..=max {
        match transport.request(request) {
            Some(body) if !body.is_empty() => {
                return Ok(Response {
                    body,
                    attempts: attempt,
                });
            }
            _ => {
                debug!(
                    "Retry: {} {} attempt {}/{} got no response",
                    request.method.as_str(),
                    request.endpoint,
                    attempt,
                    max
                );
                if attempt < max {
                    clock.delay_ms(policy.delay_after(attempt));
                }
            }
        }
    }
    Err(SyncError::RequestFailed { attempts: max })
}
