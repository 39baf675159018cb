//! Per-client rate limiting

use axum::http::HeaderMap;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const SWEEP_EVERY: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after: Duration },
}

/// Decides whether a client may issue another request.
pub trait RateLimiter: Send + Sync {
    fn check(&self, client_id: &str) -> RateDecision;

    fn allow(&self, client_id: &str) -> bool {
        matches!(self.check(client_id), RateDecision::Allowed)
    }
}

/// Sliding-window limiter keeping recent request instants per client.
///
/// The prune/compare/append sequence for a client runs while holding that
/// client's map entry, so concurrent requests from one client are counted
/// exactly once each. Different clients never share an entry.
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    requests: DashMap<String, VecDeque<Instant>>,
    checks: AtomicU64,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            requests: DashMap::new(),
            checks: AtomicU64::new(0),
        }
    }

    fn check_at(&self, client_id: &str, now: Instant) -> RateDecision {
        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.sweep(now);
        }

        let mut entry = self.requests.entry(client_id.to_string()).or_default();
        let timestamps = entry.value_mut();

        while let Some(oldest) = timestamps.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() >= self.max_requests {
            let retry_after = timestamps
                .front()
                .map(|oldest| self.window.saturating_sub(now.saturating_duration_since(*oldest)))
                .unwrap_or(self.window);
            return RateDecision::Limited { retry_after };
        }

        timestamps.push_back(now);
        RateDecision::Allowed
    }

    /// Remove clients with no request inside the window.
    fn sweep(&self, now: Instant) {
        self.requests.retain(|_, timestamps| {
            timestamps
                .back()
                .is_some_and(|last| now.saturating_duration_since(*last) < self.window)
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.requests.len()
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn check(&self, client_id: &str) -> RateDecision {
        self.check_at(client_id, Instant::now())
    }
}

/// Identify the caller: first `X-Forwarded-For` hop, then `X-Real-IP`, then
/// the socket peer address.
///
/// Forwarding headers are client-controlled unless a trusted proxy rewrites
/// them. With `trust_forwarded` off only the peer address is used.
pub fn client_identifier(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded: bool,
) -> String {
    let from_headers = trust_forwarded
        .then(|| forwarded_client(headers))
        .flatten();

    from_headers
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded.or(real_ip).map(str::to_string)
}
