//! Per-IP token bucket rate limiting.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// A simple token bucket rate limiter.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    /// Whether the bucket has refilled to `capacity` since its last use,
    /// making it indistinguishable from a fresh one.
    fn is_full_at(&self, now: Instant, capacity: f64, refill_rate: f64) -> bool {
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        refill_rate > 0.0 && self.tokens + elapsed * refill_rate >= capacity
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// How often `check` sweeps out refilled buckets.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

struct Buckets {
    by_ip: HashMap<IpAddr, TokenBucket>,
    last_prune: Instant,
}

/// Buckets keyed by client IP.
pub struct RateLimiterState {
    buckets: Mutex<Buckets>,
    enabled: bool,
    rps: f64,
    burst: f64,
}

impl RateLimiterState {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(Buckets {
                by_ip: HashMap::new(),
                last_prune: Instant::now(),
            }),
            enabled: config.enabled,
            rps: config.requests_per_second as f64,
            burst: config.burst_size.max(1) as f64,
        }
    }

    /// Take one token for `ip`. Returns false when the bucket is empty.
    pub fn check(&self, ip: IpAddr) -> bool {
        if !self.enabled {
            return true;
        }
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        if now.duration_since(buckets.last_prune) >= PRUNE_INTERVAL {
            self.prune(&mut buckets, now);
        }
        buckets
            .by_ip
            .entry(ip)
            .or_insert_with(|| TokenBucket::new(self.burst))
            .try_acquire(self.burst, self.rps)
    }

    /// Forget clients whose buckets have refilled. Returns how many were
    /// dropped.
    pub fn prune_idle(&self) -> usize {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        self.prune(&mut buckets, Instant::now())
    }

    fn prune(&self, buckets: &mut Buckets, now: Instant) -> usize {
        let before = buckets.by_ip.len();
        buckets
            .by_ip
            .retain(|_, bucket| !bucket.is_full_at(now, self.burst, self.rps));
        buckets.last_prune = now;
        let dropped = before - buckets.by_ip.len();
        if dropped > 0 {
            tracing::debug!(dropped, remaining = buckets.by_ip.len(), "Pruned idle rate limit buckets");
        }
        dropped
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().map(|b| b.by_ip.len()).unwrap_or(0)
    }
}

/// Reject requests from clients that exhausted their bucket.
///
/// Requests served without connection info (in-process tests) share the
/// unspecified address.
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if state.check(ip) {
        next.run(request).await
    } else {
        tracing::warn!(client = %ip, path = %request.uri().path(), "Rate limit exceeded");
        metrics::record_rate_limited("auth");
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Too many requests, please try again later" })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(enabled: bool, rps: u32, burst: u32) -> RateLimiterState {
        RateLimiterState::new(&RateLimitConfig {
            enabled,
            requests_per_second: rps,
            burst_size: burst,
        })
    }

    #[test]
    fn test_burst_then_reject() {
        let state = limiter(true, 0, 3);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        assert!(state.check(ip));
        assert!(state.check(ip));
        assert!(state.check(ip));
        assert!(!state.check(ip));
    }

    #[test]
    fn test_clients_have_separate_buckets() {
        let state = limiter(true, 0, 1);
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();
        assert!(state.check(a));
        assert!(!state.check(a));
        assert!(state.check(b));
        assert_eq!(state.tracked_clients(), 2);
    }

    #[test]
    fn test_disabled_always_allows() {
        let state = limiter(false, 0, 1);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        for _ in 0..10 {
            assert!(state.check(ip));
        }
        assert_eq!(state.tracked_clients(), 0);
    }

    #[test]
    fn test_prune_drops_refilled_buckets() {
        let state = limiter(true, 20, 1);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        assert!(state.check(ip));
        assert_eq!(state.prune_idle(), 0);

        std::thread::sleep(std::time::Duration::from_millis(80));
        assert_eq!(state.prune_idle(), 1);
        assert_eq!(state.tracked_clients(), 0);
    }

    #[test]
    fn test_prune_keeps_buckets_that_never_refill() {
        let state = limiter(true, 0, 1);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        assert!(state.check(ip));
        assert_eq!(state.prune_idle(), 0);
        assert!(!state.check(ip));
    }

    #[test]
    fn test_refill() {
        let mut bucket = TokenBucket::new(1.0);
        assert!(bucket.try_acquire(1.0, 1000.0));
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(bucket.try_acquire(1.0, 1000.0));
    }
}
