use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::{Clock, DefaultClock};
use governor::middleware::StateInformationMiddleware;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::Quota;
use metrics::counter;
use tokio::task::JoinHandle;

use crate::errors::AppError;
use crate::AppState;

const RETRY_AFTER_SECS: &str = "60";

/// Paths that bypass the limiter.
const EXEMPT_PREFIXES: &[&str] = &["/health", "/metrics"];

type ClientLimiter<C> =
    governor::RateLimiter<String, DefaultKeyedStateStore<String>, C, StateInformationMiddleware>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited,
}

/// Keyed GCRA limiter with independent per-minute and per-hour budgets
/// for every client.
pub struct RateLimiter<C: Clock = DefaultClock> {
    per_minute: u32,
    minute: ClientLimiter<C>,
    hour: ClientLimiter<C>,
}

impl RateLimiter {
    pub fn new(per_minute: u32, per_hour: u32) -> Self {
        Self::with_clock(per_minute, per_hour, &DefaultClock::default())
    }

    /// Periodically drop clients whose budgets have fully replenished.
    pub fn spawn_cleanup(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                limiter.retain_recent();
                tracing::debug!(clients = limiter.tracked_clients(), "Rate limiter state pruned");
            }
        })
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(per_minute: u32, per_hour: u32, clock: &C) -> Self {
        Self {
            per_minute,
            minute: client_limiter(Quota::per_minute(non_zero(per_minute)), clock),
            hour: client_limiter(Quota::per_hour(non_zero(per_hour)), clock),
        }
    }

    pub fn per_minute(&self) -> u32 {
        self.per_minute
    }

    /// Consume one request from both budgets. The minute budget is checked
    /// first so a request refused there leaves the hour budget untouched.
    pub fn check(&self, client: &str) -> RateDecision {
        let key = client.to_string();
        let Ok(minute) = self.minute.check_key(&key) else {
            return RateDecision::Limited;
        };
        let Ok(hour) = self.hour.check_key(&key) else {
            return RateDecision::Limited;
        };
        RateDecision::Allowed {
            remaining: minute
                .remaining_burst_capacity()
                .min(hour.remaining_burst_capacity()),
        }
    }

    /// Forget clients with nothing left to replenish.
    pub fn retain_recent(&self) {
        self.minute.retain_recent();
        self.hour.retain_recent();
        self.minute.shrink_to_fit();
        self.hour.shrink_to_fit();
    }

    pub fn tracked_clients(&self) -> usize {
        self.minute.len().max(self.hour.len())
    }
}

fn client_limiter<C: Clock>(quota: Quota, clock: &C) -> ClientLimiter<C> {
    governor::RateLimiter::new(quota, DefaultKeyedStateStore::default(), clock)
}

fn non_zero(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
}

/// Client identity. The peer address is authoritative unless proxy headers
/// are trusted, in which case the first `x-forwarded-for` hop wins, then
/// `x-real-ip`.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(client) = forwarded {
            return client.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn enforce_rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path();
    if EXEMPT_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return next.run(req).await;
    }

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(req.headers(), peer, state.config.trust_proxy_headers);
    let limit = HeaderValue::from(state.rate_limiter.per_minute());

    match state.rate_limiter.check(&client) {
        RateDecision::Limited => {
            counter!("rate_limited_requests_total").increment(1);
            tracing::warn!(client = %client, path = %path, "Rate limit exceeded");

            let mut response = AppError::TooManyRequests.into_response();
            let headers = response.headers_mut();
            headers.insert("retry-after", HeaderValue::from_static(RETRY_AFTER_SECS));
            headers.insert("x-ratelimit-limit", limit);
            headers.insert("x-ratelimit-remaining", HeaderValue::from(0u32));
            response
        }
        RateDecision::Allowed { remaining } => {
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", limit);
            headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            response
        }
    }
}
