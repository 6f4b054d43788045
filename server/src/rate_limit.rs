use crate::error::ApiError;
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DashMapStateStore;
use governor::{Quota, RateLimiter};
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

pub type IpRateLimiter = Arc<RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock>>;

#[derive(Clone)]
pub struct GenerationLimiter {
    limiter: IpRateLimiter,
    window_minutes: u64,
    trust_proxy: bool,
}

impl GenerationLimiter {
    /// `max` requests per `window_ms`, replenished evenly across the window.
    pub fn new(max: u32, window_ms: u64, trust_proxy: bool) -> Self {
        let max = NonZeroU32::new(max).unwrap_or(NonZeroU32::MIN);
        let period = Duration::from_millis((window_ms / u64::from(max.get())).max(1));
        let quota = Quota::with_period(period).unwrap_or_else(|| Quota::per_second(max)).allow_burst(max);
        Self { limiter: Arc::new(RateLimiter::dashmap(quota)), window_minutes: (window_ms / 60_000).max(1), trust_proxy }
    }

    fn check(&self, ip: IpAddr) -> Result<(), ApiError> {
        self.limiter.check_key(&ip).map_err(|negative| ApiError::TooManyRequests {
            retry_after_secs: negative.wait_time_from(DefaultClock::default().now()).as_secs().max(1),
            window_minutes: self.window_minutes,
        })
    }
}

/// The peer address. With `trust_proxy`, the first `X-Forwarded-For` entry wins over it.
fn client_ip(request: &Request, trust_proxy: bool) -> Option<IpAddr> {
    let peer = request.extensions().get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| addr.ip());
    if !trust_proxy {
        return peer;
    }
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok());
    forwarded.or(peer)
}

pub async fn limit_by_ip(State(limiter): State<GenerationLimiter>, request: Request, next: Next) -> Result<Response, ApiError> {
    match client_ip(&request, limiter.trust_proxy) {
        Some(ip) => {
            if let Err(err) = limiter.check(ip) {
                tracing::warn!(%ip, "rate limit exceeded");
                return Err(err);
            }
            Ok(next.run(request).await)
        }
        None => {
            tracing::warn!("could not determine client IP for rate limiting");
            Ok(next.run(request).await)
        }
    }
}
