//! Login rate limiting.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter,
};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

use crate::web::error::ApiError;

/// Login attempts keyed by client address.
pub type LoginLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Per-client login limiter shared by the login route.
pub struct RateLimitState {
    limiter: LoginLimiter,
    /// Key on forwarding headers instead of the socket address.
    trusted_proxy: bool,
}

impl RateLimitState {
    /// `login_rate_limit` attempts per minute per client; zero is treated as one.
    pub fn new(login_rate_limit: u32) -> Self {
        let per_minute = NonZeroU32::new(login_rate_limit).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::keyed(Quota::per_minute(per_minute)),
            trusted_proxy: false,
        }
    }

    /// Take the client address from `X-Forwarded-For`/`X-Real-IP`.
    pub fn with_trusted_proxy(mut self, trusted_proxy: bool) -> Self {
        self.trusted_proxy = trusted_proxy;
        self
    }

    /// Record an attempt from `client` and report whether it is allowed.
    pub fn check_login(&self, client: &str) -> bool {
        self.limiter.check_key(&client.to_string()).is_ok()
    }

    /// Forget clients whose budget has fully refilled.
    pub fn cleanup(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                self.cleanup();
            }
        });
    }
}

/// Client address used as the limiter key.
///
/// Forwarding headers are client-controlled unless a proxy rewrites them,
/// so they are only read when `trusted_proxy` is set.
fn client_key(req: &Request<Body>, trusted_proxy: bool) -> String {
    if trusted_proxy {
        let forwarded = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }

        if let Some(real_ip) = req
            .headers()
            .get("X-Real-IP")
            .and_then(|v| v.to_str().ok())
        {
            return real_ip.trim().to_string();
        }
    }

    match req.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => addr.ip().to_string(),
        None => "unknown".to_string(),
    }
}

/// Rate limiting middleware for the login endpoint.
pub async fn login_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_key(&req, state.trusted_proxy);

    if !state.check_login(&ip) {
        tracing::warn!(ip = %ip, "Login rate limit exceeded");
        return ApiError::too_many_requests("Too many login attempts. Please try again later.")
            .into_response();
    }

    next.run(req).await
}
