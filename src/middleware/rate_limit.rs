//! Fixed-window request limiting per client IP.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use crate::config::RateLimitConfig;
use crate::error::{Error, Result};
use crate::state::AppState;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Counts requests per key inside a fixed window.
#[derive(Debug)]
pub struct RateLimiter {
    windows: scc::HashMap<String, Window>,
    max_requests: u32,
    window: Duration,
    enabled: bool,
    trust_forwarded_for: bool,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration, enabled: bool) -> Self {
        Self {
            windows: scc::HashMap::new(),
            max_requests,
            window,
            enabled,
            trust_forwarded_for: false,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.max_requests,
            Duration::from_secs(config.window_seconds),
            config.enabled,
        )
        .trusting_forwarded_for(config.trust_forwarded_for)
    }

    pub fn trusting_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Records one request for `key`. Fails once the window budget is used up.
    pub async fn check(&self, key: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let now = Instant::now();
        let allowed = match self.windows.entry_async(key.to_string()).await {
            scc::hash_map::Entry::Occupied(mut entry) => {
                let window = entry.get_mut();
                if now.duration_since(window.started) >= self.window {
                    *window = Window { started: now, count: 1 };
                    true
                } else if window.count < self.max_requests {
                    window.count += 1;
                    true
                } else {
                    false
                }
            }
            scc::hash_map::Entry::Vacant(entry) => {
                entry.insert_entry(Window { started: now, count: 1 });
                true
            }
        };

        if allowed {
            Ok(())
        } else {
            tracing::warn!(client = %key, "Rate limit exceeded");
            Err(Error::RateLimited(
                "Too many requests from this IP, please try again later".to_string(),
            ))
        }
    }

    /// Drops windows that have expired. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows
            .retain_async(|_, window| now.duration_since(window.started) < self.window)
            .await;
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Client key: the peer address. The first `x-forwarded-for` hop replaces
    /// it only when the deployment sits behind a trusted proxy.
    fn client_key(&self, request: &Request) -> String {
        if self.trust_forwarded_for {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(forwarded) = forwarded {
                return forwarded.to_string();
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let key = state.rate_limiter.client_key(&request);
    state.rate_limiter.check(&key).await?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_window_budget_is_enforced() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60), true);

        for _ in 0..3 {
            assert_ok!(limiter.check("10.0.0.1").await);
        }
        let err = assert_err!(limiter.check("10.0.0.1").await);
        assert!(matches!(err, Error::RateLimited(_)));

        // Other clients have their own budget
        assert_ok!(limiter.check("10.0.0.2").await);
    }

    #[tokio::test]
    async fn test_window_resets_after_expiry() {
        let limiter = RateLimiter::new(1, Duration::from_millis(50), true);

        assert_ok!(limiter.check("10.0.0.1").await);
        assert_err!(limiter.check("10.0.0.1").await);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_ok!(limiter.check("10.0.0.1").await);
    }

    #[tokio::test]
    async fn test_disabled_limiter_allows_everything() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60), false);
        for _ in 0..50 {
            assert_ok!(limiter.check("10.0.0.1").await);
        }
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_windows() {
        let limiter = RateLimiter::new(5, Duration::from_millis(30), true);
        limiter.check("a").await.unwrap();
        limiter.check("b").await.unwrap();
        assert_eq!(limiter.tracked_clients(), 2);

        tokio::time::sleep(Duration::from_millis(50)).await;
        limiter.check("c").await.unwrap();

        assert_eq!(limiter.sweep().await, 2);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    fn request_from(peer: &str, forwarded: Option<&str>) -> Request {
        let mut builder = Request::builder();
        if let Some(forwarded) = forwarded {
            builder = builder.header("x-forwarded-for", forwarded);
        }
        let mut request = builder.body(axum::body::Body::empty()).unwrap();
        let addr: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    #[tokio::test]
    async fn test_spoofed_forwarded_header_does_not_reset_budget() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60), true);

        for hop in 0..3 {
            let request = request_from("198.51.100.4:50000", Some(&format!("203.0.113.{hop}")));
            assert_ok!(limiter.check(&limiter.client_key(&request)).await);
        }

        let request = request_from("198.51.100.4:50001", Some("203.0.113.99"));
        assert_eq!(limiter.client_key(&request), "198.51.100.4");
        assert_err!(limiter.check(&limiter.client_key(&request)).await);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_forwarded_header_used_only_when_trusted() {
        let request = request_from("10.0.0.1:443", Some("203.0.113.7, 10.0.0.1"));

        let untrusted = RateLimiter::new(3, Duration::from_secs(60), true);
        assert_eq!(untrusted.client_key(&request), "10.0.0.1");

        let trusted = RateLimiter::new(3, Duration::from_secs(60), true).trusting_forwarded_for(true);
        assert_eq!(trusted.client_key(&request), "203.0.113.7");

        let bare = Request::builder().body(axum::body::Body::empty()).unwrap();
        assert_eq!(trusted.client_key(&bare), "unknown");
    }
}
