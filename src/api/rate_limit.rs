//! Per-client sliding-window request limiting.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::{
    collections::VecDeque,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use super::{AppError, AppState};

/// Counts requests per client over a sliding window.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: DashMap::new(),
        }
    }

    /// Records a request from `client` and reports whether it is within the limit.
    ///
    /// Refused requests are not recorded.
    pub fn check(&self, client: &str) -> bool {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> bool {
        let mut seen = self.clients.entry(client.to_string()).or_default();

        while let Some(oldest) = seen.front() {
            if now.duration_since(*oldest) >= self.window {
                seen.pop_front();
            } else {
                break;
            }
        }

        if seen.len() >= self.max_requests {
            return false;
        }
        seen.push_back(now);
        true
    }

    /// Drops clients whose whole window has passed.
    pub fn sweep(&self) {
        let now = Instant::now();
        let window = self.window;
        self.clients
            .retain(|_, seen| seen.back().is_some_and(|last| now.duration_since(*last) < window));
    }
}

/// Peer address when the server recorded one, `"unknown"` otherwise.
fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |info| info.0.ip().to_string())
}

pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(limiter) = state.rate_limiter.as_deref() else {
        return next.run(request).await;
    };

    let client = client_key(&request);
    if limiter.check(&client) {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, path = %request.uri().path(), "Rate limit exceeded");
        metrics::counter!("clubhouse_rate_limited_total").increment(1);
        AppError::RateLimited.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENT: &str = "10.0.0.1";
    const OTHER_CLIENT: &str = "10.0.0.2";

    #[test]
    fn refuses_once_the_window_is_full() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.check_at(CLIENT, start));
        assert!(limiter.check_at(CLIENT, start + Duration::from_secs(1)));
        assert!(!limiter.check_at(CLIENT, start + Duration::from_secs(2)));
    }

    #[test]
    fn old_requests_leave_the_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(5));
        let start = Instant::now();

        assert!(limiter.check_at(CLIENT, start));
        assert!(limiter.check_at(CLIENT, start + Duration::from_secs(1)));
        assert!(!limiter.check_at(CLIENT, start + Duration::from_secs(4)));

        // Only the first request has expired.
        assert!(limiter.check_at(CLIENT, start + Duration::from_secs(5)));
        assert!(!limiter.check_at(CLIENT, start + Duration::from_secs(5)));
    }

    #[test]
    fn clients_are_counted_separately() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));

        assert!(limiter.check(CLIENT));
        assert!(limiter.check(OTHER_CLIENT));
        assert!(!limiter.check(CLIENT));
        assert!(!limiter.check(OTHER_CLIENT));
    }

    #[test]
    fn sweep_forgets_idle_clients() {
        let limiter = RateLimiter::new(1, Duration::from_millis(1));
        assert!(limiter.check(CLIENT));
        std::thread::sleep(Duration::from_millis(5));

        limiter.sweep();
        assert!(limiter.clients.is_empty());
    }
}
