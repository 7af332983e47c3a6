//! Per-client sliding-window rate limiting.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tokio::sync::Mutex;
use tracing::debug;

use super::{AppState, ApiError};

const WINDOW: Duration = Duration::from_secs(60);

/// Admits at most `limit` requests per client within any trailing window.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    limit: usize,
    window: Duration,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: limit as usize,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, WINDOW)
    }

    /// Record a hit for `client`, or return how long until one would be admitted.
    pub async fn check(&self, client: &str) -> Result<(), Duration> {
        self.check_at(client, Instant::now()).await
    }

    async fn check_at(&self, client: &str, now: Instant) -> Result<(), Duration> {
        let mut hits = self.hits.lock().await;
        let queue = hits.entry(client.to_string()).or_default();

        while queue
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            queue.pop_front();
        }

        if queue.len() >= self.limit {
            let oldest = queue.front().copied().unwrap_or(now);
            return Err(self.window.saturating_sub(now.duration_since(oldest)));
        }
        queue.push_back(now);
        Ok(())
    }

    /// Drop clients with no hits inside the window.
    pub async fn prune(&self) {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;
        hits.retain(|_, queue| {
            queue
                .back()
                .is_some_and(|t| now.duration_since(*t) < self.window)
        });
    }
}

/// Key requests by peer IP; falls back to a shared bucket when the server was
/// not started with connect info.
fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_key(&request);
    if let Err(retry_after) = state.limiter.check(&client).await {
        debug!(client = %client, retry_after_ms = retry_after.as_millis() as u64, "Rate limited");
        return Err(ApiError::RateLimited { retry_after });
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_up_to_limit_then_rejects() {
        let limiter = SlidingWindowLimiter::per_minute(3);
        let now = Instant::now();
        for _ in 0..3 {
            assert!(limiter.check_at("1.2.3.4", now).await.is_ok());
        }
        let retry = limiter.check_at("1.2.3.4", now).await.unwrap_err();
        assert_eq!(retry, WINDOW);
    }

    #[tokio::test]
    async fn clients_are_independent() {
        let limiter = SlidingWindowLimiter::per_minute(1);
        let now = Instant::now();
        assert!(limiter.check_at("a", now).await.is_ok());
        assert!(limiter.check_at("a", now).await.is_err());
        assert!(limiter.check_at("b", now).await.is_ok());
    }

    #[tokio::test]
    async fn window_slides() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(10));
        let start = Instant::now();
        assert!(limiter.check_at("a", start).await.is_ok());
        assert!(
            limiter
                .check_at("a", start + Duration::from_secs(4))
                .await
                .is_ok()
        );

        let retry = limiter
            .check_at("a", start + Duration::from_secs(6))
            .await
            .unwrap_err();
        assert_eq!(retry, Duration::from_secs(4));

        // First hit has aged out.
        assert!(
            limiter
                .check_at("a", start + Duration::from_secs(10))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn prune_forgets_idle_clients() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_millis(1));
        limiter.check("a").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        limiter.prune().await;
        assert!(limiter.hits.lock().await.is_empty());
    }
}
