use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

#[derive(Debug)]
struct Window {
    opened_at: Instant,
    admitted: u32,
}

/// Fixed-window limiter shared by every login route.
#[derive(Clone, Debug)]
pub struct LoginRateLimiter {
    limit: u32,
    period: Duration,
    window: Arc<Mutex<Window>>,
}

impl LoginRateLimiter {
    pub fn per_second(limit: u32) -> Self {
        Self::with_period(limit, Duration::from_secs(1))
    }

    pub fn with_period(limit: u32, period: Duration) -> Self {
        Self {
            limit: limit.max(1),
            period,
            window: Arc::new(Mutex::new(Window {
                opened_at: Instant::now(),
                admitted: 0,
            })),
        }
    }

    pub fn try_admit(&self) -> bool {
        self.try_admit_at(Instant::now())
    }

    fn try_admit_at(&self, at: Instant) -> bool {
        // counters stay consistent even if a holder panicked
        let mut window = self.window.lock().unwrap_or_else(|e| e.into_inner());
        if at.saturating_duration_since(window.opened_at) >= self.period {
            window.opened_at = at;
            window.admitted = 0;
        }
        if window.admitted < self.limit {
            window.admitted += 1;
            true
        } else {
            false
        }
    }
}

pub async fn login_rate_limit(
    State(limiter): State<LoginRateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !limiter.try_admit() {
        tracing::warn!(path = %req.uri().path(), "Login rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "rate_limit_exceeded" })),
        )
            .into_response();
    }
    next.run(req).await
}
