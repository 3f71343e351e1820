//! Per-user fixed-window request limiter.
//!
//! Expired windows are swept at most once per window length, so idle users
//! do not accumulate.

use dashmap::DashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        let max_requests = std::env::var("MURMUR_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(5);
        let window_secs = std::env::var("MURMUR_RATE_WINDOW_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    cfg: RateLimiterConfig,
    windows: DashMap<String, Window>,
    last_sweep: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(cfg: RateLimiterConfig) -> Self {
        Self {
            cfg,
            windows: DashMap::new(),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Number of users with a tracked window.
    pub fn tracked_users(&self) -> usize {
        self.windows.len()
    }

    /// Record a request; returns false when the user is over the limit.
    pub fn check(&self, user_id: &str) -> bool {
        self.check_at(user_id, Instant::now())
    }

    fn check_at(&self, user_id: &str, now: Instant) -> bool {
        self.sweep_at(now);
        let mut w = self.windows.entry(user_id.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(w.started) >= self.cfg.window {
            w.started = now;
            w.count = 0;
        }
        if w.count >= self.cfg.max_requests {
            debug!(target = "rate_limit", user_id, count = w.count, "Request rejected");
            return false;
        }
        w.count += 1;
        true
    }

    fn sweep_at(&self, now: Instant) {
        {
            let mut last = self
                .last_sweep
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if now.saturating_duration_since(*last) < self.cfg.window {
                return;
            }
            *last = now;
        }
        let window = self.cfg.window;
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < window);
        let evicted = before.saturating_sub(self.windows.len());
        if evicted > 0 {
            debug!(target = "rate_limit", evicted, "Swept expired windows");
        }
    }
}
