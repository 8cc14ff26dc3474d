use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

/// Sliding-window limiter for failed admin logins, keyed by client IP.
/// Successful logins clear the window; a background task prunes idle IPs.
pub struct LoginRateLimiter {
    failures: Arc<RwLock<HashMap<IpAddr, Vec<DateTime<Utc>>>>>,
    max_failures: usize,
    window: Duration,
}

impl LoginRateLimiter {
    pub fn new(max_failures: usize, window_seconds: i64) -> Self {
        Self {
            failures: Arc::new(RwLock::new(HashMap::new())),
            max_failures,
            window: Duration::seconds(window_seconds),
        }
    }

    pub fn is_limited(&self, ip: IpAddr) -> bool {
        let window_start = Utc::now() - self.window;
        let failures = self.failures.read();
        failures
            .get(&ip)
            .map(|times| times.iter().filter(|t| **t > window_start).count() >= self.max_failures)
            .unwrap_or(false)
    }

    pub fn record_failure(&self, ip: IpAddr) {
        let now = Utc::now();
        let window_start = now - self.window;
        let mut failures = self.failures.write();
        let times = failures.entry(ip).or_default();
        times.retain(|t| *t > window_start);
        times.push(now);
    }

    pub fn clear(&self, ip: IpAddr) {
        self.failures.write().remove(&ip);
    }

    /// Drops IPs whose failures have all aged out. Returns how many entries
    /// were removed.
    pub fn prune_stale(&self) -> usize {
        let window_start = Utc::now() - self.window;
        let mut failures = self.failures.write();
        let before = failures.len();
        failures.retain(|_, times| {
            times.retain(|t| *t > window_start);
            !times.is_empty()
        });
        before - failures.len()
    }
}

impl Clone for LoginRateLimiter {
    fn clone(&self) -> Self {
        Self {
            failures: Arc::clone(&self.failures),
            max_failures: self.max_failures,
            window: self.window,
        }
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        // 10 failed logins per minute per IP
        Self::new(10, 60)
    }
}
