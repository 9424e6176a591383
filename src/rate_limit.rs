use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Actions that are throttled before the identity provider or the contact
/// collection is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Throttled {
    SignIn,
    PasswordReset,
    Contact,
}

#[derive(Debug, Clone, Copy)]
pub struct Quota {
    pub limit: usize,
    pub window: Duration,
}

impl Quota {
    pub const fn new(limit: usize, window_secs: u64) -> Self {
        Self { limit, window: Duration::from_secs(window_secs) }
    }

    fn from_env(prefix: &str, default: Quota) -> Self {
        let limit = std::env::var(format!("{prefix}_LIMIT")).ok().and_then(|v| v.parse().ok()).unwrap_or(default.limit);
        let window = std::env::var(format!("{prefix}_WINDOW"))
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(default.window);
        Self { limit, window }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub sign_in: Quota,
    pub password_reset: Quota,
    pub contact: Quota,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            sign_in: Quota::new(10, 300),
            password_reset: Quota::new(3, 900),
            contact: Quota::new(5, 3600),
        }
    }
}

impl RateLimitConfig {
    /// `RL_SIGNIN_*`, `RL_RESET_*` and `RL_CONTACT_*` override the defaults
    /// (`_LIMIT` is a count, `_WINDOW` is seconds).
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            sign_in: Quota::from_env("RL_SIGNIN", d.sign_in),
            password_reset: Quota::from_env("RL_RESET", d.password_reset),
            contact: Quota::from_env("RL_CONTACT", d.contact),
        }
    }

    fn quota(&self, action: Throttled) -> Quota {
        match action {
            Throttled::SignIn => self.sign_in,
            Throttled::PasswordReset => self.password_reset,
            Throttled::Contact => self.contact,
        }
    }
}

/// Process-local sliding-window limiter. Clones share the same buckets.
#[derive(Clone)]
pub struct RateLimiter {
    hits: Arc<DashMap<(Throttled, String), VecDeque<Instant>>>,
    cfg: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(cfg: RateLimitConfig) -> Self {
        Self { hits: Arc::new(DashMap::new()), cfg }
    }

    /// Records an attempt for `key` and reports whether it is within quota.
    /// Email keys are compared case-insensitively.
    pub fn allow(&self, action: Throttled, key: &str) -> bool {
        let Quota { limit, window } = self.cfg.quota(action);
        let now = Instant::now();
        let mut bucket = self.hits.entry((action, key.trim().to_lowercase())).or_default();
        while bucket.front().is_some_and(|t| now.duration_since(*t) >= window) {
            bucket.pop_front();
        }
        if bucket.len() >= limit {
            return false;
        }
        bucket.push_back(now);
        true
    }
}
