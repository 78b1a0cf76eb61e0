use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    /// Requests counted in the current window.
    pub used: usize,
    /// Requests still admissible in the current window.
    pub remaining: usize,
    /// Time until the oldest counted request leaves the window, if at the limit.
    pub retry_after: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum admitted requests per key per window.
    pub max_requests: usize,
    /// Rolling window length in milliseconds.
    pub window_ms: u64,
}

impl RateLimitConfig {
    pub fn new() -> Self {
        Self {
            max_requests: 10,
            window_ms: 60 * 1000,
        }
    }

    pub fn with_max_requests(mut self, max_requests: usize) -> Self {
        self.max_requests = max_requests;
        self
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window_ms = window.as_millis() as u64;
        self
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-key sliding-window limiter.
///
/// - Each key keeps the instants of its admitted requests
/// - Instants a full window old are dropped on every decision
/// - Refused requests are not recorded
pub struct SlidingWindowLimiter {
    cfg: RateLimitConfig,
    log: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(cfg: RateLimitConfig) -> Self {
        Self {
            cfg,
            log: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.cfg
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Instant>>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn prune(window: Duration, times: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = times.front() {
            if now.saturating_duration_since(oldest) >= window {
                times.pop_front();
            } else {
                break;
            }
        }
    }

    /// Admit or refuse one request for `key` at the current instant.
    pub fn is_allowed(&self, key: &str) -> bool {
        self.is_allowed_at(key, Instant::now())
    }

    pub(crate) fn is_allowed_at(&self, key: &str, now: Instant) -> bool {
        let window = self.cfg.window();
        let mut log = self.lock();
        let times = log.entry(key.to_string()).or_default();
        Self::prune(window, times, now);

        if times.len() >= self.cfg.max_requests {
            return false;
        }
        times.push_back(now);
        true
    }

    /// Forget every request recorded for `key`.
    pub fn reset(&self, key: &str) {
        self.lock().remove(key);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn snapshot(&self, key: &str) -> RateLimitSnapshot {
        self.snapshot_at(key, Instant::now())
    }

    pub(crate) fn snapshot_at(&self, key: &str, now: Instant) -> RateLimitSnapshot {
        let window = self.cfg.window();
        let log = self.lock();
        let live: Vec<Instant> = log
            .get(key)
            .map(|times| {
                times
                    .iter()
                    .copied()
                    .filter(|t| now.saturating_duration_since(*t) < window)
                    .collect()
            })
            .unwrap_or_default();

        let used = live.len();
        let remaining = self.cfg.max_requests.saturating_sub(used);
        let retry_after = if remaining == 0 {
            live.first()
                .map(|oldest| window.saturating_sub(now.saturating_duration_since(*oldest)))
                .or(Some(window))
        } else {
            None
        };

        RateLimitSnapshot {
            used,
            remaining,
            retry_after,
        }
    }
}
