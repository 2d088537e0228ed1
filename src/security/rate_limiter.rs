// ARCHITECTURE: Rate Limiter - Sliding Window Admission Control
//
// Per-IP sliding window over recent request timestamps:
// 1. SLIDING WINDOW: each identity keeps the timestamps of its requests
//    inside the trailing window; anything older is discardable at any
//    access
// 2. REJECTIONS DON'T COUNT: a denied request is never recorded, so a
//    client hammering a full window cannot push its own reset time out
// 3. BOUNDED MEMORY: a periodic cleanup drops identities whose windows
//    have drained, so memory tracks recently active callers only

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

// CONFIGURATION: RateLimiterConfig - admission control parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    pub limit: usize,                   // Requests allowed per window (default: 100)
    pub window_seconds: u64,            // Window duration (default: 60s)
    pub cleanup_interval_seconds: u64,  // Idle identity cleanup interval (default: 300s)
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            window_seconds: 60,
            cleanup_interval_seconds: 300,
        }
    }
}

// STATUS: point-in-time usage for one identity; `reset_at` is the moment
// the window will next admit one more request (absent when no requests
// are recorded).
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    pub limit: usize,
    pub used: usize,
    pub remaining: usize,
    pub reset_at: Option<DateTime<Utc>>,
}

// CORE SYSTEM: RateLimiter - per-identity sliding window engine
pub struct RateLimiter {
    config: RateLimiterConfig,
    windows: Arc<RwLock<HashMap<String, Vec<Instant>>>>,
    cleanup_handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
}

impl RateLimiter {
    // CONSTRUCTOR: create rate limiter with default configuration
    pub fn new() -> Self {
        Self::with_config(RateLimiterConfig::default())
    }

    // CONSTRUCTOR: create rate limiter with custom configuration
    pub fn with_config(config: RateLimiterConfig) -> Self {
        Self {
            config,
            windows: Arc::new(RwLock::new(HashMap::new())),
            cleanup_handle: Arc::new(RwLock::new(None)),
        }
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_seconds)
    }

    // Timestamps at or before the cutoff have left the window. None means
    // the process is younger than the window itself, so nothing is prunable.
    fn window_cutoff(&self, now: Instant) -> Option<Instant> {
        now.checked_sub(self.window())
    }

    // LIFECYCLE: start the idle-identity cleanup task
    pub async fn start(&self) {
        let windows = Arc::clone(&self.windows);
        let window = self.window();
        let cleanup_interval = Duration::from_secs(self.config.cleanup_interval_seconds);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(cleanup_interval);
            interval.tick().await;

            loop {
                interval.tick().await;

                let cutoff = Instant::now().checked_sub(window);
                let mut windows = windows.write().await;
                let initial_count = windows.len();
                windows.retain(|_, timestamps| {
                    timestamps.retain(|t| cutoff.map_or(true, |c| *t > c));
                    !timestamps.is_empty()
                });
                let dropped = initial_count - windows.len();
                let active = windows.len();
                drop(windows);

                if dropped > 0 {
                    debug!(
                        dropped_identities = dropped,
                        active_identities = active,
                        "Cleaned up idle rate limit windows"
                    );
                }
            }
        });

        *self.cleanup_handle.write().await = Some(handle);
        info!(
            limit = self.config.limit,
            window_seconds = self.config.window_seconds,
            "Rate limiter started"
        );
    }

    // LIFECYCLE: stop the cleanup task
    pub async fn stop(&self) {
        if let Some(handle) = self.cleanup_handle.write().await.take() {
            handle.abort();
        }
        info!("Rate limiter stopped");
    }

    // CORE FUNCTION: admit or reject one request for `identity`.
    // Prunes the window first; a rejected request is NOT recorded.
    pub async fn allow(&self, identity: &str) -> bool {
        let now = Instant::now();
        let cutoff = self.window_cutoff(now);

        let mut windows = self.windows.write().await;
        let timestamps = windows.entry(identity.to_string()).or_default();
        timestamps.retain(|t| cutoff.map_or(true, |c| *t > c));

        if timestamps.len() >= self.config.limit {
            return false;
        }

        timestamps.push(now);
        true
    }

    // Read-only usage snapshot; never mutates the window.
    pub async fn status(&self, identity: &str) -> RateLimitStatus {
        let now = Instant::now();
        let cutoff = self.window_cutoff(now);

        let windows = self.windows.read().await;
        let in_window: Vec<Instant> = windows
            .get(identity)
            .map(|timestamps| {
                timestamps
                    .iter()
                    .copied()
                    .filter(|t| cutoff.map_or(true, |c| *t > c))
                    .collect()
            })
            .unwrap_or_default();
        drop(windows);

        let used = in_window.len();
        let reset_at = in_window.iter().min().map(|oldest| {
            let until_reset = (*oldest + self.window()).saturating_duration_since(now);
            Utc::now()
                + chrono::Duration::from_std(until_reset)
                    .unwrap_or_else(|_| chrono::Duration::zero())
        });

        RateLimitStatus {
            limit: self.config.limit,
            used,
            remaining: self.config.limit.saturating_sub(used),
            reset_at,
        }
    }

    // Number of identities currently tracked (cleanup keeps this bounded
    // by recently active callers).
    pub async fn tracked_identities(&self) -> usize {
        self.windows.read().await.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn limiter(limit: usize, window_seconds: u64) -> RateLimiter {
        RateLimiter::with_config(RateLimiterConfig {
            limit,
            window_seconds,
            cleanup_interval_seconds: 300,
        })
    }

    #[tokio::test]
    async fn test_allows_requests_within_limit() {
        let limiter = limiter(3, 1);

        assert!(limiter.allow("10.0.0.1").await);
        assert!(limiter.allow("10.0.0.1").await);
        assert!(limiter.allow("10.0.0.1").await);
        assert!(!limiter.allow("10.0.0.1").await);
    }

    #[tokio::test]
    async fn test_window_expiry_readmits_requests() {
        let limiter = limiter(3, 1);

        for _ in 0..3 {
            assert!(limiter.allow("10.0.0.1").await);
        }
        assert!(!limiter.allow("10.0.0.1").await);

        sleep(Duration::from_millis(1100)).await;

        assert!(limiter.allow("10.0.0.1").await);
    }

    #[tokio::test]
    async fn test_rejected_requests_do_not_consume_slots() {
        let limiter = limiter(1, 60);

        assert!(limiter.allow("10.0.0.1").await);
        // Both rejections happen inside the same window; if the first
        // rejection were recorded, used would exceed the limit.
        assert!(!limiter.allow("10.0.0.1").await);
        assert!(!limiter.allow("10.0.0.1").await);

        assert_eq!(limiter.status("10.0.0.1").await.used, 1);
    }

    #[tokio::test]
    async fn test_identities_are_isolated() {
        let limiter = limiter(2, 60);

        assert!(limiter.allow("10.0.0.1").await);
        assert!(limiter.allow("10.0.0.1").await);
        assert!(!limiter.allow("10.0.0.1").await);

        assert!(limiter.allow("10.0.0.2").await);
    }

    #[tokio::test]
    async fn test_status_reports_usage_without_mutating() {
        let limiter = limiter(3, 60);

        let status = limiter.status("10.0.0.1").await;
        assert_eq!(status.used, 0);
        assert_eq!(status.remaining, 3);
        assert!(status.reset_at.is_none());

        limiter.allow("10.0.0.1").await;
        limiter.allow("10.0.0.1").await;

        let status = limiter.status("10.0.0.1").await;
        assert_eq!(status.used, 2);
        assert_eq!(status.remaining, 1);
        assert!(status.reset_at.is_some());

        // Repeated status calls must not record anything.
        let again = limiter.status("10.0.0.1").await;
        assert_eq!(again.used, 2);
    }

    #[tokio::test]
    async fn test_used_never_exceeds_limit() {
        let limiter = limiter(3, 1);

        for _ in 0..10 {
            limiter.allow("10.0.0.1").await;
        }

        assert!(limiter.status("10.0.0.1").await.used <= 3);
    }

    #[tokio::test]
    async fn test_cleanup_drops_drained_identities() {
        let limiter = RateLimiter::with_config(RateLimiterConfig {
            limit: 10,
            window_seconds: 1,
            cleanup_interval_seconds: 1,
        });
        limiter.start().await;

        limiter.allow("10.0.0.1").await;
        limiter.allow("10.0.0.2").await;
        assert_eq!(limiter.tracked_identities().await, 2);

        sleep(Duration::from_millis(2500)).await;

        assert_eq!(limiter.tracked_identities().await, 0);
        limiter.stop().await;
    }
}
