//! Rate limiter for preventing brute force attacks on login

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of failed attempts allowed inside the window
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds
    pub ban_duration_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,        // 5 minutes
            ban_duration_seconds: 3600, // 1 hour
        }
    }
}

impl RateLimiterConfig {
    /// Create a new RateLimiterConfig from environment variables
    ///
    /// # Environment Variables
    /// - `LOGIN_MAX_ATTEMPTS` (default: 5)
    /// - `LOGIN_WINDOW_SECONDS` (default: 300)
    /// - `LOGIN_BAN_SECONDS` (default: 3600)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let read = |name: &str, default: u64| {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        };

        Self {
            max_attempts: read("LOGIN_MAX_ATTEMPTS", u64::from(defaults.max_attempts))
                .try_into()
                .unwrap_or(defaults.max_attempts),
            window_seconds: read("LOGIN_WINDOW_SECONDS", defaults.window_seconds),
            ban_duration_seconds: read("LOGIN_BAN_SECONDS", defaults.ban_duration_seconds),
        }
    }
}

#[derive(Debug)]
struct RateLimiterEntry {
    /// Failed attempts inside the current window
    attempts: u32,
    /// Start of the current window
    window_start: Instant,
    /// Ban expiration time
    ban_expires: Option<Instant>,
}

impl RateLimiterEntry {
    /// Whether the entry no longer affects any decision
    ///
    /// A banned entry is stale once its ban is over, an unbanned one once its
    /// window has passed.
    fn is_stale(&self, now: Instant, window: Duration) -> bool {
        match self.ban_expires {
            Some(ban_expires) => now >= ban_expires,
            None => now.duration_since(self.window_start) >= window,
        }
    }
}

/// Per-key failed attempt counter with temporary bans
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_seconds)
    }

    /// Check whether `key` may attempt a login right now
    pub async fn is_allowed(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let (stale, banned) = match entries.get(key) {
            Some(entry) => (entry.is_stale(now, self.window()), entry.ban_expires.is_some()),
            None => return true,
        };

        if stale {
            entries.remove(key);
            return true;
        }

        !banned
    }

    /// Record a failed attempt for `key`, banning it once the limit is hit
    pub async fn record_failure(&self, key: &str) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = self.window();

        // Keys are chosen by the caller, so drop the ones that expired
        entries.retain(|_, entry| !entry.is_stale(now, window));

        let entry = entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            attempts: 0,
            window_start: now,
            ban_expires: None,
        });

        if now.duration_since(entry.window_start) >= window {
            entry.attempts = 0;
            entry.window_start = now;
        }

        entry.attempts += 1;

        if entry.attempts >= self.config.max_attempts {
            entry.ban_expires = Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            warn!(
                "Banned key {} for {} seconds",
                key, self.config.ban_duration_seconds
            );
        }
    }

    /// Forget the failures recorded for `key` after a successful login
    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    /// Get the rate limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn limiter(max_attempts: u32, ban_duration_seconds: u64) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            max_attempts,
            window_seconds: 300,
            ban_duration_seconds,
        })
    }

    #[tokio::test]
    async fn test_unknown_key_is_allowed() {
        assert!(limiter(3, 60).is_allowed("a@test.com").await);
    }

    #[tokio::test]
    async fn test_bans_after_max_failures() {
        let limiter = limiter(3, 60);

        limiter.record_failure("a@test.com").await;
        limiter.record_failure("a@test.com").await;
        assert!(limiter.is_allowed("a@test.com").await);

        limiter.record_failure("a@test.com").await;
        assert!(!limiter.is_allowed("a@test.com").await);

        // other keys are unaffected
        assert!(limiter.is_allowed("b@test.com").await);
    }

    #[tokio::test]
    async fn test_reset_clears_failures() {
        let limiter = limiter(2, 60);

        limiter.record_failure("a@test.com").await;
        limiter.reset("a@test.com").await;
        limiter.record_failure("a@test.com").await;

        assert!(limiter.is_allowed("a@test.com").await);
    }

    #[tokio::test]
    async fn test_ban_expires() {
        let limiter = limiter(1, 0);

        limiter.record_failure("a@test.com").await;
        assert!(limiter.is_allowed("a@test.com").await);
    }

    #[tokio::test]
    async fn test_stale_entries_are_pruned() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_attempts: 5,
            window_seconds: 0,
            ban_duration_seconds: 60,
        });

        for n in 0..100 {
            limiter.record_failure(&format!("user{}@test.com", n)).await;
        }

        // Every earlier entry had its window elapse before the next failure
        assert_eq!(limiter.entries.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_active_bans_survive_pruning() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_attempts: 1,
            window_seconds: 0,
            ban_duration_seconds: 60,
        });

        limiter.record_failure("a@test.com").await;
        limiter.record_failure("b@test.com").await;

        assert_eq!(limiter.entries.lock().await.len(), 2);
        assert!(!limiter.is_allowed("a@test.com").await);
        assert!(!limiter.is_allowed("b@test.com").await);
    }

    #[tokio::test]
    async fn test_checking_a_stale_key_removes_it() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_attempts: 5,
            window_seconds: 0,
            ban_duration_seconds: 60,
        });

        limiter.record_failure("a@test.com").await;
        assert!(limiter.is_allowed("a@test.com").await);
        assert!(limiter.entries.lock().await.is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = RateLimiterConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.window_seconds, 300);
        assert_eq!(config.ban_duration_seconds, 3600);
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        unsafe {
            std::env::set_var("LOGIN_MAX_ATTEMPTS", "3");
            std::env::set_var("LOGIN_WINDOW_SECONDS", "not-a-number");
            std::env::remove_var("LOGIN_BAN_SECONDS");
        }

        let config = RateLimiterConfig::from_env();
        let defaults = RateLimiterConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.window_seconds, defaults.window_seconds);
        assert_eq!(config.ban_duration_seconds, defaults.ban_duration_seconds);

        unsafe {
            std::env::remove_var("LOGIN_MAX_ATTEMPTS");
            std::env::remove_var("LOGIN_WINDOW_SECONDS");
        }
    }
}
