//! Per-user rate limiting for guard calls

use crate::config::RateLimitConfig;
#[cfg(not(feature = "rate-limit"))]
use crate::error::Result;
#[cfg(feature = "rate-limit")]
use crate::error::{GuardError, Result};
#[cfg(feature = "rate-limit")]
use std::collections::HashMap;
#[cfg(feature = "rate-limit")]
use std::sync::Arc;
#[cfg(feature = "rate-limit")]
use tokio::sync::RwLock;

#[cfg(feature = "rate-limit")]
use governor::clock::{Clock, DefaultClock};
#[cfg(feature = "rate-limit")]
use governor::{Quota, RateLimiter as GovernorLimiter};
#[cfg(feature = "rate-limit")]
use std::num::NonZeroU32;
#[cfg(feature = "rate-limit")]
use std::sync::Mutex as StdMutex;
#[cfg(feature = "rate-limit")]
use std::time::Instant;
use std::time::Duration;

/// Buckets tracked before the map is reset
#[cfg(feature = "rate-limit")]
const MAX_TRACKED_USERS: usize = 10_000;

#[cfg(feature = "rate-limit")]
const DEFAULT_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(60) {
    Some(n) => n,
    None => NonZeroU32::MIN,
};

#[cfg(feature = "rate-limit")]
type InnerLimiter = GovernorLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    DefaultClock,
>;

#[cfg(feature = "rate-limit")]
struct UserBucket {
    limiter: InnerLimiter,
    denied_until: StdMutex<Option<Instant>>,
}

#[cfg(feature = "rate-limit")]
impl UserBucket {
    fn deny_until(&self, until: Instant) {
        let mut denied = self.denied_until.lock().unwrap_or_else(|e| e.into_inner());
        *denied = Some(until);
    }

    fn retry_after(&self, now: Instant) -> Option<Duration> {
        let denied = self.denied_until.lock().unwrap_or_else(|e| e.into_inner());
        denied
            .and_then(|until| until.checked_duration_since(now))
            .filter(|wait| !wait.is_zero())
    }
}

/// Rate limiter keyed by user
pub struct RateLimiter {
    #[cfg_attr(not(feature = "rate-limit"), allow(dead_code))]
    config: RateLimitConfig,
    #[cfg(feature = "rate-limit")]
    buckets: RwLock<HashMap<String, Arc<UserBucket>>>,
}

/// Rate limit status
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    /// False while the user is currently being refused after a denied request.
    /// A user who has drained the bucket but not yet been denied still reads true.
    pub allowed: bool,
    /// Configured requests per minute
    pub limit: u32,
    /// Time left on the current refusal
    pub retry_after: Option<Duration>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            #[cfg(feature = "rate-limit")]
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Consume one request for `user_id`
    #[cfg(feature = "rate-limit")]
    pub async fn check(&self, user_id: &str) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let bucket = self.get_or_create_bucket(user_id).await;
        match bucket.limiter.check() {
            Ok(()) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(DefaultClock::default().now());
                bucket.deny_until(Instant::now() + wait);
                Err(GuardError::RateLimitExceeded(format!(
                    "Rate limit exceeded for user: {}. Limit: {} requests/minute",
                    user_id, self.config.requests_per_minute
                )))
            }
        }
    }

    #[cfg(not(feature = "rate-limit"))]
    pub async fn check(&self, _user_id: &str) -> Result<()> {
        Ok(())
    }

    /// Report whether `user_id` is currently being refused, without consuming a request
    #[cfg(feature = "rate-limit")]
    pub async fn status(&self, user_id: &str) -> RateLimitStatus {
        let limit = self.config.requests_per_minute;
        let bucket = if self.config.enabled {
            self.buckets.read().await.get(user_id).cloned()
        } else {
            None
        };

        let retry_after = bucket.and_then(|b| b.retry_after(Instant::now()));
        RateLimitStatus {
            allowed: retry_after.is_none(),
            limit,
            retry_after,
        }
    }

    #[cfg(not(feature = "rate-limit"))]
    pub async fn status(&self, _user_id: &str) -> RateLimitStatus {
        RateLimitStatus {
            allowed: true,
            limit: self.config.requests_per_minute,
            retry_after: None,
        }
    }

    #[cfg(feature = "rate-limit")]
    async fn get_or_create_bucket(&self, user_id: &str) -> Arc<UserBucket> {
        {
            let buckets = self.buckets.read().await;
            if let Some(bucket) = buckets.get(user_id) {
                return bucket.clone();
            }
        }

        let mut buckets = self.buckets.write().await;

        // Another task may have inserted while we waited for the write lock
        if let Some(bucket) = buckets.get(user_id) {
            return bucket.clone();
        }

        if buckets.len() >= MAX_TRACKED_USERS {
            buckets.clear();
        }

        let per_minute =
            NonZeroU32::new(self.config.requests_per_minute).unwrap_or(DEFAULT_PER_MINUTE);
        let burst = NonZeroU32::new(self.config.burst_size).unwrap_or(per_minute);
        let quota = Quota::per_minute(per_minute).allow_burst(burst);

        let bucket = Arc::new(UserBucket {
            limiter: GovernorLimiter::direct(quota),
            denied_until: StdMutex::new(None),
        });
        buckets.insert(user_id.to_string(), bucket.clone());

        bucket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limit_disabled() {
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: false,
            ..Default::default()
        });

        for _ in 0..100 {
            assert!(limiter.check("user1").await.is_ok());
        }
        assert!(limiter.status("user1").await.allowed);
    }

    #[tokio::test]
    #[cfg(feature = "rate-limit")]
    async fn test_rate_limit_basic() {
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: true,
            requests_per_minute: 2,
            burst_size: 2,
        });

        assert!(limiter.check("user1").await.is_ok());
        assert!(limiter.check("user1").await.is_ok());

        let err = limiter.check("user1").await.unwrap_err();
        assert!(matches!(err, GuardError::RateLimitExceeded(_)));

        // Other users have their own bucket
        assert!(limiter.check("user2").await.is_ok());
    }

    #[tokio::test]
    #[cfg(feature = "rate-limit")]
    async fn test_status_reports_exhaustion() {
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: true,
            requests_per_minute: 1,
            burst_size: 1,
        });

        assert!(limiter.status("bob").await.allowed);
        limiter.check("bob").await.unwrap();

        // Drained but not yet denied
        assert!(limiter.status("bob").await.allowed);

        assert!(limiter.check("bob").await.is_err());

        let status = limiter.status("bob").await;
        assert!(!status.allowed);
        assert!(status.retry_after.is_some());
    }
}
