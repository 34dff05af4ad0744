//! Rate governor
//!
//! Wraps a whole run: before the run starts it looks at the remaining API
//! quota and, when it is nearly exhausted, sleeps until the quota resets.

use chrono::{DateTime, Utc};
use gh_client::{GitHubClient, RateLimit};
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

pub struct RateGovernor {
    threshold: u64,
    max_wait: Duration,
    last_seen: Mutex<Option<RateLimit>>,
}

impl RateGovernor {
    pub fn new(threshold: u64, max_wait: Duration) -> Self {
        Self {
            threshold,
            max_wait,
            last_seen: Mutex::new(None),
        }
    }

    /// The quota snapshot seen by the last `guard` call
    pub fn last_seen(&self) -> Option<RateLimit> {
        *self.last_seen.lock().unwrap()
    }

    /// How long to wait before running, None if the quota is sufficient
    ///
    /// A reset time in the past yields a zero wait; the wait never exceeds
    /// `max_wait`.
    pub fn wait_time(&self, rate_limit: &RateLimit, now: DateTime<Utc>) -> Option<Duration> {
        if rate_limit.remaining >= self.threshold {
            return None;
        }
        let until_reset = (rate_limit.reset_at - now).to_std().unwrap_or(Duration::ZERO);
        Some(until_reset.min(self.max_wait))
    }

    /// Run `run` once the quota allows it
    ///
    /// A failing quota query is logged and the run starts immediately.
    pub async fn guard<F>(&self, client: &dyn GitHubClient, run: F) -> F::Output
    where
        F: Future,
    {
        match client.fetch_rate_limit().await {
            Ok(rate_limit) => {
                *self.last_seen.lock().unwrap() = Some(rate_limit);
                log::debug!(
                    "API quota: {}/{} remaining, resets at {}",
                    rate_limit.remaining,
                    rate_limit.limit,
                    rate_limit.reset_at
                );

                if let Some(wait) = self.wait_time(&rate_limit, Utc::now()) {
                    log::warn!(
                        "Only {} API requests left, waiting {}s for the quota reset",
                        rate_limit.remaining,
                        wait.as_secs()
                    );
                    tokio::time::sleep(wait).await;
                }
            }
            Err(e) => {
                log::warn!("Could not check API quota, continuing anyway: {}", e);
            }
        }

        run.await
    }
}
