use crate::payload::RateLimitResource;
use anyhow::anyhow;
use chrono::Utc;
use contributions::api::Result;
use derive_more::Constructor;
use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderValue};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Request budget of the current rate limit window. `reset` is a Unix timestamp in seconds.
#[derive(Constructor, Debug, Clone, PartialEq)]
pub struct RateLimit {
    pub(crate) limit: u32,
    pub(crate) remaining: u32,
    pub(crate) reset: i64,
}

impl RateLimit {
    /// Used until the first response reports the actual limits.
    pub fn unknown() -> Self {
        RateLimit::new(u32::MAX, u32::MAX, 0)
    }

    /// Limits GitHub reports with every response.
    pub(crate) fn from_headers(headers: &HeaderMap<HeaderValue>) -> anyhow::Result<Self> {
        Ok(RateLimit::new(
            read_header(headers, "x-ratelimit-limit")?,
            read_header(headers, "x-ratelimit-remaining")?,
            read_header(headers, "x-ratelimit-reset")?,
        ))
    }

    /// Spends one request of the budget, or returns how long to sleep until the window resets.
    fn take(&mut self, now: i64) -> Option<Duration> {
        if self.remaining > 0 {
            self.remaining -= 1;
            return None;
        }
        if self.reset < now {
            debug!("Rate limit window reset at {}, restoring budget of {}", self.reset, self.limit);
            self.remaining = self.limit.saturating_sub(1);
            return None;
        }
        let seconds = self.reset.saturating_sub(now).saturating_add(1);
        Some(Duration::from_secs(u64::try_from(seconds).unwrap_or_default()))
    }

    /// Responses of parallel requests arrive in any order, so a report may be older than what is
    /// already known: the budget only shrinks and the reset only moves forward.
    fn merge(&mut self, reported: RateLimit) {
        self.limit = reported.limit;
        self.remaining = self.remaining.min(reported.remaining);
        self.reset = self.reset.max(reported.reset);
    }
}

impl From<&RateLimitResource> for RateLimit {
    fn from(resource: &RateLimitResource) -> Self {
        RateLimit::new(resource.limit, resource.remaining, resource.reset)
    }
}

/// Shares one [`RateLimit`] between all requests of a client.
#[derive(Constructor)]
pub struct RateLimiter {
    limit: Arc<Mutex<RateLimit>>,
}

impl RateLimiter {
    /// Returns once a request may be sent.
    pub(crate) async fn wait(&self) {
        loop {
            let delay = self.limit.lock().await.take(Utc::now().timestamp());
            match delay {
                None => return,
                Some(delay) => {
                    info!("Rate limit exhausted, waiting {} sec", delay.as_secs());
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    pub(crate) async fn reset_limiter(&self, headers: &HeaderMap<HeaderValue>) -> Result<()> {
        let reported = RateLimit::from_headers(headers)?;
        let mut rate_limit = self.limit.lock().await;
        rate_limit.merge(reported);
        debug!("Updated limits: {:?}", rate_limit);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn remaining(&self) -> u32 {
        self.limit.lock().await.remaining
    }
}

pub(crate) fn read_header<T>(headers: &HeaderMap<HeaderValue>, header: &str) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    let value = headers
        .get(header)
        .ok_or_else(|| anyhow!("Header {} not found", header))?
        .to_str()?;
    Ok(value.parse::<T>()?)
}
