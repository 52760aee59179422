use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use contributions::aggregation::DEADLINE_WINDOW_HOURS;
use contributions::paginator::{PageLimits, DEFAULT_MAX_PAGES, DEFAULT_PER_PAGE};
use contributions::retry::{RetryPolicy, DEFAULT_RETRIES, DEFAULT_RETRY_DELAY};
use contributions::RetrieverConfig;
use secrecy::SecretString;
use std::{fmt::Display, str::FromStr};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Repository owner, user or organization
    #[clap(short, long, env)]
    pub owner: String,

    /// Repository name
    #[clap(short, long, env)]
    pub repo: String,

    /// Deadline as RFC 3339 timestamp, e.g. 2024-01-10T00:00:00Z
    #[clap(short, long, env, parse(try_from_str=parse_deadline))]
    pub deadline: Option<DateTime<Utc>>,

    /// Hours before the deadline in which commits count as deadline fighting
    #[clap(long, env, default_value_t = DEADLINE_WINDOW_HOURS, parse(try_from_str=window_hours_in_range))]
    pub window_hours: i64,

    /// API OAuth access token
    #[clap(short, long, env)]
    pub api_token: Option<SecretString>,

    /// Repository API URL
    #[clap(long, env, default_value = "https://api.github.com")]
    pub api_url: String,

    /// Retries of a failing request
    #[clap(long, env, default_value_t = DEFAULT_RETRIES, parse(try_from_str=retries_in_range))]
    pub retries: u32,

    /// Delay before the first retry, doubled for every further one
    #[clap(long, env, default_value_t = DEFAULT_RETRY_DELAY.as_millis() as u64)]
    pub retry_delay_ms: u64,

    /// Items requested per page
    #[clap(long, env, default_value_t = DEFAULT_PER_PAGE, parse(try_from_str=per_page_in_range))]
    pub per_page: u32,

    /// Maximal pages fetched per listing
    #[clap(long, env, default_value_t = DEFAULT_MAX_PAGES, parse(try_from_str=max_pages_in_range))]
    pub max_pages: u32,

    /// Seconds a single request may take before it fails and is retried
    #[clap(long, env, default_value_t = DEFAULT_TIMEOUT_SECS, parse(try_from_str=timeout_secs_in_range))]
    pub timeout_secs: u64,
}

impl Args {
    pub fn retriever_config(&self) -> RetrieverConfig {
        RetrieverConfig::new(
            RetryPolicy::new(self.retries, std::time::Duration::from_millis(self.retry_delay_ms)),
            PageLimits::new(self.per_page, self.max_pages),
        )
    }

    pub fn window(&self) -> Duration {
        Duration::hours(self.window_hours)
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

fn parse_deadline(value: &str) -> clap::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|deadline| deadline.with_timezone(&Utc))
        .map_err(|err| format!("deadline {} is not an RFC 3339 timestamp: {}", value, err))
}

fn window_hours_in_range(value: &str) -> clap::Result<i64, String> {
    number_in_range(value, 1, 24 * 365, "window_hours".to_string())
}

fn retries_in_range(value: &str) -> clap::Result<u32, String> {
    number_in_range(value, 0, 10, "retries".to_string())
}

fn per_page_in_range(value: &str) -> clap::Result<u32, String> {
    // GitHub caps `per_page` at 100
    number_in_range(value, 1, 100, "per_page".to_string())
}

fn max_pages_in_range(value: &str) -> clap::Result<u32, String> {
    number_in_range(value, 1, 100, "max_pages".to_string())
}

fn timeout_secs_in_range(value: &str) -> clap::Result<u64, String> {
    number_in_range(value, 1, 600, "timeout_secs".to_string())
}

fn number_in_range<T>(value: &str, min: T, max: T, name: String) -> clap::Result<T, String>
where
    T: FromStr + PartialOrd + Display,
    <T as FromStr>::Err: Display,
{
    value.parse::<T>().map_err(|err| format!("{}", err)).and_then(|value| {
        if value < min || value > max {
            return Err(format!("{} is not in range {} .. {}.", name, min, max));
        }
        Ok(value)
    })
}
