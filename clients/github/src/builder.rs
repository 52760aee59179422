use crate::limiter::{RateLimit, RateLimiter};
use crate::payload::RateLimitBody;
use crate::payload::RateLimitResources;
use crate::GithubClient;
use contributions::api::Result;
use log::warn;
use reqwest::header;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use reqwest::Client;
use reqwest::ClientBuilder;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

pub const GITHUB_URL: &str = "https://api.github.com";

pub struct GithubClientBuilder {
    client_builder: ClientBuilder,
    github_url: String,
    headers: HeaderMap,
}

impl Default for GithubClientBuilder {
    fn default() -> Self {
        let mut headers = HeaderMap::default();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("team-pulse"));
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        Self {
            client_builder: ClientBuilder::default(),
            github_url: GITHUB_URL.to_string(),
            headers,
        }
    }
}

impl GithubClientBuilder {
    /// Sends `token` as bearer credential with every request.
    pub fn try_with_token(self, token: secrecy::SecretString) -> Result<GithubClientBuilder> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret())).map_err(anyhow::Error::from)?;
        value.set_sensitive(true);
        Ok(self.with_header(header::AUTHORIZATION, value))
    }

    pub fn try_with_user_agent<STR: AsRef<str>>(self, user_agent: STR) -> Result<GithubClientBuilder> {
        let value = HeaderValue::from_str(user_agent.as_ref()).map_err(anyhow::Error::from)?;
        Ok(self.with_header(header::USER_AGENT, value))
    }

    pub fn with_github_url<STR: AsRef<str>>(mut self, url: STR) -> GithubClientBuilder {
        self.github_url = url.as_ref().to_string();
        self
    }

    /// Upper bound for a single request, retries not included.
    pub fn with_timeout(mut self, timeout: Duration) -> GithubClientBuilder {
        self.client_builder = self.client_builder.timeout(timeout);
        self
    }

    fn with_header(mut self, key: HeaderName, val: HeaderValue) -> GithubClientBuilder {
        self.headers.insert(key, val);
        self
    }

    /// Builds the client, seeding its rate limiter from `GET /rate_limit`.
    pub async fn build(self) -> Result<GithubClient> {
        let github_url = Url::parse(&self.github_url).map_err(anyhow::Error::from)?;
        let github_url = github_url.as_str().trim_end_matches('/').to_string();
        let client = self
            .client_builder
            .default_headers(self.headers)
            .build()
            .map_err(crate::request_error)?;
        let rate_limit = match rate_limit(&client, &github_url).await {
            Ok(resources) => RateLimit::from(&resources.core),
            Err(err) => {
                warn!("Failed to read rate limits, relying on response headers: {}", err);
                RateLimit::unknown()
            }
        };
        Ok(GithubClient {
            client,
            github_url,
            limiter: RateLimiter::new(Arc::new(Mutex::new(rate_limit))),
        })
    }
}

async fn rate_limit(client: &Client, github_url: &str) -> Result<RateLimitResources> {
    let request_url = format!("{}/rate_limit", github_url);
    let response = client
        .get(&request_url)
        .send()
        .await
        .map_err(crate::request_error)?;
    let response = crate::check_status(response, &request_url)?;
    crate::read_response::<RateLimitBody>(response)
        .await
        .map(|body| body.resources)
}
