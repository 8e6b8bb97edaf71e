//! HTTP GET with bounded exponential backoff.
//!
//! Every failed attempt is retried, whether the request never completed
//! (connect error, timeout) or the service answered with a non-2xx status.
//! The policy is plain data so callers and tests can tune it.

use std::time::Duration;

use reqwest::{
    Client,
    header::{ACCEPT, HeaderMap, HeaderValue},
};

use crate::error::{FetchError, truncate_body};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_BACKOFF_FACTOR: u32 = 2;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// Wait after the failed attempt `attempt` (0-based) before the next one.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.saturating_pow(attempt);
        self.initial_delay.saturating_mul(factor)
    }
}

#[derive(Debug, Clone)]
pub struct FetcherSettings {
    pub user_agent: String,
    pub timeout: Duration,
    pub https_only: bool,
    pub retry: RetryPolicy,
}

/// Fetches JSON documents; knows nothing about weather.
#[derive(Debug, Clone)]
pub struct Fetcher {
    http: Client,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(settings: FetcherSettings) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent(settings.user_agent)
            .default_headers(headers)
            .timeout(settings.timeout)
            .https_only(settings.https_only)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            http,
            retry: settings.retry,
        })
    }

    /// GET `url` and return the body, retrying per the policy.
    ///
    /// The error of the final attempt is returned once the budget is spent.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match self.attempt(url).await {
                Ok(body) => {
                    if attempt > 0 {
                        tracing::info!(url, retries = attempt, "Request succeeded after retrying");
                    }
                    return Ok(body);
                }
                Err(err) if attempt + 1 >= attempts => {
                    tracing::error!(url, attempts, error = %err, "All attempts exhausted");
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    tracing::warn!(
                        url,
                        attempt = attempt + 1,
                        attempts,
                        error = %err,
                        "Request failed"
                    );
                    tracing::debug!(?delay, "Waiting before retry");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(&self, url: &str) -> Result<String, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let res = self.http.get(url).send().await.map_err(transport)?;
        let status = res.status();
        let body = res.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }
}
