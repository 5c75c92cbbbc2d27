// src/utils/http.rs

//! HTTP transport with per-attempt timeout, retry and exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{ACCEPT, USER_AGENT};

use crate::error::{AppError, NetworkFailure, Result};
use crate::models::PollerConfig;

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Source of raw page text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return the response body.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Per-call fetch settings.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Total attempts, including the first. Zero behaves like one.
    pub retries: u32,
    /// Timeout of each attempt
    pub timeout: Duration,
    pub user_agent: String,
    /// When false, a 4xx response ends the call without further attempts
    pub retry_client_errors: bool,
}

impl FetchOptions {
    pub fn from_config(config: &PollerConfig) -> Self {
        Self {
            retries: config.retries,
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            retry_client_errors: config.retry_client_errors,
        }
    }
}

/// Delay schedule between failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
    pub max_jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(2),
            max: Duration::from_secs(15),
            max_jitter: Duration::from_millis(500),
        }
    }
}

impl BackoffPolicy {
    /// Delay after failed attempt `attempt` (1-based), before jitter:
    /// `min(base * 2^(attempt-1), max)`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Base delay plus a random jitter in `[0, max_jitter)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
        };
        self.base_delay(attempt) + jitter
    }
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &PollerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .build()?;
    Ok(client)
}

/// Fetches pages over HTTP, retrying failed attempts with backoff.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    options: FetchOptions,
    backoff: BackoffPolicy,
}

impl HttpFetcher {
    /// Create a fetcher from poller settings.
    pub fn new(config: &PollerConfig) -> Result<Self> {
        Ok(Self::with_client(
            create_async_client(config)?,
            FetchOptions::from_config(config),
        ))
    }

    /// Create a fetcher around an existing client.
    pub fn with_client(client: reqwest::Client, options: FetchOptions) -> Self {
        Self {
            client,
            options,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Replace the backoff schedule.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Fetch `url` with explicit options.
    ///
    /// On exhaustion the error carries the last attempt's failure.
    pub async fn fetch_with(&self, url: &str, options: &FetchOptions) -> Result<String> {
        let attempts = options.retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let failure = match self.attempt(url, options).await {
                Ok(text) => {
                    if attempt > 1 {
                        log::debug!("Fetched {url} on attempt {attempt}");
                    }
                    return Ok(text);
                }
                Err(failure) => failure,
            };

            let give_up = attempt >= attempts
                || (failure.is_client_error() && !options.retry_client_errors);
            if give_up {
                return Err(AppError::Network {
                    url: url.to_string(),
                    attempts: attempt,
                    source: failure,
                });
            }

            let delay = self.backoff.delay(attempt);
            log::warn!(
                "Attempt {attempt}/{attempts} for {url} failed: {failure}. Retrying in {} ms",
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> std::result::Result<String, NetworkFailure> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                NetworkFailure::Timeout(options.timeout)
            } else {
                NetworkFailure::Request(e)
            }
        };

        let response = self
            .client
            .get(url)
            .timeout(options.timeout)
            .header(USER_AGENT, &options.user_agent)
            .header(ACCEPT, HTML_ACCEPT)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkFailure::Status { status });
        }

        response.text().await.map_err(classify)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.fetch_with(url, &self.options).await
    }
}
