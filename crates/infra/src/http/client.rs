use std::time::Duration;

use nishiki_domain::NishikiError;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::{debug, warn};

use crate::errors::InfraError;

const DEFAULT_USER_AGENT: &str = concat!("nishiki/", env!("CARGO_PKG_VERSION"));

/// How many times a request may be sent and how long to wait in between.
///
/// Backoff doubles per retry and stops growing after eight doublings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total sends, counting the first
    pub attempts: usize,
    /// Wait before the first retry
    pub backoff: Duration,
}

impl RetryPolicy {
    /// One shot, no retries. Used for authorization-code exchanges, where a
    /// resent request could spend the single-use code twice.
    pub const fn once() -> Self {
        Self { attempts: 1, backoff: Duration::ZERO }
    }

    fn has_next(&self, sent: usize) -> bool {
        sent < self.attempts.max(1)
    }

    fn delay_before(&self, retry: usize) -> Duration {
        let doublings = retry.saturating_sub(1).min(8) as u32;
        self.backoff.saturating_mul(1u32 << doublings)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 3, backoff: Duration::from_millis(200) }
    }
}

/// What one send produced, before the retry decision.
enum Attempt {
    Done(Response),
    RetryableStatus(Response),
    RetryableFailure(reqwest::Error),
    Failed(reqwest::Error),
}

/// Thin reqwest wrapper shared by the token and API adapters.
#[derive(Clone)]
pub struct HttpClient {
    inner: ReqwestClient,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Start building a client with the default timeout and retry policy
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Client with default settings
    ///
    /// # Errors
    /// Returns [`NishikiError::Network`] if reqwest cannot build the client
    pub fn new() -> Result<Self, NishikiError> {
        Self::builder().build()
    }

    /// Retry policy applied by [`HttpClient::send`]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Request builder on the underlying reqwest client; send it with
    /// [`HttpClient::send`] to get retries
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.inner.request(method, url)
    }

    /// Send `builder`, resending on 5xx and transport failures while the
    /// retry policy allows it. The final response is returned as-is, so
    /// callers still see a 5xx that outlived every retry.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, NishikiError> {
        let mut sent = 0;
        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| {
                    NishikiError::Internal("streaming request bodies cannot be resent".into())
                })?
                .build()
                .map_err(to_domain)?;
            sent += 1;

            let last_chance = !self.retry.has_next(sent);
            match self.attempt(request, sent).await {
                Attempt::Done(response) => return Ok(response),
                Attempt::RetryableStatus(response) if last_chance => return Ok(response),
                Attempt::RetryableFailure(err) | Attempt::Failed(err) if last_chance => {
                    return Err(to_domain(err))
                }
                Attempt::Failed(err) => return Err(to_domain(err)),
                Attempt::RetryableStatus(_) | Attempt::RetryableFailure(_) => {
                    let delay = self.retry.delay_before(sent);
                    warn!(
                        attempt = sent,
                        delay_ms = delay.as_millis() as u64,
                        "retrying backend request"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    async fn attempt(&self, request: reqwest::Request, sent: usize) -> Attempt {
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(attempt = sent, %method, %url, "sending backend request");

        match self.inner.execute(request).await {
            Ok(response) => {
                let status = response.status();
                debug!(attempt = sent, %method, %url, %status, "backend responded");
                if status.is_server_error() {
                    Attempt::RetryableStatus(response)
                } else {
                    Attempt::Done(response)
                }
            }
            Err(err) => {
                debug!(attempt = sent, %method, %url, error = %err, "backend request failed");
                if err.is_timeout() || err.is_connect() || err.is_request() {
                    Attempt::RetryableFailure(err)
                } else {
                    Attempt::Failed(err)
                }
            }
        }
    }
}

fn to_domain(err: reqwest::Error) -> NishikiError {
    InfraError::from(err).into()
}

/// Builder for [`HttpClient`]
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    retry: RetryPolicy,
    user_agent: String,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpClientBuilder {
    /// Per-request timeout, covering connect through body
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total sends, counting the first. Zero is treated as one.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.retry.attempts = attempts.max(1);
        self
    }

    /// Wait before the first retry; doubled for each later one
    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.retry.backoff = backoff;
        self
    }

    /// Replace attempts and backoff together
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = RetryPolicy { attempts: retry.attempts.max(1), ..retry };
        self
    }

    /// Override the `nishiki/<version>` user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Build the client
    ///
    /// # Errors
    /// Returns [`NishikiError::Network`] if reqwest rejects the settings
    pub fn build(self) -> Result<HttpClient, NishikiError> {
        let inner = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .no_proxy()
            .build()
            .map_err(to_domain)?;

        Ok(HttpClient { inner, retry: self.retry })
    }
}
