use super::FetchError;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_DELAY: Duration = Duration::from_millis(2000);

/// Fixed-delay retry: the wait between attempts never grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Run `op` until it succeeds or `policy.max_attempts` calls have failed.
///
/// The closure receives the 1-based attempt number. The error of the last
/// attempt is returned unchanged.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!("Fetch attempt {} failed: {}", attempt, e);
                if attempt >= attempts {
                    return Err(e);
                }
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

/// HTTP client whose JSON GETs go through [`retry`].
#[derive(Debug, Clone)]
pub struct ResilientClient {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl ResilientClient {
    pub fn new(policy: RetryPolicy) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent("Mozilla/5.0 (compatible; homedash/0.1)")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// GET `url` and decode the body as JSON. Non-2xx statuses and bodies
    /// that fail to decode both count as a failed attempt.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        retry(self.policy, |_| self.get_json_once(url)).await
    }

    async fn get_json_once<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl Default for ResilientClient {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
