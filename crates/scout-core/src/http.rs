//! Outbound HTTP shared by all adapters
//!
//! Transport failures are retried with exponential backoff. Connect errors
//! are retried for every method since the request never left the client;
//! timeouts only for idempotent methods, so a slow `POST` is never replayed.
//! Non-success statuses are never retried: they surface as
//! [`Error::RemoteService`] carrying the status and body.

use crate::config::HttpSettings;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retry
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before retrying after the given (1-based) failed attempt
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}

/// `reqwest::Client` plus the retry policy applied to every request
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    retry: RetryPolicy,
    cancel: Option<CancellationToken>,
}

impl HttpClient {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.timeout())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self::from_client(client, settings.retry_policy()))
    }

    pub fn from_client(client: reqwest::Client, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            cancel: None,
        }
    }

    /// Copy of this client whose requests and backoff sleeps stop with
    /// [`Error::Cancelled`] once `token` is cancelled
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            cancel: Some(token),
            ..self.clone()
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Send a request built fresh for every attempt
    pub async fn send<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let mut attempt = 1;
        loop {
            let request = build(&self.client).build()?;
            let method = request.method().clone();

            match self.until_cancelled(self.client.execute(request)).await? {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.retry.max_attempts && is_retryable(&e, &method) => {
                    let delay = self.retry.backoff_for(attempt);
                    tracing::warn!(
                        %method,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient HTTP failure, retrying"
                    );
                    self.until_cancelled(tokio::time::sleep(delay)).await?;
                    attempt += 1;
                }
                Err(e) => return Err(Error::Http(e)),
            }
        }
    }

    async fn until_cancelled<T>(&self, fut: impl Future<Output = T>) -> Result<T> {
        let Some(token) = &self.cancel else {
            return Ok(fut.await);
        };
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled),
            value = fut => Ok(value),
        }
    }

    /// Send and fail with [`Error::RemoteService`] on a non-success status
    pub async fn send_checked<F>(&self, service: &str, build: F) -> Result<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let response = self.send(build).await?;
        ensure_success(service, response).await
    }

    /// Send, check the status and decode a JSON body
    pub async fn json<T, F>(&self, service: &str, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let response = self.send_checked(service, build).await?;
        decode_json(service, response).await
    }
}

/// A connect failure never reached the server; a timeout may have
fn is_retryable(error: &reqwest::Error, method: &reqwest::Method) -> bool {
    error.is_connect() || (error.is_timeout() && method.is_idempotent())
}

/// Map a non-success status to [`Error::RemoteService`]
pub async fn ensure_success(service: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::debug!(service, status = status.as_u16(), "Provider returned error status");
    Err(Error::remote(service, status.as_u16(), body))
}

/// Decode a JSON body, reporting shape mismatches as [`Error::Protocol`]
pub async fn decode_json<T: DeserializeOwned>(service: &str, response: reqwest::Response) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| Error::protocol(service, format!("invalid JSON body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Deserialize)]
    struct Job {
        id: String,
    }

    fn test_client() -> HttpClient {
        HttpClient::new(&HttpSettings::default()).unwrap()
    }

    /// Client with a short request timeout and a fast two-attempt retry
    fn impatient_client() -> HttpClient {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(300))
            .build()
            .unwrap();
        HttpClient::from_client(
            client,
            RetryPolicy {
                max_attempts: 2,
                initial_backoff: Duration::from_millis(10),
                max_backoff: Duration::from_millis(10),
            },
        )
    }

    /// Accepts connections and never answers; returns its URL and a connection counter
    async fn silent_server() -> (String, Arc<AtomicUsize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = connections.clone();
        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                open.push(socket);
            }
        });
        (url, connections)
    }

    /// URL of a local port nothing listens on
    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        url
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(350));
        assert_eq!(policy.backoff_for(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_json_decodes_success_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/jobs/1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "job-1"}"#)
            .create_async()
            .await;

        let url = format!("{}/jobs/1", server.url());
        let job: Job = test_client().json("test", |c| c.get(&url)).await.unwrap();

        assert_eq!(job.id, "job-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/jobs/1")
            .with_status(503)
            .with_body("overloaded")
            .expect(1)
            .create_async()
            .await;

        let url = format!("{}/jobs/1", server.url());
        let err = test_client()
            .json::<Job, _>("test", |c| c.get(&url))
            .await
            .unwrap_err();

        match err {
            Error::RemoteService { status, body, .. } => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_body_is_protocol_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/jobs/1")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let url = format!("{}/jobs/1", server.url());
        let err = test_client()
            .json::<Job, _>("test", |c| c.get(&url))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_timeout_retried_up_to_max_attempts() {
        let (url, connections) = silent_server().await;

        let err = impatient_client()
            .send(|c| c.get(format!("{}/crawls/job-1", url)))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Http(ref e) if e.is_timeout()));
        assert_eq!(connections.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timed_out_post_is_not_replayed() {
        let (url, connections) = silent_server().await;

        let err = impatient_client()
            .send(|c| c.post(format!("{}/crawls", url)).body("{}"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Http(ref e) if e.is_timeout()));
        assert_eq!(connections.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connect_error_surfaces_after_retries() {
        let url = closed_port_url();

        let err = impatient_client()
            .send(|c| c.post(format!("{}/crawls", url)))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Http(ref e) if e.is_connect()));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_backoff() {
        let url = closed_port_url();
        let token = CancellationToken::new();
        let client = HttpClient::from_client(
            reqwest::Client::new(),
            RetryPolicy {
                max_attempts: 5,
                initial_backoff: Duration::from_secs(30),
                max_backoff: Duration::from_secs(30),
            },
        )
        .with_cancellation(token.clone());

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let started = std::time::Instant::now();
        let err = client.send(|c| c.get(&url)).await.unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cancelled_client_sends_nothing() {
        let (url, connections) = silent_server().await;
        let token = CancellationToken::new();
        token.cancel();

        let err = impatient_client()
            .with_cancellation(token)
            .send(|c| c.get(&url))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(connections.load(Ordering::SeqCst), 0);
    }
}
