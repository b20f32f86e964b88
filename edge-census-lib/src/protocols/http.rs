//! HTTP fetching.
//!
//! Pages and range resources are plain `GET`s whose body is consumed as text.
//! [`HttpFetcher`] does it over the network; [`StaticFetcher`] serves canned
//! bodies for offline runs and tests.

use crate::error::CensusError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Anything that can turn a URL into a response body.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch `url` and return its body.
    ///
    /// Non-success HTTP statuses are errors.
    async fn fetch(&self, url: &str) -> Result<String, CensusError>;
}

/// reqwest-backed fetcher.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    /// HTTP client shared by every request
    http_client: reqwest::Client,
    /// Per-request timeout
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, CensusError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("edge-census/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                CensusError::internal(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            timeout,
        })
    }

    fn map_error(&self, url: &str, err: reqwest::Error) -> CensusError {
        if err.is_timeout() {
            CensusError::timeout(format!("GET {}", url), self.timeout)
        } else {
            CensusError::from(err)
        }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, CensusError> {
        tracing::debug!(url, "GET");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CensusError::http_status(url, status.as_u16()));
        }

        response.text().await.map_err(|e| self.map_error(url, e))
    }
}

/// Fetcher that serves fixed bodies keyed by URL.
///
/// Unknown URLs fail with a network error, which is how a fetcher behaves when
/// the host is unreachable.
#[derive(Clone, Debug, Default)]
pub struct StaticFetcher {
    bodies: HashMap<String, String>,
    latency: Option<Duration>,
}

impl StaticFetcher {
    /// Create an empty fetcher; every URL fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub fn with_body<U: Into<String>, B: Into<String>>(mut self, url: U, body: B) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    /// Delay every response, successful or not.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl Fetch for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, CensusError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| CensusError::network(url, "Connection refused"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_fetcher_serves_known_urls() {
        let fetcher = StaticFetcher::new().with_body("http://a.test/", "hello");
        assert_eq!(fetcher.fetch("http://a.test/").await.unwrap(), "hello");

        let err = fetcher.fetch("http://b.test/").await.unwrap_err();
        assert!(matches!(err, CensusError::NetworkError { .. }));
    }

    #[tokio::test]
    async fn test_http_fetcher_reports_connection_failure() {
        let fetcher = HttpFetcher::with_timeout(Duration::from_secs(2)).unwrap();
        // Port 9 (discard) is closed on any sane test host.
        let err = fetcher.fetch("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, CensusError::NetworkError { .. }));
    }

    /// Accepts connections and never writes a response.
    async fn stalled_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_http_fetcher_times_out_on_silent_server() {
        let url = stalled_server().await;
        let fetcher = HttpFetcher::with_timeout(Duration::from_millis(100)).unwrap();

        let err = fetcher.fetch(&url).await.unwrap_err();
        match err {
            CensusError::Timeout { operation, duration } => {
                assert_eq!(operation, format!("GET {}", url));
                assert_eq!(duration, Duration::from_millis(100));
            }
            other => panic!("expected a timeout, got {:?}", other),
        }
    }
}
