//! HTTP client abstraction for testability.
//!
//! The [`AsyncHttpClient`] trait lets the tile proxy be exercised with a
//! mock client in tests while production code uses [`AsyncReqwestClient`].

use std::future::Future;
use std::time::Duration;

/// Errors from outbound HTTP requests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
    /// The request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Request(String),
    /// The upstream answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
}

/// Trait for asynchronous HTTP GET operations.
pub trait AsyncHttpClient: Send + Sync {
    /// Perform an HTTP GET and return the response body.
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, HttpError>> + Send;
}

/// Default timeout for upstream fetches.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Some tile servers reject requests without a browser-like User-Agent.
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Real HTTP client backed by `reqwest` with connection pooling.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Create a client with the default timeout.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| HttpError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HttpError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(HttpError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| HttpError::Request(e.to_string()))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock client recording every requested URL.
    pub struct MockHttpClient {
        pub response: Result<Vec<u8>, HttpError>,
        pub requests: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        pub fn returning(response: Result<Vec<u8>, HttpError>) -> Self {
            Self {
                response,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requested_urls(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl AsyncHttpClient for MockHttpClient {
        async fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.response.clone()
        }
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let mock = MockHttpClient::returning(Ok(vec![1, 2, 3]));
        let body = mock.get("http://example.com/a").await.unwrap();
        assert_eq!(body, vec![1, 2, 3]);
        assert_eq!(mock.requested_urls(), vec!["http://example.com/a"]);
    }

    #[test]
    fn test_client_builds() {
        assert!(AsyncReqwestClient::new().is_ok());
    }
}
