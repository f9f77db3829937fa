//! Public endpoint publisher - outbound tunnel for the gateway port.
//!
//! Asks a localtunnel-style provider for a public URL, then keeps a pool of
//! TCP connections open between the provider and the local gateway port,
//! piping bytes in both directions. Some providers interpose a one-time
//! interstitial confirmation page (HTTP 511) before the tunnel is usable;
//! [`TunnelPublisher::open`] performs that handshake transparently.
//!
//! Tunnel failure is fatal to this feature only; the caller decides whether
//! the relay continues serving on its local binding.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use tokio::io::copy_bidirectional;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Marker preceding the base64 continuation token on the interstitial page.
const TOKEN_MARKER: &str = "__endpoint=\"";

/// Connections kept open to the provider when it does not say how many.
const DEFAULT_CONN_COUNT: u16 = 4;

/// Pause before redialing after a pump error.
const REDIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Tunnel configuration.
#[derive(Debug, Clone)]
pub struct TunnelConfig {
    /// Provider base URL, e.g. `https://localtunnel.me`.
    pub provider_url: String,
    /// Local port the tunnel forwards to (the gateway port).
    pub local_port: u16,
    /// Overall deadline for the allocation handshake.
    pub startup_timeout: Duration,
}

/// Error type for the tunnel publisher.
#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    #[error("tunnel request failed: {0}")]
    Request(String),
    #[error("tunnel allocation response was not understood: {0}")]
    Allocation(String),
    #[error("interstitial page did not contain a continuation token")]
    MissingToken,
    #[error("continuation token was not valid base64 JSON: {0}")]
    BadToken(String),
    #[error("tunnel confirmation rejected: {0}")]
    Confirmation(String),
    #[error("tunnel handshake timed out after {0:?}")]
    Timeout(Duration),
}

/// Provider's tunnel allocation.
#[derive(Debug, Deserialize)]
struct Allocation {
    #[allow(dead_code)]
    id: String,
    url: String,
    port: u16,
    #[serde(default)]
    max_conn_count: Option<u16>,
}

/// Continuation token embedded in the 511 interstitial page.
#[derive(Debug, Deserialize)]
struct ContinuationToken {
    endpoint: String,
}

enum AllocationOutcome {
    Ready(Allocation),
    Interstitial(String),
}

/// A live tunnel. Dropping the handle aborts the connection pumps.
pub struct TunnelHandle {
    /// Public URL viewers can reach the gateway at.
    pub url: String,
    pumps: Vec<JoinHandle<()>>,
}

impl Drop for TunnelHandle {
    fn drop(&mut self) {
        for pump in &self.pumps {
            pump.abort();
        }
    }
}

/// Requests and maintains a public tunnel endpoint.
pub struct TunnelPublisher {
    http: reqwest::Client,
    config: TunnelConfig,
}

impl TunnelPublisher {
    pub fn new(config: TunnelConfig) -> Result<Self, TunnelError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TunnelError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Perform the allocation handshake and start the connection pumps.
    ///
    /// The whole handshake is bounded by the configured startup timeout so
    /// a stalled provider cannot delay relay startup indefinitely; on
    /// expiry the underlying request is dropped, not leaked.
    pub async fn open(&self) -> Result<TunnelHandle, TunnelError> {
        let timeout = self.config.startup_timeout;
        tokio::time::timeout(timeout, self.handshake())
            .await
            .map_err(|_| TunnelError::Timeout(timeout))?
    }

    async fn handshake(&self) -> Result<TunnelHandle, TunnelError> {
        let allocation = match self.request_allocation().await? {
            AllocationOutcome::Ready(allocation) => allocation,
            AllocationOutcome::Interstitial(body) => {
                debug!("provider interposed an interstitial page, confirming");
                let endpoint = extract_endpoint(&body)?;
                self.confirm(&endpoint).await?;
                match self.request_allocation().await? {
                    AllocationOutcome::Ready(allocation) => allocation,
                    AllocationOutcome::Interstitial(_) => {
                        return Err(TunnelError::Confirmation(
                            "interstitial page returned after confirmation".to_string(),
                        ))
                    }
                }
            }
        };

        let remote = remote_endpoint(&allocation.url, allocation.port);
        let conn_count = allocation.max_conn_count.unwrap_or(DEFAULT_CONN_COUNT);
        info!(
            url = %allocation.url,
            remote = %remote,
            conn_count,
            "tunnel allocated"
        );

        let pumps = (0..conn_count)
            .map(|pump| spawn_pump(pump, remote.clone(), self.config.local_port))
            .collect();

        Ok(TunnelHandle {
            url: allocation.url,
            pumps,
        })
    }

    async fn request_allocation(&self) -> Result<AllocationOutcome, TunnelError> {
        let url = format!("{}/?new", self.config.provider_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| TunnelError::Request(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NETWORK_AUTHENTICATION_REQUIRED {
            let body = response
                .text()
                .await
                .map_err(|e| TunnelError::Request(e.to_string()))?;
            return Ok(AllocationOutcome::Interstitial(body));
        }
        if !response.status().is_success() {
            return Err(TunnelError::Request(format!(
                "HTTP {} from {url}",
                response.status()
            )));
        }

        let allocation = response
            .json::<Allocation>()
            .await
            .map_err(|e| TunnelError::Allocation(e.to_string()))?;
        Ok(AllocationOutcome::Ready(allocation))
    }

    async fn confirm(&self, endpoint: &str) -> Result<(), TunnelError> {
        let url = format!(
            "{}/continue",
            self.config.provider_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "endpoint": endpoint }))
            .send()
            .await
            .map_err(|e| TunnelError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TunnelError::Confirmation(format!(
                "HTTP {}",
                response.status()
            )));
        }
        debug!(endpoint, "interstitial confirmation accepted");
        Ok(())
    }
}

/// Extract the endpoint identifier from an interstitial page body.
///
/// The page embeds `__endpoint="<base64>"` where the base64 payload is a
/// JSON object with an `endpoint` field.
fn extract_endpoint(body: &str) -> Result<String, TunnelError> {
    let start = body.find(TOKEN_MARKER).ok_or(TunnelError::MissingToken)? + TOKEN_MARKER.len();
    let end = body[start..]
        .find('"')
        .ok_or(TunnelError::MissingToken)?
        + start;

    let decoded = BASE64
        .decode(&body[start..end])
        .map_err(|e| TunnelError::BadToken(e.to_string()))?;
    let token: ContinuationToken =
        serde_json::from_slice(&decoded).map_err(|e| TunnelError::BadToken(e.to_string()))?;
    Ok(token.endpoint)
}

/// `host:port` TCP endpoint for the tunnel data connections.
fn remote_endpoint(url: &str, port: u16) -> String {
    let host = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host = host.split('/').next().unwrap_or(host);
    format!("{host}:{port}")
}

/// Keep one tunnel connection alive, redialing when it closes.
fn spawn_pump(pump: u16, remote: String, local_port: u16) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match pump_once(&remote, local_port).await {
                Ok(()) => trace!(pump, "tunnel connection closed, redialing"),
                Err(e) => {
                    debug!(pump, error = %e, "tunnel pump error");
                    tokio::time::sleep(REDIAL_BACKOFF).await;
                }
            }
        }
    })
}

/// Bridge one provider connection to the local gateway.
async fn pump_once(remote: &str, local_port: u16) -> std::io::Result<()> {
    let mut upstream = TcpStream::connect(remote).await?;
    let mut local = TcpStream::connect(("127.0.0.1", local_port)).await?;
    copy_bidirectional(&mut upstream, &mut local).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interstitial_page(token_json: &str) -> String {
        let token = BASE64.encode(token_json);
        format!(
            "<html><body>Click to continue<script>var __endpoint=\"{token}\";</script></body></html>"
        )
    }

    #[test]
    fn test_extract_endpoint_from_interstitial() {
        let body = interstitial_page(r#"{"endpoint":"tun-7f3a"}"#);
        assert_eq!(extract_endpoint(&body).unwrap(), "tun-7f3a");
    }

    #[test]
    fn test_missing_marker_is_an_error() {
        let result = extract_endpoint("<html><body>nothing here</body></html>");
        assert!(matches!(result, Err(TunnelError::MissingToken)));
    }

    #[test]
    fn test_bad_base64_is_an_error() {
        let result = extract_endpoint("prefix __endpoint=\"not!!valid@@base64\" suffix");
        assert!(matches!(result, Err(TunnelError::BadToken(_))));
    }

    #[test]
    fn test_token_without_endpoint_field_is_an_error() {
        let body = interstitial_page(r#"{"something":"else"}"#);
        assert!(matches!(
            extract_endpoint(&body),
            Err(TunnelError::BadToken(_))
        ));
    }

    #[test]
    fn test_remote_endpoint_strips_scheme_and_path() {
        assert_eq!(
            remote_endpoint("https://gentle-owl-42.localtunnel.me", 34567),
            "gentle-owl-42.localtunnel.me:34567"
        );
        assert_eq!(
            remote_endpoint("http://tunnel.example.com/extra", 1000),
            "tunnel.example.com:1000"
        );
    }

    #[test]
    fn test_allocation_deserializes_provider_response() {
        let allocation: Allocation = serde_json::from_str(
            r#"{"id":"gentle-owl-42","url":"https://gentle-owl-42.localtunnel.me","port":34567,"max_conn_count":10}"#,
        )
        .unwrap();
        assert_eq!(allocation.url, "https://gentle-owl-42.localtunnel.me");
        assert_eq!(allocation.port, 34567);
        assert_eq!(allocation.max_conn_count, Some(10));
    }
}
