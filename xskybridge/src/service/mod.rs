//! High-level relay service facade.
//!
//! Wires the telemetry listener, broadcast hub, gateway and optional tunnel
//! together from one [`RelayConfig`] and runs them until the process stops.
//! Startup order matters: the UDP listener and the gateway port are bound
//! first (both fatal on failure), then the tunnel is attempted, and finally
//! one human-readable line with the externally-usable viewer URL is
//! printed.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::RelayConfig;
use crate::gateway::{self, GatewayError, GatewayState};
use crate::hub::Hub;
use crate::proxy::{AsyncReqwestClient, HttpError, TileProxy, TileProxyConfig};
use crate::telemetry::{
    ProtocolGeneration, TelemetryError, TelemetryListener, TelemetryListenerConfig,
};
use crate::tunnel::{TunnelConfig, TunnelError, TunnelHandle, TunnelPublisher};

/// Deadline for the tunnel allocation handshake at startup.
const TUNNEL_STARTUP_TIMEOUT: Duration = Duration::from_secs(15);

/// Error type for relay startup.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("failed to create HTTP client: {0}")]
    Http(#[from] HttpError),
    #[error("tunnel required but unavailable: {0}")]
    Tunnel(#[from] TunnelError),
}

/// The assembled relay.
pub struct RelayService {
    config: RelayConfig,
}

impl RelayService {
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Run the relay until the process is stopped.
    ///
    /// # Errors
    ///
    /// Fails when the UDP telemetry port or the gateway port cannot be
    /// bound, or when a required tunnel cannot be established. Everything
    /// else is logged and survived.
    pub async fn run(self) -> Result<(), ServiceError> {
        let config = self.config;
        let hub = Arc::new(Hub::new());

        let listener_config = TelemetryListenerConfig {
            generation: config.generation,
            port: config.telemetry_port,
            control_addr: (config.generation == ProtocolGeneration::Binary)
                .then(|| config.sim_control_addr()),
            subscribe_radar: config.subscribe_radar,
            subscription_rate_hz: config.subscription_rate_hz,
        };
        let listener = TelemetryListener::bind(listener_config, Arc::clone(&hub)).await?;
        let control = listener.control_sender();
        let listener_task = listener.start();

        let proxy = TileProxy::new(
            TileProxyConfig {
                secret: config.proxy_secret.clone(),
                upstream_base: config.tile_upstream.clone(),
            },
            AsyncReqwestClient::new()?,
        );
        let state = GatewayState {
            hub: Arc::clone(&hub),
            proxy: Arc::new(proxy),
            control,
        };

        // The handle keeps the tunnel's connection pumps alive for as long
        // as the gateway serves.
        let mut tunnel: Option<TunnelHandle> = None;
        if config.tunnel_enabled {
            match open_tunnel(&config).await {
                Ok(handle) => {
                    info!(url = %handle.url, "tunnel established");
                    tunnel = Some(handle);
                }
                Err(e) if config.tunnel_required => return Err(e.into()),
                Err(e) => warn!(error = %e, "tunnel unavailable, serving locally only"),
            }
        }

        let proxy_url = tunnel
            .as_ref()
            .map(|handle| handle.url.clone())
            .unwrap_or_else(|| config.local_url());
        println!("{}", startup_line(&config.viewer_url, &proxy_url));
        info!(viewer = %config.viewer_url, proxy = %proxy_url, "relay ready");

        let result = gateway::serve(config.gateway_port, state).await;
        listener_task.abort();
        hub.shutdown();
        drop(tunnel);
        result.map_err(ServiceError::from)
    }
}

async fn open_tunnel(config: &RelayConfig) -> Result<TunnelHandle, TunnelError> {
    let publisher = TunnelPublisher::new(TunnelConfig {
        provider_url: config.tunnel_host.clone(),
        local_port: config.gateway_port,
        startup_timeout: TUNNEL_STARTUP_TIMEOUT,
    })?;
    publisher.open().await
}

/// The one line a viewer application needs to connect.
fn startup_line(viewer_url: &str, proxy_url: &str) -> String {
    format!("{viewer_url}?proxy={proxy_url}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_line_with_local_url() {
        assert_eq!(
            startup_line("https://charts.example.com", "http://localhost:5000"),
            "https://charts.example.com?proxy=http://localhost:5000"
        );
    }

    #[test]
    fn test_startup_line_with_tunnel_url() {
        assert_eq!(
            startup_line(
                "https://charts.example.com",
                "https://gentle-owl-42.localtunnel.me"
            ),
            "https://charts.example.com?proxy=https://gentle-owl-42.localtunnel.me"
        );
    }
}
