//! Relay configuration.
//!
//! One explicit [`RelayConfig`] is built at startup - from the process
//! environment in production, from a plain map in tests - and passed to
//! each component. No component reads the environment on its own.
//!
//! A malformed optional key falls back to its default with a warning;
//! startup never fails on configuration alone.

pub mod defaults;

use std::collections::HashMap;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use tracing::warn;

use crate::telemetry::ProtocolGeneration;

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Port shared by the viewer gateway and the tile proxy (`WS_PORT`).
    pub gateway_port: u16,
    /// UDP telemetry port (`XP_PORT`): simulator broadcast port in the
    /// text generation, local reply port in the binary generation.
    pub telemetry_port: u16,
    /// Upstream wire format generation (`PROTOCOL`: `text` or `binary`).
    pub generation: ProtocolGeneration,
    /// Simulator control host (`XP_HOST`).
    pub sim_host: IpAddr,
    /// Simulator control port (`XP_CONTROL_PORT`).
    pub sim_control_port: u16,
    /// Subscribe to the weather radar stream at startup (`RADAR`).
    pub subscribe_radar: bool,
    /// Requested record rate for subscriptions (`RATE`).
    pub subscription_rate_hz: u32,
    /// Publish a public tunnel URL at startup (`TUNNEL`).
    pub tunnel_enabled: bool,
    /// Treat tunnel failure as fatal (`TUNNEL_REQUIRED`).
    pub tunnel_required: bool,
    /// Tunnel provider base URL (`TUNNEL_HOST`).
    pub tunnel_host: String,
    /// Shared-secret path segment for tile requests (`PROXY_SECRET`).
    pub proxy_secret: String,
    /// Upstream tile provider base URL (`TILE_UPSTREAM`).
    pub tile_upstream: String,
    /// Viewer application base URL for the startup line (`VIEWER_URL`).
    pub viewer_url: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            gateway_port: defaults::GATEWAY_PORT,
            telemetry_port: defaults::TEXT_TELEMETRY_PORT,
            generation: ProtocolGeneration::Text,
            sim_host: IpAddr::from([127, 0, 0, 1]),
            sim_control_port: defaults::SIM_CONTROL_PORT,
            subscribe_radar: true,
            subscription_rate_hz: defaults::SUBSCRIPTION_RATE_HZ,
            tunnel_enabled: false,
            tunnel_required: false,
            tunnel_host: defaults::TUNNEL_HOST.to_string(),
            proxy_secret: defaults::PROXY_SECRET.to_string(),
            tile_upstream: defaults::TILE_UPSTREAM.to_string(),
            viewer_url: defaults::VIEWER_URL.to_string(),
        }
    }
}

impl RelayConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_map(&std::env::vars().collect())
    }

    /// Build the configuration from an explicit key/value map.
    pub fn from_map(vars: &HashMap<String, String>) -> Self {
        let generation = match vars.get("PROTOCOL").map(String::as_str) {
            Some("binary") => ProtocolGeneration::Binary,
            Some("text") | None => ProtocolGeneration::Text,
            Some(other) => {
                warn!(value = other, "unknown PROTOCOL value, using text");
                ProtocolGeneration::Text
            }
        };
        let telemetry_port_default = match generation {
            ProtocolGeneration::Text => defaults::TEXT_TELEMETRY_PORT,
            ProtocolGeneration::Binary => defaults::BINARY_TELEMETRY_PORT,
        };

        let mut config = Self {
            generation,
            telemetry_port: telemetry_port_default,
            ..Self::default()
        };

        if let Some(value) = vars.get("WS_PORT") {
            config.gateway_port = parse_or(value, "WS_PORT", config.gateway_port);
        }
        if let Some(value) = vars.get("XP_PORT") {
            config.telemetry_port = parse_or(value, "XP_PORT", config.telemetry_port);
        }
        if let Some(value) = vars.get("XP_HOST") {
            config.sim_host = parse_or(value, "XP_HOST", config.sim_host);
        }
        if let Some(value) = vars.get("XP_CONTROL_PORT") {
            config.sim_control_port =
                parse_or(value, "XP_CONTROL_PORT", config.sim_control_port);
        }
        if let Some(value) = vars.get("RADAR") {
            config.subscribe_radar = flag(value);
        }
        if let Some(value) = vars.get("RATE") {
            config.subscription_rate_hz = parse_or(value, "RATE", config.subscription_rate_hz);
        }
        if let Some(value) = vars.get("TUNNEL") {
            config.tunnel_enabled = flag(value);
        }
        if let Some(value) = vars.get("TUNNEL_REQUIRED") {
            config.tunnel_required = flag(value);
        }
        if let Some(value) = vars.get("TUNNEL_HOST") {
            config.tunnel_host = value.clone();
        }
        if let Some(value) = vars.get("PROXY_SECRET") {
            config.proxy_secret = value.clone();
        }
        if let Some(value) = vars.get("TILE_UPSTREAM") {
            config.tile_upstream = value.clone();
        }
        if let Some(value) = vars.get("VIEWER_URL") {
            config.viewer_url = value.clone();
        }

        config
    }

    /// Simulator control endpoint for subscription datagrams.
    pub fn sim_control_addr(&self) -> SocketAddr {
        SocketAddr::new(self.sim_host, self.sim_control_port)
    }

    /// Local viewer URL when no tunnel is active.
    pub fn local_url(&self) -> String {
        format!("http://localhost:{}", self.gateway_port)
    }
}

/// Parse a configuration value, falling back to the default on error.
fn parse_or<T>(value: &str, key: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match value.trim().parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(key, value, %default, "invalid configuration value, using default");
            default
        }
    }
}

/// Truthy environment flag.
fn flag(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = RelayConfig::from_map(&HashMap::new());
        assert_eq!(config.gateway_port, 5000);
        assert_eq!(config.telemetry_port, 49002);
        assert_eq!(config.generation, ProtocolGeneration::Text);
        assert!(!config.tunnel_enabled);
        assert!(config.subscribe_radar);
    }

    #[test]
    fn test_binary_generation_changes_default_port() {
        let config = RelayConfig::from_map(&map(&[("PROTOCOL", "binary")]));
        assert_eq!(config.generation, ProtocolGeneration::Binary);
        assert_eq!(config.telemetry_port, defaults::BINARY_TELEMETRY_PORT);

        // An explicit port still wins
        let config =
            RelayConfig::from_map(&map(&[("PROTOCOL", "binary"), ("XP_PORT", "49123")]));
        assert_eq!(config.telemetry_port, 49123);
    }

    #[test]
    fn test_overrides() {
        let config = RelayConfig::from_map(&map(&[
            ("WS_PORT", "8080"),
            ("XP_HOST", "192.168.1.50"),
            ("TUNNEL", "1"),
            ("PROXY_SECRET", "another-secret"),
        ]));
        assert_eq!(config.gateway_port, 8080);
        assert_eq!(config.sim_host, IpAddr::from([192, 168, 1, 50]));
        assert!(config.tunnel_enabled);
        assert_eq!(config.proxy_secret, "another-secret");
    }

    #[test]
    fn test_every_recognized_key_is_parsed() {
        let config = RelayConfig::from_map(&map(&[
            ("WS_PORT", "8080"),
            ("XP_PORT", "49100"),
            ("XP_HOST", "192.168.1.50"),
            ("XP_CONTROL_PORT", "49200"),
            ("PROTOCOL", "binary"),
            ("RADAR", "0"),
            ("RATE", "25"),
            ("TUNNEL", "1"),
            ("TUNNEL_REQUIRED", "true"),
            ("TUNNEL_HOST", "https://tunnel.example.net"),
            ("PROXY_SECRET", "another-secret"),
            ("TILE_UPSTREAM", "https://tiles.example.net"),
            ("VIEWER_URL", "https://viewer.example.net"),
        ]));

        assert_eq!(config.gateway_port, 8080);
        assert_eq!(config.telemetry_port, 49100);
        assert_eq!(config.sim_host, IpAddr::from([192, 168, 1, 50]));
        assert_eq!(config.sim_control_port, 49200);
        assert_eq!(config.generation, ProtocolGeneration::Binary);
        assert!(!config.subscribe_radar);
        assert_eq!(config.subscription_rate_hz, 25);
        assert!(config.tunnel_enabled);
        assert!(config.tunnel_required);
        assert_eq!(config.tunnel_host, "https://tunnel.example.net");
        assert_eq!(config.proxy_secret, "another-secret");
        assert_eq!(config.tile_upstream, "https://tiles.example.net");
        assert_eq!(config.viewer_url, "https://viewer.example.net");
    }

    #[test]
    fn test_malformed_numeric_falls_back_to_default() {
        let config = RelayConfig::from_map(&map(&[("WS_PORT", "not-a-port")]));
        assert_eq!(config.gateway_port, defaults::GATEWAY_PORT);
    }

    #[test]
    fn test_flag_values() {
        assert!(flag("1"));
        assert!(flag("true"));
        assert!(flag(" yes "));
        assert!(!flag("0"));
        assert!(!flag("off"));
        assert!(!flag(""));
    }

    #[test]
    fn test_sim_control_addr() {
        let config = RelayConfig::from_map(&map(&[("XP_HOST", "10.0.0.2")]));
        assert_eq!(
            config.sim_control_addr(),
            "10.0.0.2:49000".parse().unwrap()
        );
    }

    #[test]
    fn test_local_url() {
        let config = RelayConfig::from_map(&map(&[("WS_PORT", "5050")]));
        assert_eq!(config.local_url(), "http://localhost:5050");
    }
}
