//! XSkyBridge - real-time X-Plane telemetry relay.
//!
//! Receives flight-simulator telemetry datagrams over UDP, decodes them
//! into typed records, and fans the records out as JSON messages to any
//! number of WebSocket viewers. The same listening port doubles as a map
//! tile proxy, and the whole endpoint can optionally be published at a
//! public URL through an outbound tunnel.
//!
//! # High-Level API
//!
//! ```ignore
//! use xskybridge::config::RelayConfig;
//! use xskybridge::service::RelayService;
//!
//! let config = RelayConfig::from_env();
//! RelayService::new(config).run().await?;
//! ```
//!
//! Data flow: `telemetry::TelemetryListener` → `telemetry::protocol::decode`
//! → `hub::Hub::publish` → each `gateway` session.

pub mod config;
pub mod gateway;
pub mod hub;
pub mod logging;
pub mod proxy;
pub mod service;
pub mod telemetry;
pub mod tunnel;

/// Version of the XSkyBridge library and CLI.
///
/// Synchronized across the workspace via `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
