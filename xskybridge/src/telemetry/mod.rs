//! Telemetry ingest - UDP listener for simulator datagrams.
//!
//! Binds one UDP socket, decodes every arriving datagram and publishes the
//! resulting record to the [`Hub`](crate::hub::Hub). In the binary
//! generation the listener also sends fire-and-forget subscription
//! datagrams to the simulator's control port so it starts streaming the
//! requested record types; viewers may adjust those subscriptions at
//! runtime through the listener's control channel.
//!
//! Bind failure is fatal to startup. Everything after a successful bind is
//! recoverable: socket read errors and malformed datagrams are logged and
//! the loop continues.

pub mod protocol;
pub mod record;

pub use protocol::{decode, ProtocolGeneration};
pub use record::TelemetryRecord;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::hub::Hub;

/// Largest datagram either generation produces, with headroom.
const MAX_DATAGRAM_SIZE: usize = 2048;

/// Backoff after a socket read error.
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Capacity of the subscription control channel.
const CONTROL_QUEUE: usize = 16;

/// Upstream record streams a deployment can subscribe to (binary
/// generation only; the text generation is broadcast by the simulator
/// without any subscription).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryStream {
    /// `RPOS` position/attitude records.
    Position,
    /// `RADR` weather radar records.
    Radar,
}

impl TelemetryStream {
    fn tag(self) -> &'static [u8; 4] {
        match self {
            TelemetryStream::Position => b"RPOS",
            TelemetryStream::Radar => b"RADR",
        }
    }
}

/// Request to change an upstream subscription. A rate of zero disables the
/// stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionCommand {
    pub stream: TelemetryStream,
    pub rate_hz: u32,
}

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct TelemetryListenerConfig {
    /// Wire format generation of the upstream simulator.
    pub generation: ProtocolGeneration,

    /// UDP port to bind. For the text generation this is the simulator's
    /// broadcast port; for the binary generation it is the local port the
    /// simulator is asked to reply to.
    pub port: u16,

    /// Simulator control endpoint for subscription datagrams (binary
    /// generation only).
    pub control_addr: Option<SocketAddr>,

    /// Whether to request the weather radar stream at startup.
    pub subscribe_radar: bool,

    /// Requested record rate for startup subscriptions.
    pub subscription_rate_hz: u32,
}

impl Default for TelemetryListenerConfig {
    fn default() -> Self {
        Self {
            generation: ProtocolGeneration::Text,
            port: 49002,
            control_addr: None,
            subscribe_radar: true,
            subscription_rate_hz: 10,
        }
    }
}

/// Error type for the telemetry listener.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to bind the UDP socket. Fatal at startup.
    #[error("failed to bind UDP socket on port {port}: {source}")]
    SocketBind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

/// UDP listener feeding the broadcast hub.
pub struct TelemetryListener {
    config: TelemetryListenerConfig,
    socket: UdpSocket,
    hub: Arc<Hub>,
    control_tx: mpsc::Sender<SubscriptionCommand>,
    control_rx: mpsc::Receiver<SubscriptionCommand>,
}

impl TelemetryListener {
    /// Bind the listener socket.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::SocketBind`] when the port is unavailable;
    /// callers must treat this as fatal rather than serve a partial relay.
    pub async fn bind(
        config: TelemetryListenerConfig,
        hub: Arc<Hub>,
    ) -> Result<Self, TelemetryError> {
        let socket = UdpSocket::bind(("0.0.0.0", config.port))
            .await
            .map_err(|e| TelemetryError::SocketBind {
                port: config.port,
                source: e,
            })?;

        info!(
            port = config.port,
            generation = ?config.generation,
            "telemetry listener bound"
        );

        let (control_tx, control_rx) = mpsc::channel(CONTROL_QUEUE);
        Ok(Self {
            config,
            socket,
            hub,
            control_tx,
            control_rx,
        })
    }

    /// Actual bound address, useful when binding port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Sender for runtime subscription changes (handed to the gateway so
    /// optional viewer control messages can reach the simulator).
    pub fn control_sender(&self) -> mpsc::Sender<SubscriptionCommand> {
        self.control_tx.clone()
    }

    /// Spawn the receive loop.
    ///
    /// The loop never exits on its own; the caller owns the returned
    /// handle and aborts it at shutdown.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        self.send_initial_subscriptions().await;

        let mut buffer = [0u8; MAX_DATAGRAM_SIZE];
        let mut datagrams: u64 = 0;

        loop {
            tokio::select! {
                received = self.socket.recv_from(&mut buffer) => match received {
                    Ok((len, peer)) => {
                        datagrams += 1;
                        if datagrams == 1 {
                            info!(peer = %peer, len, "received first telemetry datagram");
                        }
                        self.handle_datagram(&buffer[..len]);
                    }
                    Err(e) => {
                        warn!(error = %e, "UDP receive error");
                        tokio::time::sleep(RECV_ERROR_BACKOFF).await;
                    }
                },
                // `control_rx` never yields `None` because the listener
                // keeps its own sender clone alive.
                Some(command) = self.control_rx.recv() => {
                    self.send_subscription(command).await;
                }
            }
        }
    }

    /// Decode one datagram and publish the record.
    ///
    /// Unrecognized datagrams are dropped here; they never reach sessions.
    fn handle_datagram(&self, bytes: &[u8]) {
        let record = protocol::decode(self.config.generation, bytes);
        match record {
            TelemetryRecord::Unrecognized => {
                trace!(len = bytes.len(), "unrecognized datagram dropped");
            }
            record => {
                self.hub.publish(&record);
            }
        }
    }

    /// Ask the simulator to start streaming the configured record types.
    ///
    /// Fire-and-forget: no acknowledgment exists and send failures are
    /// logged, never fatal.
    async fn send_initial_subscriptions(&self) {
        if self.config.generation != ProtocolGeneration::Binary {
            return;
        }
        let rate = self.config.subscription_rate_hz;
        self.send_subscription(SubscriptionCommand {
            stream: TelemetryStream::Position,
            rate_hz: rate,
        })
        .await;
        if self.config.subscribe_radar {
            self.send_subscription(SubscriptionCommand {
                stream: TelemetryStream::Radar,
                rate_hz: rate,
            })
            .await;
        }
    }

    async fn send_subscription(&self, command: SubscriptionCommand) {
        let Some(control) = self.config.control_addr else {
            trace!(?command, "no control address configured, command ignored");
            return;
        };

        // Wire shape: 4-byte tag, NUL, ASCII rate, NUL.
        let mut datagram = Vec::with_capacity(12);
        datagram.extend_from_slice(command.stream.tag());
        datagram.push(0);
        datagram.extend_from_slice(command.rate_hz.to_string().as_bytes());
        datagram.push(0);

        match self.socket.send_to(&datagram, control).await {
            Ok(_) => debug!(
                control = %control,
                stream = ?command.stream,
                rate = command.rate_hz,
                "subscription datagram sent"
            ),
            Err(e) => warn!(error = %e, "failed to send subscription datagram"),
        }
    }
}
