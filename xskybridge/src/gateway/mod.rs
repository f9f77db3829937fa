//! Session gateway - shared HTTP listening port for viewers and tiles.
//!
//! One axum server owns the public port. Requests carrying a WebSocket
//! upgrade become hub-managed viewer sessions; every other request is
//! dispatched to the tile proxy. A session needs no inbound traffic to
//! function, but text frames that parse as subscription control messages
//! are forwarded to the telemetry listener; anything else is ignored.
//!
//! A session task exits through a single teardown path that deregisters it
//! from the hub exactly once, whether the viewer closed cleanly, the write
//! failed, or the hub dropped the session first.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{OriginalUri, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::hub::Hub;
use crate::proxy::{AsyncReqwestClient, TileProxy};
use crate::telemetry::{SubscriptionCommand, TelemetryStream};

/// Error type for the gateway server.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Failed to bind the listening port. Fatal at startup.
    #[error("failed to bind gateway port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: hyper::Error,
    },
    /// The server exited with an error while running.
    #[error("gateway server failed: {0}")]
    Serve(#[source] hyper::Error),
}

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct GatewayState {
    pub hub: Arc<Hub>,
    pub proxy: Arc<TileProxy<AsyncReqwestClient>>,
    pub control: mpsc::Sender<SubscriptionCommand>,
}

/// Build the gateway router: WebSocket upgrades become sessions, anything
/// else is a tile request.
pub fn router(state: GatewayState) -> Router {
    Router::new().fallback(dispatch).with_state(state)
}

/// Serve the gateway until the process stops.
///
/// # Errors
///
/// [`GatewayError::Bind`] when the port is unavailable - fatal, the relay
/// must not continue with a partial feature set.
pub async fn serve(port: u16, state: GatewayState) -> Result<(), GatewayError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server = axum::Server::try_bind(&addr)
        .map_err(|e| GatewayError::Bind { port, source: e })?;

    info!(port, "gateway listening");
    server
        .serve(router(state).into_make_service())
        .await
        .map_err(GatewayError::Serve)
}

async fn dispatch(
    State(state): State<GatewayState>,
    OriginalUri(uri): OriginalUri,
    upgrade: Option<WebSocketUpgrade>,
) -> Response {
    match upgrade {
        Some(upgrade) => upgrade
            .on_upgrade(move |socket| run_session(socket, state))
            .into_response(),
        None => {
            let body = state.proxy.handle(uri.path()).await;
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "image/jpeg"),
                    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
                ],
                body,
            )
                .into_response()
        }
    }
}

/// Drive one viewer session until either side closes.
async fn run_session(socket: WebSocket, state: GatewayState) {
    let (id, mut outbound) = state.hub.join();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            message = outbound.recv() => match message {
                Some(message) => {
                    if sink.send(Message::Text(message)).await.is_err() {
                        debug!(session = id, "session write failed");
                        break;
                    }
                }
                // Hub dropped this session (teardown or shutdown)
                None => break,
            },
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    forward_control(&state.control, id, &text);
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // ping/pong/binary: ignored
                Some(Err(e)) => {
                    debug!(session = id, error = %e, "session read error");
                    break;
                }
            },
        }
    }

    // Single exit path; leave() is additionally idempotent against a
    // concurrent publish-side teardown.
    state.hub.leave(id);
}

/// Optional viewer control frame adjusting upstream subscriptions.
#[derive(Debug, Deserialize)]
struct ControlFrame {
    #[serde(rename = "type")]
    kind: String,
    stream: String,
    #[serde(default)]
    rate: Option<u32>,
}

/// Parse a text frame as a subscription command.
///
/// Unparseable or unexpected frames return `None`; the relay functions
/// with no inbound viewer traffic at all.
fn parse_control(text: &str) -> Option<SubscriptionCommand> {
    let frame: ControlFrame = serde_json::from_str(text).ok()?;
    if frame.kind != "subscribe" {
        return None;
    }
    let stream = match frame.stream.as_str() {
        "position" => TelemetryStream::Position,
        "radar" => TelemetryStream::Radar,
        _ => return None,
    };
    Some(SubscriptionCommand {
        stream,
        rate_hz: frame.rate.unwrap_or(0),
    })
}

fn forward_control(
    control: &mpsc::Sender<SubscriptionCommand>,
    session: u64,
    text: &str,
) {
    let Some(command) = parse_control(text) else {
        trace!(session, "ignoring non-control frame");
        return;
    };
    // Best effort: a full control queue just drops the request
    if control.try_send(command).is_ok() {
        debug!(session, ?command, "subscription command forwarded");
    }
}
