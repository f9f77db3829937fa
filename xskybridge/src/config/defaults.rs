//! Default configuration values.

/// Gateway port shared by viewer WebSockets and the tile proxy.
pub const GATEWAY_PORT: u16 = 5000;

/// Simulator broadcast port for the text generation (ForeFlight convention).
pub const TEXT_TELEMETRY_PORT: u16 = 49002;

/// Local reply port for the binary generation.
pub const BINARY_TELEMETRY_PORT: u16 = 49010;

/// Simulator control port the subscription datagrams go to.
pub const SIM_CONTROL_PORT: u16 = 49000;

/// Requested record rate for startup subscriptions.
pub const SUBSCRIPTION_RATE_HZ: u32 = 10;

/// Tunnel provider base URL.
pub const TUNNEL_HOST: &str = "https://localtunnel.me";

/// Upstream tile provider base URL.
pub const TILE_UPSTREAM: &str = "https://t.skyvector.com";

/// Viewer application base URL used in the startup line.
pub const VIEWER_URL: &str = "https://charts.example.com";

/// Shared-secret path segment for tile requests.
pub const PROXY_SECRET: &str = "kT3nWq8ZbvslQr72";
