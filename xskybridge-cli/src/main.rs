//! XSkyBridge CLI - run the telemetry relay.
//!
//! Configuration comes from the environment (see `RelayConfig`); the flags
//! below override individual values for quick experiments.

mod error;

use clap::{Parser, ValueEnum};

use error::CliError;
use xskybridge::config::RelayConfig;
use xskybridge::logging::init_logging;
use xskybridge::service::RelayService;
use xskybridge::telemetry::ProtocolGeneration;

#[derive(Debug, Clone, ValueEnum)]
enum Protocol {
    /// ForeFlight-style comma-separated datagrams (XGPS/XATT)
    Text,
    /// Fixed-offset binary datagrams (RPOS/RADR)
    Binary,
}

#[derive(Parser)]
#[command(name = "xskybridge", version = xskybridge::VERSION)]
#[command(about = "Relay X-Plane telemetry to web viewers", long_about = None)]
struct Args {
    /// Gateway port for viewer WebSockets and the tile proxy
    #[arg(long)]
    port: Option<u16>,

    /// UDP port for telemetry datagrams
    #[arg(long)]
    telemetry_port: Option<u16>,

    /// Telemetry protocol generation
    #[arg(long, value_enum)]
    protocol: Option<Protocol>,

    /// Publish the gateway at a public URL via the tunnel provider
    #[arg(long)]
    tunnel: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn apply(&self, config: &mut RelayConfig) {
        if let Some(port) = self.port {
            config.gateway_port = port;
        }
        if let Some(port) = self.telemetry_port {
            config.telemetry_port = port;
        }
        if let Some(protocol) = &self.protocol {
            config.generation = match protocol {
                Protocol::Text => ProtocolGeneration::Text,
                Protocol::Binary => ProtocolGeneration::Binary,
            };
        }
        if self.tunnel {
            config.tunnel_enabled = true;
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _logging_guard = match init_logging(args.debug) {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e.to_string()).exit(),
    };

    let mut config = RelayConfig::from_env();
    args.apply(&mut config);

    if let Err(e) = RelayService::new(config).run().await {
        CliError::Service(e).exit();
    }
}
