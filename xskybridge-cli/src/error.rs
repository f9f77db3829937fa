//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use xskybridge::service::ServiceError;

/// CLI-specific errors with appropriate exit behavior.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// The relay service failed to start or exited with an error
    Service(ServiceError),
}

impl CliError {
    /// Exit the process with an error message and code 1.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Service(ServiceError::Telemetry(_))
            | CliError::Service(ServiceError::Gateway(_)) => {
                eprintln!();
                eprintln!("Common issues:");
                eprintln!("  1. Port already in use: another relay or simulator instance");
                eprintln!("  2. Permissions: ports below 1024 need elevated privileges");
            }
            CliError::Service(ServiceError::Tunnel(_)) => {
                eprintln!();
                eprintln!("The tunnel provider could not be reached. Unset TUNNEL_REQUIRED");
                eprintln!("to keep serving on the local binding when the tunnel fails.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "failed to initialize logging: {}", msg),
            CliError::Service(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_logging_init() {
        let error = CliError::LoggingInit("permission denied".to_string());
        assert_eq!(
            error.to_string(),
            "failed to initialize logging: permission denied"
        );
    }
}
