//! Logging infrastructure for XSkyBridge.
//!
//! Structured logging with dual output: a non-blocking file writer under
//! `logs/` plus stdout for terminal tailing. Level defaults to INFO,
//! overridable via `RUST_LOG` or the debug flag.

use std::fs;
use std::io;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Directory for log files.
const LOG_DIR: &str = "logs";

/// Log file name.
const LOG_FILE: &str = "xskybridge.log";

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping it flushes and closes the file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize logging.
///
/// Creates the log directory if needed and truncates the previous session's
/// log file. With `debug` set, the default filter drops to debug level
/// (an explicit `RUST_LOG` still wins).
///
/// # Errors
///
/// Returns an error when the log directory or file cannot be created.
pub fn init_logging(debug: bool) -> Result<LoggingGuard, io::Error> {
    fs::create_dir_all(LOG_DIR)?;
    fs::write(format!("{LOG_DIR}/{LOG_FILE}"), "")?;

    let file_appender = tracing_appender::rolling::never(LOG_DIR, LOG_FILE);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_target(false);

    let default_filter = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // init_logging itself installs a global subscriber and can only run
    // once per process, so tests cover the file plumbing it relies on.

    #[test]
    fn test_log_file_truncation() {
        let dir = std::env::temp_dir().join(format!(
            "xskybridge_log_test_{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join(LOG_FILE);

        fs::write(&file, "previous session").unwrap();
        fs::write(&file, "").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_guard_holds_worker() {
        let (writer, guard) = tracing_appender::non_blocking(std::io::sink());
        drop(writer);
        let _logging_guard = LoggingGuard { _file_guard: guard };
    }
}
