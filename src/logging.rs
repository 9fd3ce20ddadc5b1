use anyhow::Context;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Environment variable naming a file to append logs to instead of stderr.
pub const LOG_FILE_ENV: &str = "EXCEL_SCHEMA_LOG_FILE";

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` with `verbose`.
pub fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let result = if let Some(path) = std::env::var_os(LOG_FILE_ENV) {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.to_string_lossy()))?;
        fmt()
            .with_env_filter(env_filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
            .with_thread_names(true)
            .with_line_number(true)
            .try_init()
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .try_init()
    };
    result.map_err(|error| anyhow::anyhow!("Failed to install tracing subscriber: {error}"))
}
