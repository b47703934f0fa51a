//! Initializes `tracing-subscriber` from the `[logging]` configuration
//! section, mirroring the original implementation's `console`/`logfile`/
//! `verbosity` options.

use std::fs::OpenOptions;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Maps the original Python `logging`-module verbosity names onto a
/// `tracing` filter directive.
fn filter_for(verbosity: &str) -> EnvFilter {
    let level = match verbosity.to_ascii_uppercase().as_str() {
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARNING" => "warn",
        "ERROR" | "CRITICAL" => "error",
        _ => "warn",
    };
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Installs the global `tracing` subscriber. Must be called once, before
/// any other logging occurs; a second call is a programming error.
pub fn init(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = filter_for(&config.verbosity);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &config.logfile {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.with_writer(file).with_ansi(false).init();
        }
        None => {
            if config.console {
                builder.init();
            } else {
                builder.with_writer(std::io::sink).init();
            }
        }
    }
    Ok(())
}
