//! `portal` CLI entry point: loads configuration, starts the ingest
//! pipeline, and drains assembled records to stdout as newline-delimited
//! JSON until asked to shut down.
//!
//! Exit codes: `0` clean shutdown, `1` configuration error, `2` bind/TLS
//! setup failure, `3` any other runtime error (async runtime startup,
//! logging initialization).

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use portal::config::PortalConfig;
use portal::pipeline::Pipeline;
use portal::tls;
use portal::PortalError;

/// An RFC 5424 syslog ingest gateway.
#[derive(Debug, Parser)]
#[command(name = "portal", version, about)]
struct Args {
    /// Path to the portal.conf INI configuration file. Falls back to the
    /// PORTAL_CONFIG environment variable, then /etc/meniscus-portal/portal.conf.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enables process-level profiling. Not implemented — accepted (and
    /// mirrored by the PROFILE environment variable) so existing
    /// deployments that already pass it don't fail to start.
    #[arg(long)]
    profile: bool,
}

fn config_path(args: &Args) -> PathBuf {
    args.config
        .clone()
        .or_else(|| std::env::var_os("PORTAL_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("/etc/meniscus-portal/portal.conf"))
}

fn profiling_requested(args: &Args) -> bool {
    args.profile || std::env::var("PROFILE").is_ok_and(|v| v == "true")
}

fn main() -> ExitCode {
    let args = Args::parse();
    let path = config_path(&args);

    let config = match PortalConfig::load(&path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load configuration from {}: {e}", path.display());
            return exit_code(&PortalError::Config(e));
        }
    };

    if let Err(e) = portal::logging::init(&config.logging) {
        eprintln!("failed to initialize logging: {e}");
        return exit_code(&PortalError::Runtime(e.to_string()));
    }

    if profiling_requested(&args) {
        warn!("profiling was requested via --profile/PROFILE but is not implemented; ignoring");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            let err = PortalError::Runtime(e.to_string());
            error!(error = %err, "failed to start async runtime");
            return exit_code(&err);
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "portal exited with an error");
            exit_code(&e)
        }
    }
}

/// Maps a [`PortalError`] onto the process exit code documented for it:
/// `1` configuration error, `2` bind/TLS failure (reported as `Io`), `3`
/// any other runtime error.
fn exit_code(err: &PortalError) -> ExitCode {
    match err {
        PortalError::Config(_) => ExitCode::from(1),
        PortalError::Io(_) => ExitCode::from(2),
        PortalError::Runtime(_) => ExitCode::from(3),
    }
}

async fn run(config: PortalConfig) -> Result<(), PortalError> {
    let tls_acceptor = if config.ssl.enabled() {
        let cert = config.ssl.cert_file.as_deref().expect("validated by PortalConfig::load");
        let key = config.ssl.key_file.as_deref().expect("validated by PortalConfig::load");
        let acceptor = tls::load_acceptor(cert, key)
            .map_err(|e| PortalError::Io(std::io::Error::other(e)))?;
        Some(acceptor)
    } else {
        None
    };

    let bind_addr = format!(
        "{}:{}",
        config.core.syslog_bind_host.host, config.core.syslog_bind_host.port
    );
    let addr: std::net::SocketAddr = bind_addr.parse().map_err(|e| {
        PortalError::Io(std::io::Error::other(format!(
            "failed to resolve bind address {bind_addr}: {e}"
        )))
    })?;

    let mut pipeline = Pipeline::new(addr, tls_acceptor, config.core.transport_capacity);
    let consumer = pipeline.subscribe();

    pipeline.start().await?;
    info!("portal is running");

    let drain = tokio::spawn(async move {
        let mut stdout = std::io::stdout().lock();
        while let Some(record) = consumer.recv().await {
            let line = record.to_json().to_string();
            if writeln!(stdout, "{line}").is_err() {
                break;
            }
        }
    });

    wait_for_shutdown_signal().await;
    info!("shutdown signal received");

    pipeline.stop().await;
    drain.abort();

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut int = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = term.recv() => {}
        _ = int.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
