//! INI-backed configuration, mirroring the original implementation's
//! `ConfigParser`-based `portal.conf` (sections `[core]`, `[ssl]`,
//! `[logging]`) with the same option names and defaults. `[core]
//! zmq_bind_host` is carried over verbatim as a key name even though the
//! ZeroMQ socket it used to configure no longer exists — see
//! [`CoreConfig::zmq_bind_host`].

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors encountered while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    Missing(PathBuf),

    #[error("malformed host/port value: {0}")]
    MalformedHost(String),

    #[error("ssl section has cert_file or key_file set but not both")]
    IncompleteTls,

    #[error("tls configuration error: {0}")]
    Tls(String),

    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] ini::Error),
}

/// A `host:port` pair. A bare host with no port defaults to port 80, for
/// compatibility with the original implementation's `_host_tuple` helper
/// (itself almost certainly a transcription artifact from an example meant
/// to show port 5140, not a considered default — kept here anyway since
/// operators may depend on it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

impl HostPort {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut parts = raw.splitn(2, ':');
        let host = parts
            .next()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError::MalformedHost(raw.to_string()))?;
        match parts.next() {
            None => Ok(Self {
                host: host.to_string(),
                port: 80,
            }),
            Some(port_str) => {
                let port = port_str
                    .parse()
                    .map_err(|_| ConfigError::MalformedHost(raw.to_string()))?;
                Ok(Self {
                    host: host.to_string(),
                    port,
                })
            }
        }
    }
}

/// `[core]` section: listener binding and worker process count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub processes: u32,
    pub syslog_bind_host: HostPort,
    /// Kept as a config key for backward compatibility with deployments
    /// of the original ZeroMQ-based gateway: the bound resource is now an
    /// in-process fan-out channel, not a ZeroMQ socket, so only the port
    /// is meaningful here — it's reused directly as the transport's
    /// bounded-queue capacity (see [`CoreConfig::transport_capacity`]).
    pub zmq_bind_host: HostPort,
    pub transport_capacity: usize,
}

/// `[ssl]` section. `None` for both fields means plaintext TCP.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SslConfig {
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
}

impl SslConfig {
    pub fn enabled(&self) -> bool {
        self.cert_file.is_some()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.cert_file, &self.key_file) {
            (Some(_), Some(_)) | (None, None) => Ok(()),
            _ => Err(ConfigError::IncompleteTls),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub console: bool,
    pub logfile: Option<PathBuf>,
    pub verbosity: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub core: CoreConfig,
    pub ssl: SslConfig,
    pub logging: LoggingConfig,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            core: CoreConfig {
                processes: 1,
                syslog_bind_host: HostPort {
                    host: "localhost".to_string(),
                    port: 5140,
                },
                zmq_bind_host: HostPort {
                    host: "localhost".to_string(),
                    port: 5000,
                },
                transport_capacity: 5000,
            },
            ssl: SslConfig::default(),
            logging: LoggingConfig {
                console: true,
                logfile: None,
                verbosity: "WARNING".to_string(),
            },
        }
    }
}

impl PortalConfig {
    /// Loads configuration from an INI file at `path`, falling back to
    /// [`PortalConfig::default`] for any option absent from the file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        let ini = ini::Ini::load_from_file(path)?;
        let defaults = Self::default();

        let core_section = ini.section(Some("core"));
        let processes = core_section
            .and_then(|s| s.get("processes"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.core.processes);
        let syslog_bind_host = match core_section.and_then(|s| s.get("syslog_bind_host")) {
            Some(raw) => HostPort::parse(raw)?,
            None => defaults.core.syslog_bind_host,
        };
        let zmq_bind_host = match core_section.and_then(|s| s.get("zmq_bind_host")) {
            Some(raw) => HostPort::parse(raw)?,
            None => defaults.core.zmq_bind_host,
        };
        let transport_capacity = (zmq_bind_host.port as usize).max(1);

        let ssl_section = ini.section(Some("ssl"));
        let ssl = SslConfig {
            cert_file: ssl_section
                .and_then(|s| s.get("cert_file"))
                .map(PathBuf::from),
            key_file: ssl_section
                .and_then(|s| s.get("key_file"))
                .map(PathBuf::from),
        };
        ssl.validate()?;

        let logging_section = ini.section(Some("logging"));
        let console = logging_section
            .and_then(|s| s.get("console"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.logging.console);
        let logfile = logging_section
            .and_then(|s| s.get("logfile"))
            .map(PathBuf::from);
        let verbosity = logging_section
            .and_then(|s| s.get("verbosity"))
            .map(str::to_string)
            .unwrap_or(defaults.logging.verbosity);

        Ok(Self {
            core: CoreConfig {
                processes,
                syslog_bind_host,
                zmq_bind_host,
                transport_capacity,
            },
            ssl,
            logging: LoggingConfig {
                console,
                logfile,
                verbosity,
            },
        })
    }
}
