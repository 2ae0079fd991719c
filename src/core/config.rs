use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};

use clap::ArgMatches;

use crate::core::exporter::FailurePolicy;
use crate::error::{ExporterError, Result};

pub const DEFAULT_LISTEN_ADDRESS: &str = ":9114";
pub const DEFAULT_TELEMETRY_PATH: &str = "/metrics";

/// Runtime settings of the exporter, taken from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterConfig {
    pub listen_address: SocketAddr,
    /// Path the metrics are served on; `/` is kept for the landing page
    pub telemetry_path: String,
    pub failure_policy: FailurePolicy,
    /// Serve readings from the built-in mock device instead of NVML
    pub use_mock: bool,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 9114),
            telemetry_path: DEFAULT_TELEMETRY_PATH.to_string(),
            failure_policy: FailurePolicy::default(),
            use_mock: false,
        }
    }
}

impl ExporterConfig {
    /// Build the config from parsed arguments (see `crate::cli::build_cli`)
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let listen_address = matches
            .get_one::<String>("listen-address")
            .map(String::as_str)
            .unwrap_or(DEFAULT_LISTEN_ADDRESS);
        let telemetry_path = matches
            .get_one::<String>("telemetry-path")
            .map(String::as_str)
            .unwrap_or(DEFAULT_TELEMETRY_PATH);
        let failure_policy = match matches.get_one::<String>("failure-policy") {
            Some(policy) => policy.parse()?,
            None => FailurePolicy::default(),
        };

        Ok(Self {
            listen_address: parse_listen_address(listen_address)?,
            telemetry_path: validate_telemetry_path(telemetry_path)?,
            failure_policy,
            use_mock: matches.get_flag("mock"),
        })
    }
}

/// Parse `HOST:PORT`, or `:PORT` to listen on every IPv4 interface.
pub fn parse_listen_address(addr: &str) -> Result<SocketAddr> {
    let addr = addr.trim();

    if let Some(port) = addr.strip_prefix(':') {
        let port: u16 = port
            .parse()
            .map_err(|_| ExporterError::config(format!("invalid listen port: '{}'", port)))?;
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
    }

    if let Ok(socket) = addr.parse::<SocketAddr>() {
        return Ok(socket);
    }

    // Host names such as localhost:9114
    addr.to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| ExporterError::config(format!("invalid listen address: '{}'", addr)))
}

pub fn validate_telemetry_path(path: &str) -> Result<String> {
    if !path.starts_with('/') {
        return Err(ExporterError::config(format!(
            "telemetry path must start with '/': '{}'",
            path
        )));
    }
    if path == "/" {
        return Err(ExporterError::config(
            "telemetry path cannot be '/', it serves the landing page",
        ));
    }
    if path.chars().any(char::is_whitespace) {
        return Err(ExporterError::config(format!(
            "telemetry path cannot contain whitespace: '{}'",
            path
        )));
    }
    // Served as a literal route, so router capture syntax is not allowed
    if path.contains(['{', '}'])
        || path
            .split('/')
            .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
    {
        return Err(ExporterError::config(format!(
            "telemetry path cannot contain route parameters or wildcards: '{}'",
            path
        )));
    }
    Ok(path.to_string())
}
