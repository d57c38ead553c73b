//! Server configuration.
//!
//! All configuration arrives on the command line. A missing or invalid
//! parameter aborts startup with a usage error before any socket is
//! opened.

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Interval-push websocket relay server.
///
/// Listens for websocket connections and sends each client its current
/// message on a fixed cadence. A client replaces its message by sending a
/// new one.
#[derive(Parser, Debug, Clone)]
#[command(name = "beacond", version, about)]
pub struct Config {
    /// Port to listen on. Use 0 for an ephemeral port.
    pub port: u16,

    /// Push interval in milliseconds. Must be at least 1.
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// Host to bind to.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Serve Prometheus metrics on this port.
    #[arg(long)]
    pub metrics_port: Option<u16>,
}

impl Config {
    /// Get the socket address to bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Get the push cadence as a duration.
    #[must_use]
    pub fn push_interval(&self) -> Duration {
        Duration::from_millis(self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parses_required_parameters() {
        let config = Config::try_parse_from(["beacond", "4000", "1000"]).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.interval, 1000);
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:4000");
        assert_eq!(config.push_interval(), Duration::from_secs(1));
        assert!(config.metrics_port.is_none());
    }

    #[test]
    fn test_config_missing_parameters_rejected() {
        assert!(Config::try_parse_from(["beacond"]).is_err());
        assert!(Config::try_parse_from(["beacond", "4000"]).is_err());
    }

    #[test]
    fn test_config_zero_interval_rejected() {
        assert!(Config::try_parse_from(["beacond", "4000", "0"]).is_err());
    }

    #[test]
    fn test_config_non_numeric_parameters_rejected() {
        assert!(Config::try_parse_from(["beacond", "port", "1000"]).is_err());
        assert!(Config::try_parse_from(["beacond", "4000", "soon"]).is_err());
        assert!(Config::try_parse_from(["beacond", "70000", "1000"]).is_err());
    }

    #[test]
    fn test_config_custom_host_and_metrics_port() {
        let config = Config::try_parse_from([
            "beacond",
            "4000",
            "250",
            "--host",
            "0.0.0.0",
            "--metrics-port",
            "9090",
        ])
        .unwrap();
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:4000");
        assert_eq!(config.push_interval(), Duration::from_millis(250));
        assert_eq!(config.metrics_port, Some(9090));
    }
}
