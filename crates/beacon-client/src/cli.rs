//! Command-line interface for the Beacon client.

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;

/// Interactive client for the Beacon relay.
///
/// Prints every message the server pushes and relays each line typed on
/// stdin as the connection's replacement message.
#[derive(Parser, Debug, Clone)]
#[command(name = "beacon", version, about)]
pub struct Args {
    /// Websocket endpoint to connect to, e.g. ws://127.0.0.1:4000.
    pub url: String,
}

impl Args {
    /// Validate the endpoint before any network work happens.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse as a websocket request
    /// or carries a non-websocket scheme.
    pub fn validate(&self) -> Result<()> {
        let request = self
            .url
            .as_str()
            .into_client_request()
            .with_context(|| format!("Invalid websocket endpoint: {}", self.url))?;

        let scheme = request.uri().scheme_str().unwrap_or("");
        if scheme != "ws" && scheme != "wss" {
            bail!("Endpoint {} must use ws:// or wss://", self.url);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(url: &str) -> Args {
        Args {
            url: url.to_string(),
        }
    }

    #[test]
    fn test_cli_accepts_websocket_endpoints() {
        assert!(args("ws://127.0.0.1:4000").validate().is_ok());
        assert!(args("ws://localhost:8765").validate().is_ok());
        assert!(args("wss://relay.example.com/feed").validate().is_ok());
    }

    #[test]
    fn test_cli_rejects_non_websocket_schemes() {
        assert!(args("http://127.0.0.1:4000").validate().is_err());
        assert!(args("ftp://127.0.0.1:4000").validate().is_err());
    }

    #[test]
    fn test_cli_rejects_malformed_endpoints() {
        assert!(args("not a url").validate().is_err());
        assert!(args("ws://").validate().is_err());
    }

    #[test]
    fn test_cli_url_is_required() {
        assert!(Args::try_parse_from(["beacon"]).is_err());

        let parsed = Args::try_parse_from(["beacon", "ws://localhost:4000"]).unwrap();
        assert_eq!(parsed.url, "ws://localhost:4000");
    }
}
