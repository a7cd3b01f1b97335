//! Server configuration from the command line and environment.

use clap::Parser;
use std::net::SocketAddr;

/// DrawSync relay server.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "drawsync-server",
    version,
    about = "Room-scoped WebSocket relay for DrawSync canvases"
)]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, env = "DRAWSYNC_BIND", default_value = "0.0.0.0:3030", value_name = "ADDR")]
    pub bind: SocketAddr,

    /// Origin allowed by CORS. Any origin is allowed when unset.
    #[arg(long, env = "DRAWSYNC_ALLOWED_ORIGIN", value_name = "ORIGIN")]
    pub allowed_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3030)),
            allowed_origin: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let config = ServerConfig::try_parse_from([
            "drawsync-server",
            "--bind",
            "127.0.0.1:4000",
            "--allowed-origin",
            "http://localhost:5173",
        ])
        .unwrap();
        assert_eq!(config.bind, "127.0.0.1:4000".parse().unwrap());
        assert_eq!(config.allowed_origin.as_deref(), Some("http://localhost:5173"));
    }

    #[test]
    fn test_rejects_bad_address() {
        assert!(ServerConfig::try_parse_from(["drawsync-server", "--bind", "nowhere"]).is_err());
    }
}
