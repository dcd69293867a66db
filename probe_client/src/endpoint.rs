//! Front-end address parsing.
//!
//! Fronts are usually published as `tcp://host:port`. The probe speaks WebSocket,
//! so the address is validated once at startup and mapped onto a `ws://` or `wss://` URL.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq)]
pub enum EndpointError {
    #[error("invalid front address '{0}': {1}")]
    Malformed(String, String),

    #[error("unsupported scheme '{0}' (expected tcp, ssl, ws or wss)")]
    UnsupportedScheme(String),

    #[error("front address '{0}' has no host")]
    MissingHost(String),

    #[error("front address '{0}' has no port")]
    MissingPort(String),
}

/// A validated front-end address. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    raw: String,
    host: String,
    port: u16,
    tls: bool,
}

impl Endpoint {
    pub fn parse(address: &str) -> Result<Self, EndpointError> {
        let address = address.trim();
        let url = Url::parse(address)
            .map_err(|e| EndpointError::Malformed(address.to_string(), e.to_string()))?;

        let tls = match url.scheme() {
            "tcp" | "ws" => false,
            "ssl" | "wss" => true,
            other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
        };

        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => return Err(EndpointError::MissingHost(address.to_string())),
        };

        // tcp/ssl have no registered default port, ws/wss fall back to 80/443
        let port = url
            .port_or_known_default()
            .ok_or_else(|| EndpointError::MissingPort(address.to_string()))?;

        Ok(Self {
            raw: address.to_string(),
            host,
            port,
            tls,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn use_tls(&self) -> bool {
        self.tls
    }

    /// Generate the WebSocket URL for this front
    pub fn websocket_url(&self) -> String {
        let protocol = if self.tls { "wss" } else { "ws" };
        format!("{}://{}:{}", protocol, self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
