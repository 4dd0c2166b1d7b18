//! Gateway configuration

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default listen address for the HTTP server
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Default upstream request timeout in seconds
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Upper bound for the upstream timeout
pub const MAX_UPSTREAM_TIMEOUT_SECS: u64 = 300;

/// Runtime configuration for the gateway and its HTTP surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Address the HTTP server listens on
    pub bind_addr: String,
    /// Timeout for a single upstream round trip
    pub upstream_timeout_secs: u64,
    /// Token required on admin routes; `None` leaves them open
    #[serde(skip_serializing)]
    pub admin_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            upstream_timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
            admin_token: None,
        }
    }
}

impl GatewayConfig {
    /// Validate and normalize the configuration
    pub fn validate(&self) -> Self {
        Self {
            bind_addr: self.bind_addr.trim().to_string(),
            upstream_timeout_secs: self
                .upstream_timeout_secs
                .clamp(1, MAX_UPSTREAM_TIMEOUT_SECS),
            admin_token: self
                .admin_token
                .as_ref()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        }
    }

    /// Parse the bind address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr
            .trim()
            .parse()
            .map_err(|e| Error::config(format!("Invalid bind address '{}': {}", self.bind_addr, e)))
    }
}
