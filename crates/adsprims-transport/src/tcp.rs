use std::time::Duration;

use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::AmsStream;

/// TCP port the AMS router listens on.
pub const DEFAULT_ROUTER_PORT: u16 = 48898;

/// TCP transport to an AMS router.
pub struct TcpTransport;

impl TcpTransport {
    /// Connect to a router, failing after `timeout`.
    ///
    /// `addr` is `host` or `host:port`; a missing port defaults to
    /// [`DEFAULT_ROUTER_PORT`].
    pub async fn connect(addr: &str, timeout: Duration) -> Result<AmsStream> {
        let addr = Self::normalize_addr(addr)?;
        debug!(%addr, ?timeout, "connecting to ams router");

        let stream = match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(TransportError::Connect { addr, source }),
            Err(_) => return Err(TransportError::ConnectTimeout { addr, timeout }),
        };
        stream.set_nodelay(true)?;

        info!(%addr, "connected to ams router");
        Ok(AmsStream::from_tcp(stream))
    }

    /// Append the default router port when `addr` carries none.
    pub fn normalize_addr(addr: &str) -> Result<String> {
        let addr = addr.trim();
        if addr.is_empty() {
            return Err(TransportError::InvalidAddress(addr.to_string()));
        }

        // Bracketed IPv6 with or without port.
        if let Some(rest) = addr.strip_prefix('[') {
            let Some(end) = rest.find(']') else {
                return Err(TransportError::InvalidAddress(addr.to_string()));
            };
            let tail = &rest[end + 1..];
            if tail.is_empty() {
                return Ok(format!("{addr}:{DEFAULT_ROUTER_PORT}"));
            }
            return match tail.strip_prefix(':') {
                Some(port) if port.parse::<u16>().is_ok() => Ok(addr.to_string()),
                _ => Err(TransportError::InvalidAddress(addr.to_string())),
            };
        }

        match addr.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => {
                if host.is_empty() || port.parse::<u16>().is_err() {
                    return Err(TransportError::InvalidAddress(addr.to_string()));
                }
                Ok(addr.to_string())
            }
            // Bare IPv6 literal.
            Some(_) => Ok(format!("[{addr}]:{DEFAULT_ROUTER_PORT}")),
            None => Ok(format!("{addr}:{DEFAULT_ROUTER_PORT}")),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name() -> &'static str {
        "ams-tcp"
    }
}
