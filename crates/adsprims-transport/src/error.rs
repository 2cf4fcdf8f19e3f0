use std::time::Duration;

/// Errors that can occur while establishing or using the router connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the router address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// The connection attempt did not complete in time.
    #[error("connecting to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    /// The router address could not be parsed.
    #[error("invalid router address '{0}'")]
    InvalidAddress(String),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport has been shut down.
    #[error("transport shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, TransportError>;
