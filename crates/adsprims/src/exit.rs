use std::fmt;
use std::io;

use adsprims_client::ClientError;
use adsprims_transport::TransportError;

// Exit code constants aligned with rsfulmen/DDR-0002 semantics.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
/// The device answered with a non-zero ADS return code.
pub const ADS_ERROR: i32 = 70;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::UnexpectedEof => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Connect { source, .. } | TransportError::Io(source) => {
            io_error(context, source)
        }
        TransportError::ConnectTimeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        TransportError::InvalidAddress(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::Transport(err) => transport_error(context, err),
        ClientError::Io(err) => io_error(context, err),
        ClientError::Ads(_) => CliError::new(ADS_ERROR, format!("{context}: {err}")),
        ClientError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ClientError::Disconnected(_) => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        ClientError::Codec(_) | ClientError::TypeDepthExceeded { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}
