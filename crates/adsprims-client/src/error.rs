use std::time::Duration;

use adsprims_frame::{AdsReturnCode, FrameError};

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] adsprims_transport::TransportError),

    /// Frame-level error other than a device return code.
    #[error("frame error: {0}")]
    Frame(FrameError),

    /// Value codec or declaration error.
    #[error("codec error: {0}")]
    Codec(#[from] adsprims_types::CodecError),

    /// The device answered with a non-zero ADS return code.
    #[error("ads error 0x{:X}: {}", .0.code(), .0.message())]
    Ads(AdsReturnCode),

    /// No reply arrived in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The router connection is gone.
    #[error("disconnected: {0}")]
    Disconnected(String),

    /// Type resolution nested deeper than the configured bound.
    #[error("type '{type_name}' nests deeper than {max_depth} levels")]
    TypeDepthExceeded { type_name: String, max_depth: usize },

    /// A reply was well-formed but not what the request asked for.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// I/O error on the router stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FrameError> for ClientError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Ads(code) => ClientError::Ads(code),
            other => ClientError::Frame(other),
        }
    }
}

impl ClientError {
    /// True for errors after which the connection is unusable.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_) | ClientError::Disconnected(_) | ClientError::Io(_)
        )
    }

    /// The device return code, if this is a device error.
    pub fn ads_code(&self) -> Option<AdsReturnCode> {
        match self {
            ClientError::Ads(code) => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_ads_error_maps_to_ads() {
        let err: ClientError = FrameError::Ads(AdsReturnCode(0x710)).into();
        assert_eq!(err.ads_code(), Some(AdsReturnCode(0x710)));
        assert_eq!(err.to_string(), "ads error 0x710: Symbol not found");
    }

    #[test]
    fn other_frame_errors_stay_frame() {
        let err: ClientError = FrameError::Malformed("bad".to_string()).into();
        assert!(matches!(err, ClientError::Frame(_)));
        assert!(!err.is_connection_error());
    }
}
