use crate::return_code::AdsReturnCode;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The AMS/TCP length exceeds the configured maximum; the stream cannot
    /// be resynchronised past it.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A structure was shorter than its fixed layout requires.
    #[error("truncated {what} ({got} bytes, need {needed})")]
    Truncated {
        what: &'static str,
        needed: usize,
        got: usize,
    },

    /// A structure was long enough but internally inconsistent.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// An AMS net id could not be parsed.
    #[error("invalid AMS net id '{0}'")]
    InvalidNetId(String),

    /// The device answered with a non-zero ADS return code.
    #[error("ads error {}: {}", .0.code(), .0.message())]
    Ads(AdsReturnCode),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;

/// Fail with [`FrameError::Truncated`] unless `data` holds `needed` bytes.
pub(crate) fn ensure_len(data: &[u8], needed: usize, what: &'static str) -> Result<()> {
    if data.len() < needed {
        return Err(FrameError::Truncated {
            what,
            needed,
            got: data.len(),
        });
    }
    Ok(())
}
