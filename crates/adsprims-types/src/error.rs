/// Errors raised while converting between bytes and [`Value`](crate::Value)s
/// or while parsing declarations.
///
/// `path` is the dotted field path from the root variable (`.a.b[2]`), or
/// empty for the root itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The value's kind cannot be stored in the target type.
    #[error("{}: expected {expected}, got {got}", display_path(.path))]
    TypeMismatch {
        path: String,
        expected: String,
        got: &'static str,
    },

    /// A numeric value does not fit the target width.
    #[error("{}: value {value} out of range for {target}", display_path(.path))]
    OutOfRange {
        path: String,
        value: String,
        target: &'static str,
    },

    /// A structure value lacks one of the declared members.
    #[error("{}: missing member '{member}'", display_path(.path))]
    MissingMember { path: String, member: String },

    /// An array value's length differs from the declared length.
    #[error("{}: expected {expected} elements, got {got}", display_path(.path))]
    LengthMismatch {
        path: String,
        expected: usize,
        got: usize,
    },

    /// A string was given for an enum but names no enumerator.
    #[error("{}: unknown enumerator '{name}'", display_path(.path))]
    UnknownEnumerator { path: String, name: String },

    /// The byte buffer ends before the node's data.
    #[error(
        "{}: buffer too short (need {needed} bytes at offset {offset}, have {available})",
        display_path(.path)
    )]
    BufferTooShort {
        path: String,
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Element size times array dimensions exceeds what one ADS transfer
    /// can carry.
    #[error("{}: declared size overflows ({detail})", display_path(.path))]
    SizeOverflow { path: String, detail: String },

    /// The node's wire type code has no value representation.
    #[error("{}: unsupported data type {code} ({type_name})", display_path(.path))]
    UnsupportedType {
        path: String,
        code: u32,
        type_name: String,
    },

    /// A symbol or data type entry is inconsistent.
    #[error("malformed declaration: {0}")]
    Declaration(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}
