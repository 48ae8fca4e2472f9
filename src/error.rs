//! Crate-level error types.
//!
//! Only the fallible, off-tick paths (decoding, parsing, option I/O)
//! return errors. Render-loop operations log through `log` and degrade
//! instead.

use std::fmt;

/// Errors produced by the framescope crate.
#[derive(Debug)]
pub enum FramescopeError {
    /// A compressed columnar payload could not be decoded.
    Decode(String),
    /// Raw frame or dataset JSON did not have the expected shape.
    FrameFormat(String),
    /// A schema rule was violated (e.g. a computed field shadowing a
    /// stored column).
    Schema(String),
    /// Unknown compact numeric type code.
    UnknownTypeCode(String),
    /// A frame's previous transform cannot be inverted.
    SingularTransform(usize),
    /// JSON (de)serialization failure.
    Json(serde_json::Error),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl fmt::Display for FramescopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(msg) => write!(f, "decode error: {msg}"),
            Self::FrameFormat(msg) => write!(f, "frame format error: {msg}"),
            Self::Schema(msg) => write!(f, "schema error: {msg}"),
            Self::UnknownTypeCode(code) => {
                write!(f, "unknown numeric type code '{code}'")
            }
            Self::SingularTransform(frame) => {
                write!(f, "transform of frame {frame} is not invertible")
            }
            Self::Json(e) => write!(f, "JSON error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for FramescopeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for FramescopeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<std::io::Error> for FramescopeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<base64::DecodeError> for FramescopeError {
    fn from(e: base64::DecodeError) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Convenience result type used across the crate.
pub type Result<T> = std::result::Result<T, FramescopeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = FramescopeError::UnknownTypeCode("q3".to_owned());
        assert_eq!(err.to_string(), "unknown numeric type code 'q3'");
    }

    #[test]
    fn json_errors_keep_their_source() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = FramescopeError::from(json_err);
        assert!(std::error::Error::source(&err).is_some());
    }
}
