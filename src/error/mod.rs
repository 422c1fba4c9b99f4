//! Error types for spillframe.

use std::fmt;

/// Errors that can occur while framing or deserializing records.
#[derive(Debug)]
pub enum DeserializeError {
    /// An I/O error occurred while spilling, reading a spill file, or reading
    /// from a feed adapter's source.
    Io(std::io::Error),

    /// A length prefix on the wire was negative or exceeded the configured
    /// maximum record length. The stream is desynchronized and must be torn down.
    CorruptLength {
        /// The decoded (signed) length prefix.
        length: i64,
        /// The maximum accepted record length.
        max: usize,
    },

    /// No candidate directory accepted a new spill file.
    SpillFile {
        /// Number of candidate directories that were tried.
        directories: usize,
        /// The error reported by the last directory tried.
        source: std::io::Error,
    },

    /// The record codec failed to decode a payload. The error is passed through
    /// untouched; the framing position is already past the offending record.
    Payload(std::io::Error),

    /// A record payload is too large to be framed with a 4-byte length prefix.
    RecordTooLarge {
        /// The payload size that was attempted.
        actual: usize,
        /// The maximum allowed size.
        max: usize,
    },

    /// A feed adapter's source ended while a record was still incomplete.
    UnexpectedEof {
        /// Number of bytes gathered toward the unfinished record.
        pending: usize,
    },

    /// Invalid configuration parameter.
    InvalidConfig {
        /// Description of what was invalid.
        message: &'static str,
    },
}

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeserializeError::Io(e) => write!(f, "io error: {}", e),
            DeserializeError::CorruptLength { length, max } => {
                write!(f, "corrupt length prefix: {} (max {})", length, max)
            }
            DeserializeError::SpillFile {
                directories,
                source,
            } => write!(
                f,
                "could not create spill file in any of {} directories: {}",
                directories, source
            ),
            DeserializeError::Payload(e) => write!(f, "payload decoding failed: {}", e),
            DeserializeError::RecordTooLarge { actual, max } => {
                write!(f, "record too large: {} bytes (max {})", actual, max)
            }
            DeserializeError::UnexpectedEof { pending } => {
                write!(
                    f,
                    "stream ended inside a record ({} bytes pending)",
                    pending
                )
            }
            DeserializeError::InvalidConfig { message } => {
                write!(f, "invalid config: {}", message)
            }
        }
    }
}

impl std::error::Error for DeserializeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeserializeError::Io(e) => Some(e),
            DeserializeError::SpillFile { source, .. } => Some(source),
            DeserializeError::Payload(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DeserializeError {
    fn from(e: std::io::Error) -> Self {
        DeserializeError::Io(e)
    }
}
