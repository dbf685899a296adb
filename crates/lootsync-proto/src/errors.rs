//! Decode errors.
//!
//! Only lines carrying a protocol marker can fail to decode. Everything else
//! on the channel is somebody's chat and is not an error.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// A marked line that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Opcode not recognised for this message family.
    #[error("unknown opcode: {0:?}")]
    UnknownOpcode(String),

    /// Line ended before a required field.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Field present but not parseable.
    #[error("invalid {field}: {value:?}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Raw text that failed to parse.
        value: String,
    },

    /// Extra fields after the last expected one.
    #[error("{0} trailing field(s)")]
    TrailingFields(usize),

    /// Broadcast wrapper opened but never closed.
    #[error("unterminated broadcast wrapper")]
    Unterminated,
}
