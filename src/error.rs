//! Error types for reading, converting and writing description tables.

use thiserror::Error;

/// Failure while reading a Lua table constructor.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Structural problems found while converting signatures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    #[error("document root must be a table, found {0}")]
    InvalidDocument(&'static str),

    #[error("{location}: {field} must be a string or a table, found {found}")]
    InvalidParamList {
        location: String,
        field: &'static str,
        found: &'static str,
    },

    #[error("{location}: signature must be a table, found {found}")]
    InvalidSignature {
        location: String,
        found: &'static str,
    },
}

/// Failures while writing a table back out. All of them abort the document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SerializeError {
    #[error("unsupported key {key} at {path}")]
    UnsupportedKey { path: String, key: String },

    #[error("unsupported {kind} value at {path}")]
    UnsupportedValue { path: String, kind: String },

    #[error("serialized output does not read back: {0}")]
    RoundTripFailure(String),
}

/// Any failure while converting one document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

impl Error {
    /// A failed self-test means the writer itself is broken, so the whole
    /// batch has to stop.
    pub fn is_round_trip_failure(&self) -> bool {
        matches!(self, Error::Serialize(SerializeError::RoundTripFailure(_)))
    }
}
