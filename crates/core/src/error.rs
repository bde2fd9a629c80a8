//! Error taxonomy for the transformation engine.
//!
//! Every failure aborts the current transformation; the engine never
//! retries or partially recovers. Message formats are part of the public
//! contract and asserted by tests.

use std::fmt;

/// Source position supplied by the script compiler, when available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Errors raised during header parsing, codec selection, or evaluation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A value's variant is wrong for its operator.
    #[error("Expected {expected}, got: {got}")]
    TypeMismatch { expected: String, got: String },

    /// A user callback has the wrong parameter count.
    #[error("Expected embedded function to have {allowed} parameters, received: {received}")]
    ArityMismatch { allowed: String, received: usize },

    /// Numerically or structurally invalid input to an otherwise
    /// well-typed operation.
    #[error("{0}")]
    Domain(String),

    /// No registered codec handles the requested media type.
    #[error("No suitable plugin found for mime type: {kind}/{subtype}")]
    CodecNotFound { kind: String, subtype: String },

    /// A codec failed; the plugin's message is surfaced untransformed.
    #[error("{0}")]
    Codec(String),

    /// Malformed script header; no recovery.
    #[error("invalid header line: {0}")]
    HeaderParse(String),

    /// General evaluation failure, with source position when the
    /// compiler supplied one.
    #[error("{message}")]
    Eval {
        message: String,
        position: Option<Position>,
    },
}

impl Error {
    /// `"Expected <kinds>, got: <prettyName>"` with the offending
    /// value's pretty name.
    pub fn type_mismatch(expected: impl Into<String>, got: &crate::value::Value) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            got: got.pretty_name().to_string(),
        }
    }

    /// Type mismatch with a literal `got` description, for messages
    /// like `"Array of type string"`.
    pub fn type_mismatch_str(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Wrong embedded-callback parameter count.
    pub fn arity(allowed: &str, received: usize) -> Self {
        Self::ArityMismatch {
            allowed: allowed.to_string(),
            received,
        }
    }

    /// Evaluation failure without position information.
    pub fn eval(message: impl Into<String>) -> Self {
        Self::Eval {
            message: message.into(),
            position: None,
        }
    }

    /// Attach a source position if none is present yet.
    #[must_use]
    pub fn at(self, position: Position) -> Self {
        match self {
            Self::Eval {
                message,
                position: None,
            } => Self::Eval {
                message,
                position: Some(position),
            },
            other => other,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
