use crate::common::Tag;
use crate::constraint::Constraint;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("type mismatch at {path}: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("constraint violation at {path}: {actual} does not satisfy {constraint}")]
    ConstraintViolation {
        path: String,
        constraint: Constraint,
        actual: String,
    },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("decoding error at offset {offset}: {kind}")]
    Decoding { kind: DecodeErrorKind, offset: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    #[error("truncated: {needed} bytes needed, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("unexpected tag {0}")]
    UnknownTag(Tag),

    #[error("malformed length: {0}")]
    MalformedLength(String),

    #[error("non-canonical encoding: {0}")]
    NonCanonical(String),

    #[error("{0} bytes of trailing data")]
    TrailingData(usize),

    #[error("invalid content: {0}")]
    InvalidContent(String),

    #[error("missing component {0}")]
    MissingComponent(String),

    #[error("nesting deeper than {0}")]
    TooDeep(usize),
}

impl Error {
    pub(crate) fn decoding(kind: DecodeErrorKind, offset: usize) -> Error {
        Error::Decoding { kind, offset }
    }

    pub(crate) fn mismatch(
        path: impl ToString,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Error {
        Error::TypeMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Move a decoding error's offset `by` octets further into the input.
    pub(crate) fn shifted(self, by: usize) -> Error {
        match self {
            Error::Decoding { kind, offset } => Error::Decoding {
                kind,
                offset: offset.saturating_add(by),
            },
            e => e,
        }
    }

    /// The decoding failure kind, if this is a decoding error.
    pub fn decode_kind(&self) -> Option<&DecodeErrorKind> {
        match self {
            Error::Decoding { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
