//! Error types for schema declaration, bit access and record encoding.

use thiserror::Error;

/// Errors produced while declaring a schema, accessing fields, or
/// packing/parsing a record.
///
/// Every variant carries the message describing the offending field,
/// offset or index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Bit offset or length is out of range, or a buffer is too short.
    #[error("{0}")]
    Range(String),
    /// A value or option has the wrong type or an unrecognized form.
    #[error("{0}")]
    Argument(String),
    /// A field, sub-schema or whole schema does not fall on a byte boundary.
    #[error("{0}")]
    Alignment(String),
    /// Duplicate names, mutation after close, or a structural violation.
    #[error("{0}")]
    Schema(String),
    /// Array index outside `0...length`.
    #[error("{0}")]
    Index(String),
}

impl Error {
    pub(crate) fn range(msg: impl Into<String>) -> Self {
        Error::Range(msg.into())
    }

    pub(crate) fn argument(msg: impl Into<String>) -> Self {
        Error::Argument(msg.into())
    }

    pub(crate) fn alignment(msg: impl Into<String>) -> Self {
        Error::Alignment(msg.into())
    }

    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        Error::Schema(msg.into())
    }

    pub(crate) fn index(index: isize, len: usize) -> Self {
        Error::Index(format!("index '{index}' not in range 0...{len}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
