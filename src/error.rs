//
// Copyright (c) The yangtree Contributors
//
// SPDX-License-Identifier: MIT
//

//! Structured errors tagged per RFC 6241 appendix A (see `spec.md` §7).

use std::fmt;

use tracing::warn;

/// Symbolic error tag, mirroring the RFC 6241 appendix A error-tag taxonomy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// A leaf value fails type, length, range, or pattern validation.
    InvalidValue,
    /// A mandatory structural element is absent.
    MissingElement,
    /// An element is malformed or misplaced.
    BadElement,
    /// An element has no corresponding schema node.
    UnknownElement,
    /// The edit target already exists where `create` requires absence.
    DataExists,
    /// The edit target is absent where the operation requires presence.
    DataMissing,
    /// The requested operation is not supported in this context (e.g. an
    /// insertion hint against a `system`-ordered list).
    OperationNotSupported,
    /// A `must`/`when`/`unique`/cardinality constraint was violated.
    OperationFailed,
    /// Internal API misuse: nil arguments, invalid path syntax, or a
    /// multi-node target where a single node was expected.
    InvalidArg,
    /// A schema lookup failed to resolve a path segment.
    SchemaMissing,
    /// Last-resort wrapper for errors that don't fit the other tags.
    UnknownError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidValue => "invalid-value",
            ErrorKind::MissingElement => "missing-element",
            ErrorKind::BadElement => "bad-element",
            ErrorKind::UnknownElement => "unknown-element",
            ErrorKind::DataExists => "data-exists",
            ErrorKind::DataMissing => "data-missing",
            ErrorKind::OperationNotSupported => "operation-not-supported",
            ErrorKind::OperationFailed => "operation-failed",
            ErrorKind::InvalidArg => "invalid-arg",
            ErrorKind::SchemaMissing => "schema-missing",
            ErrorKind::UnknownError => "unknown-error",
        };
        write!(f, "{s}")
    }
}

/// An engine error: a tag, a human-readable message, and (where derivable)
/// the path of the offending node.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    path: Option<String>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            path: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Emits the error through `tracing`, the same way
    /// `holo_northbound::error::Error::log` does for northbound errors.
    pub fn log(&self) {
        match &self.path {
            Some(path) => warn!(%path, kind = %self.kind, "{}", self.message),
            None => warn!(kind = %self.kind, "{}", self.message),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} ({}): {}", self.kind, path, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_path_when_set() {
        let err = Error::new(ErrorKind::DataMissing, "no such entry")
            .with_path("/sample/foo");
        assert_eq!(
            err.to_string(),
            "data-missing (/sample/foo): no such entry"
        );
    }

    #[test]
    fn display_without_path() {
        let err = Error::new(ErrorKind::InvalidArg, "bad input");
        assert_eq!(err.to_string(), "invalid-arg: bad input");
    }
}
