//! Error taxonomy shared by every layer of the bridge.
//!
//! Errors never cross the host boundary as Rust values; the codec renders a
//! [`BridgeError`] into a reserved-prefix string and parses it back.

use std::fmt;

use crate::path::{Path, PathError};

/// The category of a [`BridgeError`], as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidPath,
    PathNotFound,
    MalformedCommand,
    UnsupportedCommand,
    ResourceClosed,
    ExecutionError,
    ServiceNotStarted,
    ServiceBusy,
    ServiceUnavailable,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::InvalidPath,
        ErrorKind::PathNotFound,
        ErrorKind::MalformedCommand,
        ErrorKind::UnsupportedCommand,
        ErrorKind::ResourceClosed,
        ErrorKind::ExecutionError,
        ErrorKind::ServiceNotStarted,
        ErrorKind::ServiceBusy,
        ErrorKind::ServiceUnavailable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidPath => "InvalidPath",
            ErrorKind::PathNotFound => "PathNotFound",
            ErrorKind::MalformedCommand => "MalformedCommand",
            ErrorKind::UnsupportedCommand => "UnsupportedCommand",
            ErrorKind::ResourceClosed => "ResourceClosed",
            ErrorKind::ExecutionError => "ExecutionError",
            ErrorKind::ServiceNotStarted => "ServiceNotStarted",
            ErrorKind::ServiceBusy => "ServiceBusy",
            ErrorKind::ServiceUnavailable => "ServiceUnavailable",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Lifecycle errors carry no detail text.
    pub fn has_detail(self) -> bool {
        !matches!(
            self,
            ErrorKind::ServiceNotStarted | ErrorKind::ServiceBusy | ErrorKind::ServiceUnavailable
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every failure a dispatch can end in.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// Malformed path string (empty segments, disallowed characters).
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// An ancestor or the leaf is missing and may not be created.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// The command string does not follow the grammar.
    #[error("malformed command: {0}")]
    MalformedCommand(String),

    /// The verb is unknown or not offered by the resource kind.
    #[error("unsupported command: {0}")]
    UnsupportedCommand(String),

    /// The handle was invalidated while the call was in flight.
    #[error("resource closed: {0}")]
    ResourceClosed(String),

    /// The engine reported a failure; the detail is passed through verbatim.
    #[error("execution error: {0}")]
    ExecutionError(String),

    #[error("service not started")]
    ServiceNotStarted,

    #[error("service busy")]
    ServiceBusy,

    #[error("service unavailable")]
    ServiceUnavailable,
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::InvalidPath(_) => ErrorKind::InvalidPath,
            BridgeError::PathNotFound(_) => ErrorKind::PathNotFound,
            BridgeError::MalformedCommand(_) => ErrorKind::MalformedCommand,
            BridgeError::UnsupportedCommand(_) => ErrorKind::UnsupportedCommand,
            BridgeError::ResourceClosed(_) => ErrorKind::ResourceClosed,
            BridgeError::ExecutionError(_) => ErrorKind::ExecutionError,
            BridgeError::ServiceNotStarted => ErrorKind::ServiceNotStarted,
            BridgeError::ServiceBusy => ErrorKind::ServiceBusy,
            BridgeError::ServiceUnavailable => ErrorKind::ServiceUnavailable,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            BridgeError::InvalidPath(detail)
            | BridgeError::PathNotFound(detail)
            | BridgeError::MalformedCommand(detail)
            | BridgeError::UnsupportedCommand(detail)
            | BridgeError::ResourceClosed(detail)
            | BridgeError::ExecutionError(detail) => Some(detail),
            BridgeError::ServiceNotStarted
            | BridgeError::ServiceBusy
            | BridgeError::ServiceUnavailable => None,
        }
    }

    /// Rebuild an error from its kind and detail.
    ///
    /// Detail is dropped for lifecycle kinds and defaults to empty for the
    /// others.
    pub fn from_parts(kind: ErrorKind, detail: Option<String>) -> Self {
        let detail = detail.unwrap_or_default();
        match kind {
            ErrorKind::InvalidPath => BridgeError::InvalidPath(detail),
            ErrorKind::PathNotFound => BridgeError::PathNotFound(detail),
            ErrorKind::MalformedCommand => BridgeError::MalformedCommand(detail),
            ErrorKind::UnsupportedCommand => BridgeError::UnsupportedCommand(detail),
            ErrorKind::ResourceClosed => BridgeError::ResourceClosed(detail),
            ErrorKind::ExecutionError => BridgeError::ExecutionError(detail),
            ErrorKind::ServiceNotStarted => BridgeError::ServiceNotStarted,
            ErrorKind::ServiceBusy => BridgeError::ServiceBusy,
            ErrorKind::ServiceUnavailable => BridgeError::ServiceUnavailable,
        }
    }
}

impl From<PathError> for BridgeError {
    fn from(e: PathError) -> Self {
        BridgeError::InvalidPath(e.to_string())
    }
}

impl From<EngineError> for BridgeError {
    fn from(e: EngineError) -> Self {
        if e.deleted {
            BridgeError::ResourceClosed(e.message)
        } else {
            BridgeError::ExecutionError(e.message)
        }
    }
}

/// A failure reported by a storage engine.
///
/// The message is opaque to the bridge and reaches the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
    deleted: bool,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            deleted: false,
        }
    }

    /// The resource behind a handle no longer exists in the engine.
    pub fn deleted(path: &Path) -> Self {
        Self {
            message: format!("resource '{}' was deleted", path),
            deleted: true,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the handle outlived its resource. The handle is useless from
    /// then on; reopening the path is the only way forward.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::new(format!("io error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_roundtrip() {
        for kind in ErrorKind::ALL {
            assert_eq!(ErrorKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(ErrorKind::from_name("invalidpath"), None);
    }

    #[test]
    fn parts_roundtrip() {
        let errors = [
            BridgeError::InvalidPath("empty segment at position 1".into()),
            BridgeError::ExecutionError("disk full".into()),
            BridgeError::ServiceBusy,
        ];
        for error in errors {
            let rebuilt =
                BridgeError::from_parts(error.kind(), error.detail().map(str::to_string));
            assert_eq!(rebuilt, error);
        }
    }

    #[test]
    fn lifecycle_kinds_drop_detail() {
        assert_eq!(
            BridgeError::from_parts(ErrorKind::ServiceNotStarted, Some("ignored".into())),
            BridgeError::ServiceNotStarted
        );
        assert!(!ErrorKind::ServiceUnavailable.has_detail());
        assert!(ErrorKind::ExecutionError.has_detail());
    }

    #[test]
    fn path_error_becomes_invalid_path() {
        let e: BridgeError = PathError::Empty.into();
        assert_eq!(e.kind(), ErrorKind::InvalidPath);
        assert_eq!(e.detail(), Some("path is empty"));
    }

    #[test]
    fn engine_detail_passes_through_verbatim() {
        let e: BridgeError = EngineError::new("constraint violated: id").into();
        assert_eq!(e, BridgeError::ExecutionError("constraint violated: id".into()));
    }

    #[test]
    fn deleted_resource_is_resource_closed() {
        let error = EngineError::deleted(&crate::path!("db/users"));
        assert!(error.is_deleted());
        assert!(!EngineError::new("disk full").is_deleted());

        let e: BridgeError = error.into();
        assert_eq!(
            e,
            BridgeError::ResourceClosed("resource 'db/users' was deleted".into())
        );
    }

    #[test]
    fn display() {
        assert_eq!(BridgeError::ServiceNotStarted.to_string(), "service not started");
        assert_eq!(
            BridgeError::UnsupportedCommand("bogus".into()).to_string(),
            "unsupported command: bogus"
        );
    }
}
