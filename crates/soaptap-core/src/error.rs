//! Shared error type across soaptap crates.

use thiserror::Error;

/// Stable failure categories (used as metric labels and in diagnostics).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Message content larger than the configured buffer cap.
    SizeExceeded,
    /// Body was already read once and not buffered.
    AlreadyConsumed,
    /// Payload is not a well-formed XML document.
    ParseFailure,
    /// Payload parsed but does not have the expected envelope shape.
    ShapeMismatch,
    /// Filesystem / stream failure.
    Io,
    /// Message metadata could not be read.
    MetadataAccess,
    /// Inspector could not be installed on a host endpoint.
    Registration,
    /// Invalid configuration value.
    Config,
}

impl ErrorKind {
    /// String representation used in metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::SizeExceeded => "size_exceeded",
            ErrorKind::AlreadyConsumed => "already_consumed",
            ErrorKind::ParseFailure => "parse_failure",
            ErrorKind::ShapeMismatch => "shape_mismatch",
            ErrorKind::Io => "io",
            ErrorKind::MetadataAccess => "metadata_access",
            ErrorKind::Registration => "registration",
            ErrorKind::Config => "config",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, TapError>;

/// Unified error type used by core and inspector.
#[derive(Debug, Error)]
pub enum TapError {
    #[error("message exceeds the maximum buffer size of {limit} bytes")]
    SizeExceeded { limit: usize },
    #[error("message body already consumed")]
    AlreadyConsumed,
    #[error("parse failure: {0}")]
    ParseFailure(String),
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("metadata access failure: {0}")]
    MetadataAccess(String),
    #[error("registration failure: {0}")]
    Registration(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TapError {
    /// Map an error to its stable category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TapError::SizeExceeded { .. } => ErrorKind::SizeExceeded,
            TapError::AlreadyConsumed => ErrorKind::AlreadyConsumed,
            TapError::ParseFailure(_) => ErrorKind::ParseFailure,
            TapError::ShapeMismatch(_) => ErrorKind::ShapeMismatch,
            TapError::Io(_) => ErrorKind::Io,
            TapError::MetadataAccess(_) => ErrorKind::MetadataAccess,
            TapError::Registration(_) => ErrorKind::Registration,
            TapError::Config(_) => ErrorKind::Config,
        }
    }
}
