//! Shared error type across meterpush crates.

use std::time::Duration;

use thiserror::Error;

/// Stable error classification (used in logs and assertions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller error on a single instrument call.
    InvalidArgument,
    /// Instrument name already registered on the provider.
    DuplicateName,
    /// Invalid startup configuration.
    Configuration,
    /// Export attempt failed; the tick is dropped.
    TransientExport,
    /// Final flush during shutdown failed.
    Shutdown,
    /// The HTTP listener failed while serving.
    Server,
}

impl ErrorKind {
    /// String representation used in structured logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::DuplicateName => "DUPLICATE_NAME",
            ErrorKind::Configuration => "CONFIGURATION",
            ErrorKind::TransientExport => "TRANSIENT_EXPORT",
            ErrorKind::Shutdown => "SHUTDOWN",
            ErrorKind::Server => "SERVER",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MeterError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum MeterError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("instrument already registered: {0}")]
    DuplicateName(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("export failed: {0}")]
    TransientExport(String),
    #[error("export timed out after {0:?}")]
    ExportTimeout(Duration),
    #[error("shutdown incomplete: {source}")]
    Shutdown {
        #[source]
        source: Box<MeterError>,
    },
    #[error("server error: {0}")]
    Server(String),
}

impl MeterError {
    /// Map the error to its stable classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MeterError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            MeterError::DuplicateName(_) => ErrorKind::DuplicateName,
            MeterError::Configuration(_) => ErrorKind::Configuration,
            MeterError::TransientExport(_) | MeterError::ExportTimeout(_) => {
                ErrorKind::TransientExport
            }
            MeterError::Shutdown { .. } => ErrorKind::Shutdown,
            MeterError::Server(_) => ErrorKind::Server,
        }
    }

    /// Wrap a failed final flush.
    pub fn shutdown(source: MeterError) -> Self {
        MeterError::Shutdown {
            source: Box::new(source),
        }
    }
}
