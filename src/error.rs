//! Error types for the clipseek service layer.

use clipseek_fusion::{ErrorKind, FusionError};

/// Top-level error type for the search service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Error raised by the fusion engine.
    #[error(transparent)]
    Fusion(#[from] FusionError),

    /// Configuration file could not be parsed, serialized or validated.
    #[error("config error: {0}")]
    Config(String),

    /// Logging subscriber could not be installed.
    #[error("logging error: {0}")]
    Logging(String),

    /// HTTP embedding client could not be constructed.
    #[error("encoder error: {0}")]
    Encoder(String),

    /// Loading a new backend snapshot failed; the previous one stays live.
    #[error("reload failed: {0}")]
    Reload(String),

    /// HTTP server bind or serve error.
    #[error("server error: {0}")]
    Server(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Classify the error the same way the engine does.
    ///
    /// Only engine errors can be input or readiness problems; everything
    /// raised by the service layer itself is internal.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Fusion(err) => err.kind(),
            _ => ErrorKind::Internal,
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ServiceError>;
