//! Error types for the clipseek-fusion crate.
//!
//! Per-variant causes (`Encoder`, `Index`, `Cancelled`) are absorbed by the
//! dispatcher. Only call-level errors reach the caller of
//! [`crate::search`], and [`FusionError::kind`] tells them apart.

/// Errors that can occur while answering a search call.
#[derive(Debug, thiserror::Error)]
pub enum FusionError {
    /// Query, `top_k` or `threshold` outside the accepted bounds.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No backend snapshot has been installed yet.
    #[error("search engine not ready: {0}")]
    NotReady(String),

    /// Every variant failed at the vector index.
    #[error("vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// Every variant failed, at least one of them outside the index.
    #[error("all query variants failed: {0}")]
    AllVariantsFailed(String),

    /// The text encoder failed for one variant.
    #[error("encoder error: {0}")]
    Encoder(String),

    /// The vector index failed for one variant.
    #[error("index error: {0}")]
    Index(String),

    /// A variant dispatch was cancelled before it completed.
    #[error("variant dispatch cancelled")]
    Cancelled,

    /// Invalid fusion configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Coarse classification used by transports to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent something the engine refuses to run.
    InvalidInput,
    /// The engine cannot serve searches right now.
    NotReady,
    /// Anything else.
    Internal,
}

impl FusionError {
    /// Classify this error for the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotReady(_) | Self::IndexUnavailable(_) => ErrorKind::NotReady,
            Self::AllVariantsFailed(_)
            | Self::Encoder(_)
            | Self::Index(_)
            | Self::Cancelled
            | Self::Config(_) => ErrorKind::Internal,
        }
    }
}

/// Convenience type alias for clipseek-fusion results.
pub type Result<T> = std::result::Result<T, FusionError>;
