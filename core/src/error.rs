//! Error type shared by the comparator, the reconciliation engine, and the watcher.

use std::error::Error as StdError;

use thiserror::Error;

/// Boxed source error carried by backend failures.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum MirrorError {
    /// A caller broke an input contract (empty names, bad separators, bad config).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Enumerating a page failed, or the backend produced entries out of order.
    #[error("backend failure: {message}")]
    BackendFailure {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Cooperative cancellation was observed mid-scan.
    #[error("scan cancelled")]
    Cancelled,

    /// Host-level I/O outside of enumeration (worker threads, watch handles).
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl MirrorError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::BackendFailure { message: message.into(), source: None }
    }

    pub fn backend_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::BackendFailure { message: message.into(), source: Some(source.into()) }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    /// Whether this error is the cancellation marker rather than a real failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether the watcher can keep running after a scan aborted with this error.
    ///
    /// Backend failures and cancellation abort a single scan; input contract
    /// violations point at a caller bug.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::BackendFailure { .. } | Self::Cancelled | Self::Io { .. })
    }
}
