use std::sync::Arc;

/// Represents a result type for operations in this crate.
///
/// This `Result` type is a standard Rust `Result` type where the error variant is defined by the
/// crate-specific [`Error`] enum.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors produced at the experimentation client boundary.
///
/// None of these errors ever reach the host pipeline: the destination plugin logs them and
/// continues. They exist so that [`ExperimentClient`](crate::ExperimentClient) implementations
/// have a typed way to report failures.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The experimentation client failed to start.
    #[error("experimentation client failed to start: {0}")]
    ClientStart(String),

    /// The client has not fetched its project configuration yet.
    #[error("project configuration is not available")]
    ConfigurationUnavailable,

    /// Forwarding an event to the experimentation client failed.
    #[error("failed to forward event {0:?}")]
    EventForward(String),

    /// An I/O error.
    #[error(transparent)]
    // std::io::Error is not clonable, so we're wrapping it in an Arc.
    Io(Arc<std::io::Error>),
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}
