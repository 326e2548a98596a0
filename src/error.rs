//! Error types for the response window.

/// Top-level error type for the display surface.
#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    /// Persisted state could not be read or written.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Rendering extension error (highlighting, math).
    #[error("render error: {0}")]
    Render(String),

    /// Host envelope could not be dispatched.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] crate::dispatch::DispatchError),

    /// Clipboard write failed.
    #[error("clipboard error: {0}")]
    Clipboard(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, WindowError>;
