//! Error types for session store operations.

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A backend with this name was already registered.
    #[error("Backend registered twice: {0}")]
    DuplicateBackend(String),

    /// No backend is registered under this name.
    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    /// The process-wide registry was already installed.
    #[error("Backend registry already installed")]
    RegistryInstalled,
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;
