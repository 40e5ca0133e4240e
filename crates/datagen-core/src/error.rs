use thiserror::Error;

/// Core error type shared across datagen crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The model violates internal invariants.
    #[error("invalid model: {0}")]
    InvalidModel(String),
    /// An option value could not be parsed into its declared type.
    #[error("invalid option {key}: {message}")]
    InvalidOption { key: String, message: String },
    /// A requested feature is not yet supported.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// Catch-all error for unexpected failures.
    #[error("other error: {0}")]
    Other(String),
}

/// Convenience alias for results returned by datagen crates.
pub type Result<T> = std::result::Result<T, Error>;
