use datagen_definition::ValidationReport;
use thiserror::Error;

/// Errors emitted while building models and generating rows.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid model: {0}")]
    InvalidModel(String),
    #[error("model definition rejected: {}", .0.summary())]
    Rejected(ValidationReport),
    #[error("unsupported feature: {0}")]
    Unsupported(String),
    #[error("field '{field}' needs a value for '{dependency}' that the row does not hold yet")]
    MissingDependency { field: String, dependency: String },
    #[error("thread count must be at least 1")]
    InvalidThreadCount,
    #[error("worker {worker} panicked: {message}")]
    WorkerPanicked { worker: usize, message: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, GenerationError>;
