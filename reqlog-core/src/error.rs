use thiserror::Error;

/// Unified error type for Reqlog.
///
/// Nothing here ever reaches an HTTP client: the pipeline reports these at
/// error level and lets the original response through.
#[derive(Error, Debug)]
pub enum ReqlogError {
    #[error("Body capture failed: {0}")]
    BodyCapture(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ReqlogError {
    /// Short, stable name for the error-level report.
    pub fn kind(&self) -> &'static str {
        match self {
            ReqlogError::BodyCapture(_) => "body_capture",
            ReqlogError::Sink(_) => "sink",
            ReqlogError::Io(_) => "io",
            ReqlogError::Serde(_) => "serde",
        }
    }
}

pub type ReqlogResult<T> = Result<T, ReqlogError>;
