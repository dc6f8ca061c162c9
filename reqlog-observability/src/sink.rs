use reqlog_core::ReqlogError;
use serde_json::Value;
use thiserror::Error;
use tracing::Level;

/// Destination for finished request log events.
///
/// Implementations must be cheap to call from the request path; anything slow
/// (network, batching) belongs behind a channel.
pub trait LogSink: Send + Sync {
    fn write(&self, level: Level, message: &str, context: &Value) -> Result<(), SinkError>;
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("sink queue full, event dropped")]
    QueueFull,

    #[error("sink closed")]
    Closed,

    #[error("sink lock poisoned")]
    Poisoned,

    #[error("Unsupported sink: {0}")]
    Unsupported(String),
}

impl From<SinkError> for ReqlogError {
    fn from(e: SinkError) -> Self {
        ReqlogError::Sink(e.to_string())
    }
}

/// Emits every event through `tracing`, the context rendered as a JSON field.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, level: Level, message: &str, context: &Value) -> Result<(), SinkError> {
        // The level of a tracing event must be a constant, hence the match.
        match level {
            Level::ERROR => tracing::error!(context = %context, "{message}"),
            Level::WARN => tracing::warn!(context = %context, "{message}"),
            Level::INFO => tracing::info!(context = %context, "{message}"),
            Level::DEBUG => tracing::debug!(context = %context, "{message}"),
            _ => tracing::trace!(context = %context, "{message}"),
        }
        Ok(())
    }
}

/// Lowercase name used in serialized events.
pub(crate) fn level_name(level: Level) -> &'static str {
    match level {
        Level::ERROR => "error",
        Level::WARN => "warn",
        Level::INFO => "info",
        Level::DEBUG => "debug",
        _ => "trace",
    }
}
