//! Where finished request logs go.
//!
//! | Sink                 | Config `sink.kind` | Notes                                  |
//! |----------------------|--------------------|----------------------------------------|
//! | [`TracingSink`]      | `tracing`          | `tracing` event, context as JSON field |
//! | [`FileSink`]         | `file`             | JSON lines, daily + size rotation      |
//! | `VictoriaLogsSink`   | `victoria`         | batched push, needs feature `victoria` |

pub mod file_sink;
pub mod sink;

#[cfg(feature = "victoria")]
pub mod victoria;

pub use file_sink::FileSink;
pub use sink::{LogSink, SinkError, TracingSink};

use reqlog_core::config::{SinkConfig, SinkKind};
use std::sync::Arc;

/// Build the sink selected by `config.kind`.
pub fn build_sink(config: &SinkConfig) -> Result<Arc<dyn LogSink>, SinkError> {
    match config.kind {
        SinkKind::Tracing => Ok(Arc::new(TracingSink)),
        SinkKind::File => Ok(Arc::new(FileSink::new(config.file.clone())?)),
        #[cfg(feature = "victoria")]
        SinkKind::Victoria => Ok(Arc::new(victoria::VictoriaLogsSink::new(config.victoria.clone()))),
        #[cfg(not(feature = "victoria"))]
        SinkKind::Victoria => Err(SinkError::Unsupported(
            "victoria (built without the `victoria` feature)".into(),
        )),
    }
}
