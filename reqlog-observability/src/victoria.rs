use crate::sink::{LogSink, SinkError, level_name};
use chrono::Utc;
use reqlog_core::config::VictoriaLogsConfig;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{Duration, interval};
use tracing::{debug, error};

const CHANNEL_CAPACITY: usize = 10_000;

/// Pushes events to a VictoriaLogs `jsonline` endpoint.
///
/// `write` only enqueues; a background task batches entries and POSTs them
/// when `batch_size` is reached or every `flush_interval_secs`. Must be
/// created inside a tokio runtime.
pub struct VictoriaLogsSink {
    sender: mpsc::Sender<Value>,
}

impl VictoriaLogsSink {
    pub fn new(config: VictoriaLogsConfig) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(Self::flush_loop(config, rx));
        Self { sender: tx }
    }

    async fn flush_loop(config: VictoriaLogsConfig, mut rx: mpsc::Receiver<Value>) {
        let client = reqwest::Client::new();
        let batch_size = config.batch_size.max(1);
        let mut batch: Vec<Value> = Vec::with_capacity(batch_size);
        let mut ticker = interval(Duration::from_secs(config.flush_interval_secs.max(1)));

        loop {
            tokio::select! {
                entry = rx.recv() => match entry {
                    Some(entry) => {
                        batch.push(entry);
                        if batch.len() >= batch_size {
                            Self::flush(&client, &config.endpoint, &mut batch).await;
                        }
                    }
                    None => {
                        Self::flush(&client, &config.endpoint, &mut batch).await;
                        return;
                    }
                },
                _ = ticker.tick() => {
                    Self::flush(&client, &config.endpoint, &mut batch).await;
                }
            }
        }
    }

    async fn flush(client: &reqwest::Client, endpoint: &str, batch: &mut Vec<Value>) {
        if batch.is_empty() {
            return;
        }
        let body = encode_batch(batch);
        let count = batch.len();
        match client
            .post(endpoint)
            .header("Content-Type", "application/stream+json")
            .body(body)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                debug!(count, "Flushed request logs to VictoriaLogs");
            }
            Ok(resp) => {
                error!(status = %resp.status(), count, "VictoriaLogs flush failed");
            }
            Err(e) => {
                error!(error = %e, count, "VictoriaLogs connection error");
            }
        }
        batch.clear();
    }
}

impl LogSink for VictoriaLogsSink {
    fn write(&self, level: tracing::Level, message: &str, context: &Value) -> Result<(), SinkError> {
        self.sender
            .try_send(entry(level, message, context))
            .map_err(|e| match e {
                TrySendError::Full(_) => SinkError::QueueFull,
                TrySendError::Closed(_) => SinkError::Closed,
            })
    }
}

/// One jsonline record: VictoriaLogs' `_msg`/`_time` plus the event context
/// fields at top level.
fn entry(level: tracing::Level, message: &str, context: &Value) -> Value {
    let mut map = Map::new();
    map.insert("_msg".into(), Value::String(message.to_string()));
    map.insert("_time".into(), Value::String(Utc::now().to_rfc3339()));
    map.insert("level".into(), Value::String(level_name(level).to_string()));
    match context {
        Value::Object(fields) => {
            for (k, v) in fields {
                map.insert(k.clone(), v.clone());
            }
        }
        other => {
            map.insert("context".into(), other.clone());
        }
    }
    Value::Object(map)
}

fn encode_batch(batch: &[Value]) -> String {
    let mut body = String::new();
    for entry in batch {
        if let Ok(line) = serde_json::to_string(entry) {
            body.push_str(&line);
            body.push('\n');
        }
    }
    body
}
