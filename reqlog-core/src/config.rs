use figment::{Figment, providers::{Env, Format, Yaml}};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Process-wide request-log configuration.
///
/// Loaded once at startup and handed to the pipeline behind an `Arc`; nothing
/// in the request path mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLogConfig {
    /// Master switch. When false no request is ever logged.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Glob patterns matched against the request path (no leading slash).
    /// `*` never crosses a `/`.
    #[serde(default)]
    pub blacklisted_routes: Vec<String>,
    /// Maximum logged body length in characters. `<= 0` disables truncation.
    #[serde(default)]
    pub truncate_body_length: i64,
    /// Ceiling for buffering request and response bodies in the middleware.
    /// Larger bodies, or bodies of unknown length, are logged as `{}`.
    #[serde(default = "default_max_buffered_body_bytes")]
    pub max_buffered_body_bytes: usize,
    #[serde(default)]
    pub sensitive: SensitiveDefaults,
    #[serde(default)]
    pub sink: SinkConfig,
}

/// Statically configured sensitive fields.
///
/// Request signal headers are merged on top of these; they can add names but
/// never remove one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitiveDefaults {
    /// Header names, compared case-insensitively.
    #[serde(default = "default_sensitive_headers")]
    pub headers: Vec<String>,
    /// Cookie names, exact match.
    #[serde(default)]
    pub cookies: Vec<String>,
    /// Dot-delimited body paths, exact match.
    #[serde(default)]
    pub body_paths: Vec<String>,
    /// Query-string keys, exact match.
    #[serde(default = "default_sensitive_query_keys")]
    pub query_keys: Vec<String>,
}

/// Where emitted request logs go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub kind: SinkKind,
    #[serde(default)]
    pub file: FileSinkConfig,
    #[serde(default)]
    pub victoria: VictoriaLogsConfig,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Emit through `tracing` at DEBUG level.
    #[default]
    Tracing,
    /// Append JSON lines to a rotating file.
    File,
    /// Batch-push JSON lines to a VictoriaLogs endpoint.
    Victoria,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSinkConfig {
    #[serde(default = "default_file_path")]
    pub path: PathBuf,
    /// Size-based rotation threshold. 0 = daily rotation only.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// Rotated files to keep. 0 = unlimited.
    #[serde(default = "default_max_rotated_files")]
    pub max_rotated_files: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VictoriaLogsConfig {
    #[serde(default = "default_vl_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_true() -> bool { true }
fn default_max_buffered_body_bytes() -> usize { 10 * 1024 * 1024 }
fn default_file_path() -> PathBuf { PathBuf::from("request-logs.log") }
fn default_max_file_size() -> u64 { 100 * 1024 * 1024 }
fn default_max_rotated_files() -> usize { 30 }
fn default_vl_endpoint() -> String { "http://localhost:9428/insert/jsonline".into() }
fn default_batch_size() -> usize { 1000 }
fn default_flush_interval() -> u64 { 5 }

fn default_sensitive_headers() -> Vec<String> {
    [
        "authorization",
        "cookie",
        "proxy-authorization",
        "x-api-key",
        "x-auth-token",
        "x-access-token",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_sensitive_query_keys() -> Vec<String> {
    ["token", "access_token", "api_key", "password"]
        .into_iter()
        .map(String::from)
        .collect()
}

// ── Impls ─────────────────────────────────────────────────────

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            blacklisted_routes: Vec::new(),
            truncate_body_length: 0,
            max_buffered_body_bytes: default_max_buffered_body_bytes(),
            sensitive: SensitiveDefaults::default(),
            sink: SinkConfig::default(),
        }
    }
}

impl Default for SensitiveDefaults {
    fn default() -> Self {
        Self {
            headers: default_sensitive_headers(),
            cookies: Vec::new(),
            body_paths: Vec::new(),
            query_keys: default_sensitive_query_keys(),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Tracing,
            file: FileSinkConfig::default(),
            victoria: VictoriaLogsConfig::default(),
        }
    }
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            path: default_file_path(),
            max_file_size_bytes: default_max_file_size(),
            max_rotated_files: default_max_rotated_files(),
        }
    }
}

impl Default for VictoriaLogsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_vl_endpoint(),
            batch_size: default_batch_size(),
            flush_interval_secs: default_flush_interval(),
        }
    }
}

impl RequestLogConfig {
    /// Load configuration from a YAML file + `REQLOG_` env overrides.
    ///
    /// Nested keys are separated by a double underscore in the environment,
    /// e.g. `REQLOG_SINK__KIND=file`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: RequestLogConfig = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("REQLOG_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Whether bodies should be cut at all.
    pub fn truncation_enabled(&self) -> bool {
        self.truncate_body_length > 0
    }
}
