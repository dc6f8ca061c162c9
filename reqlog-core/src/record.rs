//! The request log record and the structured event it renders to.
//!
//! The event layout follows the Elastic Common Schema groups used by the
//! downstream log pipeline:
//!
//! | Key                                   | Source field            |
//! |---------------------------------------|-------------------------|
//! | `http.request.{url,root,path,method}` | request line            |
//! | `http.request.query_string`           | masked query as JSON    |
//! | `http.request.body.content`           | masked, truncated body  |
//! | `http.request.{headers,cookies}.raw`  | pretty JSON of the maps |
//! | `http.response.status_code`           | response status         |
//! | `http.route`                          | matched route template  |
//! | `event.duration`                      | elapsed nanoseconds     |
//! | `error.{type,message,code,stack_trace}` | response exception    |

use crate::cookie::ResponseCookie;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Value of `log.type` on every emitted event.
pub const LOG_TYPE: &str = "request-logs";

/// Multi-valued header map, keyed by lowercase header name.
pub type HeaderValues = BTreeMap<String, Vec<String>>;

/// Request cookie jar, name → value.
pub type CookieJar = BTreeMap<String, String>;

/// Response cookies, name → structured cookie.
pub type ResponseCookies = BTreeMap<String, ResponseCookie>;

// ─────────────────────────────────────────────────────────────
// ResponseException
// ─────────────────────────────────────────────────────────────

/// An error a handler attached to its response.
///
/// Handlers insert this into the response extensions; the pipeline picks it
/// up and renders it under `error.*`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseException {
    pub type_name: String,
    pub message: String,
    pub code: i64,
    pub stack_trace: String,
}

impl ResponseException {
    pub fn new(
        type_name: impl Into<String>,
        message: impl Into<String>,
        code: i64,
        stack_trace: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            code,
            stack_trace: stack_trace.into(),
        }
    }

    /// Capture an error value, its source chain and (when enabled through
    /// `RUST_BACKTRACE`) a backtrace of the capture site.
    pub fn from_error<E>(err: &E, code: i64) -> Self
    where
        E: std::error::Error + 'static,
    {
        let mut trace = String::new();
        let mut source = err.source();
        let mut depth = 0usize;
        while let Some(cause) = source {
            let _ = writeln!(trace, "#{depth} caused by: {cause}");
            depth += 1;
            source = cause.source();
        }
        let backtrace = std::backtrace::Backtrace::capture();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = write!(trace, "{backtrace}");
        }

        Self::new(std::any::type_name::<E>(), err.to_string(), code, trace)
    }

    /// The message to log. Never empty.
    pub fn effective_message(&self) -> String {
        if self.message.is_empty() {
            format!("{} thrown with empty message", self.type_name)
        } else {
            self.message.clone()
        }
    }
}

// ─────────────────────────────────────────────────────────────
// RequestLogRecord
// ─────────────────────────────────────────────────────────────

/// Everything logged about one request, already masked and truncated.
///
/// Built once per logged request by the pipeline, rendered with
/// [`RequestLogRecord::to_context`] and then dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLogRecord {
    pub method: String,
    pub url: String,
    /// Route template that matched, e.g. `/users/{id}`. `None` for fallbacks.
    pub route_uri: Option<String>,
    pub root: String,
    pub path: String,
    pub query_string: String,
    pub request_headers: HeaderValues,
    pub request_cookies: CookieJar,
    pub request_body: String,
    pub status: u16,
    pub response_headers: HeaderValues,
    pub response_cookies: ResponseCookies,
    pub response_body: String,
    pub response_exception: Option<ResponseException>,
    pub execution_time_ns: Option<u64>,
}

impl RequestLogRecord {
    /// Log message accompanying the event.
    pub fn message(&self) -> String {
        format!("Timing for {}", self.url)
    }

    /// Render the structured event context.
    pub fn to_context(&self) -> Result<Value, serde_json::Error> {
        let mut context = json!({
            "http": {
                "request": {
                    "url": self.url,
                    "root": self.root,
                    "path": self.path,
                    "query_string": self.query_string,
                    "body": {
                        "content": self.request_body,
                    },
                    "cookies.raw": serde_json::to_string_pretty(&self.request_cookies)?,
                    "headers.raw": serde_json::to_string_pretty(&self.request_headers)?,
                    "method": self.method,
                },
                "response": {
                    "body": {
                        "content": self.response_body,
                    },
                    "cookies.raw": serde_json::to_string_pretty(&self.response_cookies)?,
                    "headers.raw": serde_json::to_string_pretty(&self.response_headers)?,
                    "status_code": self.status,
                },
                "route": self.route_uri,
            },
            "log": {
                "type": LOG_TYPE,
            },
        });

        if let Value::Object(map) = &mut context {
            if let Some(ns) = self.execution_time_ns {
                map.insert("event".into(), json!({ "duration": ns }));
            }

            if let Some(exc) = &self.response_exception {
                map.insert(
                    "error".into(),
                    json!({
                        "type": exc.type_name,
                        "stack_trace": exc.stack_trace,
                        // error.code is a keyword field downstream
                        "code": exc.code.to_string(),
                        "message": exc.effective_message(),
                    }),
                );
            }
        }

        Ok(context)
    }
}
