//! Per-request sensitive field declarations.
//!
//! A client declares, per request, which of its own fields are sensitive by
//! sending JSON arrays in three signal headers:
//!
//! ```text
//! x-sensitive-request-headers-json: ["x-encrypt-this-header"]
//! x-sensitive-request-cookies-json: ["SECRET_COOKIE"]
//! x-sensitive-request-body-json:    ["password", "person.sensitive_data"]
//! ```
//!
//! The declarations are unioned with the configured defaults. A declaration
//! can only ever add a name; nothing a client sends can un-mask a default.

use reqlog_core::config::SensitiveDefaults;
use reqlog_core::record::HeaderValues;
use serde_json::Value;
use std::collections::BTreeSet;

/// Signal header carrying sensitive header names.
pub const SENSITIVE_HEADERS_SIGNAL: &str = "x-sensitive-request-headers-json";
/// Signal header carrying sensitive cookie names.
pub const SENSITIVE_COOKIES_SIGNAL: &str = "x-sensitive-request-cookies-json";
/// Signal header carrying sensitive body dot-paths.
pub const SENSITIVE_BODY_SIGNAL: &str = "x-sensitive-request-body-json";

/// The effective set of sensitive fields for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensitiveFieldSpec {
    /// Lowercased header names.
    header_names: BTreeSet<String>,
    cookie_names: BTreeSet<String>,
    /// Ordered, without duplicates.
    body_paths: Vec<String>,
    query_keys: BTreeSet<String>,
}

impl SensitiveFieldSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_header(&mut self, name: &str) {
        self.header_names.insert(name.to_ascii_lowercase());
    }

    pub fn add_cookie(&mut self, name: &str) {
        self.cookie_names.insert(name.to_string());
    }

    /// Add a body path. A single-segment path also marks the query key of the
    /// same name, since query parameters are request input too.
    pub fn add_body_path(&mut self, path: &str) {
        if path.is_empty() {
            return;
        }
        if !self.body_paths.iter().any(|p| p == path) {
            self.body_paths.push(path.to_string());
        }
        if !path.contains('.') {
            self.query_keys.insert(path.to_string());
        }
    }

    pub fn add_query_key(&mut self, key: &str) {
        self.query_keys.insert(key.to_string());
    }

    pub fn is_sensitive_header(&self, name: &str) -> bool {
        self.header_names.contains(&name.to_ascii_lowercase())
    }

    pub fn is_sensitive_cookie(&self, name: &str) -> bool {
        self.cookie_names.contains(name)
    }

    pub fn is_sensitive_query_key(&self, key: &str) -> bool {
        self.query_keys.contains(key)
    }

    pub fn body_paths(&self) -> &[String] {
        &self.body_paths
    }

    /// Union `other` into `self`, keeping path order (own paths first).
    pub fn merge(&mut self, other: &SensitiveFieldSpec) {
        self.header_names.extend(other.header_names.iter().cloned());
        self.cookie_names.extend(other.cookie_names.iter().cloned());
        for path in &other.body_paths {
            self.add_body_path(path);
        }
        self.query_keys.extend(other.query_keys.iter().cloned());
    }

    /// Whether every field `other` marks sensitive is also sensitive here.
    pub fn covers(&self, other: &SensitiveFieldSpec) -> bool {
        other.header_names.is_subset(&self.header_names)
            && other.cookie_names.is_subset(&self.cookie_names)
            && other.query_keys.is_subset(&self.query_keys)
            && other
                .body_paths
                .iter()
                .all(|p| self.body_paths.contains(p))
    }
}

/// Builds a [`SensitiveFieldSpec`] per request from the configured defaults
/// and the request's signal headers.
#[derive(Debug, Clone)]
pub struct SensitiveFieldRegistry {
    defaults: SensitiveFieldSpec,
}

impl SensitiveFieldRegistry {
    pub fn new(defaults: &SensitiveDefaults) -> Self {
        let mut spec = SensitiveFieldSpec::new();
        for name in &defaults.headers {
            spec.add_header(name);
        }
        for name in &defaults.cookies {
            spec.add_cookie(name);
        }
        for path in &defaults.body_paths {
            spec.add_body_path(path);
        }
        for key in &defaults.query_keys {
            spec.add_query_key(key);
        }
        Self { defaults: spec }
    }

    pub fn defaults(&self) -> &SensitiveFieldSpec {
        &self.defaults
    }

    /// Build the effective spec for one request.
    ///
    /// `signals` is the request's header map keyed by lowercase name. A signal
    /// that is missing, is not valid JSON, or is not a JSON array contributes
    /// nothing; non-string array elements are ignored.
    pub fn build(&self, signals: &HeaderValues) -> SensitiveFieldSpec {
        let mut declared = SensitiveFieldSpec::new();
        for name in declarations(signals, SENSITIVE_HEADERS_SIGNAL) {
            declared.add_header(&name);
        }
        for name in declarations(signals, SENSITIVE_COOKIES_SIGNAL) {
            declared.add_cookie(&name);
        }
        for path in declarations(signals, SENSITIVE_BODY_SIGNAL) {
            declared.add_body_path(&path);
        }

        let mut spec = self.defaults.clone();
        spec.merge(&declared);
        debug_assert!(spec.covers(&self.defaults));
        spec
    }
}

fn declarations(signals: &HeaderValues, signal: &str) -> Vec<String> {
    let Some(values) = signals.get(signal) else {
        return Vec::new();
    };
    values
        .iter()
        .filter_map(|raw| match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) => Some(items),
            _ => None,
        })
        .flatten()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect()
}
