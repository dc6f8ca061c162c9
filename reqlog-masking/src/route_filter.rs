//! Route blacklist.
//!
//! Patterns are shell-style globs matched against the request path with its
//! leading and trailing `/` removed (`/api/users/` is tested as `api/users`,
//! the root as `/`). `*` and `?` never match a `/`; `[...]` classes work as
//! usual.

use glob::{MatchOptions, Pattern};
use tracing::warn;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled set of blacklist patterns.
#[derive(Debug, Clone, Default)]
pub struct RouteFilter {
    patterns: Vec<Pattern>,
}

impl RouteFilter {
    /// Compile `patterns`. A leading `/` is dropped so `/health` and
    /// `health` behave alike. Patterns that fail to compile are logged and
    /// skipped.
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|raw| {
                let source = strip_leading_slash(raw);
                match Pattern::new(source) {
                    Ok(p) => Some(p),
                    Err(e) => {
                        warn!(pattern = %raw, error = %e, "ignoring invalid blacklisted route pattern");
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether the raw request path matches any pattern.
    pub fn is_blacklisted(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.patterns
            .iter()
            .any(|p| p.matches_with(&path, MATCH_OPTIONS))
    }
}

/// Request path as matched and logged: surrounding `/` trimmed, root is `/`.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn strip_leading_slash(pattern: &str) -> &str {
    if pattern.len() > 1 {
        pattern.strip_prefix('/').unwrap_or(pattern)
    } else {
        pattern
    }
}
