//! Dot-path addressing inside JSON documents.
//!
//! `person.sensitive_data` walks into the `person` object and masks its
//! `sensitive_data` field. A numeric segment indexes into an array, so
//! `cards.0.number` works too. Whatever sits at the end of the path (a scalar,
//! an object, an array) is replaced wholesale by [`MASK_TOKEN`].

use crate::MASK_TOKEN;
use serde_json::Value;

/// Mask the value at `path`. Returns `true` when something was replaced.
///
/// Missing segments, empty paths and empty segments (`a..b`) are no-ops.
pub fn mask_path(root: &mut Value, path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return false;
    }
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    let mut cursor = root;
    for segment in parents {
        cursor = match child_mut(cursor, segment) {
            Some(next) => next,
            None => return false,
        };
    }

    match child_mut(cursor, last) {
        Some(leaf) => {
            *leaf = Value::String(MASK_TOKEN.to_string());
            true
        }
        None => false,
    }
}

/// Mask every path in order. Returns how many paths resolved.
pub fn mask_paths<'p, I>(root: &mut Value, paths: I) -> usize
where
    I: IntoIterator<Item = &'p String>,
{
    paths
        .into_iter()
        .filter(|p| mask_path(root, p))
        .count()
}

fn child_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |idx| items.get_mut(idx)),
        _ => None,
    }
}
