use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One cookie set by a response, in structured form.
///
/// Only `value` is ever masked; the attributes are logged as sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseCookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub expires: Option<String>,
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<String>,
}

impl ResponseCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            expires: None,
            max_age: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }

    /// Parse a single `Set-Cookie` header value.
    ///
    /// Returns `None` when there is no `name=value` pair up front. Unknown
    /// attributes are ignored, as is a `Max-Age` that is not an integer.
    pub fn parse(header: &str) -> Option<Self> {
        let mut parts = header.split(';');
        let (name, value) = split_pair(parts.next()?)?;
        let mut cookie = ResponseCookie::new(name, value);

        for attr in parts {
            let attr = attr.trim();
            if attr.is_empty() {
                continue;
            }
            let (key, val) = match attr.split_once('=') {
                Some((k, v)) => (k.trim(), Some(v.trim())),
                None => (attr, None),
            };
            match key.to_ascii_lowercase().as_str() {
                "domain" => cookie.domain = val.map(String::from),
                "path" => cookie.path = val.map(String::from),
                "expires" => cookie.expires = val.map(String::from),
                "max-age" => cookie.max_age = val.and_then(|v| v.parse().ok()),
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                "samesite" => cookie.same_site = val.map(String::from),
                _ => {}
            }
        }

        Some(cookie)
    }
}

/// Parse a request `Cookie` header (`a=1; b=2`) into `jar`.
///
/// The first occurrence of a name wins. Double quotes around a value are
/// stripped.
pub fn parse_cookie_header(header: &str, jar: &mut BTreeMap<String, String>) {
    for pair in header.split(';') {
        if let Some((name, value)) = split_pair(pair) {
            jar.entry(name).or_insert(value);
        }
    }
}

fn split_pair(raw: &str) -> Option<(String, String)> {
    let (name, value) = raw.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    Some((name.to_string(), value.to_string()))
}
