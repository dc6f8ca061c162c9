use crate::MASK_TOKEN;
use crate::dotted_path::mask_paths;
use crate::registry::SensitiveFieldSpec;
use reqlog_core::record::{CookieJar, HeaderValues, ResponseCookies};
use serde_json::{Map, Value};

/// Applies one request's [`SensitiveFieldSpec`] to captured data.
///
/// Every method returns a masked copy; the inputs are left untouched and the
/// engine keeps nothing between calls. Masking an already masked value with
/// the same spec gives the same result.
pub struct MaskingEngine<'a> {
    spec: &'a SensitiveFieldSpec,
}

impl<'a> MaskingEngine<'a> {
    pub fn new(spec: &'a SensitiveFieldSpec) -> Self {
        Self { spec }
    }

    /// Mask every value of every sensitive header.
    ///
    /// Matching is per name: a header sent twice is masked twice, and the
    /// value count and order are preserved.
    pub fn mask_headers(&self, headers: &HeaderValues) -> HeaderValues {
        headers
            .iter()
            .map(|(name, values)| {
                let values = if self.spec.is_sensitive_header(name) {
                    vec![MASK_TOKEN.to_string(); values.len()]
                } else {
                    values.clone()
                };
                (name.clone(), values)
            })
            .collect()
    }

    /// Mask the value of each sensitive request cookie.
    pub fn mask_cookies(&self, cookies: &CookieJar) -> CookieJar {
        cookies
            .iter()
            .map(|(name, value)| {
                let value = if self.spec.is_sensitive_cookie(name) {
                    MASK_TOKEN.to_string()
                } else {
                    value.clone()
                };
                (name.clone(), value)
            })
            .collect()
    }

    /// Mask the `value` of each sensitive response cookie. Domain, path,
    /// expiry and flags are kept as sent.
    pub fn mask_response_cookies(&self, cookies: &ResponseCookies) -> ResponseCookies {
        cookies
            .iter()
            .map(|(name, cookie)| {
                let mut cookie = cookie.clone();
                if self.spec.is_sensitive_cookie(name) {
                    cookie.value = MASK_TOKEN.to_string();
                }
                (name.clone(), cookie)
            })
            .collect()
    }

    /// Mask the declared paths of a JSON body.
    ///
    /// Returns `None` when `body` is not JSON. When no declared path exists
    /// in the document the original text is returned as-is; otherwise the
    /// masked document is re-serialized compactly with key order preserved.
    pub fn mask_body(&self, body: &str) -> Option<String> {
        let mut doc: Value = serde_json::from_str(body).ok()?;
        if mask_paths(&mut doc, self.spec.body_paths()) == 0 {
            return Some(body.to_string());
        }
        serde_json::to_string(&doc).ok()
    }

    /// Parse a raw `k=v&...` query string, mask sensitive keys and render it
    /// as one JSON object: `token=very-secret&cake=not-secret` becomes
    /// `{"token":"[ MASKED ]","cake":"not-secret"}`.
    ///
    /// A repeated key keeps its first position and its last value. An empty
    /// query renders as `{}`.
    pub fn mask_query_string(&self, query: &str) -> String {
        let mut map = Map::new();
        for (key, value) in parse_query(query) {
            let value = if self.spec.is_sensitive_query_key(&key) {
                MASK_TOKEN.to_string()
            } else {
                value
            };
            map.insert(key, Value::String(value));
        }
        Value::Object(map).to_string()
    }
}

/// Split and form-urldecode a query string. Pairs with an empty key are
/// dropped; a key without `=` gets an empty value.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            let key = form_decode(k);
            if key.is_empty() {
                None
            } else {
                Some((key, form_decode(v)))
            }
        })
        .collect()
}

fn form_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi << 4) | lo);
                        i += 2;
                    }
                    _ => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
