//! Conversions from `http` types into the captured request/response.

use crate::capture::{CapturedBody, CapturedRequest, CapturedResponse};
use bytes::Bytes;
use http::header::{COOKIE, HOST, SET_COOKIE};
use http::{HeaderMap, Uri};
use reqlog_core::ResponseException;
use reqlog_core::cookie::{ResponseCookie, parse_cookie_header};
use reqlog_core::record::{CookieJar, HeaderValues, ResponseCookies};
use reqlog_masking::route_filter::normalize_path;

/// Header map keyed by lowercase name, values in arrival order. Values that
/// are not valid UTF-8 are decoded lossily.
pub fn header_values(headers: &HeaderMap) -> HeaderValues {
    let mut out = HeaderValues::new();
    for (name, value) in headers {
        out.entry(name.as_str().to_ascii_lowercase())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    out
}

/// Every `Cookie` header merged into one jar.
pub fn request_cookies(headers: &HeaderMap) -> CookieJar {
    let mut jar = CookieJar::new();
    for value in headers.get_all(COOKIE) {
        if let Ok(raw) = value.to_str() {
            parse_cookie_header(raw, &mut jar);
        }
    }
    jar
}

/// `Set-Cookie` headers keyed by cookie name; a later header for the same
/// name replaces an earlier one.
pub fn response_cookies(headers: &HeaderMap) -> ResponseCookies {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(ResponseCookie::parse)
        .map(|c| (c.name.clone(), c))
        .collect()
}

/// `(url, root, path, query)` for a request target.
///
/// Origin-form targets (`/a?b`) take their host from the `Host` header,
/// falling back to `localhost`; the scheme defaults to `http`.
pub fn request_target(uri: &Uri, headers: &HeaderMap) -> (String, String, String, String) {
    let scheme = uri.scheme_str().unwrap_or("http");
    let host = uri
        .host()
        .map(|h| match uri.port_u16() {
            Some(port) => format!("{h}:{port}"),
            None => h.to_string(),
        })
        .or_else(|| {
            headers
                .get(HOST)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "localhost".to_string());

    let root = format!("{scheme}://{host}");
    let path = normalize_path(uri.path());
    let url = if path == "/" {
        root.clone()
    } else {
        format!("{root}/{path}")
    };
    let query = uri.query().unwrap_or_default().to_string();
    (url, root, path, query)
}

pub fn capture_request(
    method: &http::Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
    route: Option<String>,
) -> CapturedRequest {
    let (url, root, path, query) = request_target(uri, headers);
    CapturedRequest {
        method: method.as_str().to_string(),
        url,
        root,
        path,
        query,
        headers: header_values(headers),
        body,
        route,
    }
}

pub fn capture_response(
    status: http::StatusCode,
    headers: &HeaderMap,
    body: CapturedBody,
    exception: Option<ResponseException>,
) -> CapturedResponse {
    CapturedResponse {
        status: status.as_u16(),
        headers: header_values(headers),
        cookies: response_cookies(headers),
        body,
        exception,
    }
}
