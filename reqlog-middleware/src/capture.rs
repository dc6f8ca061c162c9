use bytes::Bytes;
use reqlog_core::ResponseException;
use reqlog_core::record::{CookieJar, HeaderValues, ResponseCookies};
use std::time::Instant;

/// Where a request is in its logging lifecycle.
///
/// `Idle → Capturing → Finalizing → Emitted | Suppressed | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Capturing,
    Finalizing,
    /// One record reached the sink.
    Emitted,
    /// Logging disabled or route blacklisted; nothing was built.
    Suppressed,
    /// Finalizing or emission failed; reported at error level.
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Emitted | Stage::Suppressed | Stage::Failed)
    }
}

/// Per-request capture state: the start instant and the cookies as they
/// arrived, before inner middleware had a chance to change them.
#[derive(Debug)]
pub struct CaptureContext {
    start: Option<Instant>,
    cookies: CookieJar,
    stage: Stage,
}

impl Default for CaptureContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureContext {
    pub fn new() -> Self {
        Self {
            start: None,
            cookies: CookieJar::new(),
            stage: Stage::Idle,
        }
    }

    /// Start the timer and snapshot the request cookies.
    pub fn begin(cookies: CookieJar) -> Self {
        Self {
            start: Some(Instant::now()),
            cookies,
            stage: Stage::Capturing,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// Nanoseconds since [`begin`](Self::begin); `None` if never started.
    pub fn elapsed_ns(&self) -> Option<u64> {
        self.start
            .map(|s| u64::try_from(s.elapsed().as_nanos()).unwrap_or(u64::MAX))
    }

    pub(crate) fn advance(&mut self, next: Stage) {
        debug_assert!(!self.stage.is_terminal(), "stage {:?} is terminal", self.stage);
        self.stage = next;
    }
}

/// A buffered body, or why there is none.
#[derive(Debug, Clone)]
pub enum CapturedBody {
    Bytes(Bytes),
    /// Too large or of unknown length; passed through without buffering.
    Skipped,
    /// Buffering failed part way.
    Failed(String),
}

impl CapturedBody {
    pub fn empty() -> Self {
        CapturedBody::Bytes(Bytes::new())
    }
}

/// The request as the pipeline needs it, independent of the HTTP framework.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    /// Scheme, host and path, no query.
    pub url: String,
    /// Scheme and host.
    pub root: String,
    /// Path without surrounding slashes; `/` for the root.
    pub path: String,
    /// Raw query string, without `?`.
    pub query: String,
    /// Lowercase names, values in arrival order.
    pub headers: HeaderValues,
    pub body: Bytes,
    /// Route template that matched, e.g. `/users/{id}`.
    pub route: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub status: u16,
    /// Including `set-cookie`; the pipeline strips it.
    pub headers: HeaderValues,
    pub cookies: ResponseCookies,
    pub body: CapturedBody,
    pub exception: Option<ResponseException>,
}
