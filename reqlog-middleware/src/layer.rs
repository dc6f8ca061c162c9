//! axum middleware.
//!
//! ```ignore
//! let state = RequestLogLayer::new(config, sink);
//! let app = Router::new()
//!     .route("/users/{id}", get(show_user))
//!     .layer(axum::middleware::from_fn_with_state(state, request_log));
//! ```
//!
//! Added with `Router::layer` the middleware runs per route, so the matched
//! route template is available as `http.route`.
//!
//! Bodies are only buffered when their size hint guarantees they fit under
//! `max_buffered_body_bytes`. Anything else streams through untouched and is
//! logged as `{}`. Whatever the outcome of capturing, the inner service sees
//! the request body and the client sees the response body exactly as sent.

use crate::adapter::{capture_request, capture_response, request_cookies};
use crate::capture::{CaptureContext, CapturedBody};
use crate::pipeline::LoggingPipeline;
use axum::body::{Body, HttpBody};
use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use futures_util::{StreamExt, stream};
use http_body::Frame;
use http_body_util::{BodyExt, BodyStream, StreamBody};
use reqlog_core::{RequestLogConfig, ResponseException};
use reqlog_masking::route_filter::normalize_path;
use reqlog_observability::LogSink;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Middleware state: the shared pipeline.
#[derive(Clone)]
pub struct RequestLogLayer {
    pipeline: Arc<LoggingPipeline>,
}

impl RequestLogLayer {
    pub fn new(config: Arc<RequestLogConfig>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            pipeline: Arc::new(LoggingPipeline::new(config, sink)),
        }
    }

    pub fn pipeline(&self) -> &LoggingPipeline {
        &self.pipeline
    }
}

/// Capture the request, run the inner service, log, return its response.
///
/// Disabled or blacklisted requests pass straight through without any
/// buffering.
pub async fn request_log(
    State(state): State<RequestLogLayer>,
    request: Request,
    next: Next,
) -> Response {
    let pipeline = state.pipeline();
    if !pipeline.should_log(&normalize_path(request.uri().path())) {
        return next.run(request).await;
    }

    let ctx = CaptureContext::begin(request_cookies(request.headers()));
    let limit = pipeline.config().max_buffered_body_bytes;

    let (parts, body) = request.into_parts();
    let (captured, body) = buffer_body(body, limit).await;
    let request_body = match captured {
        CapturedBody::Bytes(bytes) => bytes,
        CapturedBody::Skipped => {
            debug!(uri = %parts.uri, limit, "Request body not buffered");
            Bytes::new()
        }
        CapturedBody::Failed(reason) => {
            warn!(error = %reason, uri = %parts.uri, "Failed to read request body");
            Bytes::new()
        }
    };
    let route = parts
        .extensions
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string());
    let captured_request =
        capture_request(&parts.method, &parts.uri, &parts.headers, request_body, route);

    let response = next.run(Request::from_parts(parts, body)).await;

    let (parts, body) = response.into_parts();
    let (captured_body, body) = buffer_body(body, limit).await;
    if let CapturedBody::Failed(reason) = &captured_body {
        error!(error = %reason, "Failed to buffer response body");
    }
    let exception = parts.extensions.get::<ResponseException>().cloned();
    let captured_response = capture_response(parts.status, &parts.headers, captured_body, exception);

    pipeline.complete(ctx, &captured_request, &captured_response);

    Response::from_parts(parts, body)
}

/// Buffer a body whose length is known to fit under `limit` and hand back a
/// body that yields the same frames.
///
/// A body without such a size hint is returned untouched as `Skipped`. One
/// that outgrows its hint stops being captured and keeps streaming. One that
/// fails part way replays the frames read so far, then the same error.
async fn buffer_body(mut body: Body, limit: usize) -> (CapturedBody, Body) {
    let fits = body
        .size_hint()
        .upper()
        .is_some_and(|upper| upper <= limit as u64);
    if !fits {
        return (CapturedBody::Skipped, body);
    }

    let mut frames: Vec<Frame<Bytes>> = Vec::new();
    let mut buffered = BytesMut::new();
    let mut trailers = false;
    while let Some(next) = body.frame().await {
        match next {
            Ok(frame) => {
                match frame.data_ref() {
                    Some(chunk) => buffered.extend_from_slice(chunk),
                    None => trailers = true,
                }
                frames.push(frame);
                if buffered.len() > limit {
                    return (CapturedBody::Skipped, replay(frames, body));
                }
            }
            Err(e) => {
                let reason = e.to_string();
                return (CapturedBody::Failed(reason), replay_then_fail(frames, e));
            }
        }
    }

    let bytes = buffered.freeze();
    let restored = if trailers {
        replay(frames, Body::empty())
    } else {
        Body::from(bytes.clone())
    };
    (CapturedBody::Bytes(bytes), restored)
}

/// `frames` followed by whatever is left of `rest`.
fn replay(frames: Vec<Frame<Bytes>>, rest: Body) -> Body {
    let head = stream::iter(frames.into_iter().map(Ok::<_, axum::Error>));
    Body::new(StreamBody::new(head.chain(BodyStream::new(rest))))
}

/// `frames` followed by `err`.
fn replay_then_fail(frames: Vec<Frame<Bytes>>, err: axum::Error) -> Body {
    let head = stream::iter(frames.into_iter().map(Ok::<_, axum::Error>));
    Body::new(StreamBody::new(head.chain(stream::iter([Err(err)]))))
}
