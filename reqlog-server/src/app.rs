//! Demo routes.
//!
//! | Route          | Behaviour                                           |
//! |----------------|-----------------------------------------------------|
//! | `GET  /health` | plain `ok`                                          |
//! | `POST /echo`   | returns the request body unchanged                  |
//! | `POST /login`  | sets a `session` cookie                             |
//! | `GET  /fail`   | 500 carrying a [`ResponseException`]                |

use axum::body::Bytes;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Router, middleware};
use reqlog_core::ResponseException;
use reqlog_middleware::{RequestLogLayer, request_log};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
enum DemoError {
    #[error("upstream ledger unavailable")]
    LedgerUnavailable(#[source] std::io::Error),
}

pub fn router(state: RequestLogLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/echo", post(echo))
        .route("/login", post(login))
        .route("/fail", get(fail))
        .layer(middleware::from_fn_with_state(state, request_log))
}

async fn health() -> &'static str {
    "ok"
}

async fn echo(body: Bytes) -> Bytes {
    body
}

async fn login() -> Response {
    (
        [(header::SET_COOKIE, "session=s3cr3t; Path=/; HttpOnly; SameSite=Lax")],
        axum::Json(json!({"logged_in": true})),
    )
        .into_response()
}

async fn fail() -> Response {
    let err = DemoError::LedgerUnavailable(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "connection refused",
    ));
    let exception = ResponseException::from_error(&err, 503);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Extension(exception),
        axum::Json(json!({"error": err.to_string()})),
    )
        .into_response()
}
