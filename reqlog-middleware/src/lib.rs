//! Request/response capture for Reqlog.
//!
//! | Module      | Job                                                        |
//! |-------------|------------------------------------------------------------|
//! | `capture`   | per-request timer, cookie snapshot and lifecycle stage     |
//! | `adapter`   | `http` headers/URI/cookies → captured request and response |
//! | `pipeline`  | mask, truncate, build the record, emit, report failures    |
//! | `layer`     | axum `from_fn_with_state` middleware around the pipeline   |

pub mod adapter;
pub mod capture;
pub mod layer;
pub mod pipeline;

pub use capture::{CaptureContext, CapturedBody, CapturedRequest, CapturedResponse, Stage};
pub use layer::{RequestLogLayer, request_log};
pub use pipeline::LoggingPipeline;
