use crate::capture::{CaptureContext, CapturedBody, CapturedRequest, CapturedResponse, Stage};
use reqlog_core::{ReqlogError, ReqlogResult, RequestLogConfig, RequestLogRecord};
use reqlog_masking::{EMPTY_BODY, MaskingEngine, RouteFilter, SensitiveFieldRegistry, truncate};
use reqlog_observability::LogSink;
use std::sync::Arc;
use tracing::{Level, error};

/// Turns one captured request/response pair into at most one emitted record.
///
/// Shared by every request; holds only read-only state.
pub struct LoggingPipeline {
    config: Arc<RequestLogConfig>,
    filter: RouteFilter,
    registry: SensitiveFieldRegistry,
    sink: Arc<dyn LogSink>,
}

impl LoggingPipeline {
    pub fn new(config: Arc<RequestLogConfig>, sink: Arc<dyn LogSink>) -> Self {
        let filter = RouteFilter::new(&config.blacklisted_routes);
        let registry = SensitiveFieldRegistry::new(&config.sensitive);
        Self {
            config,
            filter,
            registry,
            sink,
        }
    }

    pub fn config(&self) -> &RequestLogConfig {
        &self.config
    }

    /// False when logging is off or `path` is blacklisted.
    pub fn should_log(&self, path: &str) -> bool {
        self.config.enabled && (self.filter.is_empty() || !self.filter.is_blacklisted(path))
    }

    fn cut(&self, body: String) -> String {
        if self.config.truncation_enabled() {
            truncate(&body, self.config.truncate_body_length).into_owned()
        } else {
            body
        }
    }

    /// Build the masked, truncated record for one request.
    pub fn finalize(
        &self,
        ctx: &CaptureContext,
        request: &CapturedRequest,
        response: &CapturedResponse,
    ) -> ReqlogResult<RequestLogRecord> {
        let spec = self.registry.build(&request.headers);
        let engine = MaskingEngine::new(&spec);

        let request_body = std::str::from_utf8(&request.body)
            .ok()
            .and_then(|text| engine.mask_body(text))
            .unwrap_or_else(|| EMPTY_BODY.to_string());

        let response_body = match &response.body {
            CapturedBody::Bytes(bytes) if bytes.is_empty() => EMPTY_BODY.to_string(),
            CapturedBody::Bytes(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                engine.mask_body(&text).unwrap_or_else(|| text.into_owned())
            }
            CapturedBody::Skipped => EMPTY_BODY.to_string(),
            CapturedBody::Failed(reason) => {
                return Err(ReqlogError::BodyCapture(reason.clone()));
            }
        };

        let mut response_headers = response.headers.clone();
        response_headers.remove("set-cookie");

        Ok(RequestLogRecord {
            method: request.method.clone(),
            url: request.url.clone(),
            route_uri: request.route.clone(),
            root: request.root.clone(),
            path: request.path.clone(),
            query_string: engine.mask_query_string(&request.query),
            request_headers: engine.mask_headers(&request.headers),
            request_cookies: engine.mask_cookies(ctx.cookies()),
            request_body: self.cut(request_body),
            status: response.status,
            response_headers: engine.mask_headers(&response_headers),
            response_cookies: engine.mask_response_cookies(&response.cookies),
            response_body: self.cut(response_body),
            response_exception: response.exception.clone(),
            execution_time_ns: ctx.elapsed_ns(),
        })
    }

    /// Hand one record to the sink at DEBUG.
    pub fn emit(&self, record: &RequestLogRecord) -> ReqlogResult<()> {
        let context = record.to_context()?;
        self.sink.write(Level::DEBUG, &record.message(), &context)?;
        Ok(())
    }

    /// Run the completion step and return the terminal stage.
    ///
    /// Errors are reported here and never propagate; the caller's response
    /// is unaffected whatever happens.
    pub fn complete(
        &self,
        mut ctx: CaptureContext,
        request: &CapturedRequest,
        response: &CapturedResponse,
    ) -> Stage {
        if !self.should_log(&request.path) {
            ctx.advance(Stage::Suppressed);
            return ctx.stage();
        }

        ctx.advance(Stage::Finalizing);
        let result = self
            .finalize(&ctx, request, response)
            .and_then(|record| self.emit(&record));

        match result {
            Ok(()) => ctx.advance(Stage::Emitted),
            Err(e) => {
                error!(
                    error = %e,
                    kind = e.kind(),
                    method = %request.method,
                    path = %request.path,
                    "Failed to log request"
                );
                ctx.advance(Stage::Failed);
            }
        }
        ctx.stage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use reqlog_core::ResponseException;
    use reqlog_core::record::{CookieJar, HeaderValues, ResponseCookies};
    use reqlog_observability::SinkError;
    use serde_json::Value;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<(Level, String, Value)>>);

    impl LogSink for Recording {
        fn write(&self, level: Level, message: &str, context: &Value) -> Result<(), SinkError> {
            self.0
                .lock()
                .unwrap()
                .push((level, message.to_string(), context.clone()));
            Ok(())
        }
    }

    struct Broken;

    impl LogSink for Broken {
        fn write(&self, _: Level, _: &str, _: &Value) -> Result<(), SinkError> {
            Err(SinkError::Closed)
        }
    }

    fn request(body: &str) -> CapturedRequest {
        let mut headers = HeaderValues::new();
        headers.insert("content-type".into(), vec!["application/json".into()]);
        CapturedRequest {
            method: "POST".into(),
            url: "http://localhost/test".into(),
            root: "http://localhost".into(),
            path: "test".into(),
            query: String::new(),
            headers,
            body: Bytes::from(body.to_string()),
            route: Some("/test".into()),
        }
    }

    fn response(body: CapturedBody) -> CapturedResponse {
        CapturedResponse {
            status: 200,
            headers: HeaderValues::new(),
            cookies: ResponseCookies::new(),
            body,
            exception: None,
        }
    }

    fn pipeline(config: RequestLogConfig, sink: Arc<dyn LogSink>) -> LoggingPipeline {
        LoggingPipeline::new(Arc::new(config), sink)
    }

    #[test]
    fn emits_once_at_debug() {
        let sink = Arc::new(Recording::default());
        let p = pipeline(RequestLogConfig::default(), sink.clone());
        let stage = p.complete(
            CaptureContext::begin(CookieJar::new()),
            &request("{}"),
            &response(CapturedBody::Bytes(Bytes::from_static(b"ok"))),
        );
        assert_eq!(stage, Stage::Emitted);

        let events = sink.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, Level::DEBUG);
        assert_eq!(events[0].1, "Timing for http://localhost/test");
        assert_eq!(events[0].2["http"]["response"]["body"]["content"], "ok");
    }

    #[test]
    fn disabled_is_suppressed() {
        let sink = Arc::new(Recording::default());
        let config = RequestLogConfig {
            enabled: false,
            ..RequestLogConfig::default()
        };
        let p = pipeline(config, sink.clone());
        let stage = p.complete(
            CaptureContext::begin(CookieJar::new()),
            &request("{}"),
            &response(CapturedBody::empty()),
        );
        assert_eq!(stage, Stage::Suppressed);
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn sink_failure_becomes_failed_stage() {
        let p = pipeline(RequestLogConfig::default(), Arc::new(Broken));
        let stage = p.complete(
            CaptureContext::begin(CookieJar::new()),
            &request("{}"),
            &response(CapturedBody::empty()),
        );
        assert_eq!(stage, Stage::Failed);
    }

    #[test]
    fn failed_response_capture_is_an_error() {
        let p = pipeline(RequestLogConfig::default(), Arc::new(Recording::default()));
        let err = p
            .finalize(
                &CaptureContext::new(),
                &request("{}"),
                &response(CapturedBody::Failed("stream reset".into())),
            )
            .unwrap_err();
        assert_eq!(err.kind(), "body_capture");
    }

    #[test]
    fn untimed_context_has_no_duration() {
        let p = pipeline(RequestLogConfig::default(), Arc::new(Recording::default()));
        let record = p
            .finalize(&CaptureContext::new(), &request("{}"), &response(CapturedBody::empty()))
            .unwrap();
        assert_eq!(record.execution_time_ns, None);
    }

    #[test]
    fn bodies_are_normalized() {
        let p = pipeline(RequestLogConfig::default(), Arc::new(Recording::default()));
        let ctx = CaptureContext::begin(CookieJar::new());

        let r = p
            .finalize(&ctx, &request("password=1234"), &response(CapturedBody::empty()))
            .unwrap();
        assert_eq!(r.request_body, EMPTY_BODY);
        assert_eq!(r.response_body, EMPTY_BODY);

        let r = p
            .finalize(&ctx, &request(""), &response(CapturedBody::Skipped))
            .unwrap();
        assert_eq!(r.request_body, EMPTY_BODY);
        assert_eq!(r.response_body, EMPTY_BODY);

        let r = p
            .finalize(
                &ctx,
                &request("{}"),
                &response(CapturedBody::Bytes(Bytes::from_static(b"<html>hi</html>"))),
            )
            .unwrap();
        assert_eq!(r.response_body, "<html>hi</html>");
    }

    #[test]
    fn set_cookie_is_dropped_from_response_headers() {
        let p = pipeline(RequestLogConfig::default(), Arc::new(Recording::default()));
        let mut resp = response(CapturedBody::empty());
        resp.headers.insert("set-cookie".into(), vec!["sid=abc".into()]);
        resp.headers.insert("content-type".into(), vec!["text/plain".into()]);
        let r = p
            .finalize(&CaptureContext::new(), &request("{}"), &resp)
            .unwrap();
        assert!(!r.response_headers.contains_key("set-cookie"));
        assert!(r.response_headers.contains_key("content-type"));
    }

    #[test]
    fn exception_is_carried_into_the_record() {
        let p = pipeline(RequestLogConfig::default(), Arc::new(Recording::default()));
        let mut resp = response(CapturedBody::empty());
        resp.status = 500;
        resp.exception = Some(ResponseException::new("Boom", "", 7, "#0 main"));
        let r = p
            .finalize(&CaptureContext::new(), &request("{}"), &resp)
            .unwrap();
        let ctx = r.to_context().unwrap();
        assert_eq!(ctx["error"]["message"], "Boom thrown with empty message");
        assert_eq!(ctx["error"]["code"], "7");
    }

    #[test]
    fn blacklisted_path_is_suppressed() {
        let sink = Arc::new(Recording::default());
        let config = RequestLogConfig {
            blacklisted_routes: vec!["test".into()],
            ..RequestLogConfig::default()
        };
        let p = pipeline(config, sink.clone());
        assert!(!p.should_log("test"));
        assert!(p.should_log("other"));
        let stage = p.complete(
            CaptureContext::begin(CookieJar::new()),
            &request("{}"),
            &response(CapturedBody::empty()),
        );
        assert_eq!(stage, Stage::Suppressed);
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn bodies_are_cut_only_when_truncation_is_enabled() {
        let long = format!("[{}]", vec!["1"; 200].join(","));
        let resp = || response(CapturedBody::Bytes(Bytes::from(long.clone())));

        let enabled = RequestLogConfig {
            truncate_body_length: 10,
            ..RequestLogConfig::default()
        };
        let p = pipeline(enabled, Arc::new(Recording::default()));
        let r = p.finalize(&CaptureContext::new(), &request(&long), &resp()).unwrap();
        assert_eq!(r.request_body, long[..10]);
        assert_eq!(r.response_body, long[..10]);

        let p = pipeline(RequestLogConfig::default(), Arc::new(Recording::default()));
        let r = p.finalize(&CaptureContext::new(), &request(&long), &resp()).unwrap();
        assert_eq!(r.request_body, long);
        assert_eq!(r.response_body, long);
    }
}
