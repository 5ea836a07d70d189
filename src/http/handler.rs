//! Chat proxy handler.
//!
//! Per-request lifecycle, terminal on the first failure:
//! ```text
//! OPTIONS → "ok"
//! method check → body parse → prompt check → secret lookup
//!     → build payload → upstream call → response parse → {"message": ..}
//! ```

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use axum::{
    body::{self, Body},
    extract::State,
    http::{header::CONTENT_LENGTH, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;
use serde_json::{Map, Value};

use crate::chat::{ChatRequest, Outcome};
use crate::http::request::request_id_of;
use crate::http::response::{panic_message, ProxyError};
use crate::http::server::AppState;
use crate::observability::metrics;

pub async fn chat_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    // Preflight never reaches validation.
    if request.method() == Method::OPTIONS {
        return (StatusCode::OK, "ok").into_response();
    }

    let start = Instant::now();
    let request_id = request_id_of(&request);

    let result = AssertUnwindSafe(handle_chat(&state, &request_id, request))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(ProxyError::Internal(panic_message(panic.as_ref()))));

    let (label, outcome) = match result {
        Ok(message) => ("success", Outcome::Success { message }),
        Err(err) => {
            report(&state, &request_id, &err);
            (err.code(), Outcome::from(err))
        }
    };

    metrics::record_request(label, outcome.status(), start);
    outcome.into_response()
}

async fn handle_chat(
    state: &AppState,
    request_id: &str,
    request: Request<Body>,
) -> Result<String, ProxyError> {
    if request.method() != Method::POST {
        return Err(ProxyError::MethodNotAllowed);
    }

    let object = read_json_object(request, state.max_body_bytes).await?;
    let chat = ChatRequest::from_object(&object)?;

    let api_key = state
        .secrets
        .get(&state.api_key_secret)
        .await
        .ok_or(ProxyError::MissingApiKey)?;

    let built = state.builder.build(&chat);
    for dropped in &built.dropped {
        metrics::record_dropped_attachment(dropped.kind.as_str());
        state.diagnose(|sink| {
            sink.warn(&format!(
                "request_id={} dropped {} attachment: {}",
                request_id,
                dropped.kind.as_str(),
                dropped.reason
            ))
        });
    }

    let parts = built.payload.messages.iter().map(|m| m.content.len()).sum::<usize>();
    state.diagnose(|sink| {
        sink.debug(&format!(
            "request_id={} forwarding {} content part(s) to model {}",
            request_id, parts, built.payload.model
        ))
    });

    let reply = state
        .upstream
        .send(&api_key, &built.payload)
        .await
        .map_err(|e| ProxyError::UpstreamUnreachable(e.to_string()))?;

    if !reply.status.is_success() {
        return Err(ProxyError::Upstream {
            status: reply.status,
            body: reply.body_text(),
        });
    }

    let message = state
        .adapter
        .extract_assistant_message(&reply.body)
        .map_err(ProxyError::InvalidUpstreamResponse)?;

    state.diagnose(|sink| {
        sink.info(&format!(
            "request_id={} upstream replied {} ({} chars)",
            request_id,
            reply.status.as_u16(),
            message.chars().count()
        ))
    });
    Ok(message)
}

/// Read the body and decode it as a JSON object.
async fn read_json_object(
    request: Request<Body>,
    limit: usize,
) -> Result<Map<String, Value>, ProxyError> {
    let declared = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if let Some(len) = declared.filter(|len| *len > limit) {
        return Err(ProxyError::PayloadTooLarge(format!(
            "body of {} bytes exceeds limit of {} bytes",
            len, limit
        )));
    }

    // An undeclared body only fails here when it outgrows the limit; an
    // aborted connection never sees the response.
    let bytes = body::to_bytes(request.into_body(), limit)
        .await
        .map_err(|e| ProxyError::PayloadTooLarge(e.to_string()))?;

    serde_json::from_slice::<Map<String, Value>>(&bytes).map_err(|_| ProxyError::InvalidJson)
}

fn report(state: &AppState, request_id: &str, err: &ProxyError) {
    let message = match err.details() {
        Some(details) => format!(
            "request_id={} {} ({}): {}",
            request_id,
            err.code(),
            err.status().as_u16(),
            details
        ),
        None => format!(
            "request_id={} {} ({})",
            request_id,
            err.code(),
            err.status().as_u16()
        ),
    };

    state.diagnose(|sink| {
        if err.is_server_fault() {
            sink.error(&message);
        } else {
            sink.info(&message);
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::chat::{ChatPayload, ContentPart};
    use crate::config::ProxyConfig;
    use crate::http::server::HttpServer;
    use crate::observability::{DiagnosticSink, MemorySink, Severity};
    use crate::secrets::StaticSecretStore;
    use crate::upstream::{ChatUpstream, UpstreamError, UpstreamReply};

    #[derive(Clone)]
    enum Behaviour {
        Reply(u16, &'static str),
        Unreachable,
        Panic,
    }

    struct FakeUpstream {
        behaviour: Behaviour,
        calls: Mutex<Vec<(String, ChatPayload)>>,
    }

    impl FakeUpstream {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, ChatPayload)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatUpstream for FakeUpstream {
        async fn send(
            &self,
            api_key: &str,
            payload: &ChatPayload,
        ) -> Result<UpstreamReply, UpstreamError> {
            self.calls
                .lock()
                .unwrap()
                .push((api_key.to_string(), payload.clone()));
            match self.behaviour {
                Behaviour::Reply(status, body) => Ok(UpstreamReply {
                    status: StatusCode::from_u16(status).unwrap(),
                    body: body.as_bytes().to_vec(),
                }),
                Behaviour::Unreachable => {
                    Err(UpstreamError::Transport("connection refused".into()))
                }
                Behaviour::Panic => panic!("upstream exploded"),
            }
        }
    }

    const HI_THERE: &str = r#"{"choices":[{"message":{"content":"Hi there"}}]}"#;

    struct Harness {
        router: axum::Router,
        upstream: Arc<FakeUpstream>,
        sink: Arc<MemorySink>,
    }

    fn harness_with(behaviour: Behaviour, api_key: Option<&str>) -> Harness {
        let mut config = ProxyConfig::default();
        config.limits.max_body_bytes = 4096;

        let upstream = FakeUpstream::new(behaviour);
        let sink = Arc::new(MemorySink::new());
        let mut secrets = StaticSecretStore::new();
        if let Some(key) = api_key {
            secrets = secrets.with("OPENROUTER_API_KEY", key);
        }

        let state = AppState::with_upstream(&config, upstream.clone())
            .secrets(Arc::new(secrets))
            .diagnostics(sink.clone());
        let server = HttpServer::with_state(config, state).unwrap();

        Harness {
            router: server.router(),
            upstream,
            sink,
        }
    }

    /// Sink whose every call fails.
    struct BrokenSink;

    impl DiagnosticSink for BrokenSink {
        fn debug(&self, _message: &str) {
            panic!("sink backend down");
        }

        fn info(&self, _message: &str) {
            panic!("sink backend down");
        }

        fn warn(&self, _message: &str) {
            panic!("sink backend down");
        }

        fn error(&self, _message: &str) {
            panic!("sink backend down");
        }
    }

    fn router_with_sink(behaviour: Behaviour, sink: Arc<dyn DiagnosticSink>) -> axum::Router {
        let config = ProxyConfig::default();
        let secrets = StaticSecretStore::new().with("OPENROUTER_API_KEY", "sk-test");
        let state = AppState::with_upstream(&config, FakeUpstream::new(behaviour))
            .secrets(Arc::new(secrets))
            .diagnostics(sink);
        HttpServer::with_state(config, state).unwrap().router()
    }

    fn harness(behaviour: Behaviour) -> Harness {
        harness_with(behaviour, Some("sk-test"))
    }

    fn post(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/chat")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Response) {
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
            "*",
            "every response carries CORS headers"
        );
        (response.status(), response)
    }

    async fn json_body(response: Response) -> Value {
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn long_base64() -> String {
        "QUJD".repeat(40)
    }

    #[tokio::test]
    async fn hello_round_trip() {
        let h = harness(Behaviour::Reply(200, HI_THERE));

        let (status, response) = send(&h.router, post(r#"{"prompt":"Hello"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "message": "Hi there" }));

        let calls = h.upstream.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "sk-test");
        assert_eq!(calls[0].1.messages.len(), 1);
        assert_eq!(calls[0].1.messages[0].content, vec![ContentPart::text("Hello")]);
    }

    #[tokio::test]
    async fn preflight_skips_validation() {
        let h = harness(Behaviour::Reply(200, HI_THERE));
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/chat")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, response) = send(&h.router, request).await;

        assert_eq!(status, StatusCode::OK);
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
        assert!(h.upstream.calls().is_empty());
        assert!(h.sink.events().is_empty());
    }

    #[tokio::test]
    async fn non_post_is_method_not_allowed() {
        let h = harness(Behaviour::Reply(200, HI_THERE));
        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let request = Request::builder()
                .method(method)
                .uri("/chat")
                .body(Body::from(r#"{"prompt":"Hello"}"#))
                .unwrap();

            let (status, response) = send(&h.router, request).await;

            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(json_body(response).await, json!({ "error": "Method Not Allowed" }));
        }
        assert!(h.upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn unparseable_body_is_invalid_json() {
        let h = harness(Behaviour::Reply(200, HI_THERE));
        for body in ["{not json", "", "[1,2]", "\"Hello\""] {
            let (status, response) = send(&h.router, post(body)).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(
                json_body(response).await,
                json!({ "error": "Bad Request: Invalid JSON" })
            );
        }
    }

    #[tokio::test]
    async fn missing_prompt_is_same_error_with_or_without_attachments() {
        let h = harness(Behaviour::Reply(200, HI_THERE));
        let bodies = [
            json!({}),
            json!({ "prompt": "" }),
            json!({ "imageBase64": long_base64() }),
            json!({ "imageBase64": long_base64(), "audioBase64": long_base64() }),
        ];
        for body in bodies {
            let (status, response) = send(&h.router, post(body.to_string())).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(
                json_body(response).await,
                json!({ "error": "Bad Request: Missing prompt" })
            );
        }
        assert!(h.upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_api_key_is_a_loud_server_fault() {
        let h = harness_with(Behaviour::Reply(200, HI_THERE), None);

        let (status, response) = send(&h.router, post(r#"{"prompt":"Hello"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Server misconfigured: API key not configured" })
        );
        assert!(h.upstream.calls().is_empty());
        assert_eq!(h.sink.matching(Severity::Error, "api_key_missing").len(), 1);
    }

    #[tokio::test]
    async fn upstream_status_and_body_are_forwarded() {
        let h = harness(Behaviour::Reply(429, r#"{"error":"rate limited"}"#));

        let (status, response) = send(&h.router, post(r#"{"prompt":"Hello"}"#)).await;

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Upstream API error", "details": r#"{"error":"rate limited"}"# })
        );
    }

    #[tokio::test]
    async fn unreachable_upstream_is_bad_gateway() {
        let h = harness(Behaviour::Unreachable);

        let (status, response) = send(&h.router, post(r#"{"prompt":"Hello"}"#)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Upstream API error");
        assert!(body["details"].as_str().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn success_without_choices_is_invalid_format() {
        let h = harness(Behaviour::Reply(200, r#"{"id":"gen-1","choices":[]}"#));

        let (status, response) = send(&h.router, post(r#"{"prompt":"Hello"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Invalid response format from upstream API");
        assert!(h
            .sink
            .matching(Severity::Error, "invalid_upstream_response")
            .first()
            .is_some());
    }

    #[tokio::test]
    async fn malformed_attachment_is_dropped_not_rejected() {
        let h = harness(Behaviour::Reply(200, HI_THERE));
        let body = json!({
            "prompt": "What is in this picture?",
            "imageBase64": "not*base64",
            "audioBase64": long_base64(),
        });

        let (status, _) = send(&h.router, post(body.to_string())).await;

        assert_eq!(status, StatusCode::OK);
        let content = &h.upstream.calls()[0].1.messages[0].content;
        assert_eq!(content.len(), 2);
        assert!(matches!(content[1], ContentPart::Audio { .. }));
        assert_eq!(h.sink.matching(Severity::Warn, "dropped image").len(), 1);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let h = harness(Behaviour::Reply(200, HI_THERE));
        let body = json!({ "prompt": "x".repeat(8192) });

        let (status, response) = send(&h.router, post(body.to_string())).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(response).await["error"], "Payload Too Large");
        assert!(h.upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn panic_becomes_internal_error_with_cors() {
        let h = harness(Behaviour::Panic);

        let (status, response) = send(&h.router, post(r#"{"prompt":"Hello"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Internal Server Error", "details": "upstream exploded" })
        );
        let errors = h.sink.matching(Severity::Error, "internal");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("upstream exploded"));
    }

    #[tokio::test]
    async fn failing_sink_does_not_change_the_response() {
        let router = router_with_sink(Behaviour::Reply(200, HI_THERE), Arc::new(BrokenSink));
        let body = json!({ "prompt": "Hello", "imageBase64": "short" });

        let (status, response) = send(&router, post(body.to_string())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "message": "Hi there" }));
    }

    #[tokio::test]
    async fn failing_sink_keeps_client_error_envelope() {
        let router = router_with_sink(Behaviour::Reply(200, HI_THERE), Arc::new(BrokenSink));

        let (status, response) = send(&router, post("{}")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Bad Request: Missing prompt" })
        );
    }

    #[tokio::test]
    async fn method_check_precedes_prompt_check() {
        let h = harness(Behaviour::Reply(200, HI_THERE));
        let request = Request::builder()
            .method(Method::GET)
            .uri("/chat")
            .body(Body::from("{}"))
            .unwrap();

        let (status, response) = send(&h.router, request).await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(json_body(response).await, json!({ "error": "Method Not Allowed" }));
    }

    #[tokio::test]
    async fn request_id_is_generated_or_propagated() {
        let h = harness(Behaviour::Reply(200, HI_THERE));

        let (_, response) = send(&h.router, post(r#"{"prompt":"Hello"}"#)).await;
        assert!(response.headers().contains_key("x-request-id"));

        let mut request = post(r#"{"prompt":"Hello"}"#);
        request
            .headers_mut()
            .insert("x-request-id", "client-id-1".parse().unwrap());
        let (_, response) = send(&h.router, request).await;
        assert_eq!(response.headers()["x-request-id"], "client-id-1");
    }

    #[tokio::test]
    async fn health_and_unknown_paths_carry_cors() {
        let h = harness(Behaviour::Reply(200, HI_THERE));

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, response) = send(&h.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");

        let request = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let (status, _) = send(&h.router, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
