//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble the handler's collaborators into `AppState`
//! - Create the Axum Router with the chat and health routes
//! - Wire up middleware (CORS, request ID, tracing, panic catch-all)
//! - Serve until the shutdown signal fires

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::{any, get},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::chat::{ChatCompletionsAdapter, PayloadBuilder, ResponseAdapter};
use crate::config::ProxyConfig;
use crate::http::cors::{cors_middleware, CorsHeaders};
use crate::http::handler::chat_handler;
use crate::http::health::get_health;
use crate::http::request::{request_id_of, MakeRequestUuidV4};
use crate::http::response::{panic_message, panic_response};
use crate::observability::{DiagnosticSink, TracingSink};
use crate::secrets::{EnvSecretStore, SecretStore};
use crate::upstream::{ChatUpstream, HttpUpstream, UpstreamError};

/// Application state injected into handlers.
///
/// Holds only immutable collaborators; nothing is shared between requests
/// beyond them.
#[derive(Clone)]
pub struct AppState {
    pub builder: Arc<PayloadBuilder>,
    pub upstream: Arc<dyn ChatUpstream>,
    pub secrets: Arc<dyn SecretStore>,
    pub adapter: Arc<dyn ResponseAdapter>,
    pub diagnostics: Arc<dyn DiagnosticSink>,
    pub api_key_secret: Arc<str>,
    pub max_body_bytes: usize,
}

impl AppState {
    /// Production collaborators: reqwest upstream, environment secrets,
    /// chat-completions adapter and the tracing sink.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, UpstreamError> {
        let upstream = HttpUpstream::new(&config.upstream)?;
        Ok(Self::with_upstream(config, Arc::new(upstream)))
    }

    /// Same as [`AppState::from_config`] with a caller-provided upstream.
    pub fn with_upstream(config: &ProxyConfig, upstream: Arc<dyn ChatUpstream>) -> Self {
        Self {
            builder: Arc::new(PayloadBuilder::new(
                config.upstream.model.clone(),
                config.attachments.min_base64_len,
            )),
            upstream,
            secrets: Arc::new(EnvSecretStore),
            adapter: Arc::new(ChatCompletionsAdapter),
            diagnostics: Arc::new(TracingSink),
            api_key_secret: Arc::from(config.upstream.api_key_secret.as_str()),
            max_body_bytes: config.limits.max_body_bytes,
        }
    }

    pub fn secrets(mut self, secrets: Arc<dyn SecretStore>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn adapter(mut self, adapter: Arc<dyn ResponseAdapter>) -> Self {
        self.adapter = adapter;
        self
    }

    /// Emit to the diagnostic sink. A panicking sink is contained and
    /// reported through `tracing`; the request carries on.
    pub fn diagnose<F>(&self, emit: F)
    where
        F: FnOnce(&dyn DiagnosticSink),
    {
        let sink = self.diagnostics.as_ref();
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| emit(sink))) {
            tracing::warn!(
                details = %panic_message(panic.as_ref()),
                "Diagnostic sink failed"
            );
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid cross-origin header value: {0}")]
    Cors(#[from] axum::http::header::InvalidHeaderValue),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// HTTP server for the chat proxy.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with production collaborators.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let state = AppState::from_config(&config)?;
        Self::with_state(config, state)
    }

    /// Create a server around an already-assembled state.
    pub fn with_state(config: ProxyConfig, state: AppState) -> Result<Self, ServerError> {
        let cors = Arc::new(CorsHeaders::from_config(&config.cors)?);
        let router = Self::build_router(&config, state, cors);
        Ok(Self {
            router,
            config: Arc::new(config),
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState, cors: Arc<CorsHeaders>) -> Router {
        Router::new()
            .route(&config.listener.path, any(chat_handler))
            .route("/health", get(get_health))
            .with_state(state)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http().make_span_with(
                        |request: &Request<Body>| {
                            tracing::info_span!(
                                "request",
                                method = %request.method(),
                                uri = %request.uri(),
                                request_id = %request_id_of(request),
                            )
                        },
                    ))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
            .layer(middleware::from_fn_with_state(cors, cors_middleware))
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            path = %self.config.listener.path,
            model = %self.config.upstream.model,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
