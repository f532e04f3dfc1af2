pub mod config;
pub mod error;
pub mod metrics;
pub mod validation;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use speech_core::ElevenLabsClient;
use stream_core::UpstreamChatClient;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::metrics::{AppMetrics, EndpointMetricsResponse, MetricsResponse, SystemMetrics};
use crate::validation::{validate_ask_request, validate_speak_request};

pub const MISSING_SPEECH_KEY: &str = "Missing ElevenLabs API Key";
pub const MISSING_MODEL_KEY: &str = "Missing OpenAI API Key";

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct AppState {
    /// `None` when no speech key is configured
    pub speech: Option<Arc<ElevenLabsClient>>,
    /// `None` when no model key is configured
    pub llm: Option<Arc<UpstreamChatClient>>,
    pub metrics: AppMetrics,
    pub config: ServerConfig,
}

impl AppState {
    pub fn from_config(config: ServerConfig) -> Self {
        let speech = config.elevenlabs_api_key.as_ref().map(|key| {
            Arc::new(
                ElevenLabsClient::new(key.clone())
                    .with_base_url(config.elevenlabs_base_url.clone())
                    .with_voice_id(config.voice_id.clone())
                    .with_settings(config.voice_settings),
            )
        });
        if speech.is_none() {
            warn!("ELEVENLABS_API_KEY not set, /speak will answer 500");
        }

        let llm = config.openai_api_key.as_ref().map(|key| {
            Arc::new(
                UpstreamChatClient::new(key.clone(), config.llm_base_url.clone(), config.llm_model.clone())
                    .with_system_prompt(config.llm_system_prompt.clone())
                    .with_max_tokens(config.llm_max_tokens),
            )
        });
        if llm.is_none() {
            warn!("OPENAI_API_KEY not set, /ask will answer 500");
        }

        Self {
            speech,
            llm,
            metrics: AppMetrics::new(),
            config,
        }
    }
}

#[derive(Deserialize)]
pub struct SpeakRequest {
    text: String,
}

#[derive(Deserialize)]
pub struct AskRequest {
    message: String,
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .flatten()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        if config.cors_allowed_origins.is_some() {
            warn!("CORS_ALLOWED_ORIGINS has no usable origin, falling back to permissive CORS");
        } else {
            warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (development mode)");
        }
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
            .allow_credentials(false)
    } else {
        info!("CORS configured for {} origin(s)", origins.len());
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(methods)
            .allow_headers(Any)
            .allow_credentials(false)
    }
}

/// Tag every request and its response with an id, reusing the caller's when it sent one.
async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .cloned()
        .or_else(|| HeaderValue::from_str(&uuid::Uuid::new_v4().to_string()).ok());

    if let Some(ref id) = request_id {
        request.headers_mut().insert(REQUEST_ID_HEADER, id.clone());
    }
    let mut response = next.run(request).await;
    if let Some(id) = request_id {
        response.headers_mut().insert(REQUEST_ID_HEADER, id);
    }
    response
}

/// Build the full application router. Every route is served both at the
/// root and under `/api`.
pub fn build_router(state: AppState) -> Router {
    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(cors_layer(&state.config))
        .into_inner();

    let public_api = Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/speak", post(speak_endpoint))
        .route("/ask", post(ask_endpoint));

    // Metrics endpoint - consider adding authentication in production
    let metrics_api = Router::new().route("/metrics", get(metrics_endpoint));

    let api = Router::new().merge(public_api).merge(metrics_api);

    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(middleware_stack)
        .with_state(state)
}

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Json<MetricsResponse> {
    let mut system = sysinfo::System::new();
    system.refresh_cpu();
    system.refresh_memory();

    let memory_used = system.used_memory();
    let memory_total = system.total_memory();
    let memory_usage_percent = if memory_total > 0 {
        (memory_used as f64 / memory_total as f64 * 100.0) as f32
    } else {
        0.0
    };

    let system_load = if cfg!(unix) {
        Some(sysinfo::System::load_average().one)
    } else {
        None
    };

    Json(MetricsResponse {
        timestamp: chrono::Utc::now(),
        system: SystemMetrics {
            cpu_usage_percent: system.global_cpu_info().cpu_usage(),
            memory_used_mb: memory_used / 1024 / 1024,
            memory_total_mb: memory_total / 1024 / 1024,
            memory_usage_percent,
            request_count: state.metrics.request_count(),
            uptime_seconds: state.metrics.uptime_seconds(),
            system_load,
        },
        endpoints: EndpointMetricsResponse {
            ask: state.metrics.ask.stats(),
            speak: state.metrics.speak.stats(),
        },
    })
}

/// Relay speech audio for `text` from the provider.
pub async fn speak_endpoint(
    State(state): State<AppState>,
    Json(req): Json<SpeakRequest>,
) -> Result<Response, ApiError> {
    let started = Instant::now();
    let result = speak(&state, &req.text).await;
    state.metrics.speak.record(started, result.is_ok());
    result
}

async fn speak(state: &AppState, text: &str) -> Result<Response, ApiError> {
    let client = state
        .speech
        .as_ref()
        .ok_or(ApiError::MissingCredential(MISSING_SPEECH_KEY))?;
    validate_speak_request(text)?;

    info!(chars = text.chars().count(), voice = client.voice_id(), "Speech request received");

    let timeout = state.config.llm_timeout();
    let upstream = tokio::time::timeout(timeout, client.synthesize(text))
        .await
        .map_err(|_| ApiError::Timeout(timeout.as_secs()))??;

    Ok((
        [(header::CONTENT_TYPE, "audio/mpeg")],
        Body::from_stream(upstream.bytes_stream()),
    )
        .into_response())
}

/// Relay a streamed completion for `message` as server-sent events.
pub async fn ask_endpoint(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Response, ApiError> {
    let started = Instant::now();
    let result = ask(&state, &req.message).await;
    state.metrics.ask.record(started, result.is_ok());
    result
}

async fn ask(state: &AppState, message: &str) -> Result<Response, ApiError> {
    validate_ask_request(message)?;
    let client = state
        .llm
        .as_ref()
        .ok_or(ApiError::MissingCredential(MISSING_MODEL_KEY))?;

    info!(chars = message.chars().count(), model = client.model(), "Chat request received");

    let timeout = state.config.llm_timeout();
    let upstream = tokio::time::timeout(timeout, client.open_stream(message))
        .await
        .map_err(|_| ApiError::Timeout(timeout.as_secs()))??;

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(upstream.bytes_stream()),
    )
        .into_response())
}
