//! HTTP transport module for the ootd-engine generation service
//!
//! Axum-based server exposing the generation API routes the UI consumes,
//! plus health/info/metrics. Optional bearer authentication covers every
//! route except /health.

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::{cmp::Ordering, collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::cache::{CachePolicy, ReportCache};
use crate::client::{GenerateOptions, GeminiClient, TextGenerator};
use crate::config::Config;
use crate::error::OotdError;
use crate::imagegen::ImageSynthesizer;
use crate::questionnaire::QuestionnaireEngine;
use crate::report::OutfitReportEngine;
use crate::types::{OutfitReport, Profile, ResponseSet, StyleForm};

/// Shared state for the HTTP server
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub generator: Arc<dyn TextGenerator>,
    pub questionnaire: Arc<QuestionnaireEngine>,
    pub report: Arc<OutfitReportEngine>,
    pub synthesizer: Arc<ImageSynthesizer>,
    pub cache: Arc<ReportCache>,
    pub metrics: Arc<Mutex<HttpMetrics>>,
}

/// Metrics for the HTTP server
#[derive(Debug, Clone)]
pub struct HttpMetrics {
    pub total_requests: u64,
    pub last_request_unix: u64,
    pub errors_total: u64,
    pub latencies: Vec<f64>, // ring buffer for p95
    pub routes_count: HashMap<String, u64>,
}

impl HttpMetrics {
    fn new() -> Self {
        Self {
            total_requests: 0,
            last_request_unix: std::time::SystemTime::UNIX_EPOCH
                .elapsed()
                .unwrap_or_default()
                .as_secs(),
            errors_total: 0,
            latencies: Vec::with_capacity(256),
            routes_count: HashMap::new(),
        }
    }
}

impl AppState {
    /// Wire every component from configuration. Missing provider keys are
    /// per-call failures, not startup failures; the engines keep serving
    /// sample data.
    pub fn from_config(config: Config) -> crate::error::Result<Self> {
        let generator: Arc<dyn TextGenerator> = Arc::new(GeminiClient::from_config(&config)?);
        Self::with_generator(config, generator)
    }

    /// Same wiring with an injected text generator (tests use a canned one)
    pub fn with_generator(
        config: Config,
        generator: Arc<dyn TextGenerator>,
    ) -> crate::error::Result<Self> {
        let questionnaire = Arc::new(QuestionnaireEngine::new(
            generator.clone(),
            config.generation.question_model.clone(),
        ));
        let report = Arc::new(OutfitReportEngine::new(
            generator.clone(),
            config.generation.report_model.clone(),
            config.generation.report_max_tokens,
        ));
        let synthesizer = Arc::new(ImageSynthesizer::from_config(&config)?);
        let policy = if config.cache.ttl_secs == 0 {
            CachePolicy::Session
        } else {
            CachePolicy::Ttl(std::time::Duration::from_secs(config.cache.ttl_secs))
        };
        let cache = Arc::new(ReportCache::new(config.cache.max_entries, policy));

        Ok(Self {
            config: Arc::new(config),
            generator,
            questionnaire,
            report,
            synthesizer,
            cache,
            metrics: Arc::new(Mutex::new(HttpMetrics::new())),
        })
    }
}

fn error_response(err: OotdError) -> (StatusCode, Json<serde_json::Value>) {
    let status = err.status_code();
    (
        status,
        Json(json!({
            "error": err.to_string(),
        })),
    )
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

/// Info endpoint: configuration snapshot without secrets
pub async fn info_handler(State(state): State<AppState>) -> impl IntoResponse {
    let generation = &state.config.generation;
    let image = &state.config.image;
    let configured: Vec<&String> = image
        .providers
        .iter()
        .filter(|p| state.config.provider_configured(p))
        .collect();

    Json(json!({
        "generation": {
            "report_model": generation.report_model,
            "question_model": generation.question_model,
        },
        "image": {
            "providers": image.providers,
            "configured": configured,
            "width": image.width,
            "height": image.height,
        },
        "server": {
            "bind": state.config.runtime.http_bind.to_string(),
        }
    }))
}

/// Metrics endpoint
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let metrics = state.metrics.lock().await.clone();

    let (avg_latency_ms, p95_latency_ms) = if metrics.latencies.is_empty() {
        (None, None)
    } else {
        let sum: f64 = metrics.latencies.iter().sum();
        let avg = sum / metrics.latencies.len() as f64;
        let mut sorted = metrics.latencies.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let p95_idx = (sorted.len() as f64 * 0.95) as usize;
        let p95 = sorted.get(p95_idx).copied();
        (Some(avg), p95)
    };

    let routes: Vec<_> = metrics
        .routes_count
        .iter()
        .map(|(k, v)| json!({ "route": k, "count": v }))
        .collect();

    Json(json!({
        "metrics_version": "1",
        "total_requests": metrics.total_requests,
        "last_request_unix": metrics.last_request_unix,
        "errors_total": metrics.errors_total,
        "avg_latency_ms": avg_latency_ms,
        "p95_latency_ms": p95_latency_ms,
        "routes": routes,
    }))
}

/// Request body for the passthrough generation endpoint. `stream` is part
/// of the legacy wire contract and accepted but ignored (always false).
#[derive(Debug, Deserialize)]
pub struct GenerateApiRequest {
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// POST /api/generate: uniform passthrough to the backing text provider
pub async fn generate_handler(
    State(state): State<AppState>,
    Json(body): Json<GenerateApiRequest>,
) -> impl IntoResponse {
    if body.prompt.trim().is_empty() {
        return error_response(OotdError::InvalidParams {
            message: "Missing required field: prompt".to_string(),
        })
            .into_response();
    }

    let options = GenerateOptions {
        temperature: body.temperature,
        format: body.format,
        max_tokens: body.max_tokens,
        model: body.model,
    };

    match state.generator.generate(&body.prompt, &options).await {
        Ok(response) => Json(json!({ "response": response })).into_response(),
        Err(err) => {
            error!("Passthrough generation failed: {}", err);
            error_response(err).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsRequest {
    #[serde(flatten)]
    pub profile: Profile,
    #[serde(default)]
    pub previous_answers: ResponseSet,
}

/// POST /api/questions: the questionnaire engine; always succeeds visibly
pub async fn questions_handler(
    State(state): State<AppState>,
    Json(body): Json<QuestionsRequest>,
) -> impl IntoResponse {
    let generated = state
        .questionnaire
        .generate(&body.profile, &body.previous_answers)
        .await;

    Json(json!({
        "questions": generated.value,
        "source": generated.source,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(flatten)]
    pub form: StyleForm,
    /// Bypass the memo cache and overwrite its entry
    #[serde(default)]
    pub regenerate: bool,
}

/// POST /api/report: report engine behind the explicit memo cache
pub async fn report_handler(
    State(state): State<AppState>,
    Json(body): Json<ReportRequest>,
) -> impl IntoResponse {
    if !body.regenerate {
        if let Some(cached) = state.cache.get(&body.form).await {
            return Json(json!({
                "report": cached.value,
                "source": cached.source,
                "cached": true,
            }));
        }
    }

    let generated = state.report.generate(&body.form).await;
    state.cache.put(&body.form, generated.clone()).await;

    Json(json!({
        "report": generated.value,
        "source": generated.source,
        "cached": false,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    pub report: OutfitReport,
    pub profile: Profile,
}

/// POST /api/generate-image: the one route where failure is user-visible.
/// No placeholder is fabricated; exhaustion returns an explicit error.
pub async fn generate_image_handler(
    State(state): State<AppState>,
    Json(body): Json<ImageRequest>,
) -> impl IntoResponse {
    match state.synthesizer.synthesize(&body.report, &body.profile).await {
        Ok(image) => Json(json!({
            "success": true,
            "imageUrl": image.url,
            "service": image.service.label(),
            "fallbackUrl": image.fallback_url,
        }))
        .into_response(),
        Err(err) => {
            error!("Image synthesis chain exhausted: {}", err);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "success": false,
                    "error": "All image generation services failed",
                })),
            )
                .into_response()
        }
    }
}

/// Build the full router with CORS, metrics, and optional bearer auth
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/generate", post(generate_handler))
        .route("/api/questions", post(questions_handler))
        .route("/api/report", post(report_handler))
        .route("/api/generate-image", post(generate_image_handler))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            |State(metrics): State<Arc<Mutex<HttpMetrics>>>,
             req: axum::http::Request<Body>,
             next: axum::middleware::Next| async move {
                let is_api = req.uri().path().starts_with("/api/");
                let route = req.uri().path().to_string();
                let start = if is_api {
                    Some(std::time::Instant::now())
                } else {
                    None
                };
                let resp = next.run(req).await;
                if let Some(start_time) = start {
                    let latency_ms = start_time.elapsed().as_millis() as f64;
                    let mut m = metrics.lock().await;
                    if latency_ms > 0.0 {
                        m.latencies.push(latency_ms);
                        if m.latencies.len() > 256 {
                            m.latencies.remove(0);
                        }
                    }
                    if !resp.status().is_success() {
                        m.errors_total = m.errors_total.saturating_add(1);
                    }
                    m.total_requests = m.total_requests.saturating_add(1);
                    *m.routes_count.entry(route).or_insert(0) += 1;
                    m.last_request_unix = std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .unwrap_or_default()
                        .as_secs();
                }
                resp
            },
        ))
        // Bearer auth layer; when no token is configured the API is open
        .layer(middleware::from_fn_with_state(
            state.config.runtime.bearer_token.clone(),
            |State(token): State<Option<String>>,
             req: axum::http::Request<Body>,
             next: axum::middleware::Next| async move {
                // Allow /health without auth
                if req.uri().path() == "/health" {
                    return next.run(req).await;
                }
                let expected = match token {
                    Some(t) => t,
                    None => return next.run(req).await,
                };
                let headers: &HeaderMap = req.headers();
                let header_ok = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|h| h.to_str().ok())
                    .map(|v| v == format!("Bearer {}", expected))
                    .unwrap_or(false);
                if !header_ok {
                    return (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"error": {"code": 401, "message": "Unauthorized"}})),
                    )
                        .into_response();
                }
                next.run(req).await
            },
        ))
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(state: AppState) -> crate::error::Result<()> {
    let bind = state.config.runtime.http_bind;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| OotdError::Internal {
            message: format!("Failed to bind HTTP listener: {}", e),
        })?;

    tracing::info!("Starting HTTP server on {}", bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| OotdError::Internal {
            message: format!("HTTP server error: {}", e),
        })?;

    Ok(())
}
