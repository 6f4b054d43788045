pub mod config;
pub mod error;
pub mod generate;
pub mod generator;
pub mod html;
pub mod rate_limit;
pub mod stories;
pub mod validate;

use anyhow::Result;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::handler::HandlerWithoutStateExt;
use axum::http::{header, HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use config::Settings;
use error::ApiError;
use generator::Generator;
use parking_lot::RwLock;
use rate_limit::{limit_by_ip, GenerationLimiter};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use story_core::StoryStore;
use time::format_description::well_known::Rfc3339;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub type SharedStore = Arc<RwLock<StoryStore>>;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub generator: Arc<dyn Generator>,
    pub settings: Arc<Settings>,
    pub started: Instant,
}

impl AppState {
    pub fn new(settings: Settings, generator: Arc<dyn Generator>) -> Self {
        Self { store: Arc::new(RwLock::new(StoryStore::new())), generator, settings: Arc::new(settings), started: Instant::now() }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime: u64,
    pub environment: String,
}

pub fn build_app(state: AppState) -> Result<Router> {
    let settings = state.settings.clone();
    let limiter = GenerationLimiter::new(settings.rate_limit_max, settings.rate_limit_window_ms, settings.trust_proxy);

    let generation = Router::new()
        .route("/generate", post(generate::generate_image))
        .route("/generate/code", post(generate::generate_code))
        .route("/stories", post(stories::create_story))
        .route_layer(middleware::from_fn_with_state(limiter, limit_by_ip));

    let app = Router::new()
        .route("/health", get(health))
        .route("/stories", get(stories::list_stories))
        .route("/stories/search", get(stories::search_stories))
        .route("/stories/:id", get(stories::get_story))
        .route("/stories/:id/like", post(stories::like_story))
        .merge(generation)
        .with_state(state);

    let app = match &settings.public_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir).not_found_service(not_found.into_service())),
        None => app.fallback(not_found),
    };

    Ok(app
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(middleware::from_fn(security_headers))
        .layer(cors_layer(&settings.cors_origins)?)
        .layer(TraceLayer::new_for_http()))
}

/// `*` allows any origin without credentials; otherwise only the listed origins, with credentials.
fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    if origins.iter().any(|o| o == "*") {
        return Ok(CorsLayer::new().allow_origin(Any).allow_methods(methods).allow_headers(Any));
    }
    let origins = origins.iter().map(|o| o.parse::<HeaderValue>()).collect::<Result<Vec<_>, _>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true))
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
    headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.insert(header::STRICT_TRANSPORT_SECURITY, HeaderValue::from_static("max-age=15552000; includeSubDomains"));
    response
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        uptime: state.started.elapsed().as_secs(),
        environment: state.settings.environment.clone(),
    })
}

async fn not_found() -> Response {
    ApiError::not_found("Page not found! 🔍", "This endpoint doesn't exist. Try using /generate for creating AI art!")
        .into_response()
}
