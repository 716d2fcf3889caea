//! API route definitions

use axum::middleware;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::api_key::api_key_middleware;
use super::api_key::ApiKeyState;
use super::handlers::AppState;
use super::handlers::{
    self,
};

/// Job endpoints; these sit behind the API key when one is configured
fn job_routes(state: AppState) -> Router {
    let api_key = state
        .config
        .api
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty());

    let router = Router::new()
        .route("/research", post(handlers::create_research))
        .route("/status/:job_id", get(handlers::get_status))
        .route("/jobs", get(handlers::list_jobs))
        .route("/jobs/:job_id", delete(handlers::delete_job))
        .with_state(state);

    match api_key {
        Some(expected_key) => {
            info!("🔒 API key required for job endpoints");
            router.layer(middleware::from_fn_with_state(
                ApiKeyState { expected_key },
                api_key_middleware,
            ))
        }
        None => router,
    }
}

/// Full application router
pub fn app(state: AppState, enable_cors: bool) -> Router {
    let reports = ServeDir::new(state.pipeline.reports().reports_dir());

    let public = Router::new()
        .route("/", get(handlers::index))
        .route("/api", get(handlers::api_info))
        .route("/health", get(handlers::health))
        .with_state(state.clone());

    let mut app = Router::new()
        .merge(public)
        .merge(job_routes(state))
        .nest_service("/reports", reports)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if enable_cors {
        info!("✅ CORS enabled");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}
