//! HTTP server implementation

use std::sync::Arc;

use tracing::info;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::config::AppConfig;
use crate::pipeline::ResearchPipeline;
use crate::store::JobStore;
use crate::store::ResultCache;
use crate::Result;

/// Wire the shared stores and the pipeline once for the process
pub async fn build_state(config: Arc<AppConfig>) -> Result<AppState> {
    let jobs = Arc::new(JobStore::connect(&config).await);
    let cache = Arc::new(ResultCache::connect(&config).await);

    let pipeline = Arc::new(ResearchPipeline::from_config(config.clone(), cache.clone()).await?);

    Ok(AppState {
        config,
        jobs,
        cache,
        pipeline,
    })
}

/// Start the API server
pub async fn serve_api(config: AppConfig, host: String, port: u16, enable_cors: bool) -> Result<()> {
    info!("🚀 Starting Content Research API server...");

    let state = build_state(Arc::new(config)).await?;
    tokio::fs::create_dir_all(state.pipeline.reports().reports_dir()).await?;

    info!("🗄️ Job store backend: {}", state.jobs.backend_name());
    info!("🗄️ Cache backend: {}", state.cache.backend_name());
    info!("🧮 Vector store backend: {}", state.pipeline.documents().backend_name());

    let app = routes::app(state, enable_cors);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 API server listening on http://{}", addr);
    info!("");
    info!("Available endpoints:");
    info!("  GET    /                  - Web UI");
    info!("  GET    /api               - API info");
    info!("  GET    /health            - Health check");
    info!("  POST   /research          - Start a research job");
    info!("  GET    /status/:job_id    - Job status");
    info!("  GET    /jobs              - List jobs");
    info!("  DELETE /jobs/:job_id      - Delete a finished job");
    info!("  GET    /reports/:id.html  - Generated reports");

    axum::serve(listener, app).await?;

    Ok(())
}
