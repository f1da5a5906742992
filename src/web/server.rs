use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::pipeline::Pipeline;

use super::api::backlog as backlog_handlers;
use super::api::tracker as tracker_handlers;
use super::api_doc::ApiDoc;
use super::auth::AppState;
use super::config::Config;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Tracker API endpoints
        .route("/api/tracker/start", post(tracker_handlers::start))
        .route("/api/tracker/stop", post(tracker_handlers::stop))
        .route("/api/tracker/status", get(tracker_handlers::status))
        .route("/api/tracker/intervals", get(tracker_handlers::intervals))
        .route("/api/tracker/interval", put(tracker_handlers::set_interval))
        // Backlog API endpoints
        .route("/api/backlog", get(backlog_handlers::list))
        .route("/api/backlog/flush", post(backlog_handlers::flush))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config, pipeline: Pipeline) -> std::io::Result<()> {
    let bind_addr = config.web.bind.clone();
    let autostart = config.tracker.autostart;

    let state = AppState {
        config: Arc::new(config),
        tracker: Arc::new(Mutex::new(pipeline.tracker)),
        coordinator: pipeline.coordinator,
    };

    if autostart {
        let mut tracker = state.tracker.lock().await;
        let interval = tracker.config().interval;
        if let Err(e) = tracker.start(interval).await {
            log::error!("Autostart failed: {}", e);
        }
    }

    let app = router(state.clone());

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.tracker.lock().await.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown requested");
}
