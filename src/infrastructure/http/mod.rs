use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::domain::auth::JwtManager;
use crate::infrastructure::config::Config;
use crate::infrastructure::db::DbPool;
use crate::{
    controllers::{health, narration::NarrationController},
    infrastructure::auth::{auth_middleware, optional_auth_middleware, request_id_middleware},
};

/// Assemble every route with its auth layer
pub fn build_router(
    pool: Option<Arc<DbPool>>,
    jwt_manager: Arc<JwtManager>,
    narration_controller: Arc<NarrationController>,
) -> Router {
    // Anonymous callers narrate into the shared cache scope
    let public_narration_routes = Router::new()
        .route("/stream_audio", post(NarrationController::stream_audio))
        .route("/tts-options", get(NarrationController::tts_options))
        .with_state(narration_controller.clone())
        .layer(middleware::from_fn_with_state(
            jwt_manager.clone(),
            optional_auth_middleware,
        ));

    // Stored stories belong to a user
    let download_routes = Router::new()
        .route("/download_audio", get(NarrationController::download_audio))
        .with_state(narration_controller)
        .layer(middleware::from_fn_with_state(jwt_manager, auth_middleware));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(pool)
        .merge(public_narration_routes)
        .merge(download_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server with all routes configured
pub async fn start_http_server(
    config: &Config,
    app: Router,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
