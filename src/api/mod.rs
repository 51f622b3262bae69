//! REST API server module
//!
//! Exposes the image pipeline over HTTP: a multipart CSV upload that answers
//! with the ZIP archive, plus read access to the outcome log.

use crate::error::ApiError;
use crate::{Error, Result};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Upload
/// - `POST /api/upload-csv` - Process a CSV upload, respond with the ZIP archive
///
/// ## History
/// - `GET /api/upload-history` - Outcome records (filters and pagination)
/// - `GET /api/sessions/:id/summary` - Per-status counts for one session
///
/// ## System
/// - `GET /api/health` - Health check
/// - `GET /api/openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
///
/// Any other path answers with a JSON 404.
pub fn create_router(state: AppState) -> Router {
    let api_config = state.config.server.api.clone();

    let api = Router::new()
        .route(
            "/upload-csv",
            post(routes::upload_csv).layer(DefaultBodyLimit::max(api_config.max_upload_bytes)),
        )
        .route("/upload-history", get(routes::get_upload_history))
        .route("/sessions/:id/summary", get(routes::get_session_summary))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec));

    let router = Router::new().nest("/api", api);

    // Swagger UI serves its own copy of the document so it can't collide with /api/openapi.json
    let router = if api_config.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if api_config.cors_enabled {
        router.layer(build_cors_layer(&api_config.cors_origins))
    } else {
        router
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ApiError::not_found("route")))
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin; otherwise only the listed
/// origins are allowed. All methods and headers are allowed.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    let layer = if allow_any || origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(allowed))
    };

    layer
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            axum::http::header::CONTENT_DISPOSITION,
            axum::http::HeaderName::from_static(routes::SESSION_HEADER),
            axum::http::HeaderName::from_static(routes::PROCESSED_COUNT_HEADER),
            axum::http::HeaderName::from_static(routes::TOTAL_COUNT_HEADER),
        ])
}

/// Start the API server on the configured bind address.
///
/// Runs until `shutdown` resolves; in-flight requests are allowed to finish.
///
/// # Example
///
/// ```no_run
/// use csv_image_dl::{Config, Database, ImagePipeline, api::{AppState, start_api_server}};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let db = Arc::new(Database::new(&config.persistence.database_path).await?);
/// let pipeline = Arc::new(ImagePipeline::new(&config, db.clone())?);
///
/// let state = AppState::new(pipeline, db, config);
/// start_api_server(state, async {
///     let _ = tokio::signal::ctrl_c().await;
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server<F>(state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = state.config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(state);

    let listener = TcpListener::bind(bind_address).await.map_err(Error::Io)?;

    tracing::info!(
        address = %listener.local_addr().unwrap_or(bind_address),
        "API server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
