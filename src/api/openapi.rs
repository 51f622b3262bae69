//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the csv-image-dl REST API
//! using utoipa for compile-time document generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the csv-image-dl REST API
///
/// The document can be accessed via:
/// - `/api/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "csv-image-dl REST API",
        version = "0.1.0",
        description = "Upload a CSV of identifier/URL pairs and receive the images as a ZIP of JPEGs; query the per-item outcome log",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    paths(
        // Upload
        crate::api::routes::upload_csv,

        // History
        crate::api::routes::get_upload_history,
        crate::api::routes::get_session_summary,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::OutcomeStatus,
        crate::types::Stage,
        crate::types::OutcomeEntry,
        crate::types::SessionSummary,

        // API request/response types from routes
        crate::api::routes::UploadForm,
        crate::api::routes::HistoryPage,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "upload", description = "CSV upload - Fetch, convert and package the listed images"),
        (name = "history", description = "Outcome log - Per-item records and per-session summaries"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec"),
    )
)]
pub struct ApiDoc;
