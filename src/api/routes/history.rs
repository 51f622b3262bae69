//! Outcome log handlers.

use super::{HistoryPage, HistoryQuery};
use crate::api::AppState;
use crate::db::OutcomeQuery;
use crate::error::{ApiError, Error};
use crate::types::OutcomeStatus;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// GET /upload-history - Query the outcome log (with pagination)
#[utoipa::path(
    get,
    path = "/api/upload-history",
    tag = "history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Outcome records, newest first", body = HistoryPage),
        (status = 400, description = "Invalid status filter", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn get_upload_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(100).clamp(1, 1000) as usize;
    let offset = query.offset.unwrap_or(0).max(0) as usize;

    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(s) => match s.parse::<OutcomeStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiError::new(
                        "invalid_status",
                        "Invalid status filter. Must be 'success', 'failed' or 'skipped'",
                    )),
                )
                    .into_response();
            }
        },
    };

    let filter = OutcomeQuery {
        session_id: query.session.filter(|s| !s.is_empty()),
        identifier: query.identifier.filter(|s| !s.is_empty()),
        status,
        limit,
        offset,
    };

    let items = match state.db.query_outcomes(&filter).await {
        Ok(items) => items,
        Err(e) => {
            tracing::error!(error = %e, "failed to query upload history");
            return e.into_response();
        }
    };

    match state.db.count_outcomes(&filter).await {
        Ok(total) => (
            StatusCode::OK,
            Json(HistoryPage {
                items,
                total,
                limit,
                offset,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to count upload history");
            e.into_response()
        }
    }
}

/// GET /sessions/:id/summary - Per-status counts for one session
#[utoipa::path(
    get,
    path = "/api/sessions/{id}/summary",
    tag = "history",
    params(
        ("id" = String, Path, description = "Session id")
    ),
    responses(
        (status = 200, description = "Session summary", body = crate::types::SessionSummary),
        (status = 404, description = "No records for this session", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn get_session_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.db.session_summary(&id).await {
        Ok(Some(summary)) => (StatusCode::OK, Json(summary)).into_response(),
        Ok(None) => Error::NotFound(format!("session {}", id)).into_response(),
        Err(e) => e.into_response(),
    }
}
