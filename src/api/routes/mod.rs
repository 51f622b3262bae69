//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`upload`] - CSV upload, returns the image archive
//! - [`history`] - Outcome log queries and per-session summaries
//! - [`system`] - Health, OpenAPI

use serde::{Deserialize, Serialize};

mod history;
mod system;
mod upload;

pub use history::*;
pub use system::*;
pub use upload::*;

/// Multipart field carrying the uploaded CSV file
pub const UPLOAD_FIELD: &str = "csvFile";

/// Response header: session id of the upload
pub const SESSION_HEADER: &str = "x-upload-session";

/// Response header: number of images in the archive
pub const PROCESSED_COUNT_HEADER: &str = "x-processed-count";

/// Response header: number of input items
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Query parameters for GET /upload-history
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Only records of this session
    pub session: Option<String>,
    /// Only records with this identifier
    pub identifier: Option<String>,
    /// Filter by status: "success", "failed" or "skipped"
    pub status: Option<String>,
    /// Maximum number of items to return (default: 100)
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0)
    pub offset: Option<i64>,
}

/// Page of outcome records returned by GET /upload-history
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HistoryPage {
    /// Records, newest first
    pub items: Vec<crate::types::OutcomeEntry>,
    /// Number of records matching the filters
    pub total: i64,
    /// Page size in effect
    pub limit: usize,
    /// Offset in effect
    pub offset: usize,
}
