//! Database layer for csv-image-dl
//!
//! Handles SQLite persistence for the per-item outcome log.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`outcomes`] - Outcome log writes, queries and per-session summaries

use crate::types::{OutcomeEntry, OutcomeStatus, Stage};
use sqlx::{FromRow, sqlite::SqlitePool};

mod migrations;
mod outcomes;

/// Filters and pagination for outcome log queries
#[derive(Debug, Clone, Default)]
pub struct OutcomeQuery {
    /// Only records of this session
    pub session_id: Option<String>,
    /// Only records with this identifier
    pub identifier: Option<String>,
    /// Only records with this status
    pub status: Option<OutcomeStatus>,
    /// Maximum number of records returned
    pub limit: usize,
    /// Number of records skipped (newest first)
    pub offset: usize,
}

/// Outcome record from database
#[derive(Debug, Clone, FromRow)]
pub struct OutcomeRow {
    /// Unique database ID
    pub id: i64,
    /// Session UUID
    pub session_id: String,
    /// Item identifier
    pub identifier: String,
    /// Source URL
    pub source_url: String,
    /// Resolved (or default) output filename
    pub output_filename: String,
    /// Status string (success, failed, skipped)
    pub status: String,
    /// Stage string for failed items
    pub failed_stage: Option<String>,
    /// Failure or skip reason
    pub error_message: Option<String>,
    /// Output size in bytes (success only)
    pub size_bytes: Option<i64>,
    /// Processing time in milliseconds
    pub processing_time_ms: i64,
    /// Unix timestamp when the record was stored
    pub created_at: i64,
}

impl From<OutcomeRow> for OutcomeEntry {
    fn from(row: OutcomeRow) -> Self {
        use chrono::{TimeZone, Utc};

        OutcomeEntry {
            id: row.id,
            session_id: row.session_id,
            identifier: row.identifier,
            source_url: row.source_url,
            output_filename: row.output_filename,
            status: row.status.parse().unwrap_or(OutcomeStatus::Failed),
            failed_stage: row.failed_stage.as_deref().and_then(Stage::parse),
            error_message: row.error_message,
            size_bytes: row.size_bytes.map(|s| s as u64),
            processing_time_ms: row.processing_time_ms as u64,
            created_at: Utc
                .timestamp_opt(row.created_at, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }
}

/// Database handle for csv-image-dl
pub struct Database {
    pool: SqlitePool,
}
