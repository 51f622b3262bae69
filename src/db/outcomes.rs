//! Outcome log operations.

use crate::types::{OutcomeEntry, OutcomeRecord, SessionSummary};
use crate::{Error, Result};

use super::{Database, OutcomeQuery, OutcomeRow};

impl Database {
    /// Append one outcome record to the log
    pub async fn insert_outcome(&self, record: &OutcomeRecord) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO outcomes (
                session_id, identifier, source_url, output_filename, status,
                failed_stage, error_message, size_bytes, processing_time_ms, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.session_id.to_string())
        .bind(&record.identifier)
        .bind(&record.source_url)
        .bind(&record.output_filename)
        .bind(record.status.as_str())
        .bind(record.failed_stage.map(|s| s.as_str()))
        .bind(&record.error_message)
        .bind(record.size_bytes.map(|s| s as i64))
        .bind(record.processing_time_ms as i64)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(result.last_insert_rowid())
    }

    /// Query the outcome log with optional filters
    ///
    /// Returns records newest first. Each filter left as `None` matches everything.
    pub async fn query_outcomes(&self, query: &OutcomeQuery) -> Result<Vec<OutcomeEntry>> {
        let status = query.status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, OutcomeRow>(
            r#"
            SELECT id, session_id, identifier, source_url, output_filename, status,
                   failed_stage, error_message, size_bytes, processing_time_ms, created_at
            FROM outcomes
            WHERE (? IS NULL OR session_id = ?)
              AND (? IS NULL OR identifier = ?)
              AND (? IS NULL OR status = ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(&query.session_id)
        .bind(&query.session_id)
        .bind(&query.identifier)
        .bind(&query.identifier)
        .bind(status)
        .bind(status)
        .bind(query.limit as i64)
        .bind(query.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(rows.into_iter().map(OutcomeEntry::from).collect())
    }

    /// Count records matching the filters of `query` (pagination is ignored)
    pub async fn count_outcomes(&self, query: &OutcomeQuery) -> Result<i64> {
        let status = query.status.map(|s| s.as_str());

        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM outcomes
            WHERE (? IS NULL OR session_id = ?)
              AND (? IS NULL OR identifier = ?)
              AND (? IS NULL OR status = ?)
            "#,
        )
        .bind(&query.session_id)
        .bind(&query.session_id)
        .bind(&query.identifier)
        .bind(&query.identifier)
        .bind(status)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(count)
    }

    /// Per-status counts for one session
    ///
    /// Returns `None` when the session has no records at all.
    pub async fn session_summary(&self, session_id: &str) -> Result<Option<SessionSummary>> {
        let (total, succeeded, failed, skipped, total_bytes) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
                r#"
                SELECT
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN status = 'success' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'skipped' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'success' THEN size_bytes ELSE 0 END), 0)
                FROM outcomes
                WHERE session_id = ?
                "#,
            )
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        if total == 0 {
            return Ok(None);
        }

        Ok(Some(SessionSummary {
            session_id: session_id.to_string(),
            total: total as u64,
            succeeded: succeeded as u64,
            failed: failed as u64,
            skipped: skipped as u64,
            total_bytes: total_bytes as u64,
        }))
    }
}
