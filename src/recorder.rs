//! Outcome recording
//!
//! The pipeline emits exactly one [`OutcomeRecord`] per input item (and per
//! skipped row) through the [`OutcomeRecorder`] trait and awaits each call
//! before the item counts as finished.

use crate::db::Database;
use crate::error::Result;
use crate::types::OutcomeRecord;
use async_trait::async_trait;
use std::sync::Mutex;

/// Sink for outcome records
#[async_trait]
pub trait OutcomeRecorder: Send + Sync {
    /// Durably store one record
    async fn record(&self, record: &OutcomeRecord) -> Result<()>;
}

#[async_trait]
impl OutcomeRecorder for Database {
    async fn record(&self, record: &OutcomeRecord) -> Result<()> {
        self.insert_outcome(record).await.map(|_| ())
    }
}

/// Keeps records in memory, in emission order
///
/// Useful when embedding the pipeline without a database, and in tests.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    records: Mutex<Vec<OutcomeRecord>>,
}

impl MemoryRecorder {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record received so far
    pub fn records(&self) -> Vec<OutcomeRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl OutcomeRecorder for MemoryRecorder {
    async fn record(&self, record: &OutcomeRecord) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record.clone());
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InputItem, SessionId, Stage};
    use std::time::Duration;

    fn failed(identifier: &str) -> OutcomeRecord {
        let item = InputItem::new(identifier, "http://img.test/x.png").unwrap();
        OutcomeRecord::failed(
            SessionId::new(),
            &item,
            None,
            Stage::Fetch,
            "HTTP status 500",
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn memory_recorder_keeps_emission_order() {
        let recorder = MemoryRecorder::new();
        recorder.record(&failed("B")).await.unwrap();
        recorder.record(&failed("A")).await.unwrap();

        let ids: Vec<_> = recorder
            .records()
            .into_iter()
            .map(|r| r.identifier)
            .collect();
        assert_eq!(ids, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn database_recorder_persists_records() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let db = Database::new(temp_file.path()).await.unwrap();

        let record = failed("A002");
        OutcomeRecorder::record(&db, &record).await.unwrap();

        let summary = db
            .session_summary(&record.session_id.to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.failed, 1);

        db.close().await;
    }
}
