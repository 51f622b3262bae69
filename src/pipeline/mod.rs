//! Bounded-concurrency image pipeline.
//!
//! [`ImagePipeline`] drives an input list through fetch → transcode → name
//! resolution → write, at most `max_concurrent` items at a time, and packages
//! the survivors into a ZIP archive. Submodules:
//! - [`worker`] - Processing of a single item and its outcome record
//!
//! ## Session lifecycle
//!
//! Every call to [`ImagePipeline::process_items`] or
//! [`ImagePipeline::process_csv_upload`] is one session: a workspace is
//! created, the items are processed, the archive is built, and the workspace
//! (plus the uploaded input file) is removed exactly once, whatever the
//! result. The session runs on its own task, so this also holds when the
//! caller drops the future. Errors leaving a session carry its id, see
//! [`Error::in_session`].

mod worker;


use crate::archive::build_archive;
use crate::config::{Config, PipelineConfig};
use crate::error::{Error, Result};
use crate::fetcher::{HttpFetcher, ImageFetcher};
use crate::intake;
use crate::naming::NameResolver;
use crate::recorder::OutcomeRecorder;
use crate::transcode::Transcoder;
use crate::types::{
    InputItem, OUTPUT_EXTENSION, OutcomeRecord, ParsedInput, ProcessedItem, ProcessingSession,
    SessionArchive, SessionId, Stage,
};
use crate::workspace::WorkspaceManager;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use worker::ItemTaskContext;

/// The image pipeline
///
/// Cheap to clone; clones share the concurrency limit, so concurrent sessions
/// on one pipeline together never exceed `max_concurrent` in-flight items.
#[derive(Clone)]
pub struct ImagePipeline {
    config: Arc<PipelineConfig>,
    fetcher: Arc<dyn ImageFetcher>,
    transcoder: Transcoder,
    recorder: Arc<dyn OutcomeRecorder>,
    workspace: WorkspaceManager,
    /// Bounded admission for item tasks (one permit per in-flight item)
    concurrent_limit: Arc<Semaphore>,
}

impl ImagePipeline {
    /// Create a pipeline that fetches over HTTP
    pub fn new(config: &Config, recorder: Arc<dyn OutcomeRecorder>) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.pipeline)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher), recorder))
    }

    /// Create a pipeline with a custom fetcher
    pub fn with_fetcher(
        config: &Config,
        fetcher: Arc<dyn ImageFetcher>,
        recorder: Arc<dyn OutcomeRecorder>,
    ) -> Self {
        let max_concurrent = config.pipeline.max_concurrent.max(1);

        Self {
            config: Arc::new(config.pipeline.clone()),
            fetcher,
            transcoder: Transcoder::new(config.pipeline.jpeg_quality),
            recorder,
            workspace: WorkspaceManager::new(config.workspace.temp_dir.clone()),
            concurrent_limit: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Run one session over an already-parsed input list
    ///
    /// Dropping the returned future does not cancel the session; it runs to
    /// completion and cleans up in the background.
    pub async fn process_items(&self, input: ParsedInput) -> Result<SessionArchive> {
        let pipeline = self.clone();
        spawn_session(async move {
            let session = pipeline.begin_session(None).await?;
            let result = pipeline.run_session(&session, input).await;
            pipeline.finish_session(&session, result).await
        })
        .await
    }

    /// Run one session over an uploaded CSV file
    ///
    /// The session takes ownership of `input_file`: it is removed together with
    /// the workspace, on success, on failure, and when the caller stops waiting.
    pub async fn process_csv_upload(&self, input_file: PathBuf) -> Result<SessionArchive> {
        let pipeline = self.clone();
        spawn_session(async move {
            let session = pipeline.begin_session(Some(input_file)).await?;

            let result = async {
                let path = session
                    .input_file_path
                    .as_deref()
                    .ok_or_else(|| Error::Other("session has no input file".to_string()))?;
                let input = intake::parse_csv_file(path).await?;
                pipeline.run_session(&session, input).await
            }
            .await;

            pipeline.finish_session(&session, result).await
        })
        .await
    }

    /// Process `items` under the concurrency limit
    ///
    /// Items are admitted in input order; each failure is recorded and isolated
    /// from its siblings. Returns the successful items, in completion order,
    /// once every item has finished and recorded its outcome.
    pub async fn run_items(
        &self,
        session: &ProcessingSession,
        items: Vec<InputItem>,
    ) -> Vec<ProcessedItem> {
        let ctx = Arc::new(ItemTaskContext {
            session_id: session.session_id,
            fetcher: Arc::clone(&self.fetcher),
            transcoder: self.transcoder,
            resolver: NameResolver::new(&session.workspace_path, OUTPUT_EXTENSION),
            recorder: Arc::clone(&self.recorder),
        });

        let mut tasks = JoinSet::new();

        for item in items {
            // Blocks while max_concurrent items are in flight
            let permit = match Arc::clone(&self.concurrent_limit).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    let record = OutcomeRecord::failed(
                        session.session_id,
                        &item,
                        None,
                        Stage::Worker,
                        "concurrency limiter closed",
                        std::time::Duration::ZERO,
                    );
                    record_outcome(self.recorder.as_ref(), &record).await;
                    continue;
                }
            };

            let ctx = Arc::clone(&ctx);
            tasks.spawn(async move {
                let _permit = permit;
                let started = Instant::now();

                // Inner task so a panic while processing still yields a record
                match tokio::spawn(worker::run_item(Arc::clone(&ctx), item.clone())).await {
                    Ok(processed) => processed,
                    Err(e) => {
                        error!(
                            session_id = %ctx.session_id,
                            identifier = %item.identifier,
                            error = %e,
                            "item task failed"
                        );
                        let record = OutcomeRecord::failed(
                            ctx.session_id,
                            &item,
                            None,
                            Stage::Worker,
                            format!("worker task failed: {}", e),
                            started.elapsed(),
                        );
                        record_outcome(ctx.recorder.as_ref(), &record).await;
                        None
                    }
                }
            });
        }

        let mut processed = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(item)) => processed.push(item),
                Ok(None) => {}
                Err(e) => error!(session_id = %session.session_id, error = %e, "item supervisor failed"),
            }
        }

        processed
    }

    async fn begin_session(&self, input_file: Option<PathBuf>) -> Result<ProcessingSession> {
        let session_id = SessionId::new();

        match self.workspace.create(session_id, input_file.clone()).await {
            Ok(session) => Ok(session),
            Err(e) => {
                // The session never existed, but it already owned the upload
                if let Some(input) = input_file {
                    if let Err(remove_err) = tokio::fs::remove_file(&input).await {
                        warn!(?input, error = %remove_err, "failed to remove input file");
                    }
                }
                Err(e.in_session(session_id))
            }
        }
    }

    async fn finish_session(
        &self,
        session: &ProcessingSession,
        result: Result<SessionArchive>,
    ) -> Result<SessionArchive> {
        self.workspace.destroy(session).await;

        match result {
            Ok(archive) => {
                info!(
                    session_id = %session.session_id,
                    processed = archive.processed,
                    total = archive.total,
                    bytes = archive.bytes.len(),
                    "session complete"
                );
                Ok(archive)
            }
            Err(e) => {
                warn!(session_id = %session.session_id, error = %e, "session failed");
                Err(e.in_session(session.session_id))
            }
        }
    }

    async fn run_session(
        &self,
        session: &ProcessingSession,
        input: ParsedInput,
    ) -> Result<SessionArchive> {
        let session_id = session.session_id;

        info!(
            session_id = %session_id,
            items = input.items.len(),
            skipped = input.skipped.len(),
            max_concurrent = self.config.max_concurrent,
            "starting session"
        );

        for row in &input.skipped {
            record_outcome(
                self.recorder.as_ref(),
                &OutcomeRecord::skipped(session_id, row),
            )
            .await;
        }

        if input.items.is_empty() {
            return Err(Error::NoImagesProcessed);
        }

        let total = input.items.len();
        let processed = self.run_items(session, input.items).await;

        if processed.is_empty() {
            return Err(Error::NoImagesProcessed);
        }

        let count = processed.len();
        let bytes = tokio::task::spawn_blocking(move || build_archive(&processed))
            .await
            .map_err(|e| Error::Other(format!("archive task failed: {}", e)))??;

        Ok(SessionArchive {
            session_id,
            filename: SessionArchive::filename_for(session_id),
            bytes,
            processed: count,
            total,
        })
    }
}

/// Run a whole session (begin through finish) on its own task
///
/// The session owns its workspace; it must reach `finish_session` even if the
/// caller's future is dropped.
async fn spawn_session<F>(session: F) -> Result<SessionArchive>
where
    F: Future<Output = Result<SessionArchive>> + Send + 'static,
{
    tokio::spawn(session)
        .await
        .map_err(|e| Error::Other(format!("session task failed: {}", e)))?
}

/// Hand a record to the recorder, logging (not propagating) failures
pub(crate) async fn record_outcome(recorder: &dyn OutcomeRecorder, record: &OutcomeRecord) {
    if let Err(e) = recorder.record(record).await {
        error!(
            session_id = %record.session_id,
            identifier = %record.identifier,
            status = %record.status,
            error = %e,
            "failed to record outcome"
        );
    }
}
