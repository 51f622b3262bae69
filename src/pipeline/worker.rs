//! Processing of a single input item.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::ItemError;
use crate::fetcher::{ImageFetcher, validate_url};
use crate::naming::NameResolver;
use crate::recorder::OutcomeRecorder;
use crate::transcode::{Transcoder, write_atomic};
use crate::types::{InputItem, OutcomeRecord, ProcessedItem, SessionId};

use super::record_outcome;

/// Everything an item task needs, shared by all items of one session
pub(crate) struct ItemTaskContext {
    pub(crate) session_id: SessionId,
    pub(crate) fetcher: Arc<dyn ImageFetcher>,
    pub(crate) transcoder: Transcoder,
    /// One resolver per session workspace; serializes name allocation
    pub(crate) resolver: NameResolver,
    pub(crate) recorder: Arc<dyn OutcomeRecorder>,
}

/// Process one item and record its outcome
///
/// Returns the processed item on success. Every failure is converted into a
/// failed outcome record; nothing propagates to sibling items.
pub(crate) async fn run_item(ctx: Arc<ItemTaskContext>, item: InputItem) -> Option<ProcessedItem> {
    let started = Instant::now();
    let mut resolved_name = None;

    let result = process_item(&ctx, &item, &mut resolved_name).await;

    let (record, processed) = match result {
        Ok(processed) => {
            info!(
                session_id = %ctx.session_id,
                identifier = %item.identifier,
                filename = %processed.output_filename,
                size_bytes = processed.size_bytes,
                "item processed"
            );
            (
                OutcomeRecord::success(ctx.session_id, &item, &processed, started.elapsed()),
                Some(processed),
            )
        }
        Err(e) => {
            let stage = e.stage();
            warn!(
                session_id = %ctx.session_id,
                identifier = %item.identifier,
                url = %item.source_url,
                stage = stage.as_str(),
                error = %e,
                "item failed"
            );
            (
                OutcomeRecord::failed(
                    ctx.session_id,
                    &item,
                    resolved_name,
                    stage,
                    e.to_string(),
                    started.elapsed(),
                ),
                None,
            )
        }
    };

    // The item is finished only once its record is stored
    record_outcome(ctx.recorder.as_ref(), &record).await;

    processed
}

/// validate → fetch → transcode → resolve → write → stat
async fn process_item(
    ctx: &ItemTaskContext,
    item: &InputItem,
    resolved_name: &mut Option<String>,
) -> Result<ProcessedItem, ItemError> {
    let url = validate_url(&item.source_url)?;

    let data = ctx.fetcher.fetch(&url).await?;
    debug!(identifier = %item.identifier, bytes = data.len(), "transcoding");

    let jpeg = ctx.transcoder.transcode(data).await?;

    // Resolve only after a successful encode so failures don't consume names
    let name = ctx.resolver.resolve(&item.identifier).await?;
    *resolved_name = Some(name.filename.clone());

    if let Err(e) = write_atomic(&name.path, &jpeg).await {
        ctx.resolver.release(&name.filename).await;
        return Err(e);
    }

    let size_bytes = tokio::fs::metadata(&name.path)
        .await
        .map_err(|e| ItemError::Encode {
            path: Some(name.path.clone()),
            reason: format!("failed to stat output file: {}", e),
        })?
        .len();

    Ok(ProcessedItem {
        identifier: item.identifier.clone(),
        output_filename: name.filename,
        output_file_path: name.path,
        size_bytes,
    })
}
