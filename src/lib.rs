//! # csv-image-dl
//!
//! Turns a CSV list of `identifier,url` pairs into a ZIP archive of JPEG images.
//!
//! Every listed image is fetched with bounded concurrency, decoded, re-encoded
//! as JPEG and stored under a collision-free name derived from its identifier.
//! One outcome record per input item lands in a SQLite outcome log. The
//! pipeline can be embedded directly or served over the bundled REST API.
//!
//! ## Quick Start
//!
//! ```no_run
//! use csv_image_dl::{Config, Database, ImagePipeline, ParsedInput, InputItem};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let db = Arc::new(Database::new(&config.persistence.database_path).await?);
//!     let pipeline = ImagePipeline::new(&config, db)?;
//!
//!     let input = ParsedInput::from_items(vec![
//!         InputItem::new("A001", "https://example.com/a.png")?,
//!     ]);
//!     let archive = pipeline.process_items(input).await?;
//!     std::fs::write(&archive.filename, &archive.bytes)?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// ZIP packaging
pub mod archive;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Image fetching over HTTP
pub mod fetcher;
/// CSV intake
pub mod intake;
/// Collision-free output naming
pub mod naming;
/// Bounded-concurrency image pipeline
pub mod pipeline;
/// Outcome recording
pub mod recorder;
/// JPEG transcoding
pub mod transcode;
/// Core types
pub mod types;
/// Per-session scratch directories
pub mod workspace;

// Re-export commonly used types
pub use config::Config;
pub use db::{Database, OutcomeQuery};
pub use error::{ApiError, DatabaseError, Error, ErrorDetail, Result, ToHttpStatus};
pub use pipeline::ImagePipeline;
pub use recorder::{MemoryRecorder, OutcomeRecorder};
pub use types::{
    InputItem, OutcomeEntry, OutcomeRecord, OutcomeStatus, ParsedInput, SessionArchive, SessionId,
    SessionSummary, Stage,
};

/// Serve the REST API until a termination signal arrives.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// In-flight uploads are allowed to finish before this returns.
///
/// # Example
///
/// ```no_run
/// use csv_image_dl::{Config, Database, ImagePipeline, api::AppState, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Arc::new(Config::default());
///     let db = Arc::new(Database::new(&config.persistence.database_path).await?);
///     let pipeline = Arc::new(ImagePipeline::new(&config, db.clone())?);
///
///     run_with_shutdown(AppState::new(pipeline, db, config)).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(state: api::AppState) -> Result<()> {
    api::start_api_server(state, wait_for_signal()).await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
