//! Application state for the API server

use crate::{Config, Database, ImagePipeline};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clones).
#[derive(Clone)]
pub struct AppState {
    /// Pipeline that runs upload sessions
    pub pipeline: Arc<ImagePipeline>,

    /// Outcome log, for history and summary queries
    pub db: Arc<Database>,

    /// Configuration (read only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(pipeline: Arc<ImagePipeline>, db: Arc<Database>, config: Arc<Config>) -> Self {
        Self {
            pipeline,
            db,
            config,
        }
    }
}
