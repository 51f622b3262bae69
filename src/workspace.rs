//! Per-session scratch directories

use crate::error::{Error, Result};
use crate::types::{ProcessingSession, SessionId};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Creates and removes session workspaces under a root directory
#[derive(Clone, Debug)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    /// Manage workspaces under `root` (created on first use)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Allocate a fresh, exclusively-owned directory for `session_id`
    ///
    /// The session takes ownership of `input_file` (if any); both are removed by
    /// [`WorkspaceManager::destroy`].
    pub async fn create(
        &self,
        session_id: SessionId,
        input_file: Option<PathBuf>,
    ) -> Result<ProcessingSession> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Error::Workspace {
                path: self.root.clone(),
                reason: format!("failed to create workspace root: {}", e),
            })?;

        let workspace_path = self.root.join(session_id.to_string());

        // create_dir (not create_dir_all) so an existing directory is an error
        tokio::fs::create_dir(&workspace_path)
            .await
            .map_err(|e| Error::Workspace {
                path: workspace_path.clone(),
                reason: format!("failed to create session workspace: {}", e),
            })?;

        debug!(session_id = %session_id, ?workspace_path, "created session workspace");

        Ok(ProcessingSession {
            session_id,
            workspace_path,
            input_file_path: input_file,
        })
    }

    /// Remove the session's workspace and input file
    ///
    /// Best-effort: anything already gone counts as removed, other errors are
    /// logged and swallowed. Calling this twice is a no-op the second time.
    pub async fn destroy(&self, session: &ProcessingSession) {
        if let Some(input) = &session.input_file_path {
            match tokio::fs::remove_file(input).await {
                Ok(()) => debug!(session_id = %session.session_id, ?input, "removed input file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(
                    session_id = %session.session_id,
                    ?input,
                    error = %e,
                    "failed to remove input file"
                ),
            }
        }

        match tokio::fs::remove_dir_all(&session.workspace_path).await {
            Ok(()) => debug!(
                session_id = %session.session_id,
                workspace = ?session.workspace_path,
                "removed session workspace"
            ),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                session_id = %session.session_id,
                workspace = ?session.workspace_path,
                error = %e,
                "failed to remove session workspace"
            ),
        }
    }
}
