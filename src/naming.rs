//! Collision-free output names within one session workspace

use crate::error::ItemError;
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// Maximum numeric suffix tried before giving up on an identifier
const MAX_SUFFIX_ATTEMPTS: u32 = 9999;

/// An allocated output name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedName {
    /// `<identifier>.<ext>` or `<identifier>_<n>.<ext>`
    pub filename: String,
    /// Full path inside the workspace
    pub path: PathBuf,
}

/// Allocates output filenames for one workspace directory
///
/// A name is in use when it exists in the directory (probed at resolution
/// time) or was handed out by this resolver and not released. The probe and
/// the reservation happen under one lock, so concurrent workers resolving the
/// same identifier always receive distinct names.
#[derive(Debug)]
pub struct NameResolver {
    dir: PathBuf,
    extension: String,
    allocated: Mutex<HashSet<String>>,
}

impl NameResolver {
    /// Create a resolver for `dir`, producing names with extension `extension`
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
            allocated: Mutex::new(HashSet::new()),
        }
    }

    /// Allocate the smallest free name for `identifier`
    pub async fn resolve(&self, identifier: &str) -> Result<ResolvedName, ItemError> {
        check_identifier(identifier)?;

        let mut allocated = self.allocated.lock().await;

        for n in 0..=MAX_SUFFIX_ATTEMPTS {
            let filename = if n == 0 {
                format!("{}.{}", identifier, self.extension)
            } else {
                format!("{}_{}.{}", identifier, n, self.extension)
            };

            if allocated.contains(&filename) {
                continue;
            }

            let path = self.dir.join(&filename);
            let exists = tokio::fs::try_exists(&path)
                .await
                .map_err(|e| ItemError::NameResolution {
                    identifier: identifier.to_string(),
                    reason: format!("cannot probe {}: {}", path.display(), e),
                })?;
            if exists {
                continue;
            }

            allocated.insert(filename.clone());
            return Ok(ResolvedName { filename, path });
        }

        Err(ItemError::NameResolution {
            identifier: identifier.to_string(),
            reason: format!(
                "could not find unique filename after {} attempts",
                MAX_SUFFIX_ATTEMPTS
            ),
        })
    }

    /// Give back a name whose file was never written
    pub async fn release(&self, filename: &str) {
        self.allocated.lock().await.remove(filename);
    }
}

/// Reject identifiers that would name something outside the workspace
fn check_identifier(identifier: &str) -> Result<(), ItemError> {
    let reason = if identifier.is_empty() {
        Some("identifier is empty")
    } else if identifier == "." || identifier == ".." {
        Some("identifier is a relative path component")
    } else if identifier.contains(['/', '\\']) {
        Some("identifier contains a path separator")
    } else if identifier.contains('\0') {
        Some("identifier contains a NUL byte")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ItemError::NameResolution {
            identifier: identifier.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}
