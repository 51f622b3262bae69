//! Core types for csv-image-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use utoipa::ToSchema;
use uuid::Uuid;

/// Output extension of the canonical image format
pub const OUTPUT_EXTENSION: &str = "jpg";

/// Unique identifier for a processing session
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a fresh random SessionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First 8 hex characters, used in human-facing names
    pub fn short(&self) -> String {
        let mut s = self.0.simple().to_string();
        s.truncate(8);
        s
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// One `(identifier, url)` pair of the input list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InputItem {
    /// Identifier used to name the output file (non-empty, trimmed)
    pub identifier: String,
    /// Source URL of the image (trimmed, not yet validated)
    pub source_url: String,
}

impl InputItem {
    /// Build an item from raw field values.
    ///
    /// Both fields are trimmed; an empty identifier or URL is rejected with a
    /// short reason suitable for a skipped outcome record.
    pub fn new(
        identifier: impl AsRef<str>,
        source_url: impl AsRef<str>,
    ) -> std::result::Result<Self, &'static str> {
        let identifier = identifier.as_ref().trim();
        let source_url = source_url.as_ref().trim();

        match (identifier.is_empty(), source_url.is_empty()) {
            (true, true) => Err("missing identifier and URL"),
            (true, false) => Err("missing identifier"),
            (false, true) => Err("missing URL"),
            (false, false) => Ok(Self {
                identifier: identifier.to_string(),
                source_url: source_url.to_string(),
            }),
        }
    }
}

/// An input record that could not become an [`InputItem`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SkippedRow {
    /// 1-based line number in the source file
    pub line: u64,
    /// Identifier field as found (trimmed, may be empty)
    pub identifier: String,
    /// URL field as found (trimmed, may be empty)
    pub source_url: String,
    /// Why the row was skipped
    pub reason: String,
}

/// Result of parsing an input file
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedInput {
    /// Valid items, in file order
    pub items: Vec<InputItem>,
    /// Rows with content that are missing a field
    pub skipped: Vec<SkippedRow>,
}

impl ParsedInput {
    /// Input consisting only of valid items
    pub fn from_items(items: Vec<InputItem>) -> Self {
        Self {
            items,
            skipped: Vec::new(),
        }
    }
}

/// A processing session: one workspace directory plus the uploaded file it owns
#[derive(Clone, Debug)]
pub struct ProcessingSession {
    /// Session identifier
    pub session_id: SessionId,
    /// Exclusively-owned scratch directory
    pub workspace_path: PathBuf,
    /// Uploaded input file, removed together with the workspace
    pub input_file_path: Option<PathBuf>,
}

/// A successfully transcoded item, ready for archiving
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessedItem {
    /// Identifier the item was requested under
    pub identifier: String,
    /// Resolved, session-unique output filename
    pub output_filename: String,
    /// Location of the output file inside the workspace
    pub output_file_path: PathBuf,
    /// Size of the output file in bytes
    pub size_bytes: u64,
}

/// Outcome status of one record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Fetched, transcoded and written
    Success,
    /// Failed at some stage
    Failed,
    /// Malformed input row, never processed
    Skipped,
}

impl OutcomeStatus {
    /// Storage/wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Success => "success",
            OutcomeStatus::Failed => "failed",
            OutcomeStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OutcomeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "success" => Ok(OutcomeStatus::Success),
            "failed" => Ok(OutcomeStatus::Failed),
            "skipped" => Ok(OutcomeStatus::Skipped),
            other => Err(format!("unknown outcome status '{}'", other)),
        }
    }
}

/// Pipeline stage at which a failed item stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// URL validation
    Validate,
    /// Network fetch
    Fetch,
    /// Decode and re-encode
    Transcode,
    /// Output name allocation
    NameResolution,
    /// Writing or stat-ing the output file
    Write,
    /// The worker task itself died
    Worker,
}

impl Stage {
    /// Storage/wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Fetch => "fetch",
            Stage::Transcode => "transcode",
            Stage::NameResolution => "name_resolution",
            Stage::Write => "write",
            Stage::Worker => "worker",
        }
    }

    /// Parse the storage representation; unknown values yield `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "validate" => Some(Stage::Validate),
            "fetch" => Some(Stage::Fetch),
            "transcode" => Some(Stage::Transcode),
            "name_resolution" => Some(Stage::NameResolution),
            "write" => Some(Stage::Write),
            "worker" => Some(Stage::Worker),
            _ => None,
        }
    }
}

/// Structured outcome of one input item (or skipped row)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OutcomeRecord {
    /// Identifier of the item
    pub identifier: String,
    /// Source URL of the item
    pub source_url: String,
    /// Resolved output name (or the name it would have had)
    pub output_filename: String,
    /// Outcome status
    pub status: OutcomeStatus,
    /// Stage at which a failed item stopped
    pub failed_stage: Option<Stage>,
    /// Failure or skip reason
    pub error_message: Option<String>,
    /// Output size, success only
    pub size_bytes: Option<u64>,
    /// Wall-clock time spent on the item
    pub processing_time_ms: u64,
    /// Session the item belongs to
    pub session_id: SessionId,
}

impl OutcomeRecord {
    /// Record for a successfully processed item
    pub fn success(
        session_id: SessionId,
        item: &InputItem,
        processed: &ProcessedItem,
        elapsed: Duration,
    ) -> Self {
        Self {
            identifier: item.identifier.clone(),
            source_url: item.source_url.clone(),
            output_filename: processed.output_filename.clone(),
            status: OutcomeStatus::Success,
            failed_stage: None,
            error_message: None,
            size_bytes: Some(processed.size_bytes),
            processing_time_ms: elapsed.as_millis() as u64,
            session_id,
        }
    }

    /// Record for an item that failed at `stage`.
    ///
    /// When no output name was resolved yet, the default `<identifier>.jpg` is used.
    pub fn failed(
        session_id: SessionId,
        item: &InputItem,
        output_filename: Option<String>,
        stage: Stage,
        message: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            identifier: item.identifier.clone(),
            source_url: item.source_url.clone(),
            output_filename: output_filename.unwrap_or_else(|| default_filename(&item.identifier)),
            status: OutcomeStatus::Failed,
            failed_stage: Some(stage),
            error_message: Some(message.into()),
            size_bytes: None,
            processing_time_ms: elapsed.as_millis() as u64,
            session_id,
        }
    }

    /// Record for a malformed input row
    pub fn skipped(session_id: SessionId, row: &SkippedRow) -> Self {
        Self {
            identifier: row.identifier.clone(),
            source_url: row.source_url.clone(),
            output_filename: if row.identifier.is_empty() {
                String::new()
            } else {
                default_filename(&row.identifier)
            },
            status: OutcomeStatus::Skipped,
            failed_stage: None,
            error_message: Some(format!("line {}: {}", row.line, row.reason)),
            size_bytes: None,
            processing_time_ms: 0,
            session_id,
        }
    }
}

/// `<identifier>.jpg`
pub fn default_filename(identifier: &str) -> String {
    format!("{}.{}", identifier, OUTPUT_EXTENSION)
}

/// Stored outcome record as returned by the outcome log queries
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct OutcomeEntry {
    /// Unique database ID
    pub id: i64,
    /// Session the item belongs to
    pub session_id: String,
    /// Identifier of the item
    pub identifier: String,
    /// Source URL of the item
    pub source_url: String,
    /// Resolved output name
    pub output_filename: String,
    /// Outcome status
    pub status: OutcomeStatus,
    /// Stage at which a failed item stopped
    pub failed_stage: Option<Stage>,
    /// Failure or skip reason
    pub error_message: Option<String>,
    /// Output size, success only
    pub size_bytes: Option<u64>,
    /// Wall-clock time spent on the item
    pub processing_time_ms: u64,
    /// When the record was stored
    pub created_at: DateTime<Utc>,
}

/// Per-status counts for one session
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SessionSummary {
    /// Session identifier
    pub session_id: String,
    /// Total number of records
    pub total: u64,
    /// Records with status `success`
    pub succeeded: u64,
    /// Records with status `failed`
    pub failed: u64,
    /// Records with status `skipped`
    pub skipped: u64,
    /// Sum of output sizes of successful items
    pub total_bytes: u64,
}

/// The success payload of a session: the finished archive
#[derive(Clone, Debug)]
pub struct SessionArchive {
    /// Session identifier
    pub session_id: SessionId,
    /// Suggested download name, `images-<short id>.zip`
    pub filename: String,
    /// ZIP bytes
    pub bytes: Vec<u8>,
    /// Number of images in the archive
    pub processed: usize,
    /// Number of input items (excluding skipped rows)
    pub total: usize,
}

impl SessionArchive {
    /// Suggested archive name for a session
    pub fn filename_for(session_id: SessionId) -> String {
        format!("images-{}.zip", session_id.short())
    }
}
