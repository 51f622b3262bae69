//! Error types for csv-image-dl
//!
//! Errors come in two tiers:
//! - [`ItemError`] / [`FetchError`] describe why a single input item failed. They are
//!   caught by the pipeline, turned into a failed outcome record, and never fail a session.
//! - [`Error`] describes session-level failures (no images processed, archive failure,
//!   workspace failure) plus the ambient failures of the store, config and API layers.
//!
//! [`ToHttpStatus`] and [`ApiError`] map session-level errors onto HTTP responses.

use crate::types::{SessionId, Stage};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for csv-image-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for csv-image-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The uploaded input file is not valid CSV
    #[error("invalid CSV input: {0}")]
    Csv(String),

    /// The upload request itself was malformed (missing file, wrong type)
    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    /// Every item of the session failed (or the input list was empty)
    #[error("no images were successfully processed")]
    NoImagesProcessed,

    /// A processed file could not be packaged into the archive
    #[error("archive error for {path}: {reason}")]
    Archive {
        /// The source file that could not be archived
        path: PathBuf,
        /// The reason packaging failed
        reason: String,
    },

    /// The session workspace could not be created
    #[error("workspace error at {path}: {reason}")]
    Workspace {
        /// The workspace path involved
        path: PathBuf,
        /// The reason the operation failed
        reason: String,
    },

    /// A session-level failure, tagged with the session it belongs to
    #[error("session {session_id}: {source}")]
    Session {
        /// Session the failure belongs to (correlates with the outcome log)
        session_id: SessionId,
        /// The underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Tag this error with the session it happened in.
    ///
    /// Already-tagged errors are returned unchanged.
    pub fn in_session(self, session_id: SessionId) -> Self {
        match self {
            Error::Session { .. } => self,
            other => Error::Session {
                session_id,
                source: Box::new(other),
            },
        }
    }

    /// Session id carried by this error, if any
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            Error::Session { session_id, .. } => Some(*session_id),
            _ => None,
        }
    }

    /// The innermost error, unwrapping any session tag
    pub fn root(&self) -> &Error {
        match self {
            Error::Session { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Why a single item failed. Converted into a failed outcome record by the pipeline.
#[derive(Debug, Error)]
pub enum ItemError {
    /// The source URL is not an absolute http(s) URL
    #[error("invalid URL format '{url}': {reason}")]
    InvalidUrl {
        /// The rejected URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Fetching the source bytes failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The fetched bytes are not a recognizable image
    #[error("image decode failed: {0}")]
    Decode(String),

    /// JPEG encoding failed (no path yet), or writing the output file failed
    #[error("image encode failed{}: {reason}", encode_target(path))]
    Encode {
        /// The output path being produced; `None` while still in memory
        path: Option<PathBuf>,
        /// The reason encoding or writing failed
        reason: String,
    },

    /// No output name could be allocated for the identifier
    #[error("name resolution failed for '{identifier}': {reason}")]
    NameResolution {
        /// The identifier that could not be named
        identifier: String,
        /// Why allocation failed
        reason: String,
    },
}

impl ItemError {
    /// Pipeline stage this error belongs to
    pub fn stage(&self) -> Stage {
        match self {
            ItemError::InvalidUrl { .. } => Stage::Validate,
            ItemError::Fetch(_) => Stage::Fetch,
            ItemError::Decode(_) => Stage::Transcode,
            ItemError::Encode { path: None, .. } => Stage::Transcode,
            ItemError::Encode { path: Some(_), .. } => Stage::Write,
            ItemError::NameResolution { .. } => Stage::NameResolution,
        }
    }
}

fn encode_target(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" for {}", p.display()))
        .unwrap_or_default()
}

/// Network-level fetch failures
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request did not complete within the configured timeout
    #[error("request timed out after {timeout_secs}s")]
    Timeout {
        /// The timeout that elapsed, in seconds
        timeout_secs: u64,
    },

    /// Could not connect to the remote host
    #[error("connection failed: {0}")]
    Connect(String),

    /// The redirect chain exceeded the configured limit
    #[error("too many redirects (limit {limit})")]
    TooManyRedirects {
        /// The configured redirect limit
        limit: usize,
    },

    /// The server answered with a non-success status
    #[error("HTTP status {status}")]
    Status {
        /// The HTTP status code received
        status: u16,
    },

    /// The server answered with an empty body
    #[error("empty image data received")]
    EmptyBody,

    /// Reading the response body failed
    #[error("failed to read response body: {0}")]
    Body(String),

    /// Any other client-side failure
    #[error("request failed: {0}")]
    Client(String),
}

/// Trait for converting errors to HTTP status codes
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::Csv(_) => 400,
            Error::InvalidUpload(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 422 Unprocessable Entity - input was valid but nothing could be produced
            Error::NoImagesProcessed => 422,

            // 500 Internal Server Error - Server-side issues
            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::Archive { .. } => 500,
            Error::Workspace { .. } => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            Error::Session { source, .. } => source.status_code(),
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Io(_) => "io_error",
            Error::Csv(_) => "invalid_csv",
            Error::InvalidUpload(_) => "invalid_upload",
            Error::NoImagesProcessed => "no_images_processed",
            Error::Archive { .. } => "archive_error",
            Error::Workspace { .. } => "workspace_error",
            Error::NotFound(_) => "not_found",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
            Error::Session { source, .. } => source.error_code(),
        }
    }
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "no_images_processed",
///     "message": "no images were successfully processed",
///     "details": {
///       "session_id": "4f1c2a7e-0c43-4b8e-9a55-3d2f6e1b9c10"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "no_images_processed")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error (session id, paths)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();

        // The session tag lives in details; the message describes the root cause
        let message = error.root().to_string();

        let mut details = match error.root() {
            Error::Archive { path, .. } | Error::Workspace { path, .. } => {
                Some(serde_json::json!({ "path": path }))
            }
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            _ => None,
        };

        if let Some(session_id) = error.session_id() {
            let details = details.get_or_insert_with(|| serde_json::json!({}));
            details["session_id"] = serde_json::json!(session_id.to_string());
        }

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
