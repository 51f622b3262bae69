//! Configuration types for csv-image-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Image pipeline behavior (concurrency, fetching, transcoding)
///
/// These are the externally tunable parameters of the pipeline; everything
/// else about item processing is fixed.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PipelineConfig {
    /// Maximum number of items fetched/transcoded at once (default: 5)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Per-request network deadline in seconds (default: 30)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub fetch_timeout: Duration,

    /// Maximum redirect hops followed per request (default: 5)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// JPEG quality, 1-100 (default: 85)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// User-Agent header sent with every fetch
    ///
    /// Some image hosts reject requests without a browser-like agent.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            fetch_timeout: default_fetch_timeout(),
            max_redirects: default_max_redirects(),
            jpeg_quality: default_jpeg_quality(),
            user_agent: default_user_agent(),
        }
    }
}

/// Scratch space for sessions and uploads
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct WorkspaceConfig {
    /// Root under which one directory per session is created (default: "./temp")
    #[serde(default = "default_temp_dir")]
    #[schema(value_type = String)]
    pub temp_dir: PathBuf,

    /// Directory where uploaded CSV files are stored (default: "./uploads")
    #[serde(default = "default_upload_dir")]
    #[schema(value_type = String)]
    pub upload_dir: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            upload_dir: default_upload_dir(),
        }
    }
}

/// Data storage
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Outcome log database path (default: "./csv-image-dl.db")
    #[serde(default = "default_database_path")]
    #[schema(value_type = String)]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// API and external server integration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:5000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,

    /// Maximum accepted upload size in bytes (default: 10 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Main configuration
///
/// Fields are organized into logical sub-configs:
/// - [`pipeline`](PipelineConfig) - concurrency, fetch and transcode parameters
/// - [`workspace`](WorkspaceConfig) - session and upload directories
/// - [`persistence`](PersistenceConfig) - outcome log database
/// - [`server`](ServerIntegrationConfig) - REST API
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Image pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Session and upload directories
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Data storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Load a JSON configuration file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read config file '{}': {}", path.display(), e),
            key: None,
        })?;

        let config: Config = serde_json::from_str(&content).map_err(|e| Error::Config {
            message: format!("failed to parse config file '{}': {}", path.display(), e),
            key: None,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.max_concurrent == 0 {
            return Err(Error::Config {
                message: "max_concurrent must be at least 1".to_string(),
                key: Some("max_concurrent".to_string()),
            });
        }

        if !(1..=100).contains(&self.pipeline.jpeg_quality) {
            return Err(Error::Config {
                message: format!(
                    "jpeg_quality must be between 1 and 100, got {}",
                    self.pipeline.jpeg_quality
                ),
                key: Some("jpeg_quality".to_string()),
            });
        }

        if self.pipeline.fetch_timeout.is_zero() {
            return Err(Error::Config {
                message: "fetch_timeout must be non-zero".to_string(),
                key: Some("fetch_timeout".to_string()),
            });
        }

        Ok(())
    }
}

fn default_max_concurrent() -> usize {
    5
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_redirects() -> usize {
    5
}

fn default_jpeg_quality() -> u8 {
    85
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./temp")
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./csv-image-dl.db")
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.pipeline.max_concurrent, 5);
        assert_eq!(config.pipeline.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.pipeline.max_redirects, 5);
        assert_eq!(config.pipeline.jpeg_quality, 85);
        assert!(config.pipeline.user_agent.starts_with("Mozilla/5.0"));
        assert_eq!(config.server.api.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.server.api.bind_address.port(), 5000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_json_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.pipeline.max_concurrent, 5);
        assert_eq!(config.workspace.temp_dir, PathBuf::from("./temp"));
    }

    #[test]
    fn partial_json_overrides_only_given_fields() {
        let config: Config = serde_json::from_str(
            r#"{
                "pipeline": { "max_concurrent": 2, "jpeg_quality": 70, "fetch_timeout": 10 },
                "workspace": { "temp_dir": "/var/tmp/images" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.pipeline.max_concurrent, 2);
        assert_eq!(config.pipeline.jpeg_quality, 70);
        assert_eq!(config.pipeline.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.pipeline.max_redirects, 5);
        assert_eq!(config.workspace.temp_dir, PathBuf::from("/var/tmp/images"));
        assert_eq!(config.workspace.upload_dir, PathBuf::from("./uploads"));
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.pipeline.max_concurrent = 0;

        match config.validate().unwrap_err() {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("max_concurrent")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_out_of_range_quality() {
        let mut config = Config::default();
        config.pipeline.jpeg_quality = 0;
        assert!(config.validate().is_err());

        config.pipeline.jpeg_quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_file_reads_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"pipeline": {{"max_redirects": 2}}}}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.pipeline.max_redirects, 2);
    }

    #[test]
    fn from_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }
}
