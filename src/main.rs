//! csv-image-dl server binary
//!
//! Environment (a `.env` file is honored):
//! - `CSV_IMAGE_DL_CONFIG` - path to a JSON config file (defaults apply otherwise)
//! - `PORT` - overrides the port of the configured bind address
//! - `RUST_LOG` - tracing filter (default: `info`)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for human-readable

use csv_image_dl::{Config, Database, Error, ImagePipeline, Result, api::AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_LEVEL: &str = "info";

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    init_logging()?;

    let config = Arc::new(load_config()?);

    let db = Arc::new(Database::new(&config.persistence.database_path).await?);
    let pipeline = Arc::new(ImagePipeline::new(&config, db.clone())?);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        max_concurrent = config.pipeline.max_concurrent,
        database = ?config.persistence.database_path,
        "csv-image-dl starting"
    );

    let result = csv_image_dl::run_with_shutdown(AppState::new(pipeline, db.clone(), config)).await;

    // Other Arc holders are gone once the server has stopped
    if let Ok(db) = Arc::try_unwrap(db) {
        db.close().await;
    }

    result
}

fn init_logging() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let installed = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(false))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init()
    };

    installed.map_err(|e| Error::Other(format!("failed to install tracing subscriber: {}", e)))
}

fn load_config() -> Result<Config> {
    let mut config = match std::env::var_os("CSV_IMAGE_DL_CONFIG") {
        Some(path) => Config::from_file(&PathBuf::from(path))?,
        None => Config::default(),
    };

    if let Ok(port) = std::env::var("PORT") {
        let port = port.trim().parse::<u16>().map_err(|e| Error::Config {
            message: format!("invalid PORT '{}': {}", port, e),
            key: Some("PORT".to_string()),
        })?;
        config.server.api.bind_address.set_port(port);
    }

    config.validate()?;
    Ok(config)
}
