//! Image host and configuration fixtures

use csv_image_dl::{Config, Database, ImagePipeline};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A small PNG of the given size
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 7) as u8, (y * 13) as u8, 90])
    });
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .expect("encode PNG fixture");
    buf.into_inner()
}

/// Image host with:
/// - `/a.png`, `/b.png`: valid images
/// - `/slow.png`: valid image after `slow_delay`
/// - `/page.html`: an HTML page
/// - anything else: 404
pub async fn image_host(slow_delay: Duration) -> MockServer {
    let server = MockServer::start().await;

    for (route, size) in [("/a.png", 32), ("/b.png", 48)] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(size, size)))
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/slow.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(png_bytes(16, 16))
                .set_delay(slow_delay),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><body>not an image</body></html>"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    server
}

/// Config rooted in `temp` with a short fetch timeout
pub fn test_config(temp: &TempDir, max_concurrent: usize) -> Config {
    let mut config = Config::default();
    config.pipeline.max_concurrent = max_concurrent;
    config.pipeline.fetch_timeout = Duration::from_secs(1);
    config.workspace.temp_dir = temp.path().join("temp");
    config.workspace.upload_dir = temp.path().join("uploads");
    config.persistence.database_path = temp.path().join("outcomes.db");
    config
}

/// Pipeline recording into a fresh database
pub async fn create_pipeline(config: &Config) -> (ImagePipeline, Arc<Database>) {
    let db = Arc::new(
        Database::new(&config.persistence.database_path)
            .await
            .expect("open database"),
    );
    let pipeline = ImagePipeline::new(config, db.clone()).expect("create pipeline");
    (pipeline, db)
}

/// True if `dir` is missing or has no entries
pub fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}
