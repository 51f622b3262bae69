use super::*;
use crate::types::{InputItem, OutcomeRecord, SessionId, Stage};
use crate::{Config, Database, ImagePipeline};
use axum::body::Body;
use axum::http::{Request, Response};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod history;

const BOUNDARY: &str = "csv-image-dl-test-boundary";

fn test_config(temp: &TempDir) -> Config {
    let mut config = Config::default();
    config.pipeline.fetch_timeout = Duration::from_secs(2);
    config.workspace.temp_dir = temp.path().join("temp");
    config.workspace.upload_dir = temp.path().join("uploads");
    config.persistence.database_path = temp.path().join("outcomes.db");
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    config
}

/// AppState backed by a real database and HTTP fetcher inside a temp dir
async fn create_test_state_with(config: Config) -> AppState {
    let config = Arc::new(config);
    let db = Arc::new(Database::new(&config.persistence.database_path).await.unwrap());
    let pipeline = Arc::new(ImagePipeline::new(&config, db.clone()).unwrap());
    AppState::new(pipeline, db, config)
}

async fn create_test_state() -> (AppState, TempDir) {
    let temp = TempDir::new().unwrap();
    let state = create_test_state_with(test_config(&temp)).await;
    (state, temp)
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(16, 16, image::Rgb([200, 40, 40]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// Image host serving a PNG at /ok.png and 404 everywhere else
async fn image_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(png_bytes()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    server
}

fn multipart_body(field: &str, filename: &str, content_type: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload-csv")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn dir_is_empty(dir: &std::path::Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

async fn seed_failed(db: &Database, session_id: SessionId, identifier: &str) {
    let item = InputItem::new(identifier, "http://img.test/x.png").unwrap();
    let record = OutcomeRecord::failed(
        session_id,
        &item,
        None,
        Stage::Fetch,
        "HTTP status 404",
        Duration::from_millis(5),
    );
    db.insert_outcome(&record).await.unwrap();
}

#[tokio::test]
async fn test_api_server_starts_and_shuts_down() {
    let (state, _temp) = create_test_state().await;
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(start_api_server(state, async {
        let _ = rx.await;
    }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop after the shutdown signal")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_api_server_bind_failure_is_io_error() {
    let temp = TempDir::new().unwrap();
    let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();

    let mut config = test_config(&temp);
    config.server.api.bind_address = blocker.local_addr().unwrap();
    let state = create_test_state_with(config).await;

    let result = start_api_server(state, std::future::pending()).await;
    assert!(matches!(result, Err(Error::Io(_))));
}

#[tokio::test]
async fn test_cors_enabled() {
    let (state, _temp) = create_test_state().await;
    let app = create_router(state);

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(&temp);
    config.server.api.cors_enabled = false;
    let state = create_test_state_with(config).await;

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = create_router(state).oneshot(request).await.unwrap();
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(&temp);
    config.server.api.cors_origins = vec!["http://allowed.test".to_string()];
    let state = create_test_state_with(config).await;
    let app = create_router(state);

    let allowed = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://allowed.test")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(allowed).await.unwrap();
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://allowed.test"
    );

    let other = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://other.test")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(other).await.unwrap();
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let (state, _temp) = create_test_state().await;

    let response = create_router(state)
        .oneshot(get("/api/does-not-exist"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "not_found");
}
