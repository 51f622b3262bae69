//! End-to-end tests of the image pipeline against a local image host
//!
//! A wiremock server stands in for the image hosts; items are fetched over
//! real HTTP, transcoded, archived, and recorded in a SQLite outcome log.

mod common;

use common::{create_pipeline, dir_is_empty, image_host, test_config};
use csv_image_dl::{
    Error, InputItem, OutcomeQuery, OutcomeStatus, ParsedInput, Stage,
};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn zip_entries(bytes: &[u8]) -> HashMap<String, u64> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            (entry.name().to_string(), content.len() as u64)
        })
        .collect()
}

fn session_query(session_id: &str) -> OutcomeQuery {
    OutcomeQuery {
        session_id: Some(session_id.to_string()),
        limit: 100,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_csv_upload_end_to_end() {
    let temp = TempDir::new().unwrap();
    let host = image_host(Duration::from_secs(3)).await;
    let config = test_config(&temp, 3);
    let (pipeline, db) = create_pipeline(&config).await;

    let upload_dir = temp.path().join("uploads");
    std::fs::create_dir_all(&upload_dir).unwrap();
    let upload = upload_dir.join("upload-test.csv");
    std::fs::write(
        &upload,
        format!(
            "A001,{uri}/a.png\nA001,{uri}/b.png\nA002,{uri}/slow.png\nA003,{uri}/page.html\n,{uri}/a.png\n",
            uri = host.uri()
        ),
    )
    .unwrap();

    let archive = pipeline.process_csv_upload(upload.clone()).await.unwrap();

    assert_eq!(archive.processed, 2);
    assert_eq!(archive.total, 4);
    assert_eq!(
        archive.filename,
        format!("images-{}.zip", archive.session_id.short())
    );

    let entries = zip_entries(&archive.bytes);
    let mut names: Vec<_> = entries.keys().cloned().collect();
    names.sort();
    assert_eq!(names, vec!["A001.jpg", "A001_1.jpg"]);

    let session_id = archive.session_id.to_string();
    let records = db.query_outcomes(&session_query(&session_id)).await.unwrap();
    assert_eq!(records.len(), 5, "one record per row, skipped rows included");

    let by_status = |status| records.iter().filter(|r| r.status == status).count();
    assert_eq!(by_status(OutcomeStatus::Success), 2);
    assert_eq!(by_status(OutcomeStatus::Failed), 2);
    assert_eq!(by_status(OutcomeStatus::Skipped), 1);

    for record in records.iter().filter(|r| r.status == OutcomeStatus::Success) {
        assert_eq!(
            Some(entries[&record.output_filename]),
            record.size_bytes,
            "archive entry size matches the success record"
        );
    }

    let stage_of = |identifier: &str| {
        records
            .iter()
            .find(|r| r.identifier == identifier)
            .and_then(|r| r.failed_stage)
    };
    assert_eq!(stage_of("A002"), Some(Stage::Fetch));
    assert_eq!(stage_of("A003"), Some(Stage::Transcode));

    assert!(!upload.exists(), "uploaded CSV is removed with the session");
    assert!(dir_is_empty(&temp.path().join("temp")));
}

#[tokio::test]
async fn test_all_items_failing_is_a_session_error() {
    let temp = TempDir::new().unwrap();
    let host = image_host(Duration::from_secs(3)).await;
    let config = test_config(&temp, 2);
    let (pipeline, db) = create_pipeline(&config).await;

    let input = ParsedInput::from_items(vec![
        InputItem::new("A001", &format!("{}/missing.png", host.uri())).unwrap(),
        InputItem::new("A002", "not a url").unwrap(),
    ]);

    let err = pipeline.process_items(input).await.unwrap_err();
    assert!(matches!(err.root(), Error::NoImagesProcessed));

    let session_id = err.session_id().expect("error carries the session id");
    let summary = db
        .session_summary(&session_id.to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.failed, 2);

    assert!(dir_is_empty(&temp.path().join("temp")));
}

#[tokio::test]
async fn test_concurrency_cap_bounds_wall_clock() {
    let delay = Duration::from_millis(300);
    let temp = TempDir::new().unwrap();
    let host = image_host(delay).await;

    let items = |n: usize| {
        ParsedInput::from_items(
            (0..n)
                .map(|i| {
                    InputItem::new(&format!("S{i}"), &format!("{}/slow.png", host.uri())).unwrap()
                })
                .collect(),
        )
    };

    // Cap 2: six items need at least three rounds
    let (pipeline, _db) = create_pipeline(&test_config(&temp, 2)).await;
    let started = Instant::now();
    let archive = pipeline.process_items(items(6)).await.unwrap();
    assert_eq!(archive.processed, 6);
    assert!(started.elapsed() >= delay * 3);

    // Cap 6: all six overlap
    let temp = TempDir::new().unwrap();
    let (pipeline, _db) = create_pipeline(&test_config(&temp, 6)).await;
    let started = Instant::now();
    let archive = pipeline.process_items(items(6)).await.unwrap();
    assert_eq!(archive.processed, 6);
    assert!(started.elapsed() < delay * 6);
}
