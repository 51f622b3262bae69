use super::*;

#[tokio::test]
async fn test_upload_history_empty() {
    let (state, _temp) = create_test_state().await;

    let response = create_router(state)
        .oneshot(get("/api/upload-history"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["items"].as_array().unwrap().len(), 0);
    assert_eq!(json["total"], 0);
    assert_eq!(json["limit"], 100);
    assert_eq!(json["offset"], 0);
}

#[tokio::test]
async fn test_upload_history_filters_and_paginates() {
    let (state, _temp) = create_test_state().await;
    let first = SessionId::new();
    let second = SessionId::new();

    seed_failed(&state.db, first, "A001").await;
    seed_failed(&state.db, first, "A002").await;
    seed_failed(&state.db, second, "A001").await;

    let app = create_router(state);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/upload-history?session={first}")))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["total"], 2);
    assert!(
        json["items"]
            .as_array()
            .unwrap()
            .iter()
            .all(|item| item["session_id"] == first.to_string())
    );

    let response = app
        .clone()
        .oneshot(get("/api/upload-history?identifier=A001&status=failed"))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["items"][0]["failed_stage"], "fetch");

    let response = app
        .clone()
        .oneshot(get("/api/upload-history?limit=1&offset=1"))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["total"], 3);
    assert_eq!(json["limit"], 1);
    assert_eq!(json["offset"], 1);
    assert_eq!(json["items"].as_array().unwrap().len(), 1);

    let response = app
        .oneshot(get("/api/upload-history?status=success"))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["total"], 0);
}

#[tokio::test]
async fn test_upload_history_clamps_limit() {
    let (state, _temp) = create_test_state().await;
    let app = create_router(state);

    let response = app
        .clone()
        .oneshot(get("/api/upload-history?limit=5000"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["limit"], 1000);

    let response = app
        .oneshot(get("/api/upload-history?limit=0&offset=-4"))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["limit"], 1);
    assert_eq!(json["offset"], 0);
}

#[tokio::test]
async fn test_upload_history_invalid_status() {
    let (state, _temp) = create_test_state().await;

    let response = create_router(state)
        .oneshot(get("/api/upload-history?status=complete"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "invalid_status");
}

#[tokio::test]
async fn test_session_summary() {
    let (state, _temp) = create_test_state().await;
    let session_id = SessionId::new();
    seed_failed(&state.db, session_id, "A001").await;
    seed_failed(&state.db, session_id, "A002").await;

    let response = create_router(state)
        .oneshot(get(&format!("/api/sessions/{session_id}/summary")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["session_id"], session_id.to_string());
    assert_eq!(json["total"], 2);
    assert_eq!(json["failed"], 2);
    assert_eq!(json["succeeded"], 0);
}

#[tokio::test]
async fn test_session_summary_unknown_session_is_404() {
    let (state, _temp) = create_test_state().await;

    let response = create_router(state)
        .oneshot(get(&format!("/api/sessions/{}/summary", SessionId::new())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "not_found");
}
