//! Router-level tests through `tower::ServiceExt::oneshot`

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use docqa::server::build_router;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn ask(body: Value) -> Request<Body> {
    Request::post("/ask")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn upload(filename: &str, content: &str) -> Request<Body> {
    let boundary = "docqa-test-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\n{c}\r\n--{b}--\r\n",
        b = boundary,
        f = filename,
        c = content
    );
    Request::post("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_ask_before_ingestion_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_router(common::test_state(dir.path()));

    let (status, body) = call(app, ask(json!({ "query": "anything?" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("No documents"));
}

#[tokio::test]
async fn test_missing_and_blank_queries_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(dir.path());

    let (status, _) = call(build_router(state.clone()), ask(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(build_router(state), ask(json!({ "query": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_then_ask() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(dir.path());

    let (status, body) = call(
        build_router(state.clone()),
        upload("geo.txt", "The capital of France is Paris."),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["new_chunks_added"], 1);
    assert_eq!(body["total_chunks_in_index"], 1);
    assert!(dir.path().join("geo.txt").exists());

    let (status, body) = call(
        build_router(state),
        ask(json!({ "query": "What is the capital of France?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["answer"].as_str().unwrap().contains("Paris"));
    assert_eq!(body["contexts"][0], "The capital of France is Paris.");
    assert_eq!(body["model"], "echo");
}

#[tokio::test]
async fn test_query_over_length_limit_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(dir.path());
    state
        .pipeline()
        .ingest_bytes("a.txt", b"Some indexed text.")
        .await
        .unwrap();

    let long_query = "x".repeat(101);
    let (status, body) = call(build_router(state.clone()), ask(json!({ "query": long_query }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("maximum length"));

    let at_limit = "x".repeat(100);
    let (status, _) = call(build_router(state), ask(json!({ "query": at_limit }))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_upload_rejects_unsupported_extension() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_router(common::test_state(dir.path()));

    let (status, body) = call(app, upload("slides.pptx", "binary")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Unsupported"));
    assert!(!dir.path().join("slides.pptx").exists());
}

#[tokio::test]
async fn test_failed_upload_leaves_no_file_behind() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_router(common::test_state(dir.path()));

    let (status, _) = call(app, upload("empty.txt", "   ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!dir.path().join("empty.txt").exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_failed_reupload_keeps_existing_document() {
    let dir = tempfile::tempdir().unwrap();
    let original = "Meeting notes: the launch moved to Friday.";
    std::fs::write(dir.path().join("notes.txt"), original).unwrap();

    let state = common::test_state(dir.path());
    state.pipeline().ingest_directory(dir.path()).await.unwrap();
    assert_eq!(state.knowledge().len(), 1);

    let (status, _) = call(build_router(state.clone()), upload("notes.txt", "   ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(
        std::fs::read_to_string(dir.path().join("notes.txt")).unwrap(),
        original
    );
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    assert_eq!(state.knowledge().len(), 1);
}

#[tokio::test]
async fn test_reupload_replaces_file_on_success() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "Old draft.").unwrap();
    let state = common::test_state(dir.path());

    let (status, _) = call(
        build_router(state),
        upload("notes.txt", "Final version of the notes."),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("notes.txt")).unwrap(),
        "Final version of the notes."
    );
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_health_reports_index_size_and_models() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(dir.path());
    state
        .pipeline()
        .ingest_bytes("a.txt", b"One short document.")
        .await
        .unwrap();

    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = call(build_router(state), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["ollama_status"], "connected");
    assert_eq!(body["ollama_model"], "echo");
    assert_eq!(body["embedding_model"], "bow-64");
    assert_eq!(body["total_documents"], 1);
}
