use std::io::{Cursor, Write};
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use httpmock::{Method::POST, MockServer};
use medbrief::{
    api,
    config::{Config, GenerationProvider},
    generation::{GenerationSettings, SummaryGenerator, get_generation_client},
    pipeline::MedbriefService,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use zip::write::SimpleFileOptions;

fn openai_config(base_url: String) -> Config {
    Config {
        generation_provider: GenerationProvider::OpenAI,
        generation_model: "gpt-4-turbo".into(),
        generation_base_url: Some(base_url),
        openai_api_key: Some("sk-test".into()),
        anthropic_api_key: None,
        generation_timeout_secs: 10,
        summary_max_tokens: 2000,
        chat_max_tokens: 1500,
        generation_temperature: 0.7,
        max_documents_per_analysis: 10,
        server_port: None,
    }
}

fn router_for(server: &MockServer) -> Router {
    let config = openai_config(server.base_url());
    let client = get_generation_client(&config).expect("generation client");
    let generator = SummaryGenerator::new(client, GenerationSettings::from_config(&config));
    let service = MedbriefService::with_empty_stores(
        Arc::new(generator),
        config.max_documents_per_analysis,
    );
    api::create_router(Arc::new(service))
}

fn completion(text: &str) -> Value {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": text } }]
    })
}

fn docx(paragraph: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", SimpleFileOptions::default())
        .expect("start document part");
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>{paragraph}</w:t></w:r></w:p></w:body></w:document>"#
    );
    writer
        .write_all(document.as_bytes())
        .expect("write document part");
    writer.finish().expect("finish archive").into_inner()
}

fn stored(dir: &TempDir, name: &str, bytes: &[u8]) -> Value {
    let path = dir.path().join(format!("upload-{name}"));
    std::fs::write(&path, bytes).expect("write upload");
    json!({ "path": path, "originalName": name })
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("router response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

#[tokio::test]
async fn analysis_then_chat_round_trip() {
    let server = MockServer::start_async().await;
    let summary_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_contains("Please analyze these documents");
            then.status(200)
                .json_body(completion("## Patient Medical Summary\nHypertension."));
        })
        .await;
    let chat_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_contains("PATIENT MEDICAL CONTEXT");
            then.status(200)
                .json_body(completion("Blood pressure was 120/80."));
        })
        .await;
    let app = router_for(&server);
    let dir = TempDir::new().expect("tempdir");

    let (status, analysis) = send(
        &app,
        Method::POST,
        "/api/analysis",
        Some(json!({
            "files": [
                stored(&dir, "report.txt", b"BP 120/80"),
                stored(&dir, "notes.txt", b""),
                stored(&dir, "scan.docx", b"not a zip"),
                stored(&dir, "letter.docx", &docx("Referred to cardiology")),
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{analysis}");
    summary_mock.assert_async().await;
    assert_eq!(analysis["filesAnalyzed"], 4);
    assert_eq!(analysis["successfullyParsed"], 2);
    assert_eq!(analysis["summary"], "## Patient Medical Summary\nHypertension.");
    assert!(analysis.get("context").is_none());
    let outcomes: Vec<_> = analysis["documents"]
        .as_array()
        .expect("documents")
        .iter()
        .map(|doc| doc["outcome"]["status"].as_str().expect("status").to_string())
        .collect();
    assert_eq!(outcomes, ["success", "emptyContent", "failure", "success"]);
    let analysis_id = analysis["id"].as_str().expect("id").to_string();

    let (status, fetched) = send(&app, Method::GET, &format!("/api/analysis/{analysis_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], analysis_id.as_str());

    let (status, first) = send(
        &app,
        Method::POST,
        "/api/chat",
        Some(json!({ "message": "What was the blood pressure?", "analysisId": analysis_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["messageCount"], 1);
    let conversation_id = first["conversationId"].as_str().expect("id").to_string();

    let (status, second) = send(
        &app,
        Method::POST,
        "/api/chat",
        Some(json!({
            "message": "Is that normal?",
            "analysisId": analysis_id,
            "conversationId": conversation_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["conversationId"], conversation_id.as_str());
    assert_eq!(second["messageCount"], 2);
    chat_mock.assert_hits_async(2).await;

    let (status, history) = send(&app, Method::GET, &format!("/api/chat/{conversation_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["messageCount"], 2);
    assert_eq!(history["history"][0]["userMessage"], "What was the blood pressure?");
    assert_eq!(history["history"][1]["userMessage"], "Is that normal?");

    let (_, metrics) = send(&app, Method::GET, "/metrics", None).await;
    assert_eq!(metrics["analysesCompleted"], 1);
    assert_eq!(metrics["chatTurns"], 2);
    assert_eq!(metrics["documentsFailed"], 1);

    let (status, cleared) = send(&app, Method::DELETE, "/api/chat", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["count"], 1);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/analysis/{analysis_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, missing) = send(&app, Method::GET, &format!("/api/analysis/{analysis_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["error"], "Analysis not found");
}

#[tokio::test]
async fn empty_aggregate_is_rejected_without_generation() {
    let server = MockServer::start_async().await;
    let any_call = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(completion("unused"));
        })
        .await;
    let app = router_for(&server);
    let dir = TempDir::new().expect("tempdir");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/analysis",
        Some(json!({
            "files": [
                stored(&dir, "notes.txt", b"   \n\t"),
                stored(&dir, "xray.png", b"\x89PNG"),
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["documents"].as_array().expect("documents").len(), 2);
    assert_eq!(
        body["documents"][1]["outcome"]["reason"],
        "Unsupported file type: .png"
    );
    any_call.assert_hits_async(0).await;
}

#[tokio::test]
async fn provider_failure_commits_nothing() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(500).body("upstream exploded");
        })
        .await;
    let app = router_for(&server);
    let dir = TempDir::new().expect("tempdir");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/analysis",
        Some(json!({ "files": [stored(&dir, "report.txt", b"BP 120/80")] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Generation failed");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/chat",
        Some(json!({ "message": "hello", "medicalContext": "BP 120/80" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, metrics) = send(&app, Method::GET, "/metrics", None).await;
    assert_eq!(metrics["analysesCompleted"], 0);
    assert_eq!(metrics["chatTurns"], 0);
    assert_eq!(metrics["generationFailures"], 2);
}

#[tokio::test]
async fn invalid_requests_are_bad_requests() {
    let server = MockServer::start_async().await;
    let app = router_for(&server);

    let (status, body) = send(&app, Method::POST, "/api/analysis", Some(json!({ "files": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid input");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/chat",
        Some(json!({ "message": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/chat",
        Some(json!({ "medicalContext": "BP 120/80" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid input");

    let (status, body) = send(&app, Method::GET, "/api/chat/never-issued", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Conversation not found");
}
