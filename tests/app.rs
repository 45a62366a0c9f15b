#![cfg(feature = "web")]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use toolbench::ai::{AiError, ModelProvider, ModelReply, ModelRequest};
use toolbench::app::{AppState, router};
use toolbench::config::Config;
use toolbench::converter::pdf::{PdfEngine, RenderedPage};
use toolbench::converter::{ConvertError, Converter};
use toolbench::storage::Storage;

struct MockEngine;

impl PdfEngine for MockEngine {
    fn page_texts(&self, _pdf: &[u8]) -> Result<Vec<String>, ConvertError> {
        Ok(vec!["Hello from page one".to_string()])
    }

    fn render_pages(&self, _pdf: &[u8]) -> Result<Vec<RenderedPage>, ConvertError> {
        Err(ConvertError::Pdf("rendering is not available in tests".to_string()))
    }
}

/// Answers by looking at the prompt, like a very obliging model
struct MockProvider;

#[async_trait]
impl ModelProvider for MockProvider {
    async fn generate(&self, request: ModelRequest) -> Result<ModelReply, AiError> {
        if request.prompt.contains("Summarize") {
            return Ok(ModelReply::text("not json at all"));
        }
        if request.prompt.contains("book") {
            return Ok(ModelReply::text(
                r#"{"title":"Emma","summary":"Matchmaking.","keyPoints":[],"themes":["Class"]}"#,
            ));
        }
        Ok(ModelReply::text(r#"{"translatedText":"Hallo"}"#))
    }
}

fn app_with(provider: Option<Arc<dyn ModelProvider>>) -> Router {
    let state = AppState::new(
        Config::default(),
        Storage::in_memory(),
        Converter::new(MockEngine),
        provider,
    );
    router(Arc::new(state))
}

fn app() -> Router {
    app_with(Some(Arc::new(MockProvider)))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn upload(uri: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "toolbench-test-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::post(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn landing_page_lists_tools() {
    let app = app();
    let (status, body) = send(&app, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("/tools/unit-converter"));
    assert!(html.contains("<h2>Document Tools</h2>"));
}

#[tokio::test]
async fn sitemap_is_xml() {
    let app = app();
    let response = app
        .clone()
        .oneshot(Request::get("/sitemap.xml").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/xml")
    );
}

#[tokio::test]
async fn tools_can_be_searched_and_filtered() {
    let app = app();
    let (status, tools) = get_json(&app, "/api/tools?q=ocr").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tools.as_array().map(Vec::len), Some(1));
    assert_eq!(tools[0]["id"], "image-to-text");

    let (status, _) = get_json(&app, "/api/tools?category=gardening").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, tool) = get_json(&app, "/api/tools/secure-notes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tool["ai_powered"], false);
    assert_eq!(tool["category"], "security");

    let (status, _) = get_json(&app, "/api/tools/time-machine").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unit_conversion_reports_inline_errors() {
    let app = app();
    let (status, body) = post_json(
        &app,
        "/api/units/convert",
        json!({"category": "temperature", "value": "100", "from": "Celsius", "to": "Fahrenheit"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["formatted"], "212");

    let (status, body) = post_json(
        &app,
        "/api/units/convert",
        json!({"category": "length", "value": "ten", "from": "Meter", "to": "Foot"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Please enter a valid number");

    let (status, units) = get_json(&app, "/api/units/temperature").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(units["units"], json!(["Celsius", "Fahrenheit", "Kelvin"]));
}

#[tokio::test]
async fn password_batches_are_kept() {
    let app = app();
    let (status, body) = post_json(&app, "/api/password/generate", json!({"length": 20, "count": 3})).await;
    assert_eq!(status, StatusCode::OK);
    let batch = body["passwords"].as_array().cloned().unwrap_or_default();
    assert_eq!(batch.len(), 3);
    assert!(batch.iter().all(|p| p.as_str().map(str::len) == Some(20)));

    let (_, last) = get_json(&app, "/api/password/last-batch").await;
    assert_eq!(last, Value::Array(batch));

    let (status, body) = post_json(&app, "/api/password/generate", json!({"length": 8})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "password");

    let (status, body) = post_json(
        &app,
        "/api/password/generate",
        json!({"uppercase": false, "lowercase": false, "numbers": false, "symbols": false}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please select at least one character type");

    let (_, report) = post_json(&app, "/api/password/strength", json!({"password": "password"})).await;
    assert_eq!(report["level"], "VeryWeak");
}

#[tokio::test]
async fn csv_and_json_convert_both_ways() {
    let app = app();
    let request = Request::post("/api/csv-to-json").body(Body::from("a,b\n1,2")).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value, json!([{"a": "1", "b": "2"}]));

    let request = Request::post("/api/json-to-csv").body(Body::from("{\"a\":1}")).unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn document_conversion_downloads_and_records_history() {
    let app = app();
    let response = app
        .clone()
        .oneshot(upload("/api/convert/pdf-to-docx", "letter.pdf", b"%PDF-1.4"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"letter.txt\""
    );
    assert!(response.headers().contains_key("x-fidelity-note"));
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&body).contains("Hello from page one"));

    let (status, _) = send(&app, upload("/api/convert/pdf-to-pptx", "letter.pdf", b"%PDF-1.4")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, history) = get_json(&app, "/api/convert/pdf-to-docx/history").await;
    assert_eq!(history[0]["fileName"], "letter.pdf");
    assert_eq!(history[0]["status"], "success");

    let (_, history) = get_json(&app, "/api/convert/pdf-to-pptx/history").await;
    assert_eq!(history[0]["status"], "error");

    let (_, task) = get_json(&app, "/api/tasks/pdf-to-pptx").await;
    assert_eq!(task["state"], "error");
}

#[tokio::test]
async fn conversion_errors_map_to_status_codes() {
    let app = app();
    let (status, body) = send(&app, upload("/api/convert/docx-to-odt", "a.docx", b"x")).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "error");

    let (status, _) = send(&app, upload("/api/convert/docx-to-pdf", "photo.png", b"png")).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let (status, _) = get_json(&app, "/api/tasks/never-ran").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ai_flows_run_through_the_provider() {
    let app = app();
    let (status, body) = post_json(
        &app,
        "/api/ai/translate",
        json!({"text": "Hello", "targetLanguage": "German"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["translatedText"], "Hallo");

    let (_, task) = get_json(&app, "/api/tasks/ai-translator").await;
    assert_eq!(task["state"], "success");

    let (status, _) = post_json(&app, "/api/ai/translate", json!({"text": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(&app, "/api/ai/poetry", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn off_schema_replies_fall_back_or_fail() {
    let app = app();
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/ai/summarize")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"text": "long text"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ai-fallback"], "true");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["summary"], "Summary unavailable. Please try again.");
}

#[tokio::test]
async fn book_summaries_are_remembered() {
    let app = app();
    let (status, _) = get_json(&app, "/api/ai/book-summary/last").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = post_json(&app, "/api/ai/book-summary", json!({"title": "Emma"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], "Matchmaking.");

    let (status, last) = get_json(&app, "/api/ai/book-summary/last").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(last["title"], "Emma");
}

#[tokio::test]
async fn ai_without_a_provider_is_unavailable() {
    let app = app_with(None);
    let (status, body) = post_json(
        &app,
        "/api/ai/translate",
        json!({"text": "Hello", "targetLanguage": "German"}),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

async fn notes_request(app: &Router, method: Method, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, bearer(token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn open_vault(app: &Router, password: &str) -> String {
    let (code, body) = post_json(app, "/api/notes/master", json!({ "password": password })).await;
    assert_eq!(code, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn notes_require_an_unlocked_session() {
    let app = app();
    let (_, status) = get_json(&app, "/api/notes/status").await;
    assert_eq!(status, json!({"masterPasswordSet": false, "unlocked": false}));

    let (code, _) = get_json(&app, "/api/notes").await;
    assert_eq!(code, StatusCode::UNAUTHORIZED);

    let token = open_vault(&app, "hunter22!").await;
    let (code, _) = post_json(&app, "/api/notes/master", json!({"password": "hunter22!"})).await;
    assert_eq!(code, StatusCode::CONFLICT);

    let (code, note) = notes_request(
        &app,
        Method::POST,
        "/api/notes",
        &token,
        json!({"title": "Locker", "content": "code 1904", "category": "Gym"}),
    )
    .await;
    assert_eq!(code, StatusCode::CREATED);
    let id = note["id"].as_str().unwrap_or_default().to_string();

    let uri = format!("/api/notes/{id}");
    let (code, updated) = notes_request(
        &app,
        Method::PUT,
        &uri,
        &token,
        json!({"title": "Locker", "content": "code 2024"}),
    )
    .await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(updated["category"], "General");

    let (code, _) = notes_request(&app, Method::POST, "/api/notes/lock", &token, json!({})).await;
    assert_eq!(code, StatusCode::OK);
    let (code, _) = notes_request(&app, Method::GET, "/api/notes", &token, Value::Null).await;
    assert_eq!(code, StatusCode::UNAUTHORIZED);

    let (code, _) = post_json(&app, "/api/notes/unlock", json!({"password": "wrong-password"})).await;
    assert_eq!(code, StatusCode::UNAUTHORIZED);
    let (code, body) = post_json(&app, "/api/notes/unlock", json!({"password": "hunter22!"})).await;
    assert_eq!(code, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (_, listing) = notes_request(&app, Method::GET, "/api/notes?q=2024", &token, Value::Null).await;
    assert_eq!(listing["notes"][0]["content"], "code 2024");

    let (code, _) = notes_request(&app, Method::DELETE, &uri, &token, Value::Null).await;
    assert_eq!(code, StatusCode::OK);
    let (code, _) = notes_request(&app, Method::DELETE, &uri, &token, Value::Null).await;
    assert_eq!(code, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unlocked_notes_stay_private_to_the_session() {
    let app = app();
    let token = open_vault(&app, "hunter22!").await;
    notes_request(&app, Method::POST, "/api/notes", &token, json!({"title": "Bank", "content": "PIN 4821"})).await;

    let request = Request::get("/api/notes")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(!String::from_utf8_lossy(&body).contains("4821"));

    let (code, _) = notes_request(&app, Method::GET, "/api/notes", "guessed-token", Value::Null).await;
    assert_eq!(code, StatusCode::UNAUTHORIZED);

    let (_, status) = get_json(&app, "/api/notes/status").await;
    assert_eq!(status["unlocked"], false);
}

#[tokio::test]
async fn cors_only_answers_the_site_origin() {
    let app = app();
    let from = |origin: &'static str| {
        Request::get("/api/tools")
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(from("http://localhost:3000")).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );

    let response = app.clone().oneshot(from("https://evil.example")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn master_password_can_be_changed_and_backed_up() {
    let app = app();
    let token = open_vault(&app, "hunter22!").await;
    notes_request(&app, Method::POST, "/api/notes", &token, json!({"title": "Bank", "content": "PIN 4821"})).await;

    let request = Request::get("/api/notes/backup")
        .header(header::AUTHORIZATION, bearer(&token))
        .body(Body::empty())
        .unwrap();
    let (code, backup) = send(&app, request).await;
    assert_eq!(code, StatusCode::OK);

    let (code, _) = notes_request(
        &app,
        Method::POST,
        "/api/notes/password",
        &token,
        json!({"currentPassword": "wrong-password", "newPassword": "correct horse"}),
    )
    .await;
    assert_eq!(code, StatusCode::UNAUTHORIZED);
    let (code, _) = notes_request(
        &app,
        Method::POST,
        "/api/notes/password",
        &token,
        json!({"currentPassword": "hunter22!", "newPassword": "correct horse"}),
    )
    .await;
    assert_eq!(code, StatusCode::OK);

    let (code, _) = post_json(&app, "/api/notes/unlock", json!({"password": "hunter22!"})).await;
    assert_eq!(code, StatusCode::UNAUTHORIZED);
    let (code, _) = post_json(&app, "/api/notes/unlock", json!({"password": "correct horse"})).await;
    assert_eq!(code, StatusCode::OK);

    // Restoring needs a session and brings back the backup's password
    let request = Request::post("/api/notes/backup").body(Body::from(backup.clone())).unwrap();
    let (code, _) = send(&app, request).await;
    assert_eq!(code, StatusCode::UNAUTHORIZED);

    let request = Request::post("/api/notes/backup")
        .header(header::AUTHORIZATION, bearer(&token))
        .body(Body::from(backup))
        .unwrap();
    let (code, _) = send(&app, request).await;
    assert_eq!(code, StatusCode::OK);

    let (code, body) = post_json(&app, "/api/notes/unlock", json!({"password": "hunter22!"})).await;
    assert_eq!(code, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();
    let (_, listing) = notes_request(&app, Method::GET, "/api/notes", &token, Value::Null).await;
    assert_eq!(listing["notes"][0]["content"], "PIN 4821");
}

#[tokio::test]
async fn configured_upload_limit_applies_to_conversions() {
    let mut config = Config::default();
    config.server.max_upload_bytes = 10;
    let state = AppState::new(config, Storage::in_memory(), Converter::new(MockEngine), None);
    let app = router(Arc::new(state));

    let (code, body) = send(&app, upload("/api/convert/pdf-to-docx", "big.pdf", b"%PDF-1.7 more than ten bytes")).await;
    assert_eq!(code, StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "error");
}
