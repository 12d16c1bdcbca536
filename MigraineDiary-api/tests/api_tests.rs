use std::sync::{Arc, Once};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use migraine_diary_api::{create_app, AppState, Clients};
use migraine_diary_domain::auth::token::generate_token;
use migraine_diary_domain::auth::CRON_SECRET_HEADER;
use migraine_diary_domain::config::AppConfig;
use migraine_diary_domain::database::DatabasePool;
use migraine_diary_domain::testing::{FakeLlmClient, FakeWeatherProvider, RecordingPushSender};

const CRON_SECRET: &str = "cron-test-secret";

static INIT: Once = Once::new();

fn initialize() {
    INIT.call_once(|| {
        std::env::set_var("JWT_SECRET", "api_tests_secret_key");
    });
}

fn test_app() -> Router {
    initialize();

    let config = AppConfig {
        cron_secret: Some(CRON_SECRET.to_string()),
        ..AppConfig::default()
    };
    let clients = Clients {
        weather: Arc::new(FakeWeatherProvider::new()),
        push: Arc::new(RecordingPushSender::new()),
        llm: Arc::new(FakeLlmClient::answering("Attacks cluster after poor sleep.")),
    };
    let pool = DatabasePool::in_memory().expect("in-memory database");
    create_app(AppState::new(&config, pool, clients))
}

fn token_for(user: &str) -> String {
    initialize();
    generate_token(user).expect("token")
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, token, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_reports_database() {
    let app = test_app();
    let (status, body) = send_json(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["components"]["database"]["status"], "ok");
    // No LLM key in the default config
    assert_eq!(body["components"]["llm"]["status"], "degraded");
}

#[tokio::test]
async fn test_diary_routes_require_token() {
    let app = test_app();

    let (status, body) = send_json(&app, Method::GET, "/api/v1/entries", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = send_json(&app, Method::GET, "/api/v1/entries", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_entry_lifecycle() {
    let app = test_app();
    let token = token_for("user-entries");

    let (status, created) = send_json(
        &app,
        Method::POST,
        "/api/v1/entries",
        Some(&token),
        Some(json!({
            "pain_level": 7,
            "pain_location": "left temple",
            "triggers": ["Stress", "stress", "bright light"],
            "medications": ["Ibuprofen"],
            "notes": "woke up with it"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["pain_level"], 7);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, page) = send_json(&app, Method::GET, "/api/v1/entries", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["count"], 1);
    assert_eq!(page["limit"], 100);

    let (status, updated) = send_json(
        &app,
        Method::PUT,
        &format!("/api/v1/entries/{}", id),
        Some(&token),
        Some(json!({ "pain_level": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["pain_level"], 4);
    assert_eq!(updated["pain_location"], "left temple");

    let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/entries/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send_json(&app, Method::GET, &format!("/api/v1/entries/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_invalid_entry_is_rejected() {
    let app = test_app();
    let token = token_for("user-invalid");

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/api/v1/entries",
        Some(&token),
        Some(json!({ "pain_level": 11 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/api/v1/entries",
        Some(&token),
        Some(json!({ "pain_level": "high" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_entries_are_scoped_to_their_owner() {
    let app = test_app();
    let owner = token_for("user-owner");
    let other = token_for("user-other");

    let (_, created) = send_json(
        &app,
        Method::POST,
        "/api/v1/entries",
        Some(&owner),
        Some(json!({ "pain_level": 5 })),
    )
    .await;
    let uri = format!("/api/v1/entries/{}", created["id"].as_str().unwrap());

    let (status, _) = send_json(&app, Method::GET, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, page) = send_json(&app, Method::GET, "/api/v1/entries", Some(&other), None).await;
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn test_cron_routes_check_secret() {
    let app = test_app();

    let (status, _) = send_json(&app, Method::POST, "/cron/reminders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/cron/reminders")
        .header(CRON_SECRET_HEADER, CRON_SECRET)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let report: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(report["claimed"], 0);
}

#[tokio::test]
async fn test_doctor_share_flow() {
    let app = test_app();
    let token = token_for("user-share");
    let today = Utc::now().date_naive();

    send_json(
        &app,
        Method::POST,
        "/api/v1/entries",
        Some(&token),
        Some(json!({ "pain_level": 6, "notes": "private" })),
    )
    .await;

    let share_request = json!({
        "from_date": (today - Duration::days(7)).to_string(),
        "to_date": today.to_string(),
        "include_notes": false
    });

    // Sharing needs consent first
    let (status, body) = send_json(&app, Method::POST, "/api/v1/shares", Some(&token), Some(share_request.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = send_json(
        &app,
        Method::POST,
        "/api/v1/consents",
        Some(&token),
        Some(json!({ "consent_type": "doctor_sharing", "version": "1.0" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, share) = send_json(&app, Method::POST, "/api/v1/shares", Some(&token), Some(share_request)).await;
    assert_eq!(status, StatusCode::CREATED);
    let code = share["code"].as_str().unwrap().to_string();
    let id = share["id"].as_str().unwrap().to_string();

    // The code is the credential; lowercase input is accepted
    let (status, diary) = send_json(&app, Method::GET, &format!("/share/{}", code.to_lowercase()), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(diary["entries"].as_array().unwrap().len(), 1);
    assert!(diary["entries"][0]["notes"].is_null());

    let request = Request::builder()
        .uri(format!("/share/{}/pdf", code))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));

    let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/shares/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send_json(&app, Method::GET, &format!("/share/{}", code), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ai_report_requires_consent() {
    let app = test_app();
    let token = token_for("user-ai");

    send_json(
        &app,
        Method::POST,
        "/api/v1/entries",
        Some(&token),
        Some(json!({ "pain_level": 8, "triggers": ["sleep"] })),
    )
    .await;

    let (status, _) = send_json(&app, Method::POST, "/api/v1/reports/ai", Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    send_json(
        &app,
        Method::POST,
        "/api/v1/consents",
        Some(&token),
        Some(json!({ "consent_type": "ai_analysis", "version": "1.0" })),
    )
    .await;

    let (status, report) = send_json(&app, Method::POST, "/api/v1/reports/ai", Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["report"], "Attacks cluster after poor sleep.");
    assert_eq!(report["entry_count"], 1);
}

#[tokio::test]
async fn test_unknown_consent_type_is_bad_request() {
    let app = test_app();
    let token = token_for("user-consent");

    let (status, body) = send_json(&app, Method::DELETE, "/api/v1/consents/marketing", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = send_json(&app, Method::DELETE, "/api/v1/consents/ai_analysis", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pdf_report_download() {
    let app = test_app();
    let token = token_for("user-pdf");

    send_json(
        &app,
        Method::POST,
        "/api/v1/entries",
        Some(&token),
        Some(json!({ "pain_level": 5 })),
    )
    .await;

    let request = Request::builder()
        .uri("/api/v1/reports/pdf")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"migraine-report-"));
}

#[tokio::test]
async fn test_account_export_and_erasure() {
    let app = test_app();
    let token = token_for("user-account");

    send_json(
        &app,
        Method::POST,
        "/api/v1/entries",
        Some(&token),
        Some(json!({ "pain_level": 3 })),
    )
    .await;
    send_json(
        &app,
        Method::POST,
        "/api/v1/medications",
        Some(&token),
        Some(json!({ "name": "Sumatriptan" })),
    )
    .await;

    let (status, export) = send_json(&app, Method::GET, "/api/v1/account/export", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(export["user_id"], "user-account");
    assert_eq!(export["entries"].as_array().unwrap().len(), 1);
    assert_eq!(export["medications"].as_array().unwrap().len(), 1);

    let (status, report) = send_json(&app, Method::DELETE, "/api/v1/account", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total"], 2);

    let (_, page) = send_json(&app, Method::GET, "/api/v1/entries", Some(&token), None).await;
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = test_app();
    let (status, doc) = send_json(&app, Method::GET, "/api-docs/openapi.json", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/v1/entries"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearer"].is_object());
}
