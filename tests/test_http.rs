//! HTTP-level tests against the router with the scripted provider.
//!
//! Run with:
//!   cargo test --test test_http

use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use persona_relay::conversation::PollSettings;
use persona_relay::http::{AppState, build_router};
use persona_relay::personas::PersonaRegistry;
use persona_relay::provider::scripted::ScriptedProvider;
use persona_relay::provider::{AssistantsProvider, RunStatus};

const VECTOR_STORE: &str = "vs_shared_test";
const BOUNDARY: &str = "relay-test-boundary";

// ── helpers ──────────────────────────────────────────────────────────────────

fn app_with(provider: &ScriptedProvider, ceiling: Duration) -> Router {
    let registry = PersonaRegistry::from_config(&[]).expect("presets load");
    let state = AppState::new(
        registry,
        AssistantsProvider::Scripted(provider.clone()),
        PollSettings { interval: Duration::from_millis(1), ceiling },
        VECTOR_STORE,
    );
    build_router(state, &[])
}

fn app(provider: &ScriptedProvider) -> Router {
    app_with(provider, Duration::from_secs(5))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.expect("router response");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    (status, bytes.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let (status, body) = send(app, req).await;
    (status, serde_json::from_slice(&body).expect("json body"))
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body) = send(app, req).await;
    (status, serde_json::from_slice(&body).expect("json body"))
}

/// POST to the stream endpoint and return every `data:` payload.
async fn post_stream(app: &Router, uri: &str, body: Value) -> Vec<Value> {
    let req = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    String::from_utf8(body)
        .expect("utf-8 event stream")
        .lines()
        .filter_map(|l| l.strip_prefix("data: ").or_else(|| l.strip_prefix("data:")))
        .map(|d| serde_json::from_str(d).expect("frame json"))
        .collect()
}

fn chunks_text(frames: &[Value]) -> String {
    frames
        .iter()
        .filter(|f| f["t"] == "c")
        .map(|f| f["d"].as_str().unwrap_or_default())
        .collect()
}

fn multipart_upload(uri: &str, field: &str, filename: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         {content}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Request::post(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

// ── service ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_and_banner() {
    let app = app(&ScriptedProvider::new());
    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "healthy" }));

    let (status, body) = get_json(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agents"], 10);
}

// ── personas ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn agents_listed_in_id_order() {
    let app = app(&ScriptedProvider::new());
    let (status, body) = get_json(&app, "/api/agents").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<u64> = body.as_array().unwrap().iter().map(|a| a["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, (1..=10).collect::<Vec<_>>());
    assert_eq!(body[0]["display_name"], "Maya");
    assert!(body[0].get("instructions").is_none());
}

#[tokio::test]
async fn every_configured_id_resolves() {
    let app = app(&ScriptedProvider::new());
    for id in 1..=10u64 {
        let (status, body) = get_json(&app, &format!("/api/agents/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id);
    }
}

#[tokio::test]
async fn unknown_or_malformed_id() {
    let app = app(&ScriptedProvider::new());
    let (status, body) = get_json(&app, "/api/agents/11").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = get_json(&app, "/api/agents/maya").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn initialize_reports_readiness_per_agent() {
    let registry = PersonaRegistry::from_config(&[]).unwrap();
    let robert = registry.get(8).unwrap().external_assistant_id.clone();
    let provider = ScriptedProvider::new().with_missing_assistant(robert);
    let app = app(&provider);

    let (status, body) = post_json(&app, "/api/agents/initialize", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agents_created"], 9);
    assert_eq!(body["shared_vector_store_id"], VECTOR_STORE);
    let agents = body["agents"].as_array().unwrap();
    assert_eq!(agents.len(), 10);
    for a in agents {
        assert_eq!(a["is_ready"], a["agent_id"] != 8);
    }
}

// ── chat ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn maya_conversation_keeps_its_thread() {
    let provider = ScriptedProvider::new();
    let app = app(&provider);

    let (status, first) = post_json(
        &app,
        "/api/agents/1/chat",
        json!({ "message": "Hi, I'm from Floral Image with a complimentary arrangement" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["agent_id"], 1);
    assert_eq!(first["agent_name"], "Maya");
    assert!(!first["response"].as_str().unwrap().is_empty());
    let thread_id = first["thread_id"].as_str().expect("thread id").to_string();

    let (status, second) = post_json(
        &app,
        "/api/agents/1/chat",
        json!({ "message": "Yes, complimentary for 1-2 weeks to try", "thread_id": thread_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["thread_id"], thread_id.as_str());

    let posted = provider.posted_messages();
    assert_eq!(posted.len(), 2);
    assert!(posted.iter().all(|m| m.thread_id == thread_id));
    assert_eq!(posted[1].content, "Yes, complimentary for 1-2 weeks to try");
    assert_eq!(provider.issued_threads().len(), 1);
}

#[tokio::test]
async fn omitted_thread_gets_fresh_handle() {
    let provider = ScriptedProvider::new();
    let app = app(&provider);

    let mut seen = Vec::new();
    for _ in 0..3 {
        let (status, body) = post_json(&app, "/api/agents/4/chat", json!({ "message": "How much?" })).await;
        assert_eq!(status, StatusCode::OK);
        let tid = body["thread_id"].as_str().unwrap().to_string();
        assert!(!seen.contains(&tid));
        seen.push(tid);
    }

    let (_, body) = post_json(&app, "/api/agents/4/chat", json!({ "message": "again", "thread_id": "" })).await;
    assert!(!seen.contains(&body["thread_id"].as_str().unwrap().to_string()));
}

#[tokio::test]
async fn chat_validation_errors() {
    let app = app(&ScriptedProvider::new());

    let (status, body) = post_json(&app, "/api/agents/1/chat", json!({ "message": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, _) = post_json(&app, "/api/agents/1/chat", json!({ "thread_id": "thread_x" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(&app, "/api/agents/42/chat", json!({ "message": "hi" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_run_is_bad_gateway() {
    let provider = ScriptedProvider::new().with_run_statuses(vec![RunStatus::Queued, RunStatus::Failed]);
    let app = app(&provider);
    let (status, body) = post_json(&app, "/api/agents/2/chat", json!({ "message": "Is it sanitary?" })).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "upstream");
}

#[tokio::test]
async fn stuck_run_is_gateway_timeout() {
    let provider = ScriptedProvider::new().with_run_statuses(vec![RunStatus::InProgress]);
    let app = app_with(&provider, Duration::from_millis(50));
    let (status, body) = post_json(&app, "/api/agents/2/chat", json!({ "message": "Is it sanitary?" })).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"], "timeout");
}

// ── streaming ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn stream_matches_polled_reply() {
    let reply = "Okay, but I'm busy. What's the catch? We pay $150 a week now.";
    let provider = ScriptedProvider::new().with_reply(reply).with_delta_size(3);
    let app = app(&provider);

    let (_, polled) = post_json(&app, "/api/agents/1/chat", json!({ "message": "Hi" })).await;
    assert_eq!(polled["response"], reply);

    for buffered in [true, false] {
        let frames = post_stream(
            &app,
            "/api/agents/1/chat/stream",
            json!({ "message": "Hi", "buffer_by_sentence": buffered }),
        )
        .await;
        assert_eq!(frames.first().unwrap()["t"], "s");
        assert_eq!(frames.last().unwrap()["t"], "d");
        assert_eq!(chunks_text(&frames), reply, "buffered = {buffered}");

        let tid = frames[0]["tid"].as_str().unwrap();
        assert!(frames.iter().all(|f| f["tid"] == tid));
    }
}

#[tokio::test]
async fn stream_reuses_supplied_thread() {
    let provider = ScriptedProvider::new();
    let app = app(&provider);
    let (_, first) = post_json(&app, "/api/agents/6/chat", json!({ "message": "Got a minute?" })).await;
    let tid = first["thread_id"].as_str().unwrap();

    let frames = post_stream(
        &app,
        "/api/agents/6/chat/stream",
        json!({ "message": "Free trial for the showroom", "thread_id": tid }),
    )
    .await;
    assert_eq!(frames[0]["tid"], tid);
    assert!(provider.posted_messages().iter().all(|m| m.thread_id == tid));
}

#[tokio::test]
async fn stream_failure_ends_with_error_frame() {
    let provider = ScriptedProvider::new().with_run_statuses(vec![RunStatus::Failed]);
    let app = app(&provider);
    let frames = post_stream(&app, "/api/agents/3/chat/stream", json!({ "message": "Hello" })).await;
    let tags: Vec<&str> = frames.iter().map(|f| f["t"].as_str().unwrap()).collect();
    assert_eq!(tags, vec!["s", "e"]);
    assert!(!frames[1]["e"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn stream_setup_errors_keep_status_codes() {
    let app = app(&ScriptedProvider::new());
    let (status, _) = post_json(&app, "/api/agents/99/chat/stream", json!({ "message": "hi" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post_json(
        &app,
        "/api/agents/1/chat/stream",
        json!({ "message": "hi", "thread_id": "thread_unknown" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

// ── documents ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_then_list_shows_file() {
    let provider = ScriptedProvider::new();
    let app = app(&provider);

    let req = multipart_upload("/api/agents/5/upload-file", "file", "case-studies.txt", "Law firm case study");
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["filename"], "case-studies.txt");
    let file_id = body["file_id"].as_str().unwrap().to_string();

    let (status, files) = get_json(&app, "/api/agents/9/files").await;
    assert_eq!(status, StatusCode::OK);
    assert!(files.as_array().unwrap().iter().any(|f| f["file_id"] == file_id.as_str()));

    let (status, store) = get_json(&app, "/api/agents/shared/vector-store").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store["external_vector_store_id"], VECTOR_STORE);
    assert_eq!(store["file_count"], 1);
}

#[tokio::test]
async fn upload_rejections() {
    let provider = ScriptedProvider::new();
    let app = app(&provider);

    let (status, _) = send(&app, multipart_upload("/api/agents/5/upload-file", "document", "a.txt", "x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, multipart_upload("/api/agents/5/upload-file", "file", "empty.txt", "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, multipart_upload("/api/agents/77/upload-file", "file", "a.txt", "x")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert!(provider.uploaded_files().is_empty());
}

#[tokio::test]
async fn attach_failure_is_bad_gateway() {
    let provider = ScriptedProvider::new().with_failing_attach();
    let app = app(&provider);
    let (status, _) = send(&app, multipart_upload("/api/agents/1/upload-file", "file", "a.txt", "x")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}
