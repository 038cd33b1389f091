//! Axum handlers.
//!
//! Each handler receives [`AppState`] via [`axum::extract::State`]. Failures
//! are returned as [`RelayError`], which renders its own status and JSON body.

use axum::{
    Json,
    extract::{Multipart, Path, State, rejection::JsonRejection},
    extract::multipart::MultipartRejection,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures_util::future::join_all;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::AppState;
use crate::conversation::{FragmentStream, segment};
use crate::error::RelayError;
use crate::personas::{Persona, PersonaSummary};

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(super) struct ChatRequest {
    message: String,
    #[serde(default)]
    thread_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StreamChatRequest {
    message: String,
    #[serde(default)]
    thread_id: Option<String>,
    #[serde(default = "default_buffer_by_sentence")]
    buffer_by_sentence: bool,
}

fn default_buffer_by_sentence() -> bool {
    true
}

/// One SSE `data:` payload. Kept compact; the keys are what browser clients
/// already parse.
#[derive(Debug, Serialize)]
#[serde(tag = "t")]
enum StreamFrame {
    #[serde(rename = "s")]
    Start { tid: String },
    #[serde(rename = "c")]
    Chunk { d: String, tid: String },
    #[serde(rename = "d")]
    Done { tid: String },
    #[serde(rename = "e")]
    Error { e: String, tid: String },
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn parse_agent_id(raw: &str) -> Result<u32, RelayError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| RelayError::Validation(format!("agent id must be a positive integer, got '{raw}'")))
}

fn persona<'a>(state: &'a AppState, raw_id: &str) -> Result<&'a Persona, RelayError> {
    state.registry.get(parse_agent_id(raw_id)?)
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, RelayError> {
    body.map(|Json(v)| v).map_err(|e| RelayError::Validation(e.body_text()))
}

fn require_message(message: &str) -> Result<(), RelayError> {
    if message.trim().is_empty() {
        return Err(RelayError::Validation("message must not be blank".into()));
    }
    Ok(())
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /
pub(super) async fn root(State(state): State<AppState>) -> Response {
    Json(json!({
        "message": "Persona Relay API",
        "version": env!("CARGO_PKG_VERSION"),
        "agents": state.registry.len(),
    }))
    .into_response()
}

/// GET /health
pub(super) async fn health() -> Response {
    Json(json!({ "status": "healthy" })).into_response()
}

/// GET /api/agents
pub(super) async fn list_agents(State(state): State<AppState>) -> Response {
    let agents: Vec<PersonaSummary> = state.registry.list().map(PersonaSummary::from).collect();
    Json(agents).into_response()
}

/// GET /api/agents/{id}
pub(super) async fn get_agent(State(state): State<AppState>, Path(raw_id): Path<String>) -> Result<Response, RelayError> {
    let persona = persona(&state, &raw_id)?;
    Ok(Json(persona).into_response())
}

/// POST /api/agents/initialize — check every persona's assistant with the
/// provider. Nothing is created; the assistants already exist remotely.
pub(super) async fn initialize_agents(State(state): State<AppState>) -> Response {
    let personas: Vec<&Persona> = state.registry.list().collect();
    let checks = join_all(personas.iter().map(|p| state.conversations.verify_assistant(p))).await;

    let agents: Vec<serde_json::Value> = personas
        .iter()
        .zip(&checks)
        .map(|(p, check)| {
            json!({
                "agent_id": p.id,
                "name": p.display_name,
                "role": p.role,
                "assistant_id": p.external_assistant_id,
                "is_ready": check.is_ok(),
            })
        })
        .collect();
    let ready = checks.iter().filter(|c| c.is_ok()).count();
    info!(ready, total = personas.len(), "persona assistants verified");

    Json(json!({
        "message": format!("{ready} of {} agents ready", personas.len()),
        "agents_created": ready,
        "shared_vector_store_id": state.documents.vector_store_id(),
        "agents": agents,
    }))
    .into_response()
}

/// POST /api/agents/{id}/chat
pub(super) async fn chat(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, RelayError> {
    let persona = persona(&state, &raw_id)?;
    let req = json_body(body)?;
    require_message(&req.message)?;

    let thread_id = state.conversations.ensure_thread(req.thread_id.as_deref()).await?;
    let response = state.conversations.send(persona, &thread_id, &req.message).await?;

    Ok(Json(json!({
        "agent_id": persona.id,
        "agent_name": persona.display_name,
        "response": response,
        "thread_id": thread_id,
    }))
    .into_response())
}

/// POST /api/agents/{id}/chat/stream
///
/// Thread creation and message posting finish before the response starts, so
/// those failures still get a proper status code. Later failures arrive as a
/// final `"e"` frame.
pub(super) async fn chat_stream(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<StreamChatRequest>, JsonRejection>,
) -> Result<Response, RelayError> {
    let persona = persona(&state, &raw_id)?;
    let req = json_body(body)?;
    require_message(&req.message)?;

    let thread_id = state.conversations.ensure_thread(req.thread_id.as_deref()).await?;
    let fragments = state
        .conversations
        .send_streaming(persona, &thread_id, &req.message)
        .await?;
    let fragments = if req.buffer_by_sentence {
        segment::by_sentence(fragments)
    } else {
        fragments
    };
    debug!(agent_id = persona.id, %thread_id, buffered = req.buffer_by_sentence, "streaming reply");

    let events = frames(thread_id, fragments).map(|frame| Event::default().json_data(frame));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()).into_response())
}

enum Phase {
    Start(FragmentStream),
    Body(FragmentStream),
    Finished,
}

/// Start frame, one chunk per fragment, then either a done or an error frame.
fn frames(tid: String, fragments: FragmentStream) -> BoxStream<'static, StreamFrame> {
    stream::unfold(Phase::Start(fragments), move |phase| {
        let tid = tid.clone();
        async move {
            match phase {
                Phase::Start(f) => Some((StreamFrame::Start { tid }, Phase::Body(f))),
                Phase::Body(mut f) => match f.next().await {
                    Some(Ok(d)) => Some((StreamFrame::Chunk { d, tid }, Phase::Body(f))),
                    Some(Err(e)) => Some((StreamFrame::Error { e: e.to_string(), tid }, Phase::Finished)),
                    None => Some((StreamFrame::Done { tid }, Phase::Finished)),
                },
                Phase::Finished => None,
            }
        }
    })
    .boxed()
}

/// POST /api/agents/{id}/upload-file — multipart field `file`.
pub(super) async fn upload_file(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, RelayError> {
    persona(&state, &raw_id)?;
    let mut multipart = multipart.map_err(|e| RelayError::Validation(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RelayError::Validation(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| RelayError::Validation(e.body_text()))?;

        let file_id = state.documents.upload(bytes.to_vec(), &filename).await?;
        return Ok(Json(json!({ "file_id": file_id, "filename": filename })).into_response());
    }

    Err(RelayError::Validation("multipart field 'file' is missing".into()))
}

/// GET /api/agents/{id}/files
pub(super) async fn list_files(State(state): State<AppState>, Path(raw_id): Path<String>) -> Result<Response, RelayError> {
    persona(&state, &raw_id)?;
    let files = state.documents.list_for_index().await?;
    Ok(Json(files).into_response())
}

/// GET /api/agents/shared/vector-store
pub(super) async fn shared_vector_store(State(state): State<AppState>) -> Result<Response, RelayError> {
    let info = state.documents.index_info().await?;
    Ok(Json(info).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_id_must_be_unsigned() {
        assert_eq!(parse_agent_id("7").unwrap(), 7);
        assert!(matches!(parse_agent_id("abc"), Err(RelayError::Validation(_))));
        assert!(matches!(parse_agent_id("-1"), Err(RelayError::Validation(_))));
    }

    #[test]
    fn frames_serialize_compactly() {
        let s = serde_json::to_string(&StreamFrame::Chunk { d: "Hi.".into(), tid: "thread_1".into() }).unwrap();
        assert_eq!(s, r#"{"t":"c","d":"Hi.","tid":"thread_1"}"#);
        let s = serde_json::to_string(&StreamFrame::Error { e: "boom".into(), tid: "thread_1".into() }).unwrap();
        assert_eq!(s, r#"{"t":"e","e":"boom","tid":"thread_1"}"#);
    }

    #[tokio::test]
    async fn frame_sequence_ends_with_done_or_error() {
        let ok: FragmentStream = stream::iter(vec![Ok("a".to_string()), Ok("b".to_string())]).boxed();
        let tags: Vec<String> = frames("t1".into(), ok)
            .map(|f| serde_json::to_value(f).unwrap()["t"].as_str().unwrap().to_string())
            .collect()
            .await;
        assert_eq!(tags, vec!["s", "c", "c", "d"]);

        let failing: FragmentStream = stream::iter(vec![
            Ok("a".to_string()),
            Err(RelayError::Upstream("run failed".into())),
        ])
        .boxed();
        let tags: Vec<String> = frames("t1".into(), failing)
            .map(|f| serde_json::to_value(f).unwrap()["t"].as_str().unwrap().to_string())
            .collect()
            .await;
        assert_eq!(tags, vec!["s", "c", "e"]);
    }
}
