//! OpenAI Assistants v2 backend.
//!
//! Speaks the hosted `/threads`, `/assistants`, `/files` and `/vector_stores`
//! endpoints. All OpenAI wire types are private to this module; callers only
//! see the shared types from [`super`]. Every request carries the bearer key
//! and the `OpenAI-Beta: assistants=v2` header.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::{StreamExt, stream};
use reqwest::{Client, Method, RequestBuilder, multipart};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error, trace};

use super::sse::{SseDecoder, SseFrame};
use super::{
    AssistantInfo, FileDescriptor, IndexInfo, ProviderError, RunEvent, RunEventStream, RunSnapshot,
    RunStatus,
};

const ASSISTANTS_BETA: &str = "assistants=v2";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// How many recent messages to scan for the assistant's reply.
const REPLY_SCAN_LIMIT: &str = "20";
const FILE_LIST_LIMIT: &str = "100";

// ── Public provider ───────────────────────────────────────────────────────────

/// Client for the hosted Assistants API.
///
/// Cheap to clone: `reqwest::Client` is an `Arc` internally.
#[derive(Clone)]
pub struct OpenAiAssistants {
    client: Client,
    api_base_url: String,
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for OpenAiAssistants {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAssistants")
            .field("api_base_url", &self.api_base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OpenAiAssistants {
    /// `timeout_seconds` bounds each non-streaming call. Streaming runs have
    /// no total timeout here; the conversation layer enforces an idle ceiling.
    pub fn new(api_base_url: String, api_key: String, timeout_seconds: u64) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout: Duration::from_secs(timeout_seconds),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{path}", self.api_base_url))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", ASSISTANTS_BETA)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T, ProviderError> {
        let response = req.timeout(self.timeout).send().await.map_err(|e| {
            error!(call = what, error = %e, "provider request failed (transport)");
            ProviderError::Transport(e.to_string())
        })?;

        let response = check_status(response).await?;

        response.json::<T>().await.map_err(|e| {
            error!(call = what, error = %e, "failed to deserialize provider response");
            ProviderError::Decode(format!("{what}: {e}"))
        })
    }

    pub async fn create_thread(&self) -> Result<String, ProviderError> {
        let thread: IdObject = self
            .send_json(self.request(Method::POST, "threads").json(&json!({})), "create thread")
            .await?;
        debug!(thread_id = %thread.id, "thread created");
        Ok(thread.id)
    }

    pub async fn post_message(&self, thread_id: &str, content: &str) -> Result<(), ProviderError> {
        let req = self
            .request(Method::POST, &format!("threads/{thread_id}/messages"))
            .json(&json!({ "role": "user", "content": content }));
        let message: IdObject = self.send_json(req, "post message").await?;
        debug!(%thread_id, message_id = %message.id, content_len = content.len(), "message posted");
        Ok(())
    }

    pub async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunSnapshot, ProviderError> {
        let req = self
            .request(Method::POST, &format!("threads/{thread_id}/runs"))
            .json(&json!({ "assistant_id": assistant_id }));
        let run: RunObject = self.send_json(req, "create run").await?;
        debug!(%thread_id, run_id = %run.id, status = ?run.status, "run created");
        Ok(run.into())
    }

    pub async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<RunSnapshot, ProviderError> {
        let req = self.request(Method::GET, &format!("threads/{thread_id}/runs/{run_id}"));
        let run: RunObject = self.send_json(req, "retrieve run").await?;
        trace!(%thread_id, %run_id, status = ?run.status, "run polled");
        Ok(run.into())
    }

    pub async fn latest_reply(&self, thread_id: &str) -> Result<String, ProviderError> {
        let req = self
            .request(Method::GET, &format!("threads/{thread_id}/messages"))
            .query(&[("order", "desc"), ("limit", REPLY_SCAN_LIMIT)]);
        let list: MessageList = self.send_json(req, "list messages").await?;

        list.data
            .into_iter()
            .find(|m| m.role == "assistant")
            .map(|m| {
                m.content
                    .into_iter()
                    .filter(|c| c.kind == "text")
                    .filter_map(|c| c.text.map(|t| t.value))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ProviderError::Decode("thread has no assistant reply".into()))
    }

    pub async fn stream_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunEventStream, ProviderError> {
        let req = self
            .request(Method::POST, &format!("threads/{thread_id}/runs"))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&json!({ "assistant_id": assistant_id, "stream": true }));

        let response = req.send().await.map_err(|e| {
            error!(%thread_id, error = %e, "stream run request failed (transport)");
            ProviderError::Transport(e.to_string())
        })?;
        let response = check_status(response).await?;
        debug!(%thread_id, %assistant_id, "run stream opened");

        let bytes = Box::pin(response.bytes_stream());
        let events = stream::unfold(
            Some((bytes, SseDecoder::default(), VecDeque::new())),
            |state| async move {
                let (mut bytes, mut decoder, mut pending) = state?;
                loop {
                    if let Some(item) = pending.pop_front() {
                        return Some((item, Some((bytes, decoder, pending))));
                    }
                    match bytes.next().await {
                        Some(Ok(chunk)) => {
                            pending.extend(decoder.feed(&chunk).into_iter().filter_map(run_event_from_frame));
                        }
                        Some(Err(e)) => {
                            return Some((Err(ProviderError::Transport(e.to_string())), None));
                        }
                        None => return None,
                    }
                }
            },
        );

        Ok(events.boxed())
    }

    pub async fn retrieve_assistant(&self, assistant_id: &str) -> Result<AssistantInfo, ProviderError> {
        let req = self.request(Method::GET, &format!("assistants/{assistant_id}"));
        let a: AssistantObject = self.send_json(req, "retrieve assistant").await?;
        Ok(AssistantInfo { id: a.id, name: a.name, model: a.model })
    }

    pub async fn upload_file(&self, bytes: Vec<u8>, filename: &str) -> Result<FileDescriptor, ProviderError> {
        let size = bytes.len();
        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = multipart::Form::new().text("purpose", "assistants").part("file", part);

        let file: FileObject = self
            .send_json(self.request(Method::POST, "files").multipart(form), "upload file")
            .await?;
        debug!(file_id = %file.id, %filename, size, "file uploaded");
        Ok(file.into())
    }

    pub async fn attach_file(&self, vector_store_id: &str, file_id: &str) -> Result<(), ProviderError> {
        let req = self
            .request(Method::POST, &format!("vector_stores/{vector_store_id}/files"))
            .json(&json!({ "file_id": file_id }));
        let attached: VectorStoreFileObject = self.send_json(req, "attach file").await?;
        debug!(%vector_store_id, file_id = %attached.id, status = ?attached.status, "file attached");
        Ok(())
    }

    pub async fn list_index_files(&self, vector_store_id: &str) -> Result<Vec<FileDescriptor>, ProviderError> {
        let req = self
            .request(Method::GET, &format!("vector_stores/{vector_store_id}/files"))
            .query(&[("limit", FILE_LIST_LIMIT)]);
        let list: VectorStoreFileList = self.send_json(req, "list vector store files").await?;
        Ok(list
            .data
            .into_iter()
            .map(|f| FileDescriptor {
                file_id: f.id,
                filename: None,
                bytes: f.usage_bytes,
                status: f.status,
                created_at: f.created_at,
            })
            .collect())
    }

    pub async fn retrieve_index(&self, vector_store_id: &str) -> Result<IndexInfo, ProviderError> {
        let req = self.request(Method::GET, &format!("vector_stores/{vector_store_id}"));
        let vs: VectorStoreObject = self.send_json(req, "retrieve vector store").await?;
        Ok(IndexInfo {
            external_vector_store_id: vs.id,
            name: vs.name,
            file_count: vs.file_counts.total,
            completed: vs.file_counts.completed,
            in_progress: vs.file_counts.in_progress,
            failed: vs.file_counts.failed,
        })
    }
}

// ── Stream event mapping ──────────────────────────────────────────────────────

fn run_event_from_frame(frame: SseFrame) -> Option<Result<RunEvent, ProviderError>> {
    let event = frame.event.as_deref()?;
    match event {
        "thread.message.delta" => {
            let parsed: MessageDeltaEvent = match serde_json::from_str(&frame.data) {
                Ok(p) => p,
                Err(e) => return Some(Err(ProviderError::Decode(format!("message delta: {e}")))),
            };
            let text: String = parsed
                .delta
                .content
                .into_iter()
                .filter(|c| c.kind == "text")
                .filter_map(|c| c.text.and_then(|t| t.value))
                .collect();
            (!text.is_empty()).then(|| Ok(RunEvent::TextDelta(text)))
        }
        "thread.run.completed" => Some(Ok(RunEvent::Completed)),
        "thread.run.failed" => {
            let reason = serde_json::from_str::<RunObject>(&frame.data)
                .ok()
                .and_then(|r| r.last_error)
                .map(|e| e.describe())
                .unwrap_or_else(|| "run failed".to_string());
            Some(Ok(RunEvent::Failed(reason)))
        }
        "thread.run.cancelled" => Some(Ok(RunEvent::Failed("run cancelled".into()))),
        "thread.run.expired" => Some(Ok(RunEvent::Failed("run expired".into()))),
        "thread.run.incomplete" => Some(Ok(RunEvent::Failed("run incomplete".into()))),
        "thread.run.requires_action" => Some(Ok(RunEvent::Failed(
            "run requires action, which personas do not support".into(),
        ))),
        "error" => {
            let message = serde_json::from_str::<serde_json::Value>(&frame.data)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
                .unwrap_or(frame.data);
            Some(Ok(RunEvent::Failed(message)))
        }
        other => {
            trace!(event = other, "ignoring run stream event");
            None
        }
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct IdObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    id: String,
    status: RunStatus,
    #[serde(default)]
    last_error: Option<LastError>,
}

#[derive(Debug, Deserialize)]
struct LastError {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

impl LastError {
    fn describe(&self) -> String {
        match &self.code {
            Some(code) => format!("{code}: {}", self.message),
            None => self.message.clone(),
        }
    }
}

impl From<RunObject> for RunSnapshot {
    fn from(run: RunObject) -> Self {
        RunSnapshot {
            id: run.id,
            status: run.status,
            last_error: run.last_error.map(|e| e.describe()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<MessageObject>,
}

#[derive(Debug, Deserialize)]
struct MessageObject {
    role: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: String,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaEvent {
    delta: MessageDelta,
}

#[derive(Debug, Deserialize)]
struct MessageDelta {
    #[serde(default)]
    content: Vec<DeltaContent>,
}

#[derive(Debug, Deserialize)]
struct DeltaContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<DeltaText>,
}

#[derive(Debug, Deserialize)]
struct DeltaText {
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantObject {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileObject {
    id: String,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    bytes: Option<u64>,
    #[serde(default)]
    created_at: Option<i64>,
    #[serde(default)]
    status: Option<String>,
}

impl From<FileObject> for FileDescriptor {
    fn from(f: FileObject) -> Self {
        FileDescriptor {
            file_id: f.id,
            filename: f.filename,
            bytes: f.bytes,
            status: f.status,
            created_at: f.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct VectorStoreFileObject {
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    created_at: Option<i64>,
    #[serde(default)]
    usage_bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct VectorStoreFileList {
    data: Vec<VectorStoreFileObject>,
}

#[derive(Debug, Deserialize)]
struct VectorStoreObject {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    file_counts: FileCounts,
}

#[derive(Debug, Default, Deserialize)]
struct FileCounts {
    #[serde(default)]
    in_progress: u64,
    #[serde(default)]
    completed: u64,
    #[serde(default)]
    failed: u64,
    #[serde(default)]
    total: u64,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Consume the response and return it if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(env) => {
            let code = env
                .error
                .code
                .map(|v| match v {
                    serde_json::Value::String(s) => format!(" [code={s}]"),
                    other => format!(" [code={other}]"),
                })
                .unwrap_or_default();
            format!("{}{code}", env.error.message)
        }
        Err(_) => body,
    };

    error!(%status, %message, "provider returned HTTP error");
    Err(ProviderError::Status { status: status.as_u16(), message })
}
