//! Assistants API provider abstraction.
//!
//! `AssistantsProvider` is an enum over concrete backends, mirroring the
//! primitives the relay consumes: threads, messages, runs, assistants, files
//! and vector stores. Wire formats stay private to each backend module.
//!
//! Provider instances are shared immutable capabilities — clone them freely.

pub mod openai;
pub mod scripted;
mod sse;

use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ProviderBackend, ProviderConfig};
use crate::error::RelayError;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Transport(String),
    #[error("provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected provider response: {0}")]
    Decode(String),
}

impl From<ProviderError> for RelayError {
    fn from(e: ProviderError) -> Self {
        RelayError::Upstream(e.to_string())
    }
}

// ── Shared types ──────────────────────────────────────────────────────────────

/// Run lifecycle status as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
}

/// Point-in-time view of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSnapshot {
    pub id: String,
    pub status: RunStatus,
    /// Provider-supplied failure detail, if any.
    pub last_error: Option<String>,
}

/// One item of a streamed run, already reduced to what the relay needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    TextDelta(String),
    Completed,
    /// Failed, cancelled, expired or otherwise terminated without a reply.
    Failed(String),
}

pub type RunEventStream = BoxStream<'static, Result<RunEvent, ProviderError>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssistantInfo {
    pub id: String,
    pub name: Option<String>,
    pub model: Option<String>,
}

/// A file as reported by the provider, either freshly uploaded or attached
/// to the shared vector store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDescriptor {
    pub file_id: String,
    pub filename: Option<String>,
    pub bytes: Option<u64>,
    pub status: Option<String>,
    pub created_at: Option<i64>,
}

/// Summary of the shared vector store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexInfo {
    pub external_vector_store_id: String,
    pub name: Option<String>,
    pub file_count: u64,
    pub completed: u64,
    pub in_progress: u64,
    pub failed: u64,
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch keeps callers free of trait objects; adding a backend means
/// a new module, a new variant and one new arm per method.
#[derive(Debug, Clone)]
pub enum AssistantsProvider {
    OpenAi(openai::OpenAiAssistants),
    Scripted(scripted::ScriptedProvider),
}

macro_rules! dispatch {
    ($self:ident, $p:ident => $call:expr) => {
        match $self {
            AssistantsProvider::OpenAi($p) => $call,
            AssistantsProvider::Scripted($p) => $call,
        }
    };
}

impl AssistantsProvider {
    /// Build the backend selected by `[provider] backend`.
    pub fn from_config(cfg: &ProviderConfig, api_key: Option<String>) -> Result<Self, ProviderError> {
        match cfg.backend {
            ProviderBackend::OpenAi => {
                let key = api_key.ok_or_else(|| {
                    ProviderError::Transport("openai backend needs an API key".into())
                })?;
                Ok(Self::OpenAi(openai::OpenAiAssistants::new(
                    cfg.api_base_url.clone(),
                    key,
                    cfg.timeout_seconds,
                )?))
            }
            ProviderBackend::Scripted => Ok(Self::Scripted(scripted::ScriptedProvider::new())),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            AssistantsProvider::OpenAi(_) => ProviderBackend::OpenAi.as_str(),
            AssistantsProvider::Scripted(_) => ProviderBackend::Scripted.as_str(),
        }
    }

    pub async fn create_thread(&self) -> Result<String, ProviderError> {
        dispatch!(self, p => p.create_thread().await)
    }

    pub async fn post_message(&self, thread_id: &str, content: &str) -> Result<(), ProviderError> {
        dispatch!(self, p => p.post_message(thread_id, content).await)
    }

    pub async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunSnapshot, ProviderError> {
        dispatch!(self, p => p.create_run(thread_id, assistant_id).await)
    }

    pub async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<RunSnapshot, ProviderError> {
        dispatch!(self, p => p.retrieve_run(thread_id, run_id).await)
    }

    /// Text of the newest assistant message on the thread.
    pub async fn latest_reply(&self, thread_id: &str) -> Result<String, ProviderError> {
        dispatch!(self, p => p.latest_reply(thread_id).await)
    }

    /// Start a run and subscribe to its incremental output.
    pub async fn stream_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunEventStream, ProviderError> {
        dispatch!(self, p => p.stream_run(thread_id, assistant_id).await)
    }

    pub async fn retrieve_assistant(&self, assistant_id: &str) -> Result<AssistantInfo, ProviderError> {
        dispatch!(self, p => p.retrieve_assistant(assistant_id).await)
    }

    pub async fn upload_file(&self, bytes: Vec<u8>, filename: &str) -> Result<FileDescriptor, ProviderError> {
        dispatch!(self, p => p.upload_file(bytes, filename).await)
    }

    pub async fn attach_file(&self, vector_store_id: &str, file_id: &str) -> Result<(), ProviderError> {
        dispatch!(self, p => p.attach_file(vector_store_id, file_id).await)
    }

    pub async fn list_index_files(&self, vector_store_id: &str) -> Result<Vec<FileDescriptor>, ProviderError> {
        dispatch!(self, p => p.list_index_files(vector_store_id).await)
    }

    pub async fn retrieve_index(&self, vector_store_id: &str) -> Result<IndexInfo, ProviderError> {
        dispatch!(self, p => p.retrieve_index(vector_store_id).await)
    }
}
