//! Scripted provider — deterministic in-memory backend for tests and offline
//! runs (`backend = "scripted"`).
//!
//! Threads, runs, files and vector stores live in process memory. By default
//! every run completes after two polls and replies with
//! `"[<assistant_id>] <last user message>"`. Builders adjust the script.
//!
//! Meant for tests and demos. The message and poll logs keep only the newest
//! [`RECORD_LIMIT`] entries and each thread keeps only its latest run, but
//! thread ids and their last replies are held for the life of the process.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::{StreamExt, stream};
use tokio::time::Instant;
use tracing::debug;

use super::{
    AssistantInfo, FileDescriptor, IndexInfo, ProviderError, RunEvent, RunEventStream, RunSnapshot,
    RunStatus,
};

const DEFAULT_DELTA_CHARS: usize = 4;
const SCRIPTED_FAILURE: &str = "scripted run failure";

/// Entries kept in each inspection log.
pub const RECORD_LIMIT: usize = 1024;

fn push_capped<T>(log: &mut Vec<T>, item: T) {
    if log.len() >= RECORD_LIMIT {
        let excess = log.len() + 1 - RECORD_LIMIT;
        log.drain(..excess);
    }
    log.push(item);
}

/// A user message recorded by [`ScriptedProvider::post_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub thread_id: String,
    pub content: String,
}

#[derive(Debug, Clone)]
struct RunRecord {
    thread_id: String,
    reply: String,
    polls: usize,
}

#[derive(Debug)]
struct State {
    // script
    reply: Option<String>,
    run_statuses: Vec<RunStatus>,
    delta_chars: usize,
    failing_attach: bool,
    missing_assistants: HashSet<String>,

    // recorded
    threads: Vec<String>,
    messages: Vec<PostedMessage>,
    runs: HashMap<String, RunRecord>,
    replies: HashMap<String, String>,
    poll_times: Vec<Instant>,
    files: Vec<FileDescriptor>,
    index: HashMap<String, Vec<String>>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            reply: None,
            run_statuses: vec![RunStatus::Queued, RunStatus::InProgress, RunStatus::Completed],
            delta_chars: DEFAULT_DELTA_CHARS,
            failing_attach: false,
            missing_assistants: HashSet::new(),
            threads: Vec::new(),
            messages: Vec::new(),
            runs: HashMap::new(),
            replies: HashMap::new(),
            poll_times: Vec::new(),
            files: Vec::new(),
            index: HashMap::new(),
        }
    }
}

/// In-memory Assistants backend. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    state: Arc<Mutex<State>>,
}

fn not_found(what: &str, id: &str) -> ProviderError {
    ProviderError::Status {
        status: 404,
        message: format!("No {what} found with id '{id}'."),
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Script builders ───────────────────────────────────────────────────────

    /// Reply with `text` instead of echoing.
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.lock().reply = Some(text.into());
        self
    }

    /// Statuses reported by successive polls of a run. The first is returned
    /// on creation; the last repeats forever. An empty list is ignored.
    pub fn with_run_statuses(self, statuses: Vec<RunStatus>) -> Self {
        if !statuses.is_empty() {
            self.lock().run_statuses = statuses;
        }
        self
    }

    /// Characters per streamed text delta.
    pub fn with_delta_size(self, chars: usize) -> Self {
        self.lock().delta_chars = chars.max(1);
        self
    }

    /// Make every vector store attach fail with a 500.
    pub fn with_failing_attach(self) -> Self {
        self.lock().failing_attach = true;
        self
    }

    /// Report `assistant_id` as missing on retrieval.
    pub fn with_missing_assistant(self, assistant_id: impl Into<String>) -> Self {
        self.lock().missing_assistants.insert(assistant_id.into());
        self
    }

    // ── Inspection ────────────────────────────────────────────────────────────

    pub fn posted_messages(&self) -> Vec<PostedMessage> {
        self.lock().messages.clone()
    }

    pub fn issued_threads(&self) -> Vec<String> {
        self.lock().threads.clone()
    }

    /// When each `retrieve_run` call happened, on the tokio clock.
    pub fn poll_times(&self) -> Vec<Instant> {
        self.lock().poll_times.clone()
    }

    pub fn uploaded_files(&self) -> Vec<FileDescriptor> {
        self.lock().files.clone()
    }

    // ── Provider surface ──────────────────────────────────────────────────────

    pub async fn create_thread(&self) -> Result<String, ProviderError> {
        let id = format!("thread_{}", uuid::Uuid::new_v4().simple());
        self.lock().threads.push(id.clone());
        debug!(thread_id = %id, "scripted thread created");
        Ok(id)
    }

    pub async fn post_message(&self, thread_id: &str, content: &str) -> Result<(), ProviderError> {
        let mut st = self.lock();
        if !st.threads.iter().any(|t| t == thread_id) {
            return Err(not_found("thread", thread_id));
        }
        push_capped(
            &mut st.messages,
            PostedMessage {
                thread_id: thread_id.to_string(),
                content: content.to_string(),
            },
        );
        Ok(())
    }

    pub async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunSnapshot, ProviderError> {
        let mut st = self.lock();
        let reply = st.reply_for(thread_id, assistant_id)?;
        st.runs.retain(|_, r| r.thread_id != thread_id);
        let run_id = format!("run_{}", uuid::Uuid::new_v4().simple());
        st.runs.insert(
            run_id.clone(),
            RunRecord { thread_id: thread_id.to_string(), reply, polls: 0 },
        );
        Ok(st.snapshot(&run_id))
    }

    pub async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<RunSnapshot, ProviderError> {
        let mut st = self.lock();
        push_capped(&mut st.poll_times, Instant::now());
        let run = st
            .runs
            .get_mut(run_id)
            .filter(|r| r.thread_id == thread_id)
            .ok_or_else(|| not_found("run", run_id))?;
        run.polls += 1;
        Ok(st.snapshot(run_id))
    }

    pub async fn latest_reply(&self, thread_id: &str) -> Result<String, ProviderError> {
        self.lock()
            .replies
            .get(thread_id)
            .cloned()
            .ok_or_else(|| ProviderError::Decode("thread has no assistant reply".into()))
    }

    pub async fn stream_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunEventStream, ProviderError> {
        let (reply, outcome, delta_chars) = {
            let mut st = self.lock();
            let reply = st.reply_for(thread_id, assistant_id)?;
            let outcome = st.run_statuses.last().copied().unwrap_or(RunStatus::Completed);
            if outcome == RunStatus::Completed {
                st.replies.insert(thread_id.to_string(), reply.clone());
            }
            (reply, outcome, st.delta_chars)
        };

        let chars: Vec<char> = reply.chars().collect();
        let deltas: Vec<Result<RunEvent, ProviderError>> = chars
            .chunks(delta_chars)
            .map(|c| Ok(RunEvent::TextDelta(c.iter().collect())))
            .collect();

        let events = match outcome {
            RunStatus::Completed => stream::iter(deltas).chain(stream::iter([Ok(RunEvent::Completed)])).boxed(),
            RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling => {
                stream::iter(deltas).chain(stream::pending()).boxed()
            }
            _ => stream::iter([Ok(RunEvent::Failed(SCRIPTED_FAILURE.to_string()))]).boxed(),
        };
        Ok(events)
    }

    pub async fn retrieve_assistant(&self, assistant_id: &str) -> Result<AssistantInfo, ProviderError> {
        if self.lock().missing_assistants.contains(assistant_id) {
            return Err(not_found("assistant", assistant_id));
        }
        Ok(AssistantInfo {
            id: assistant_id.to_string(),
            name: Some(format!("scripted {assistant_id}")),
            model: Some("gpt-4o-mini".to_string()),
        })
    }

    pub async fn upload_file(&self, bytes: Vec<u8>, filename: &str) -> Result<FileDescriptor, ProviderError> {
        let file = FileDescriptor {
            file_id: format!("file-{}", uuid::Uuid::new_v4().simple()),
            filename: Some(filename.to_string()),
            bytes: Some(bytes.len() as u64),
            status: Some("processed".to_string()),
            created_at: Some(unix_now()),
        };
        self.lock().files.push(file.clone());
        Ok(file)
    }

    pub async fn attach_file(&self, vector_store_id: &str, file_id: &str) -> Result<(), ProviderError> {
        let mut st = self.lock();
        if st.failing_attach {
            return Err(ProviderError::Status {
                status: 500,
                message: "scripted attach failure".into(),
            });
        }
        if !st.files.iter().any(|f| f.file_id == file_id) {
            return Err(not_found("file", file_id));
        }
        st.index.entry(vector_store_id.to_string()).or_default().push(file_id.to_string());
        Ok(())
    }

    pub async fn list_index_files(&self, vector_store_id: &str) -> Result<Vec<FileDescriptor>, ProviderError> {
        let st = self.lock();
        let attached = st.index.get(vector_store_id).cloned().unwrap_or_default();
        Ok(attached
            .iter()
            .filter_map(|id| st.files.iter().find(|f| &f.file_id == id))
            .map(|f| FileDescriptor {
                status: Some("completed".to_string()),
                ..f.clone()
            })
            .collect())
    }

    pub async fn retrieve_index(&self, vector_store_id: &str) -> Result<IndexInfo, ProviderError> {
        let count = self
            .lock()
            .index
            .get(vector_store_id)
            .map_or(0, |files| files.len() as u64);
        Ok(IndexInfo {
            external_vector_store_id: vector_store_id.to_string(),
            name: Some("scripted knowledge base".to_string()),
            file_count: count,
            completed: count,
            in_progress: 0,
            failed: 0,
        })
    }
}

impl State {
    fn reply_for(&self, thread_id: &str, assistant_id: &str) -> Result<String, ProviderError> {
        if !self.threads.iter().any(|t| t == thread_id) {
            return Err(not_found("thread", thread_id));
        }
        if let Some(reply) = &self.reply {
            return Ok(reply.clone());
        }
        let last = self
            .messages
            .iter()
            .rev()
            .find(|m| m.thread_id == thread_id)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(format!("[{assistant_id}] {last}"))
    }

    /// Current snapshot of `run_id`; records the reply once it completes.
    fn snapshot(&mut self, run_id: &str) -> RunSnapshot {
        let Some(run) = self.runs.get(run_id) else {
            return RunSnapshot {
                id: run_id.to_string(),
                status: RunStatus::Failed,
                last_error: Some("unknown run".into()),
            };
        };
        let idx = run.polls.min(self.run_statuses.len().saturating_sub(1));
        let status = self.run_statuses.get(idx).copied().unwrap_or(RunStatus::Completed);
        if status == RunStatus::Completed {
            self.replies.insert(run.thread_id.clone(), run.reply.clone());
        }
        RunSnapshot {
            id: run_id.to_string(),
            status,
            last_error: (status == RunStatus::Failed).then(|| SCRIPTED_FAILURE.to_string()),
        }
    }
}
