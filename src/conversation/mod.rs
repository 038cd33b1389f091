//! Conversation client.
//!
//! Drives one persona turn against the provider: make sure a thread exists,
//! post the user message, then either poll a run to completion or stream its
//! output. Threads are owned by the provider; the relay keeps no local
//! conversation state, so a caller continues a conversation by passing the
//! returned thread id back.

pub mod run_state;
pub mod segment;

use std::time::Duration;

use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::time::{Instant, sleep_until, timeout, timeout_at};
use tracing::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::error::RelayError;
use crate::personas::Persona;
use crate::provider::{AssistantInfo, AssistantsProvider, RunEvent, RunEventStream, RunSnapshot};

use run_state::{Observation, RunState};

/// Incremental reply text, ending after the last fragment or at the first error.
pub type FragmentStream = BoxStream<'static, Result<String, RelayError>>;

/// How the run poll loop paces itself.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Fixed delay between status checks.
    pub interval: Duration,
    /// Total wait for a polled run; idle gap allowed on a streamed run.
    pub ceiling: Duration,
}

impl From<&ProviderConfig> for PollSettings {
    fn from(cfg: &ProviderConfig) -> Self {
        Self { interval: cfg.poll_interval(), ceiling: cfg.poll_timeout() }
    }
}

#[derive(Debug, Clone)]
pub struct ConversationClient {
    provider: AssistantsProvider,
    poll: PollSettings,
}

impl ConversationClient {
    pub fn new(provider: AssistantsProvider, poll: PollSettings) -> Self {
        Self { provider, poll }
    }

    /// Reuse `existing` unchanged when it is not blank, otherwise open a new
    /// thread.
    pub async fn ensure_thread(&self, existing: Option<&str>) -> Result<String, RelayError> {
        match existing.filter(|t| !t.trim().is_empty()) {
            Some(thread_id) => Ok(thread_id.to_string()),
            None => {
                let thread_id = self.provider.create_thread().await?;
                info!(%thread_id, "opened new conversation thread");
                Ok(thread_id)
            }
        }
    }

    /// Post `message` on `thread_id`, run `persona` and return its full reply.
    pub async fn send(&self, persona: &Persona, thread_id: &str, message: &str) -> Result<String, RelayError> {
        self.provider.post_message(thread_id, message).await?;
        let run = self
            .provider
            .create_run(thread_id, &persona.external_assistant_id)
            .await?;
        debug!(agent_id = persona.id, %thread_id, run_id = %run.id, "run started");

        self.wait_for_run(thread_id, &run).await?;
        let reply = self.provider.latest_reply(thread_id).await?;
        debug!(agent_id = persona.id, %thread_id, reply_len = reply.len(), "reply received");
        Ok(reply)
    }

    /// Post `message` and stream the reply as it is produced.
    ///
    /// Posting and opening the run happen before this returns, so those
    /// failures surface as an `Err` rather than inside the stream.
    pub async fn send_streaming(
        &self,
        persona: &Persona,
        thread_id: &str,
        message: &str,
    ) -> Result<FragmentStream, RelayError> {
        self.provider.post_message(thread_id, message).await?;
        let events = self
            .provider
            .stream_run(thread_id, &persona.external_assistant_id)
            .await?;
        debug!(agent_id = persona.id, %thread_id, "streaming run started");
        Ok(fragments(events, self.poll.ceiling))
    }

    /// Look up the persona's assistant on the provider side.
    pub async fn verify_assistant(&self, persona: &Persona) -> Result<AssistantInfo, RelayError> {
        self.provider
            .retrieve_assistant(&persona.external_assistant_id)
            .await
            .map_err(|e| {
                warn!(agent_id = persona.id, assistant_id = %persona.external_assistant_id, error = %e, "assistant lookup failed");
                e.into()
            })
    }

    async fn wait_for_run(&self, thread_id: &str, run: &RunSnapshot) -> Result<(), RelayError> {
        let deadline = Instant::now() + self.poll.ceiling;
        let mut state = RunState::from(run);
        let mut polls = 0u32;

        while !state.is_terminal() {
            let now = Instant::now();
            if now >= deadline {
                state = state.advance(Observation::DeadlinePassed);
                continue;
            }
            sleep_until((now + self.poll.interval).min(deadline)).await;

            let obs = match timeout_at(deadline, self.provider.retrieve_run(thread_id, &run.id)).await {
                Ok(snapshot) => Observation::Snapshot(snapshot?),
                Err(_) => Observation::DeadlinePassed,
            };
            polls += 1;
            state = state.advance(obs);
        }

        match state {
            RunState::Completed => {
                debug!(%thread_id, run_id = %run.id, polls, "run completed");
                Ok(())
            }
            RunState::TimedOut => {
                warn!(%thread_id, run_id = %run.id, polls, "run did not finish before the poll ceiling");
                Err(RelayError::UpstreamTimeout(self.poll.ceiling))
            }
            RunState::Failed(reason) => {
                warn!(%thread_id, run_id = %run.id, %reason, "run failed");
                Err(RelayError::Upstream(reason))
            }
            other => Err(RelayError::Upstream(format!("run stopped in state {other:?}"))),
        }
    }
}

/// Reduce provider run events to text fragments.
///
/// Each wait for the next event is bounded by `idle`. The stream ends cleanly
/// only on a completion event.
fn fragments(events: RunEventStream, idle: Duration) -> FragmentStream {
    stream::unfold(Some(events), move |state| async move {
        let mut events = state?;
        loop {
            let item = match timeout(idle, events.next()).await {
                Err(_) => Err(RelayError::UpstreamTimeout(idle)),
                Ok(None) => Err(RelayError::Upstream("run stream ended before completion".into())),
                Ok(Some(Err(e))) => Err(e.into()),
                Ok(Some(Ok(RunEvent::TextDelta(text)))) if text.is_empty() => continue,
                Ok(Some(Ok(RunEvent::TextDelta(text)))) => return Some((Ok(text), Some(events))),
                Ok(Some(Ok(RunEvent::Completed))) => return None,
                Ok(Some(Ok(RunEvent::Failed(reason)))) => Err(RelayError::Upstream(reason)),
            };
            if let Err(e) = &item {
                warn!(error = %e, "reply stream aborted");
            }
            return Some((item, None));
        }
    })
    .boxed()
}
