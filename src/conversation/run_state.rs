//! Run lifecycle as a pure state machine.
//!
//! The poll loop feeds each observation in and stops once the state is
//! terminal. No I/O and no clock here, so the transitions are tested
//! directly.

use crate::provider::{RunSnapshot, RunStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Queued,
    InProgress,
    Completed,
    Failed(String),
    TimedOut,
}

/// What the poll loop saw on one iteration.
#[derive(Debug, Clone)]
pub enum Observation {
    Snapshot(RunSnapshot),
    DeadlinePassed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed(_) | RunState::TimedOut)
    }

    /// Apply one observation. Terminal states absorb everything.
    pub fn advance(self, obs: Observation) -> RunState {
        if self.is_terminal() {
            return self;
        }
        match obs {
            Observation::DeadlinePassed => RunState::TimedOut,
            Observation::Snapshot(snap) => from_snapshot(snap),
        }
    }
}

impl From<&RunSnapshot> for RunState {
    fn from(snap: &RunSnapshot) -> Self {
        from_snapshot(snap.clone())
    }
}

fn from_snapshot(snap: RunSnapshot) -> RunState {
    let reason = |fallback: &str| snap.last_error.clone().unwrap_or_else(|| fallback.to_string());
    match snap.status {
        RunStatus::Queued => RunState::Queued,
        RunStatus::InProgress | RunStatus::Cancelling => RunState::InProgress,
        RunStatus::Completed => RunState::Completed,
        RunStatus::Failed => RunState::Failed(reason("run failed")),
        RunStatus::Cancelled => RunState::Failed(reason("run cancelled")),
        RunStatus::Expired => RunState::Failed(reason("run expired")),
        RunStatus::Incomplete => RunState::Failed(reason("run incomplete")),
        // Personas carry no tools, so nothing can satisfy the action.
        RunStatus::RequiresAction => RunState::Failed(reason("run requires action, which personas do not support")),
    }
}
