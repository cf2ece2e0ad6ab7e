/*!
 * Worker State
 * Linear lifecycle of one worker unit
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Worker lifecycle. States only move forward, one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Arguments parsed, workspace attached
    Started,
    /// Evaluating the predicate over the item
    ComputingPredicate,
    /// Blocked on the gate
    AwaitingGate,
    /// Holding the gate and writing results
    InCriticalSection,
    /// Gate released, about to detach
    Done,
}

impl WorkerState {
    /// The state that follows this one, if any
    pub fn next(self) -> Option<Self> {
        match self {
            WorkerState::Started => Some(WorkerState::ComputingPredicate),
            WorkerState::ComputingPredicate => Some(WorkerState::AwaitingGate),
            WorkerState::AwaitingGate => Some(WorkerState::InCriticalSection),
            WorkerState::InCriticalSection => Some(WorkerState::Done),
            WorkerState::Done => None,
        }
    }

    pub fn can_transition_to(self, to: Self) -> bool {
        self.next() == Some(to)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Started => "started",
            WorkerState::ComputingPredicate => "computing_predicate",
            WorkerState::AwaitingGate => "awaiting_gate",
            WorkerState::InCriticalSection => "in_critical_section",
            WorkerState::Done => "done",
        };
        f.write_str(name)
    }
}
