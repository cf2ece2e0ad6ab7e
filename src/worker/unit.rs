/*!
 * Worker Unit
 *
 * One worker evaluates one item: attach the workspace, compute the
 * predicate, wait for the gate, append results while holding it, release
 * and detach. Every failure is fatal to this worker only; the coordinator
 * observes the exit status and never retries.
 */

use super::output::{append_span, CriticalSpan, OutputChannels, ResultRecord};
use super::predicate::{is_symmetric, Predicate};
use super::state::WorkerState;
use crate::config::{WorkerArgs, WorkerEnv};
use crate::core::clock::offset_us;
use crate::core::errors::{BatchError, BatchResult};
use crate::core::types::{Pid, Timestamp};
use crate::ipc::{Gate, WorkspaceView};
use tracing::{debug, info, warn};

pub struct WorkerUnit {
    args: WorkerArgs,
    env: WorkerEnv,
    predicate: Predicate,
    pid: Pid,
    state: WorkerState,
}

impl WorkerUnit {
    pub fn new(args: WorkerArgs, env: WorkerEnv) -> Self {
        Self {
            args,
            env,
            predicate: is_symmetric,
            pid: std::process::id(),
            state: WorkerState::Started,
        }
    }

    /// Replace the default symmetry check
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    fn advance(&mut self, to: WorkerState) {
        debug_assert!(self.state.can_transition_to(to), "{} -> {}", self.state, to);
        debug!(pid = self.pid, index = self.args.index, from = %self.state, to = %to, "Worker state");
        self.state = to;
    }

    fn observe(&self, what: &'static str, start: Timestamp) -> BatchResult<u64> {
        let offset = offset_us(start).map_err(|e| BatchError::io("read monotonic clock", e))?;
        info!(pid = self.pid, index = self.args.index, offset_us = offset, "{}", what);
        Ok(offset)
    }

    /// Run the whole lifecycle, returning the record that was written
    pub fn run(&mut self) -> BatchResult<ResultRecord> {
        let index = self.args.index;
        let view = WorkspaceView::attach(&self.env.workspace_key, Some(self.args.item_count))?;
        let gate = Gate::open(&self.env.gate_key)?;
        let channels = OutputChannels::new(&self.env.output_dir);
        let start = view.start();

        self.advance(WorkerState::ComputingPredicate);
        let text = view.item(index)?.to_owned();
        let outcome = (self.predicate)(&text);
        let record = ResultRecord::new(index, self.pid, text, outcome);

        self.advance(WorkerState::AwaitingGate);
        let waiting_us = self.observe("Began waiting for gate", start)?;
        let guard = gate.acquire()?;

        self.advance(WorkerState::InCriticalSection);
        let entered_us = self.observe("Entered critical section", start)?;
        let delay = self.env.delay.sample(&mut rand::thread_rng());
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        channels.append(&record)?;
        let exited_us = self.observe("Exited critical section", start)?;

        if let Some(ref timeline) = self.env.timeline {
            let span = CriticalSpan {
                pid: self.pid,
                index,
                waiting_us,
                entered_us,
                exited_us,
            };
            // The timeline is diagnostic only
            if let Err(e) = append_span(timeline, &span) {
                warn!(pid = self.pid, index, error = %e, "Failed to record timeline span");
            }
        }
        guard.release()?;

        self.advance(WorkerState::Done);
        drop(view);
        Ok(record)
    }
}
