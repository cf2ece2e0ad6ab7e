/*!
 * Coordinator
 *
 * Drives one run end to end: read the input, publish the workspace, arm the
 * deadline, launch workers through the bounded launcher, then tear the
 * workspace down and append the final time record. The workspace is
 * destroyed exactly once on every path past its creation.
 */

use crate::config::{RunConfig, WorkerEnv};
use crate::core::clock::monotonic_ns;
use crate::core::errors::{BatchError, BatchResult};
use crate::input::read_items;
use crate::ipc::{Gate, Workspace};
use crate::process::{BoundedLauncher, ProcessBackend, RunReport};
use crate::signals::DeadlineController;
use crate::worker::OutputChannels;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub struct Coordinator {
    config: RunConfig,
}

impl Coordinator {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub async fn run(&self) -> BatchResult<RunReport> {
        let started = Instant::now();
        let config = &self.config;

        let items = read_items(&config.input)?;
        let worker_bin = config.resolve_worker_bin()?;
        info!(
            input = %config.input.display(),
            items = items.len(),
            max_total = config.max_total,
            max_concurrent = config.max_concurrent,
            "Coordinator starting"
        );

        let start = monotonic_ns().map_err(|e| BatchError::io("read monotonic clock", e))?;
        let key = config.workspace_key();
        let mut workspace = Workspace::create(&key, items.len())?;
        let truncated = workspace.publish(&items, start)?;
        if truncated > 0 {
            warn!(truncated, "Some items were truncated to the slot width");
        }

        // Create the gate key up front so workers race only on the lock itself
        let gate = Gate::open(config.gate_path())?;

        let controller = Arc::new(DeadlineController::new(config.max_total.min(items.len())));
        let armed = controller.arm(config.deadline)?;

        let backend = ProcessBackend::new(
            worker_bin,
            WorkerEnv::for_run(config, key.as_str()),
            items.len(),
        );
        let outcome = match BoundedLauncher::new(backend, controller, config.max_concurrent) {
            Ok(launcher) => launcher.run(items.len(), config.max_total).await,
            Err(e) => Err(e.into()),
        };

        armed.disarm();
        let destroyed = workspace.destroy();
        let mut report = outcome?;
        destroyed?;

        report.elapsed = started.elapsed();
        OutputChannels::new(&config.output_dir).append_final_time(report.elapsed)?;
        info!(
            gate = %gate.path().display(),
            elapsed_secs = report.elapsed.as_secs_f64(),
            "Coordinator finished"
        );
        Ok(report)
    }
}
