/*!
 * batchgate-worker - Worker Entry Point
 *
 * Invoked by the coordinator as `batchgate-worker <index> <item-count>` with
 * the workspace and gate keys in its environment.
 */

use batchgate::{init_tracing, BatchError, WorkerArgs, WorkerEnv, WorkerUnit};
use std::process::ExitCode;
use tracing::error;

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let unit = WorkerArgs::parse(args.as_slice())
        .and_then(|args| Ok((args, WorkerEnv::from_env()?)))
        .map(|(args, env)| WorkerUnit::new(args, env));

    let result = match unit {
        Ok(mut unit) => unit.run().map(|_| ()),
        Err(e) => Err(BatchError::from(e)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e.exit_code();
            error!(pid = std::process::id(), error = %e, "Worker failed");
            eprintln!("{:?}", miette::Report::new(e));
            ExitCode::from(code)
        }
    }
}
