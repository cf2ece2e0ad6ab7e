/*!
 * batchgate - Coordinator Entry Point
 *
 * Parses the command line, applies environment overrides and runs the
 * coordinator. Exit status is 0 on completion and after a deadline or
 * interrupt abort; configuration and resource failures exit non-zero.
 */

use batchgate::{init_tracing, parse_args, BatchError, Coordinator, Invocation, USAGE};
use std::process::ExitCode;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match parse_args(std::env::args().skip(1)) {
        Ok(Invocation::Help) => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Ok(Invocation::Run(config)) => config,
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    init_tracing();

    let config = match config.with_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            return ExitCode::from(2);
        }
    };

    match Coordinator::new(config).run().await {
        Ok(report) => {
            if let Some(cause) = report.trip {
                // Aborted runs still exit 0 once cleanup has finished
                let aborted = BatchError::DeadlineExceeded(cause);
                warn!(
                    error = %aborted,
                    launched = report.launched,
                    succeeded = report.succeeded,
                    "Run aborted before completion"
                );
            } else {
                info!(
                    launched = report.launched,
                    succeeded = report.succeeded,
                    failed = report.failed,
                    "Run complete"
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let code = e.exit_code();
            error!(error = %e, "Run failed");
            eprintln!("{:?}", miette::Report::new(e));
            ExitCode::from(code)
        }
    }
}
