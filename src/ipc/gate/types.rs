/*!
 * Gate Types
 */

use miette::Diagnostic;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Gate error types. All of them are fatal to the worker that hits them.
#[derive(Debug, Error, Diagnostic)]
pub enum GateError {
    /// The gate key could not be created or opened. Reported with the
    /// resource exit class, like workspace allocation failures.
    #[error("Failed to open gate {path}: {source}")]
    #[diagnostic(
        code(gate::open),
        help("Check that the gate's directory exists and is writable.")
    )]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Gate {0} no longer exists")]
    #[diagnostic(
        code(gate::missing),
        help("The gate file was removed while the run was in progress.")
    )]
    Missing(PathBuf),

    #[error("Failed to acquire gate {path}: {source}")]
    #[diagnostic(code(gate::acquire))]
    Acquire {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to release gate {path}: {source}")]
    #[diagnostic(code(gate::release))]
    Release {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
