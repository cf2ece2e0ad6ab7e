/*!
 * Output Channels
 *
 * Append-only result files shared by every worker of a run. Callers must
 * hold the gate (or, for in-process units, the channel mutex) while
 * appending; nothing in here serializes writers.
 */

use crate::core::errors::{BatchError, BatchResult};
use crate::core::types::{ItemIndex, Pid};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Audit channel: one line per processed item plus the final time record
pub const AUDIT_FILE: &str = "output.log";
/// Items satisfying the predicate
pub const ACCEPTED_FILE: &str = "palin.out";
/// Items failing the predicate
pub const REJECTED_FILE: &str = "nopalin.out";

/// Outcome of one item, written exactly once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub index: ItemIndex,
    pub pid: Pid,
    pub text: String,
    pub outcome: bool,
}

impl ResultRecord {
    pub fn new(index: ItemIndex, pid: Pid, text: impl Into<String>, outcome: bool) -> Self {
        Self {
            index,
            pid,
            text: text.into(),
            outcome,
        }
    }

    /// `PID  INDEX  TEXT`
    pub fn audit_line(&self) -> String {
        format!("{}  {}  {}\n", self.pid, self.index, self.text)
    }
}

/// Critical-section observation, offsets in microseconds since the
/// workspace's reference start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalSpan {
    pub pid: Pid,
    pub index: ItemIndex,
    pub waiting_us: u64,
    pub entered_us: u64,
    pub exited_us: u64,
}

impl CriticalSpan {
    /// True when the two critical sections shared any instant
    pub fn overlaps(&self, other: &CriticalSpan) -> bool {
        self.entered_us < other.exited_us && other.entered_us < self.exited_us
    }
}

/// The three result files of a run
#[derive(Debug, Clone)]
pub struct OutputChannels {
    audit: PathBuf,
    accepted: PathBuf,
    rejected: PathBuf,
}

impl OutputChannels {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            audit: dir.join(AUDIT_FILE),
            accepted: dir.join(ACCEPTED_FILE),
            rejected: dir.join(REJECTED_FILE),
        }
    }

    pub fn audit_path(&self) -> &Path {
        &self.audit
    }

    pub fn accepted_path(&self) -> &Path {
        &self.accepted
    }

    pub fn rejected_path(&self) -> &Path {
        &self.rejected
    }

    /// Append the audit line and the outcome line for `record`
    pub fn append(&self, record: &ResultRecord) -> BatchResult<()> {
        append_line(&self.audit, &record.audit_line())?;
        let channel = if record.outcome {
            &self.accepted
        } else {
            &self.rejected
        };
        append_line(channel, &format!("{}\n", record.text))
    }

    /// Append the coordinator's closing record to the audit channel
    pub fn append_final_time(&self, elapsed: Duration) -> BatchResult<()> {
        append_line(
            &self.audit,
            &format!("\n\tFinal time: {:.5} s\n\n", elapsed.as_secs_f64()),
        )
    }
}

fn open_append(path: &Path) -> BatchResult<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| BatchError::output(path, e))
}

// One write per line so a reader never sees a partial record
fn append_line(path: &Path, line: &str) -> BatchResult<()> {
    let mut file = open_append(path)?;
    file.write_all(line.as_bytes())
        .map_err(|e| BatchError::output(path, e))
}

/// Append one span as a JSON line
pub fn append_span(path: &Path, span: &CriticalSpan) -> BatchResult<()> {
    let mut line = serde_json::to_string(span).map_err(|e| BatchError::output(path, e.into()))?;
    line.push('\n');
    append_line(path, &line)
}

/// Read back every span of a timeline file
pub fn read_timeline(path: &Path) -> BatchResult<Vec<CriticalSpan>> {
    let file = File::open(path).map_err(|e| BatchError::io("open timeline", e))?;
    let mut spans = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| BatchError::io("read timeline", e))?;
        if line.trim().is_empty() {
            continue;
        }
        let span = serde_json::from_str(&line)
            .map_err(|e| BatchError::io("parse timeline", e.into()))?;
        spans.push(span);
    }
    Ok(spans)
}
