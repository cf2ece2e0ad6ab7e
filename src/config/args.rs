/*!
 * Command Line Arguments
 * getopt-style parsing for the coordinator and positional parsing for workers
 */

use super::error::ConfigError;
use super::RunConfig;
use crate::core::limits::MAX_TOTAL_CAP;
use crate::core::types::ItemIndex;
use std::path::PathBuf;
use std::time::Duration;

pub const USAGE: &str = "\
batchgate reads a file of strings and, for each string, launches a worker process
(batchgate-worker) that decides whether the string is a palindrome. Palindromes are
appended to palin.out, all other strings to nopalin.out, and every processed string
to output.log.

Invocation:
  batchgate -h
  batchgate [-n x] [-s x] [-t time] infile

Options:
  -h       Print this help page.
  -n x     Maximum total number of workers ever launched (default 4, maximum 20).
  -s x     Number of workers allowed to run at the same time (default 2).
  -t time  Seconds after which the run is terminated, finished or not (default 100).
  infile   Input file containing the strings to test, one per line.";

/// What the coordinator was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Help,
    Run(RunConfig),
}

/// Parse coordinator arguments (program name already stripped).
///
/// Options may appear anywhere; `-x value` and `-xvalue` are both accepted
/// and `--` ends option processing. `-h` wins as soon as it is seen.
pub fn parse_args<I, S>(args: I) -> Result<Invocation, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut positionals = Vec::new();
    let mut max_total = None;
    let mut max_concurrent = None;
    let mut deadline = None;

    while let Some(arg) = args.next() {
        if arg == "--" {
            positionals.extend(args.by_ref());
            break;
        }

        let mut chars = arg.chars();
        if chars.next() != Some('-') || arg.len() == 1 {
            positionals.push(arg);
            continue;
        }

        let flag = chars.next().unwrap_or('-');
        let inline: String = chars.collect();
        match flag {
            'h' => return Ok(Invocation::Help),
            'n' | 's' | 't' => {
                let value = if inline.is_empty() {
                    args.next().ok_or(ConfigError::MissingValue(flag))?
                } else {
                    inline
                };
                match flag {
                    'n' => max_total = Some(parse_total(&value)?),
                    's' => max_concurrent = Some(parse_concurrency(&value)?),
                    _ => deadline = Some(parse_deadline(&value)?),
                }
            }
            _ => return Err(ConfigError::UnknownOption(arg)),
        }
    }

    if positionals.len() != 1 {
        return Err(ConfigError::WrongArgCount(positionals.len()));
    }

    let mut config = RunConfig::new(PathBuf::from(positionals.remove(0)));
    if let Some(n) = max_total {
        config.max_total = n;
    }
    if let Some(s) = max_concurrent {
        config.max_concurrent = s;
    }
    if let Some(t) = deadline {
        config.deadline = t;
    }
    Ok(Invocation::Run(config))
}

fn parse_number(flag: char, value: &str) -> Result<i64, ConfigError> {
    value.trim().parse::<i64>().map_err(|_| ConfigError::InvalidValue {
        flag,
        value: value.to_string(),
        reason: "not an integer",
    })
}

/// -n is clamped to the hard cap rather than rejected
fn parse_total(value: &str) -> Result<usize, ConfigError> {
    let n = parse_number('n', value)?;
    if n < 0 {
        return Err(ConfigError::InvalidValue {
            flag: 'n',
            value: value.to_string(),
            reason: "must not be negative",
        });
    }
    Ok(usize::try_from(n).unwrap_or(MAX_TOTAL_CAP).min(MAX_TOTAL_CAP))
}

fn parse_concurrency(value: &str) -> Result<usize, ConfigError> {
    let s = parse_number('s', value)?;
    if s <= 0 {
        return Err(ConfigError::InvalidConcurrency(s));
    }
    usize::try_from(s).map_err(|_| ConfigError::InvalidConcurrency(s))
}

fn parse_deadline(value: &str) -> Result<Duration, ConfigError> {
    let t = parse_number('t', value)?;
    if t <= 0 {
        return Err(ConfigError::InvalidValue {
            flag: 't',
            value: value.to_string(),
            reason: "must be a positive number of seconds",
        });
    }
    Ok(Duration::from_secs(t.unsigned_abs()))
}

/// Positional arguments a worker is launched with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerArgs {
    pub index: ItemIndex,
    pub item_count: usize,
}

impl WorkerArgs {
    pub fn new(index: ItemIndex, item_count: usize) -> Self {
        Self { index, item_count }
    }

    /// Parse `<index> <item-count>` (program name already stripped)
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self, ConfigError> {
        let [index, count] = args else {
            return Err(ConfigError::WorkerArgs(format!(
                "expected 2 arguments, got {}",
                args.len()
            )));
        };
        let index = index
            .as_ref()
            .parse::<ItemIndex>()
            .map_err(|_| ConfigError::WorkerArgs(format!("bad index '{}'", index.as_ref())))?;
        let item_count = count
            .as_ref()
            .parse::<usize>()
            .map_err(|_| ConfigError::WorkerArgs(format!("bad item count '{}'", count.as_ref())))?;
        if index >= item_count {
            return Err(ConfigError::WorkerArgs(format!(
                "index {} out of range for {} items",
                index, item_count
            )));
        }
        Ok(Self { index, item_count })
    }

    pub fn to_args(&self) -> [String; 2] {
        [self.index.to_string(), self.item_count.to_string()]
    }
}
