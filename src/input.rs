/*!
 * Input Reader
 * Turns the input file into the ordered item sequence
 */

use crate::core::errors::{BatchError, BatchResult};
use crate::core::types::WorkItem;
use std::borrow::Cow;
use std::path::Path;
use tracing::warn;

/// One item per line. A last line without a terminator still counts; `\r\n`
/// endings are stripped. Blank lines are items too.
///
/// Lines are decoded independently: invalid UTF-8 in one line replaces the
/// offending bytes with U+FFFD and leaves every other item untouched.
pub fn parse_items(content: impl AsRef<[u8]>) -> Vec<WorkItem> {
    let mut lines: Vec<&[u8]> = content.as_ref().split(|&b| b == b'\n').collect();
    if lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    lines
        .into_iter()
        .enumerate()
        .map(|(index, line)| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            let text = match String::from_utf8_lossy(line) {
                Cow::Borrowed(text) => text.to_owned(),
                Cow::Owned(text) => {
                    warn!(index, "Item is not valid UTF-8, invalid bytes replaced");
                    text
                }
            };
            WorkItem::new(index, text)
        })
        .collect()
}

pub fn read_items(path: &Path) -> BatchResult<Vec<WorkItem>> {
    let content = std::fs::read(path).map_err(|e| BatchError::io("read input file", e))?;
    Ok(parse_items(content))
}
