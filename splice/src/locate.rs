use std::ops::Range;

use crate::block::{BlockSpan, BlockSpec};
use crate::document::Document;
use crate::error::{MarkerKind, SpliceError};

/// Find the single block described by `spec` in `doc`.
///
/// The start pattern must match exactly once. The body begins on the line
/// after the match (the rest of the opener line stays with the marker) and runs
/// up to the nearest following line whose first token is the end literal; later
/// lines carrying the same literal belong to other blocks and are never reached.
pub fn locate(doc: &Document, spec: &BlockSpec) -> Result<BlockSpan, SpliceError> {
    spec.check_end()?;
    let regex = spec.start_regex()?;
    let text = doc.as_str();

    let starts: Vec<Range<usize>> = regex.find_iter(text).map(|m| m.range()).collect();
    let start = match starts.as_slice() {
        [] => {
            return Err(SpliceError::MarkerNotFound {
                block: spec.name().to_string(),
                marker: MarkerKind::Start,
                opened_at: None,
            });
        }
        [only] => only.clone(),
        _ => {
            return Err(SpliceError::AmbiguousMarker {
                block: spec.name().to_string(),
                spans: starts,
            });
        }
    };

    let not_closed = || SpliceError::MarkerNotFound {
        block: spec.name().to_string(),
        marker: MarkerKind::End,
        opened_at: Some(start.clone()),
    };
    let body_start = next_line_start(text, start.end).ok_or_else(not_closed)?;
    let end = find_end_line(text, body_start, spec.end()).ok_or_else(not_closed)?;

    Ok(BlockSpan {
        block: spec.name().to_string(),
        body: body_start..end.start,
        start,
        end,
    })
}

/// `from` itself when it already sits at a line start, otherwise the start of
/// the following line. `None` when `from` is on the last line.
fn next_line_start(text: &str, from: usize) -> Option<usize> {
    if from == 0 || text.as_bytes()[from - 1] == b'\n' {
        Some(from)
    } else {
        text[from..].find('\n').map(|i| from + i + 1)
    }
}

/// Range of the first line starting at or after `line_start` that terminates
/// a block. `line_start` must be the start of a line.
fn find_end_line(text: &str, mut line_start: usize, end: &str) -> Option<Range<usize>> {
    loop {
        let rest = &text[line_start..];
        let line_len = rest.find('\n').unwrap_or(rest.len());
        if is_terminator(&rest[..line_len], end) {
            return Some(line_start..line_start + line_len);
        }
        if line_len == rest.len() {
            return None;
        }
        line_start += line_len + 1;
    }
}

/// A line terminates the block when it starts with the end literal and the
/// literal is a whole token.
fn is_terminator(line: &str, end: &str) -> bool {
    line.strip_prefix(end)
        .is_some_and(|rest| rest.chars().next().is_none_or(char::is_whitespace))
}
