use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use thiserror::Error;

/// Which delimiter of a block could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Start,
    End,
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerKind::Start => write!(f, "start"),
            MarkerKind::End => write!(f, "end"),
        }
    }
}

/// The input that was empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Base,
    Payload { block: String },
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Base => write!(f, "base document"),
            InputKind::Payload { block } => write!(f, "payload of block `{}`", block),
        }
    }
}

/// Why a substitution could not be carried out.
///
/// Every variant that concerns a block carries its name so the operator knows
/// which section of the base document or which payload to fix.
#[derive(Debug, Error)]
pub enum SpliceError {
    #[error("block `{block}`: {marker} marker not found")]
    MarkerNotFound {
        block: String,
        marker: MarkerKind,
        /// For a missing end marker, where the block was opened.
        opened_at: Option<Range<usize>>,
    },

    #[error("block `{block}`: start marker matches {} times, expected exactly one", .spans.len())]
    AmbiguousMarker {
        block: String,
        spans: Vec<Range<usize>>,
    },

    #[error("{input} is empty")]
    EmptyInput { input: InputKind },

    #[error("block `{block}`: invalid start pattern: {source}")]
    InvalidPattern {
        block: String,
        #[source]
        source: regex::Error,
    },

    #[error("block `{block}`: end marker `{end}` must be a single non-empty token")]
    InvalidEndMarker { block: String, end: String },

    #[error("blocks `{first}` and `{second}` overlap")]
    OverlappingBlocks {
        first: String,
        second: String,
        first_span: Range<usize>,
        second_span: Range<usize>,
    },

    #[error("block `{block}` is specified more than once")]
    DuplicateBlock { block: String },
}

impl SpliceError {
    /// Name of the block the error is about, if any.
    pub fn block(&self) -> Option<&str> {
        match self {
            SpliceError::MarkerNotFound { block, .. }
            | SpliceError::AmbiguousMarker { block, .. }
            | SpliceError::InvalidPattern { block, .. }
            | SpliceError::InvalidEndMarker { block, .. }
            | SpliceError::DuplicateBlock { block } => Some(block),
            SpliceError::EmptyInput { input } => match input {
                InputKind::Base => None,
                InputKind::Payload { block } => Some(block),
            },
            SpliceError::OverlappingBlocks { first, .. } => Some(first),
        }
    }

    /// Convert to a codespan-reporting Diagnostic. Spans refer to the base
    /// document registered under `file_id`.
    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        let diagnostic = Diagnostic::error().with_message(self.to_string());
        match self {
            SpliceError::MarkerNotFound {
                marker: MarkerKind::End,
                opened_at: Some(span),
                ..
            } => diagnostic
                .with_labels(vec![
                    Label::primary(file_id, span.clone())
                        .with_message("block opened here but never closed"),
                ])
                .with_notes(vec![
                    "the end marker must be the first token on its own line".to_string(),
                ]),
            SpliceError::MarkerNotFound { .. } => diagnostic,
            SpliceError::AmbiguousMarker { spans, .. } => {
                let labels = spans
                    .iter()
                    .enumerate()
                    .map(|(i, span)| {
                        let label = if i == 0 {
                            Label::primary(file_id, span.clone())
                        } else {
                            Label::secondary(file_id, span.clone())
                        };
                        label.with_message(format!("candidate {}", i + 1))
                    })
                    .collect();
                diagnostic
                    .with_labels(labels)
                    .with_notes(vec!["make the start marker specific to one block".to_string()])
            }
            SpliceError::OverlappingBlocks {
                first,
                second,
                first_span,
                second_span,
            } => diagnostic.with_labels(vec![
                Label::primary(file_id, second_span.clone()).with_message(format!("`{second}`")),
                Label::secondary(file_id, first_span.clone()).with_message(format!("`{first}`")),
            ]),
            SpliceError::EmptyInput { .. }
            | SpliceError::InvalidPattern { .. }
            | SpliceError::InvalidEndMarker { .. }
            | SpliceError::DuplicateBlock { .. } => diagnostic,
        }
    }
}
