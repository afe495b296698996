use std::ops::Range;

use regex::{Regex, RegexBuilder};

use crate::error::SpliceError;

/// How the opening marker of a block is recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartMarker {
    /// A literal opener line. Anchored to line start; the match swallows
    /// trailing blanks and the line break so the body starts on the next line.
    Literal(String),
    /// A raw regular expression in multi-line mode. The match must cover the
    /// opening marker and everything up to, but not including, the body.
    Pattern(String),
}

impl StartMarker {
    /// Regex source for this marker.
    pub fn to_regex_source(&self) -> String {
        match self {
            StartMarker::Literal(opener) => format!(r"^{}[ \t]*\r?\n", regex::escape(opener)),
            StartMarker::Pattern(pattern) => pattern.clone(),
        }
    }
}

/// Describes one substitutable region: where it opens and how it closes.
/// Owns no content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpec {
    name: String,
    start: StartMarker,
    end: String,
    allow_empty: bool,
}

impl BlockSpec {
    pub fn new(name: impl Into<String>, start: StartMarker, end: impl Into<String>) -> Self {
        BlockSpec {
            name: name.into(),
            start,
            end: end.into(),
            allow_empty: false,
        }
    }

    /// A block opened by a literal line, e.g. `RUN cat > app.js <<'JSEOF'`.
    pub fn literal(
        name: impl Into<String>,
        opener: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self::new(name, StartMarker::Literal(opener.into()), end)
    }

    /// A block opened by a regular expression match.
    pub fn pattern(
        name: impl Into<String>,
        pattern: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self::new(name, StartMarker::Pattern(pattern.into()), end)
    }

    /// Accept an empty payload for this block instead of rejecting it.
    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> &StartMarker {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    pub fn allows_empty(&self) -> bool {
        self.allow_empty
    }

    /// Compile the start marker. `^` and `$` match at line boundaries.
    pub(crate) fn start_regex(&self) -> Result<Regex, SpliceError> {
        RegexBuilder::new(&self.start.to_regex_source())
            .multi_line(true)
            .build()
            .map_err(|source| SpliceError::InvalidPattern {
                block: self.name.clone(),
                source,
            })
    }

    /// The end literal must be one non-empty token, otherwise "first token
    /// equals the literal" can never hold.
    pub(crate) fn check_end(&self) -> Result<(), SpliceError> {
        if self.end.is_empty() || self.end.contains(char::is_whitespace) {
            return Err(SpliceError::InvalidEndMarker {
                block: self.name.clone(),
                end: self.end.clone(),
            });
        }
        Ok(())
    }
}

/// Byte ranges of one located block within a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpan {
    /// Name of the block specification that produced this span.
    pub block: String,
    /// The start-marker match.
    pub start: Range<usize>,
    /// The body: from the line after the start marker to the start of the end-marker line.
    pub body: Range<usize>,
    /// The end-marker line, without the trailing `\n`.
    pub end: Range<usize>,
}

impl BlockSpan {
    /// The whole block, markers included.
    pub fn full(&self) -> Range<usize> {
        self.start.start..self.end.end
    }

    pub fn overlaps(&self, other: &BlockSpan) -> bool {
        let (a, b) = (self.full(), other.full());
        a.start < b.end && b.start < a.end
    }
}
