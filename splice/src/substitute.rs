use std::collections::HashSet;

use crate::block::{BlockSpan, BlockSpec};
use crate::document::{Document, Payload};
use crate::error::{InputKind, SpliceError};
use crate::locate::locate;

/// Replace the body of every block in `base` with its payload.
///
/// Either every block is replaced or an error naming the first failing block
/// is returned; `base` itself is never modified.
pub fn substitute(base: &Document, specs: &[(BlockSpec, Payload)]) -> Result<Document, SpliceError> {
    Substitutor::new(base).apply(specs)
}

/// Section substitution over one base document.
///
/// Works in two phases: every block is located against the base first, then
/// the new document is assembled by slicing around the located bodies. Because
/// nothing is located in partially substituted text, payload content can never
/// be taken for a marker, and all spans in errors point into the base.
pub struct Substitutor<'a> {
    base: &'a Document,
}

impl<'a> Substitutor<'a> {
    pub fn new(base: &'a Document) -> Self {
        Substitutor { base }
    }

    /// Locate every block, in the order given, and check that no name repeats
    /// and no two blocks overlap. Spans are returned in the same order.
    pub fn locate_all<'s>(
        &self,
        specs: impl IntoIterator<Item = &'s BlockSpec>,
    ) -> Result<Vec<BlockSpan>, SpliceError> {
        self.locate_each(specs.into_iter().map(|spec| (spec, None)))
    }

    /// Per block, in order: name not seen before, payload non-empty unless
    /// allowed, block located. The first failure wins.
    fn locate_each<'s>(
        &self,
        items: impl IntoIterator<Item = (&'s BlockSpec, Option<&'s Payload>)>,
    ) -> Result<Vec<BlockSpan>, SpliceError> {
        if self.base.is_empty() {
            return Err(SpliceError::EmptyInput {
                input: InputKind::Base,
            });
        }

        let mut seen = HashSet::new();
        let mut spans = Vec::new();
        for (spec, payload) in items {
            if !seen.insert(spec.name()) {
                return Err(SpliceError::DuplicateBlock {
                    block: spec.name().to_string(),
                });
            }
            if payload.is_some_and(|p| p.is_empty() && !spec.allows_empty()) {
                return Err(SpliceError::EmptyInput {
                    input: InputKind::Payload {
                        block: spec.name().to_string(),
                    },
                });
            }
            spans.push(locate(self.base, spec)?);
        }

        check_overlaps(&spans)?;
        Ok(spans)
    }

    /// Produce the substituted document.
    pub fn apply(&self, specs: &[(BlockSpec, Payload)]) -> Result<Document, SpliceError> {
        self.apply_with_spans(specs).map(|(document, _)| document)
    }

    /// Like [`Substitutor::apply`], also returning where each block was found
    /// in the base, in the order of `specs`.
    pub fn apply_with_spans(
        &self,
        specs: &[(BlockSpec, Payload)],
    ) -> Result<(Document, Vec<BlockSpan>), SpliceError> {
        let spans = self.locate_each(specs.iter().map(|(spec, payload)| (spec, Some(payload))))?;

        let mut edits: Vec<(&BlockSpan, &Payload)> =
            spans.iter().zip(specs.iter().map(|(_, payload)| payload)).collect();
        edits.sort_by_key(|(span, _)| span.body.start);

        let document = Document::from(splice_bodies(self.base.as_str(), &edits));
        Ok((document, spans))
    }
}

/// Blocks are compared in document order; after sorting, any overlap shows up
/// between neighbours.
fn check_overlaps(spans: &[BlockSpan]) -> Result<(), SpliceError> {
    let mut ordered: Vec<&BlockSpan> = spans.iter().collect();
    ordered.sort_by_key(|span| span.start.start);

    for pair in ordered.windows(2) {
        let (first, second) = (pair[0], pair[1]);
        if first.overlaps(second) {
            return Err(SpliceError::OverlappingBlocks {
                first: first.block.clone(),
                second: second.block.clone(),
                first_span: first.full(),
                second_span: second.full(),
            });
        }
    }
    Ok(())
}

/// Slice-and-concatenate. `edits` must be sorted and non-overlapping.
fn splice_bodies(text: &str, edits: &[(&BlockSpan, &Payload)]) -> String {
    let added: usize = edits.iter().map(|(_, payload)| payload.len() + 1).sum();
    let mut out = String::with_capacity(text.len() + added);
    let mut cursor = 0;

    for (span, payload) in edits {
        out.push_str(&text[cursor..span.body.start]);
        out.push_str(payload.as_str());
        // The end marker has to stay at the start of its line.
        if !payload.is_empty() && !payload.as_str().ends_with('\n') {
            out.push('\n');
        }
        cursor = span.body.end;
    }

    out.push_str(&text[cursor..]);
    out
}
