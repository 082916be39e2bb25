//! Source locations.
//!
//! The core never re-derives line/column information itself; it is handed a
//! [`LineIndex`] oracle by the parser adapter (§6, "Parser interface") and
//! only ever converts byte offsets through it.

use serde::{Deserialize, Serialize};

/// A byte offset into a single source file.
pub type SourceOffset = u32;

/// A 0-based (line, character) pair, matching the LSP convention used by
/// [`crate::diagnostics::Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineColumn {
    pub line: u32,
    pub character: u32,
}

impl LineColumn {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A half-open `[start, end)` byte range, plus the resolved line/column pair
/// for each endpoint so diagnostics never need to re-query the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start_offset: SourceOffset,
    pub end_offset: SourceOffset,
    pub start: LineColumn,
    pub end: LineColumn,
}

impl Span {
    pub fn new(start_offset: SourceOffset, end_offset: SourceOffset, start: LineColumn, end: LineColumn) -> Self {
        Self { start_offset, end_offset, start, end }
    }

    /// A zero-width span at a single offset, useful for synthesized
    /// instructions (e.g. the `Jump` CFG builder inserts at the end of an
    /// empty block).
    pub fn point(offset: SourceOffset, at: LineColumn) -> Self {
        Self { start_offset: offset, end_offset: offset, start: at, end: at }
    }
}

/// Resolves byte offsets to line/column pairs for one source file.
///
/// Implemented by the parser adapter (out of scope for this crate); the
/// core depends only on this trait, never on the parser's internal rope or
/// line-table representation.
pub trait LineIndex {
    fn resolve(&self, offset: SourceOffset) -> LineColumn;
}

/// A line index backed by a precomputed table of line-start offsets, usable
/// directly in tests without pulling in a real parser adapter.
#[derive(Debug, Clone)]
pub struct TableLineIndex {
    line_starts: Vec<SourceOffset>,
}

impl TableLineIndex {
    pub fn from_source(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push((i + 1) as SourceOffset);
            }
        }
        Self { line_starts }
    }
}

impl LineIndex for TableLineIndex {
    fn resolve(&self, offset: SourceOffset) -> LineColumn {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insertion) => insertion.saturating_sub(1),
        };
        let line_start = self.line_starts[line];
        LineColumn::new(line as u32, offset - line_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_first_line() {
        let idx = TableLineIndex::from_source("abc\ndef\n");
        assert_eq!(idx.resolve(0), LineColumn::new(0, 0));
        assert_eq!(idx.resolve(2), LineColumn::new(0, 2));
    }

    #[test]
    fn resolves_second_line() {
        let idx = TableLineIndex::from_source("abc\ndef\n");
        assert_eq!(idx.resolve(4), LineColumn::new(1, 0));
        assert_eq!(idx.resolve(6), LineColumn::new(1, 2));
    }
}
