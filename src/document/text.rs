//! Text utilities for position conversion.
//!
//! A plain-text document is modeled as one paragraph per line (see
//! [`Node::from_plain_text`](super::Node::from_plain_text)). This index
//! converts between LSP positions, byte offsets into the source and document
//! positions of that paragraph tree, with proper UTF-16 handling.

use std::ops::Range;

use tower_lsp::lsp_types::Position;

/// Pre-computed line index for efficient position lookups.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset where each line starts.
    line_starts: Vec<usize>,
    /// Document position of each line's paragraph.
    doc_starts: Vec<usize>,
    /// Source text (needed for UTF-16 column calculation).
    source: String,
}

impl LineIndex {
    /// Build a line index from source text.
    pub fn new(source: String) -> Self {
        let mut line_starts = vec![0];
        for (i, c) in source.char_indices() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }

        let mut doc_starts = Vec::with_capacity(line_starts.len());
        let mut pos = 0;
        for line in 0..line_starts.len() {
            doc_starts.push(pos);
            pos += line_text(&source, &line_starts, line).chars().count() + 2;
        }

        Self {
            line_starts,
            doc_starts,
            source,
        }
    }

    /// Get the source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn line(&self, line: usize) -> &str {
        line_text(&self.source, &self.line_starts, line)
    }

    /// Convert an LSP position to a byte offset.
    ///
    /// Returns None if the position is out of bounds.
    pub fn position_to_offset(&self, position: Position) -> Option<usize> {
        let line = position.line as usize;
        if line >= self.line_starts.len() {
            return None;
        }

        let line_start = self.line_starts[line];
        let line_slice = self.line(line);

        let mut utf16_col = 0u32;
        for (i, c) in line_slice.char_indices() {
            if utf16_col >= position.character {
                return Some(line_start + i);
            }
            utf16_col += c.len_utf16() as u32;
        }

        // Position is at or past end of line
        Some(line_start + line_slice.len())
    }

    /// Convert an LSP position to a document position.
    pub fn position_to_doc(&self, position: Position) -> Option<usize> {
        let line = position.line as usize;
        if line >= self.line_starts.len() {
            return None;
        }

        let mut utf16_col = 0u32;
        let mut chars = 0;
        for c in self.line(line).chars() {
            if utf16_col >= position.character {
                break;
            }
            utf16_col += c.len_utf16() as u32;
            chars += 1;
        }

        Some(self.doc_starts[line] + 1 + chars)
    }

    /// Convert a document position to an LSP position.
    ///
    /// Paragraph boundaries clamp to the nearest end of the line.
    pub fn doc_to_position(&self, pos: usize) -> Position {
        let line = match self.doc_starts.binary_search(&pos) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };

        let line_slice = self.line(line);
        let chars = (pos - self.doc_starts[line]).saturating_sub(1);

        let col: usize = line_slice.chars().take(chars).map(char::len_utf16).sum();
        Position::new(line as u32, col as u32)
    }

    /// Convert a document range to an LSP range.
    pub fn doc_range_to_range(&self, range: &Range<usize>) -> tower_lsp::lsp_types::Range {
        tower_lsp::lsp_types::Range::new(
            self.doc_to_position(range.start),
            self.doc_to_position(range.end),
        )
    }

    /// Convert an LSP range to a document range.
    pub fn range_to_doc(&self, range: tower_lsp::lsp_types::Range) -> Option<Range<usize>> {
        Some(self.position_to_doc(range.start)?..self.position_to_doc(range.end)?)
    }
}

/// Text of `line` without its line terminator.
fn line_text<'a>(source: &'a str, line_starts: &[usize], line: usize) -> &'a str {
    let start = line_starts[line];
    let end = line_starts
        .get(line + 1)
        .map(|&next| next - 1)
        .unwrap_or(source.len());
    let slice = &source[start..end];
    slice.strip_suffix('\r').unwrap_or(slice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line() {
        let idx = LineIndex::new("hello world".to_string());
        assert_eq!(idx.doc_to_position(1), Position::new(0, 0));
        assert_eq!(idx.doc_to_position(6), Position::new(0, 5));
        assert_eq!(idx.doc_to_position(12), Position::new(0, 11));
    }

    #[test]
    fn multi_line() {
        let idx = LineIndex::new("hello\nworld\ntest".to_string());
        assert_eq!(idx.position_to_doc(Position::new(0, 0)), Some(1));
        assert_eq!(idx.position_to_doc(Position::new(1, 0)), Some(8));
        assert_eq!(idx.position_to_doc(Position::new(2, 4)), Some(19));
        assert_eq!(idx.doc_to_position(8), Position::new(1, 0));
        assert_eq!(idx.doc_to_position(13), Position::new(1, 5));
    }

    #[test]
    fn position_to_offset_multi_line() {
        let idx = LineIndex::new("hello\nworld".to_string());
        assert_eq!(idx.position_to_offset(Position::new(0, 0)), Some(0));
        assert_eq!(idx.position_to_offset(Position::new(0, 5)), Some(5));
        assert_eq!(idx.position_to_offset(Position::new(1, 0)), Some(6));
        assert_eq!(idx.position_to_offset(Position::new(1, 5)), Some(11));
    }

    #[test]
    fn utf16_handling() {
        // '😀' is one char in the document but 2 code units in UTF-16
        let idx = LineIndex::new("a😀b".to_string());
        assert_eq!(idx.doc_to_position(2), Position::new(0, 1));
        assert_eq!(idx.doc_to_position(3), Position::new(0, 3));
        assert_eq!(idx.position_to_doc(Position::new(0, 3)), Some(3));
        assert_eq!(idx.position_to_offset(Position::new(0, 3)), Some(5));
    }

    #[test]
    fn crlf_lines() {
        let idx = LineIndex::new("ab\r\ncd".to_string());
        assert_eq!(idx.position_to_doc(Position::new(1, 1)), Some(6));
        assert_eq!(idx.position_to_offset(Position::new(0, 9)), Some(2));
    }

    #[test]
    fn out_of_bounds() {
        let idx = LineIndex::new("hello".to_string());
        assert_eq!(idx.position_to_offset(Position::new(5, 0)), None);
        assert_eq!(idx.position_to_doc(Position::new(5, 0)), None);
    }

    #[test]
    fn doc_range_to_range() {
        let idx = LineIndex::new("hello\nworld".to_string());
        let range = idx.doc_range_to_range(&(8..13));
        assert_eq!(range.start, Position::new(1, 0));
        assert_eq!(range.end, Position::new(1, 5));
    }
}
