//! State of one plain-text document open in the language server.

use std::ops::Range;

use tower_lsp::lsp_types::{Position, TextDocumentContentChangeEvent};

use super::mapping::{Mapping, StepMap};
use super::node::Node;
use super::text::LineIndex;
use super::tree::DocNode;

/// A text document and its paragraph tree.
#[derive(Debug, Clone)]
pub struct TextDocument {
    /// Pre-computed line index for position conversion.
    pub line_index: LineIndex,
    /// One paragraph per line.
    pub tree: Node,
    /// Document version from the client.
    pub version: i32,
}

/// How one content change moved the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedChange {
    pub mapping: Mapping,
    /// Cursor position after the change.
    pub selection: Range<usize>,
    /// The change looks like a paste: several lines of real text, or a full
    /// replacement.
    pub paste: bool,
}

impl TextDocument {
    pub fn new(source: String, version: i32) -> Self {
        let tree = Node::from_plain_text(&source);
        Self {
            line_index: LineIndex::new(source),
            tree,
            version,
        }
    }

    pub fn source(&self) -> &str {
        self.line_index.source()
    }

    /// Apply one change event from the client.
    pub fn apply_change(
        &mut self,
        change: TextDocumentContentChangeEvent,
        version: i32,
    ) -> AppliedChange {
        self.version = version;
        let Some(range) = change.range else {
            return self.replace_all(change.text);
        };

        let source = self.source();
        let start = self.offset_or_end(range.start);
        let end = self.offset_or_end(range.end).max(start);
        let from = self.doc_or_end(range.start);
        let to = self.doc_or_end(range.end).max(from);

        let mut next = String::with_capacity(source.len() + change.text.len());
        next.push_str(&source[..start]);
        next.push_str(&change.text);
        next.push_str(&source[end..]);

        let inserted = doc_size(&change.text);
        let tree = if change.text.contains('\n') || change.text.contains('\r') {
            None
        } else {
            self.tree.replace_text(from, to, &change.text).ok()
        };
        self.tree = tree.unwrap_or_else(|| Node::from_plain_text(&next));
        self.line_index = LineIndex::new(next);

        AppliedChange {
            mapping: StepMap::replace(from, to - from, inserted).into(),
            selection: from + inserted..from + inserted,
            paste: change.text.contains('\n') && change.text.chars().any(|c| !c.is_whitespace()),
        }
    }

    fn replace_all(&mut self, source: String) -> AppliedChange {
        let old_size = self.tree.content_size();
        *self = Self::new(source, self.version);
        let new_size = self.tree.content_size();

        AppliedChange {
            mapping: StepMap::replace(0, old_size, new_size).into(),
            selection: new_size..new_size,
            paste: true,
        }
    }

    fn offset_or_end(&self, position: Position) -> usize {
        self.line_index
            .position_to_offset(position)
            .unwrap_or(self.source().len())
    }

    fn doc_or_end(&self, position: Position) -> usize {
        self.line_index
            .position_to_doc(position)
            .unwrap_or(self.tree.content_size().saturating_sub(1))
    }
}

/// Number of document positions `text` occupies once split into paragraphs.
fn doc_size(text: &str) -> usize {
    text.chars()
        .map(|c| match c {
            '\r' => 0,
            '\n' => 2,
            _ => 1,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{extract, Assoc};
    use tower_lsp::lsp_types::Range as LspRange;

    fn change(start: (u32, u32), end: (u32, u32), text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: Some(LspRange::new(
                Position::new(start.0, start.1),
                Position::new(end.0, end.1),
            )),
            range_length: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn typing_in_a_line_edits_the_tree() {
        let mut doc = TextDocument::new("Ths is\nnext".to_string(), 1);
        let applied = doc.apply_change(change((0, 1), (0, 1), "i"), 2);

        assert_eq!(doc.source(), "This is\nnext");
        assert_eq!(doc.tree, Node::from_plain_text("This is\nnext"));
        assert_eq!(doc.version, 2);
        assert_eq!(applied.selection, 3..3);
        assert!(!applied.paste);
        // The second paragraph moved by one.
        assert_eq!(applied.mapping.map(9, Assoc::Before), 10);
    }

    #[test]
    fn multi_line_insertions_are_pastes() {
        let mut doc = TextDocument::new("ab".to_string(), 1);
        let applied = doc.apply_change(change((0, 1), (0, 1), "x\nyz"), 2);

        assert_eq!(doc.source(), "ax\nyzb");
        assert!(applied.paste);
        assert_eq!(doc.tree.content_size(), 9);
        assert_eq!(applied.selection, 7..7);
        assert_eq!(extract(&doc.tree, None).text, "ax  yzb");

        let applied = doc.apply_change(change((0, 2), (0, 2), "\n"), 3);
        assert!(!applied.paste);
    }

    #[test]
    fn deleting_a_line_break_joins_paragraphs() {
        let mut doc = TextDocument::new("ab\ncd".to_string(), 1);
        let applied = doc.apply_change(change((0, 2), (1, 0), ""), 2);

        assert_eq!(doc.source(), "abcd");
        assert_eq!(doc.tree, Node::from_plain_text("abcd"));
        assert_eq!(applied.mapping.map(6, Assoc::Before), 4);
    }

    #[test]
    fn full_replacement_is_a_paste() {
        let mut doc = TextDocument::new("old".to_string(), 1);
        let applied = doc.apply_change(
            TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: "brand new".to_string(),
            },
            4,
        );

        assert!(applied.paste);
        assert_eq!(doc.version, 4);
        assert_eq!(doc.source(), "brand new");
        assert_eq!(applied.mapping.map_range(&(1..4)), None);
    }
}
