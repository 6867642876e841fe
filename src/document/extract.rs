//! Flat text extraction with absolute position preservation.
//!
//! The proofreader sees one string per check. Text leaves are concatenated in
//! document order and every gap left by block boundaries or inline non-text
//! leaves is padded with blanks, so that char `i` of the extracted text always
//! sits at document position `base + i`.

use std::ops::Range;

use super::tree::{descendants, DocNode};

/// A contiguous run of text with its absolute document range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    pub from: usize,
    pub to: usize,
}

/// Extracted text for one check, anchored at `base`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenedText {
    pub text: String,
    /// Document position of the first char of `text`.
    pub base: usize,
    len: usize,
}

impl FlattenedText {
    /// Length in chars.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Absolute document range covered by the text.
    pub fn range(&self) -> Range<usize> {
        self.base..self.base + self.len
    }
}

/// Collect the text leaves of `root` as spans, merging leaves that touch.
///
/// With a scope, leaves are clipped to it and subtrees outside it are skipped.
pub fn text_spans<N: DocNode>(root: &N, scope: Option<&Range<usize>>) -> Vec<TextSpan> {
    let mut spans: Vec<TextSpan> = Vec::new();

    descendants(root, |node, pos| {
        let end = pos + node.node_size();
        if let Some(scope) = scope {
            if end <= scope.start || pos >= scope.end {
                return false;
            }
        }
        if !node.is_text() {
            return true;
        }

        let (from, to) = match scope {
            Some(scope) => (pos.max(scope.start), end.min(scope.end)),
            None => (pos, end),
        };
        let text: String = node.text().chars().skip(from - pos).take(to - from).collect();

        match spans.last_mut() {
            Some(last) if last.to == from => {
                last.text.push_str(&text);
                last.to = to;
            }
            _ => spans.push(TextSpan { text, from, to }),
        }
        false
    });

    spans
}

/// Flatten the text of `root`, optionally restricted to `scope`.
///
/// With a scope the base is `scope.start`; without one it is the start of the
/// first text leaf. An empty document yields empty text.
pub fn extract<N: DocNode>(root: &N, scope: Option<Range<usize>>) -> FlattenedText {
    let spans = text_spans(root, scope.as_ref());
    let base = match &scope {
        Some(scope) => scope.start,
        None => spans.first().map_or(0, |span| span.from),
    };

    let mut text = String::new();
    let mut last = base;
    for span in &spans {
        let gap = span.from.saturating_sub(last);
        text.extend(std::iter::repeat(' ').take(gap));
        text.push_str(&span.text);
        last = span.to;
    }

    FlattenedText {
        len: last - base,
        text,
        base,
    }
}

/// Find the innermost block containing `selection`, returned as its content
/// range (inside its boundaries).
pub fn find_changed_block<N: DocNode>(root: &N, selection: &Range<usize>) -> Option<Range<usize>> {
    let mut found = None;
    descendants(root, |node, pos| {
        if !node.is_block() {
            return false;
        }
        let end = pos + node.node_size();
        if !(pos <= selection.start && selection.end <= end) {
            return false;
        }
        found = Some(pos + 1..end - 1);
        true
    });
    found
}
