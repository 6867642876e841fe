//! A small owned document tree.
//!
//! Hosts with their own document model implement [`DocNode`] directly. This
//! tree backs the language server's plain-text documents and is handy for
//! driving the engine from tests.

use crate::error::EditError;

use super::tree::{DocNode, NodeKind};

/// An owned document node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    kind: NodeKind,
    /// Node type name ("doc", "paragraph", "text", "hard_break", ...).
    name: String,
    /// Content of a text leaf.
    text: String,
    /// Inline marks on a text leaf ("bold", "em", ...).
    marks: Vec<String>,
    children: Vec<Node>,
}

impl Node {
    fn new(kind: NodeKind, name: &str, children: Vec<Node>) -> Self {
        Self {
            kind,
            name: name.to_string(),
            text: String::new(),
            marks: Vec::new(),
            children,
        }
    }

    /// The document root.
    pub fn doc(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Block, "doc", children)
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Textblock, "paragraph", children)
    }

    /// A block containing other blocks, e.g. `blockquote` or `list_item`.
    pub fn block(name: &str, children: Vec<Node>) -> Self {
        Self::new(NodeKind::Block, name, children)
    }

    pub fn text(text: &str) -> Self {
        Self::marked_text(text, &[])
    }

    pub fn marked_text(text: &str, marks: &[&str]) -> Self {
        Self {
            kind: NodeKind::Text,
            name: "text".to_string(),
            text: text.to_string(),
            marks: marks.iter().map(|m| m.to_string()).collect(),
            children: Vec::new(),
        }
    }

    pub fn hard_break() -> Self {
        Self::new(NodeKind::Inline, "hard_break", Vec::new())
    }

    /// Build a document with one paragraph per line of `source`.
    pub fn from_plain_text(source: &str) -> Self {
        let paragraphs = source
            .split('\n')
            .map(|line| {
                let line = line.strip_suffix('\r').unwrap_or(line);
                if line.is_empty() {
                    Node::paragraph(Vec::new())
                } else {
                    Node::paragraph(vec![Node::text(line)])
                }
            })
            .collect();
        Node::doc(paragraphs)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn marks(&self) -> &[String] {
        &self.marks
    }

    /// Replace the content range `[from, to)` with plain text.
    ///
    /// The range must lie inside a single textblock. Inserted characters take
    /// the marks of the character right before `from`.
    pub fn replace_text(&self, from: usize, to: usize, text: &str) -> Result<Node, EditError> {
        if from > to {
            return Err(EditError::InvalidRange { from, to });
        }
        let size = self.content_size();
        if to > size {
            return Err(EditError::OutOfBounds { from, to, size });
        }

        let mut doc = self.clone();
        if doc.replace_in(0, from, to, text) {
            Ok(doc)
        } else {
            Err(EditError::NotInTextblock { from, to })
        }
    }

    fn replace_in(&mut self, content_start: usize, from: usize, to: usize, text: &str) -> bool {
        if self.kind == NodeKind::Textblock {
            let content_end = content_start + self.content_size();
            if from < content_start || to > content_end {
                return false;
            }
            self.splice_inline(from - content_start, to - content_start, text);
            return true;
        }

        let mut pos = content_start;
        for child in &mut self.children {
            let size = child.node_size();
            if child.is_block() && from > pos && to < pos + size {
                return child.replace_in(pos + 1, from, to, text);
            }
            pos += size;
        }
        false
    }

    fn splice_inline(&mut self, start: usize, end: usize, text: &str) {
        enum Atom {
            Char(char, Vec<String>),
            Leaf(Node),
        }

        let mut atoms = Vec::new();
        for child in self.children.drain(..) {
            if child.kind == NodeKind::Text {
                atoms.extend(child.text.chars().map(|c| Atom::Char(c, child.marks.clone())));
            } else {
                atoms.push(Atom::Leaf(child));
            }
        }

        let marks = match start.checked_sub(1).and_then(|i| atoms.get(i)) {
            Some(Atom::Char(_, marks)) => marks.clone(),
            _ => Vec::new(),
        };
        atoms.splice(start..end, text.chars().map(|c| Atom::Char(c, marks.clone())));

        for atom in atoms {
            match atom {
                Atom::Char(c, marks) => {
                    let same_run = matches!(
                        self.children.last(),
                        Some(last) if last.kind == NodeKind::Text && last.marks == marks
                    );
                    if let (true, Some(last)) = (same_run, self.children.last_mut()) {
                        last.text.push(c);
                        continue;
                    }
                    let mut node = Node::marked_text("", &[]);
                    node.text.push(c);
                    node.marks = marks;
                    self.children.push(node);
                }
                Atom::Leaf(node) => self.children.push(node),
            }
        }
    }
}

impl DocNode for Node {
    fn kind(&self) -> NodeKind {
        self.kind
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn children(&self) -> impl Iterator<Item = &Self> {
        self.children.iter()
    }
}
