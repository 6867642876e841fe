//! Capability interface over a host document tree.
//!
//! Positions follow the usual structured-document convention: the root's
//! content starts at 0, every text leaf occupies one position per character,
//! every inline leaf occupies exactly one position, and every other node
//! occupies its content size plus one position for its opening and one for its
//! closing boundary.

/// Classification of a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A run of text. Leaf.
    Text,
    /// An inline leaf that is not text (image, hard break, mention).
    Inline,
    /// A block whose children are inline content (paragraph, heading).
    Textblock,
    /// A block containing other blocks (document, list, blockquote).
    Block,
}

/// Read-only view of a node in the host's document tree.
pub trait DocNode {
    /// The node's classification.
    fn kind(&self) -> NodeKind;

    /// Literal content of a text leaf. Empty for every other kind.
    fn text(&self) -> &str;

    /// Direct children, in document order.
    fn children(&self) -> impl Iterator<Item = &Self>;

    fn is_text(&self) -> bool {
        self.kind() == NodeKind::Text
    }

    fn is_block(&self) -> bool {
        matches!(self.kind(), NodeKind::Textblock | NodeKind::Block)
    }

    fn is_textblock(&self) -> bool {
        self.kind() == NodeKind::Textblock
    }

    /// Number of positions this node occupies in its parent.
    fn node_size(&self) -> usize {
        match self.kind() {
            NodeKind::Text => self.text().chars().count(),
            NodeKind::Inline => 1,
            NodeKind::Textblock | NodeKind::Block => 2 + self.content_size(),
        }
    }

    /// Size of the node's content, excluding its own boundaries.
    fn content_size(&self) -> usize {
        self.children().map(|child| child.node_size()).sum()
    }

    /// Concatenated text of all text leaves below this node.
    fn text_content(&self) -> String {
        if self.is_text() {
            return self.text().to_string();
        }
        let mut out = String::new();
        for child in self.children() {
            out.push_str(&child.text_content());
        }
        out
    }
}

/// Walk every descendant of `root` depth-first, passing each node together with
/// its absolute start position. Returning `false` from `f` skips the node's
/// children.
pub fn descendants<N, F>(root: &N, mut f: F)
where
    N: DocNode,
    F: FnMut(&N, usize) -> bool,
{
    walk(root, 0, &mut f);
}

fn walk<N, F>(parent: &N, content_start: usize, f: &mut F)
where
    N: DocNode,
    F: FnMut(&N, usize) -> bool,
{
    let mut pos = content_start;
    for child in parent.children() {
        if f(child, pos) && !child.is_text() {
            walk(child, pos + 1, f);
        }
        pos += child.node_size();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Node;

    #[test]
    fn positions_follow_node_boundaries() {
        let doc = Node::doc(vec![
            Node::paragraph(vec![Node::text("ab")]),
            Node::paragraph(vec![Node::text("cd")]),
        ]);

        let mut seen = Vec::new();
        descendants(&doc, |node, pos| {
            seen.push((node.kind(), pos));
            true
        });

        assert_eq!(
            seen,
            vec![
                (NodeKind::Textblock, 0),
                (NodeKind::Text, 1),
                (NodeKind::Textblock, 4),
                (NodeKind::Text, 5),
            ]
        );
        assert_eq!(doc.content_size(), 8);
    }

    #[test]
    fn returning_false_skips_children() {
        let doc = Node::doc(vec![Node::paragraph(vec![Node::text("ab")])]);

        let mut count = 0;
        descendants(&doc, |_, _| {
            count += 1;
            false
        });

        assert_eq!(count, 1);
    }

    #[test]
    fn inline_leaves_take_one_position() {
        let para = Node::paragraph(vec![Node::text("a"), Node::hard_break(), Node::text("b")]);
        assert_eq!(para.node_size(), 5);
        assert_eq!(para.text_content(), "ab");
    }
}
