//! Document model, text extraction and position mapping.
//!
//! This module provides:
//! - `DocNode`, the read-only view of a host document tree
//! - `Node`, an owned tree for plain-text documents and tests
//! - `extract` and `find_changed_block` for flattening text with absolute positions
//! - `StepMap`, `Mapping` and `Transaction` for following mutations
//! - `LineIndex` and `TextDocument` for LSP position conversion

mod extract;
mod mapping;
mod node;
mod state;
mod text;
mod tree;

pub use extract::{extract, find_changed_block, text_spans, FlattenedText, TextSpan};
pub use mapping::{Assoc, Mapping, StepMap, Transaction, TransactionMeta};
pub use node::Node;
pub use state::{AppliedChange, TextDocument};
pub use text::LineIndex;
pub use tree::{descendants, DocNode, NodeKind};
