//! Error types.
//!
//! Nothing in the proofreading pipeline is fatal to an editing session: every
//! error below is logged and recovered from where it occurs.

use std::path::PathBuf;

use thiserror::Error;

use crate::decoration::MarkerId;

/// Failure reported by a proofreading backend.
#[derive(Debug, Error)]
pub enum ProofreadError {
    #[error("proofreading backend unavailable: {0}")]
    Unavailable(String),

    #[error("normalization changed text length from {before} to {after} chars")]
    LengthChanged { before: usize, after: usize },

    #[error("proofreading task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Failures the spellchecker recovers from locally.
#[derive(Debug, Error)]
pub enum SpellcheckError {
    #[error(transparent)]
    ProofreaderUnavailable(#[from] ProofreadError),

    #[error("suggestions for request {request} arrived after the interaction moved on")]
    StaleInteraction { request: u64 },

    #[error("marker {0:?} has no match payload")]
    MalformedMarkerPayload(MarkerId),
}

/// Invalid edit on an owned [`Node`](crate::document::Node) tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("invalid range {from}..{to}")]
    InvalidRange { from: usize, to: usize },

    #[error("range {from}..{to} is out of bounds for content size {size}")]
    OutOfBounds { from: usize, to: usize, size: usize },

    #[error("range {from}..{to} does not lie inside a single textblock")]
    NotInTextblock { from: usize, to: usize },
}

/// Failure loading a word list.
#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("failed to read dictionary {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
