//! Diagnostics conversion from error markers to LSP diagnostics.

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString};

use crate::decoration::{MarkerSet, MARKER_CLASS};
use crate::document::LineIndex;

/// Source name attached to every published diagnostic.
pub const DIAGNOSTIC_SOURCE: &str = "spellchecker";

/// Convert every marker to an LSP diagnostic.
pub fn to_diagnostics(markers: &MarkerSet, line_index: &LineIndex) -> Vec<Diagnostic> {
    markers
        .iter()
        .map(|marker| Diagnostic {
            range: line_index.doc_range_to_range(&marker.range()),
            severity: Some(DiagnosticSeverity::INFORMATION),
            code: Some(NumberOrString::String(MARKER_CLASS.to_string())),
            code_description: None,
            source: Some(DIAGNOSTIC_SOURCE.to_string()),
            message: format!("Unknown word: {}", marker.word),
            related_information: None,
            tags: None,
            data: None,
        })
        .collect()
}
