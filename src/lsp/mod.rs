//! LSP protocol feature implementations.
//!
//! This module provides:
//! - Diagnostics conversion from error markers
//! - Code actions rendering the suggestion popover
//! - Per-document sessions driving a spellchecker each
//! - The `spellchecker/loading` notification

mod code_action;
mod diagnostics;
mod session;

use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::notification::Notification;
use tower_lsp::lsp_types::Url;

pub use code_action::{suggestion_actions, ACCEPT_SUGGESTION_COMMAND, CHECK_SPELLING_COMMAND};
pub use diagnostics::{to_diagnostics, DIAGNOSTIC_SOURCE};
pub use session::{SessionHandle, SessionMessage, SessionSink, SessionStore};

/// Sent when a document starts or stops having checks in flight.
#[derive(Debug)]
pub enum LoadingNotification {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadingParams {
    pub uri: Url,
    pub loading: bool,
}

impl Notification for LoadingNotification {
    type Params = LoadingParams;
    const METHOD: &'static str = "spellchecker/loading";
}
