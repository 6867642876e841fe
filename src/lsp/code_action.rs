//! Suggestion popovers rendered as code actions.
//!
//! Each suggestion becomes a quick fix whose command accepts it; the server
//! then applies the replacement through `workspace/applyEdit`. A popover
//! without suggestions becomes a single disabled action carrying the
//! configured message.

use tower_lsp::lsp_types::{
    CodeAction, CodeActionDisabled, CodeActionKind, CodeActionOrCommand, Command, Url,
};

use crate::suggestion::{Popover, PopoverContent};

/// Re-check a whole document. Takes the document URI, or nothing for all.
pub const CHECK_SPELLING_COMMAND: &str = "spellchecker.checkSpelling";

/// Accept a suggestion. Takes the document URI, the suggestion index and the
/// word the popover was opened for.
pub const ACCEPT_SUGGESTION_COMMAND: &str = "spellchecker.acceptSuggestion";

pub fn suggestion_actions(uri: &Url, popover: &Popover) -> Vec<CodeActionOrCommand> {
    match &popover.content {
        PopoverContent::Suggestions(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let title = format!("Change to \"{}\"", item);
                CodeActionOrCommand::CodeAction(CodeAction {
                    title: title.clone(),
                    kind: Some(CodeActionKind::QUICKFIX),
                    command: Some(Command {
                        title,
                        command: ACCEPT_SUGGESTION_COMMAND.to_string(),
                        arguments: Some(vec![
                            uri.as_str().into(),
                            index.into(),
                            popover.word.as_str().into(),
                        ]),
                    }),
                    is_preferred: Some(index == 0),
                    ..Default::default()
                })
            })
            .collect(),
        PopoverContent::Empty(message) => {
            vec![CodeActionOrCommand::CodeAction(CodeAction {
                title: message.clone(),
                kind: Some(CodeActionKind::QUICKFIX),
                disabled: Some(CodeActionDisabled {
                    reason: message.clone(),
                }),
                ..Default::default()
            })]
        }
    }
}
