//! Incremental proofreading engine and spell-check language server.
//!
//! The engine ([`Spellchecker`]) keeps spelling markers on a structured
//! document in sync with ongoing edits, re-checking only the block being
//! edited. [`Backend`] hosts one engine per open plain-text document behind
//! the Language Server Protocol.

use std::collections::HashMap;
use std::sync::OnceLock;

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService};

pub mod debounce;
pub mod decoration;
pub mod document;
pub mod error;
pub mod lsp;
pub mod proofread;
pub mod scheduler;
pub mod settings;
pub mod spellchecker;
pub mod suggestion;

pub use decoration::{reconcile, Decoration, ErrorMarker, MarkerId, MarkerSet, MARKER_CLASS};
pub use document::{
    extract, find_changed_block, Assoc, DocNode, FlattenedText, LineIndex, Mapping, Node,
    NodeKind, StepMap, TextDocument, TextSpan, Transaction, TransactionMeta,
};
pub use error::{DictionaryError, EditError, ProofreadError, SpellcheckError};
pub use proofread::{MatchResult, Proofreader, WordListProofreader};
pub use scheduler::{CheckKey, Decision, Phase, Timing};
pub use settings::{build_options, discover_settings, load_settings, Settings, UiStrings};
pub use spellchecker::{CheckId, SpellcheckEvent, Spellchecker, SpellcheckerOptions, Update};
pub use suggestion::{InteractionState, Popover, PopoverContent, Replacement, ScreenCoords};

use lsp::{SessionHandle, SessionMessage, SessionStore};

pub struct Backend {
    client: Client,
    sessions: SessionStore,
    options: OnceLock<Option<SpellcheckerOptions>>,
}

impl Backend {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            client,
            sessions: SessionStore::new(),
            options: OnceLock::new(),
        }
    }

    fn options(&self) -> Option<&SpellcheckerOptions> {
        self.options.get().and_then(|o| o.as_ref())
    }
}

/// First argument of a command, as a URI.
fn uri_argument(arguments: &[LSPAny]) -> Option<Url> {
    Url::parse(arguments.first()?.as_str()?).ok()
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        // Extract workspace root from params
        let workspace_root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .and_then(|f| f.uri.to_file_path().ok())
            .or_else(|| {
                #[allow(deprecated)]
                params.root_uri.as_ref()?.to_file_path().ok()
            });

        let options = workspace_root.and_then(|root| {
            // Discover settings by walking up the directory tree
            let (settings, settings_dir) = settings::discover_settings(&root);
            settings::build_options(&settings, &settings_dir)
        });
        if options.is_none() {
            tracing::warn!("no dictionary configured, spell checking is disabled");
        }
        let _ = self.options.set(options);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                code_action_provider: Some(CodeActionProviderCapability::Options(
                    CodeActionOptions {
                        code_action_kinds: Some(vec![CodeActionKind::QUICKFIX]),
                        ..Default::default()
                    },
                )),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![
                        lsp::CHECK_SPELLING_COMMAND.to_string(),
                        lsp::ACCEPT_SUGGESTION_COMMAND.to_string(),
                    ],
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        tracing::info!("spellchecker language server initialized");
        self.client
            .log_message(MessageType::INFO, "spellchecker language server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let Some(options) = self.options() else {
            return;
        };
        let uri = params.text_document.uri;
        tracing::debug!("document opened: {}", uri);

        let handle = SessionHandle::spawn(
            uri.clone(),
            params.text_document.text,
            params.text_document.version,
            options.clone(),
            self.client.clone(),
        );
        self.sessions.open(uri, handle);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let Some(session) = self.sessions.get(&params.text_document.uri) else {
            return;
        };
        session.send(SessionMessage::Change {
            changes: params.content_changes,
            version: params.text_document.version,
        });
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.sessions.close(&params.text_document.uri);
        // Clear diagnostics
        self.client
            .publish_diagnostics(params.text_document.uri, vec![], None)
            .await;
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let Some(session) = self.sessions.get(&params.text_document.uri) else {
            return Ok(None);
        };

        let actions = session.suggest(params.range.start).await;
        Ok((!actions.is_empty()).then_some(actions))
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> Result<Option<LSPAny>> {
        match params.command.as_str() {
            lsp::CHECK_SPELLING_COMMAND => {
                let sessions = match uri_argument(&params.arguments) {
                    Some(uri) => self.sessions.get(&uri).into_iter().collect(),
                    None => self.sessions.all(),
                };
                for session in sessions {
                    session.send(SessionMessage::CheckSpelling);
                }
            }
            lsp::ACCEPT_SUGGESTION_COMMAND => {
                let Some(uri) = uri_argument(&params.arguments) else {
                    return Ok(None);
                };
                let Some(index) = params.arguments.get(1).and_then(|v| v.as_u64()) else {
                    return Ok(None);
                };
                let Some(word) = params.arguments.get(2).and_then(|v| v.as_str()) else {
                    return Ok(None);
                };
                let Some(session) = self.sessions.get(&uri) else {
                    return Ok(None);
                };
                let Some(edit) = session.accept(word.to_string(), index as usize).await else {
                    return Ok(None);
                };

                let workspace_edit = WorkspaceEdit {
                    changes: Some(HashMap::from([(uri, vec![edit])])),
                    ..Default::default()
                };
                if let Err(e) = self.client.apply_edit(workspace_edit).await {
                    tracing::warn!("applying suggestion failed: {}", e);
                }
            }
            other => tracing::warn!("unknown command {}", other),
        }
        Ok(None)
    }
}

pub fn create_service() -> (LspService<Backend>, tower_lsp::ClientSocket) {
    LspService::new(Backend::new)
}
