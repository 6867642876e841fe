//! One actor task per open document.
//!
//! The spellchecker is driven from a single task, so each open document gets
//! its own [`Session`] owning the text, the paragraph tree and the
//! [`Spellchecker`]. The backend talks to it through a [`SessionHandle`].

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc, oneshot};
use tower_lsp::lsp_types::{
    CodeActionOrCommand, Diagnostic, Position, TextDocumentContentChangeEvent, TextEdit, Url,
};
use tower_lsp::Client;

use crate::document::{TextDocument, Transaction};
use crate::spellchecker::{SpellcheckEvent, Spellchecker, SpellcheckerOptions, Update};

use super::code_action::suggestion_actions;
use super::diagnostics::to_diagnostics;
use super::{LoadingNotification, LoadingParams};

/// Where a session reports to.
#[async_trait]
pub trait SessionSink: Send + Sync + 'static {
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: i32);

    async fn set_loading(&self, uri: Url, loading: bool);
}

#[async_trait]
impl SessionSink for Client {
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: i32) {
        self.publish_diagnostics(uri, diagnostics, Some(version))
            .await;
    }

    async fn set_loading(&self, uri: Url, loading: bool) {
        self.send_notification::<LoadingNotification>(LoadingParams { uri, loading })
            .await;
    }
}

#[derive(Debug)]
pub enum SessionMessage {
    Change {
        changes: Vec<TextDocumentContentChangeEvent>,
        version: i32,
    },
    CheckSpelling,
    /// Click at a position; replies with the resulting code actions.
    Suggest {
        position: Position,
        reply: oneshot::Sender<Vec<CodeActionOrCommand>>,
    },
    /// Accept a suggestion of the open popover, if it is still for `word`.
    Accept {
        word: String,
        index: usize,
        reply: oneshot::Sender<Option<TextEdit>>,
    },
    Close,
}

/// Sending side of a session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionMessage>,
}

impl SessionHandle {
    /// Start a session for a newly opened document.
    pub fn spawn<S: SessionSink>(
        uri: Url,
        text: String,
        version: i32,
        options: SpellcheckerOptions,
        sink: S,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::new(uri, TextDocument::new(text, version), options, sink);
        tokio::spawn(session.run(rx));
        Self { tx }
    }

    /// Returns false if the session has already stopped.
    pub fn send(&self, message: SessionMessage) -> bool {
        self.tx.send(message).is_ok()
    }

    pub async fn suggest(&self, position: Position) -> Vec<CodeActionOrCommand> {
        let (reply, rx) = oneshot::channel();
        if !self.send(SessionMessage::Suggest { position, reply }) {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    pub async fn accept(&self, word: String, index: usize) -> Option<TextEdit> {
        let (reply, rx) = oneshot::channel();
        if !self.send(SessionMessage::Accept { word, index, reply }) {
            return None;
        }
        rx.await.ok().flatten()
    }
}

/// Thread-safe storage for running sessions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<Url, SessionHandle>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session, stopping any previous one for the same document.
    pub fn open(&self, uri: Url, handle: SessionHandle) {
        if let Some(previous) = self.sessions.insert(uri, handle) {
            previous.send(SessionMessage::Close);
        }
    }

    pub fn close(&self, uri: &Url) {
        if let Some((_, handle)) = self.sessions.remove(uri) {
            handle.send(SessionMessage::Close);
        }
    }

    pub fn get(&self, uri: &Url) -> Option<SessionHandle> {
        self.sessions.get(uri).map(|r| r.clone())
    }

    pub fn all(&self) -> Vec<SessionHandle> {
        self.sessions.iter().map(|r| r.value().clone()).collect()
    }
}

struct Session<S> {
    uri: Url,
    document: TextDocument,
    spellchecker: Spellchecker,
    sink: S,
    /// Checks started but not yet finished.
    running: usize,
}

impl<S: SessionSink> Session<S> {
    fn new(uri: Url, document: TextDocument, options: SpellcheckerOptions, sink: S) -> Self {
        let mut spellchecker = Spellchecker::new(options);
        spellchecker.init(&document.tree);
        Self {
            uri,
            document,
            spellchecker,
            sink,
            running: 0,
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionMessage>) {
        let mut events = self.spellchecker.subscribe();
        tracing::debug!("session started for {}", self.uri);

        loop {
            // Messages, then events, then updates: loading is reported before
            // the markers it covers.
            tokio::select! {
                biased;
                message = rx.recv() => match message {
                    Some(SessionMessage::Close) | None => break,
                    Some(message) => self.handle(message).await,
                },
                event = events.recv() => match event {
                    Ok(event) => self.on_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "missed check events for {}", self.uri);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                Some(update) = self.spellchecker.next_update() => {
                    self.on_update(update).await;
                }
            }
        }

        if self.running > 0 {
            self.sink.set_loading(self.uri.clone(), false).await;
        }
        tracing::debug!("session stopped for {}", self.uri);
    }

    async fn handle(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::Change { changes, version } => {
                for change in changes {
                    let applied = self.document.apply_change(change, version);
                    let mut tr =
                        Transaction::edit(&self.document.tree, applied.mapping, applied.selection);
                    if applied.paste {
                        tr = tr.pasted();
                    }
                    self.spellchecker.apply(&tr);
                }
                self.publish().await;
            }
            SessionMessage::CheckSpelling => {
                self.spellchecker.check_spelling(&self.document.tree);
            }
            SessionMessage::Suggest { position, reply } => {
                let actions = self.suggest(position).await;
                let _ = reply.send(actions);
            }
            SessionMessage::Accept { word, index, reply } => {
                let edit = self
                    .spellchecker
                    .accept_word(&word, index)
                    .map(|replacement| TextEdit {
                        range: self
                            .document
                            .line_index
                            .doc_range_to_range(&replacement.range),
                        new_text: replacement.text,
                    });
                let _ = reply.send(edit);
            }
            SessionMessage::Close => {}
        }
    }

    /// Click at `position` and wait until the popover opens or the
    /// interaction ends.
    async fn suggest(&mut self, position: Position) -> Vec<CodeActionOrCommand> {
        let Some(pos) = self.document.line_index.position_to_doc(position) else {
            return Vec::new();
        };
        if self.spellchecker.click_at(pos).is_none() {
            return Vec::new();
        }

        loop {
            if let Some(popover) = self.spellchecker.popover() {
                return suggestion_actions(&self.uri, popover);
            }
            match self.spellchecker.next_update().await {
                Some(Update::StaleSuggestions | Update::InteractionClosed) | None => {
                    return Vec::new();
                }
                Some(update) => self.on_update(update).await,
            }
            // The click fired but found no marker to open.
            if !self.spellchecker.click_pending()
                && self.spellchecker.interaction().active_word().is_none()
            {
                return Vec::new();
            }
        }
    }

    async fn on_update(&mut self, update: Update) {
        match update {
            Update::MarkersChanged(_) => self.publish().await,
            Update::CheckFailed(id) => {
                tracing::debug!(?id, "check failed for {}", self.uri);
            }
            _ => {}
        }
    }

    async fn on_event(&mut self, event: SpellcheckEvent) {
        match event {
            SpellcheckEvent::CheckStarted { .. } => {
                self.running += 1;
                if self.running == 1 {
                    self.sink.set_loading(self.uri.clone(), true).await;
                }
            }
            SpellcheckEvent::CheckFinished { .. } => {
                self.running = self.running.saturating_sub(1);
                if self.running == 0 {
                    self.sink.set_loading(self.uri.clone(), false).await;
                }
            }
        }
    }

    async fn publish(&self) {
        let diagnostics = to_diagnostics(&self.spellchecker.markers(), &self.document.line_index);
        self.sink
            .publish(self.uri.clone(), diagnostics, self.document.version)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tower_lsp::lsp_types::Range;

    use crate::proofread::WordListProofreader;

    #[derive(Debug)]
    enum Sent {
        Diagnostics(Vec<String>, i32),
        Loading(bool),
    }

    #[derive(Clone)]
    struct ChannelSink(mpsc::UnboundedSender<Sent>);

    #[async_trait]
    impl SessionSink for ChannelSink {
        async fn publish(&self, _uri: Url, diagnostics: Vec<Diagnostic>, version: i32) {
            let messages = diagnostics.into_iter().map(|d| d.message).collect();
            let _ = self.0.send(Sent::Diagnostics(messages, version));
        }

        async fn set_loading(&self, _uri: Url, loading: bool) {
            let _ = self.0.send(Sent::Loading(loading));
        }
    }

    fn open(text: &str) -> (SessionHandle, mpsc::UnboundedReceiver<Sent>) {
        open_with_click_delay(text, 0)
    }

    fn open_with_click_delay(
        text: &str,
        click_ms: u64,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<Sent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let proofreader = Arc::new(WordListProofreader::new(["this", "is", "a", "test"]));
        let mut options = SpellcheckerOptions::new(proofreader);
        options.debounce.click_ms = click_ms;
        let handle = SessionHandle::spawn(
            Url::parse("file:///notes.txt").unwrap(),
            text.to_string(),
            1,
            options,
            ChannelSink(tx),
        );
        (handle, rx)
    }

    fn insert(line: u32, character: u32, text: &str, version: i32) -> SessionMessage {
        let at = Position::new(line, character);
        SessionMessage::Change {
            changes: vec![TextDocumentContentChangeEvent {
                range: Some(Range::new(at, at)),
                range_length: None,
                text: text.to_string(),
            }],
            version,
        }
    }

    async fn next_diagnostics(rx: &mut mpsc::UnboundedReceiver<Sent>) -> (Vec<String>, i32) {
        loop {
            match rx.recv().await {
                Some(Sent::Diagnostics(messages, version)) => return (messages, version),
                Some(Sent::Loading(_)) => continue,
                None => panic!("session stopped"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_markers_after_the_initial_check() {
        let (_handle, mut rx) = open("Ths is a tst.");

        assert!(matches!(rx.recv().await, Some(Sent::Loading(true))));
        let (messages, version) = next_diagnostics(&mut rx).await;
        assert_eq!(messages, ["Unknown word: Ths", "Unknown word: tst"]);
        assert_eq!(version, 1);
        assert!(matches!(rx.recv().await, Some(Sent::Loading(false))));
    }

    #[tokio::test(start_paused = true)]
    async fn code_action_then_accept_produces_an_edit() {
        let (handle, mut rx) = open("Ths is a tst.");
        next_diagnostics(&mut rx).await;

        let actions = handle.suggest(Position::new(0, 1)).await;
        assert_eq!(actions.len(), 1);

        assert!(handle.accept("tst".into(), 0).await.is_none());
        let edit = handle.accept("Ths".into(), 0).await.unwrap();
        assert_eq!(edit.new_text, "This");
        assert_eq!(edit.range, Range::new(Position::new(0, 0), Position::new(0, 3)));

        handle.send(SessionMessage::Change {
            changes: vec![TextDocumentContentChangeEvent {
                range: Some(edit.range),
                range_length: None,
                text: edit.new_text,
            }],
            version: 2,
        });
        // Mapped markers first, then the re-checked block.
        let (mapped, _) = next_diagnostics(&mut rx).await;
        assert_eq!(mapped.len(), 2);
        let (rechecked, version) = next_diagnostics(&mut rx).await;
        assert_eq!(rechecked, ["Unknown word: tst"]);
        assert_eq!(version, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn no_code_actions_away_from_markers() {
        let (handle, mut rx) = open("Ths is a tst.");
        next_diagnostics(&mut rx).await;

        assert!(handle.suggest(Position::new(0, 5)).await.is_empty());
        assert!(handle.accept("Ths".into(), 0).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn code_action_on_a_fixed_word_returns_without_waiting_for_debounced_checks() {
        let (handle, mut rx) = open_with_click_delay("Ths is", 50);
        next_diagnostics(&mut rx).await;

        // "Ths" becomes "This" and the immediate block check clears the
        // marker; the second edit leaves a debounced check pending.
        handle.send(insert(0, 2, "i", 2));
        handle.send(insert(0, 7, "x", 3));

        let started = tokio::time::Instant::now();
        let actions = handle.suggest(Position::new(0, 1)).await;
        assert!(actions.is_empty());
        assert!(started.elapsed() < std::time::Duration::from_millis(300));
    }
}
