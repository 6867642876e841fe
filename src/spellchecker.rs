//! The per-editor spellchecker.
//!
//! [`Spellchecker`] owns everything one editor needs: the current marker set,
//! the change scheduler, the pending debounced work and the suggestion
//! interaction. It is driven from a single task. Synchronous methods react to
//! document mutations and clicks; [`Spellchecker::next_update`] waits for the
//! next debounce deadline or the next completed proofreading call and folds
//! its result back in.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::{self, JoinError, JoinSet};
use tokio::time::{sleep_until, Instant};

use crate::debounce::Debouncer;
use crate::decoration::{reconcile, MarkerId, MarkerSet};
use crate::document::{extract, DocNode, FlattenedText, Mapping, Transaction};
use crate::error::{ProofreadError, SpellcheckError};
use crate::proofread::{check_text, suggest, MatchResult, Proofreader};
use crate::scheduler::{ChangeScheduler, CheckKey, Decision, Phase, Timing};
use crate::settings::{DebounceSettings, UiStrings};
use crate::suggestion::{
    InteractionController, InteractionState, Popover, Replacement, SuggestionRequest,
};

const EVENT_CAPACITY: usize = 64;

/// Everything needed to build a [`Spellchecker`].
#[derive(Clone)]
pub struct SpellcheckerOptions {
    pub proofreader: Arc<dyn Proofreader>,
    pub ui_strings: UiStrings,
    pub debounce: DebounceSettings,
}

impl SpellcheckerOptions {
    /// Options with default strings and timings.
    pub fn new(proofreader: Arc<dyn Proofreader>) -> Self {
        Self {
            proofreader,
            ui_strings: UiStrings::default(),
            debounce: DebounceSettings::default(),
        }
    }
}

/// Identity of one issued check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CheckId(u64);

/// A check waiting to be issued or in flight.
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub key: CheckKey,
    /// Absolute range whose markers the result replaces.
    pub scope: Range<usize>,
    pub text: FlattenedText,
    /// Mutations applied since `text` was extracted.
    pub since: Mapping,
}

/// Check lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpellcheckEvent {
    CheckStarted { id: CheckId, key: CheckKey },
    CheckFinished { id: CheckId, key: CheckKey, ok: bool },
}

/// What [`Spellchecker::next_update`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// Debounced work came due and was issued.
    DebounceFired,
    MarkersChanged(CheckId),
    /// The check failed; markers were left untouched.
    CheckFailed(CheckId),
    PopoverOpened,
    /// A suggestion lookup failed and the interaction was closed.
    InteractionClosed,
    /// Suggestions arrived for an interaction that had moved on.
    StaleSuggestions,
    /// A task finished that nothing was waiting for.
    Ignored,
}

pub struct Spellchecker {
    options: SpellcheckerOptions,
    markers: Arc<MarkerSet>,
    scheduler: ChangeScheduler,
    interaction: InteractionController,
    pending_checks: Debouncer<CheckKey, CheckRequest>,
    pending_clicks: Debouncer<(), MarkerId>,
    in_flight: HashMap<CheckId, CheckRequest>,
    checks: JoinSet<Result<Vec<MatchResult>, ProofreadError>>,
    check_tasks: HashMap<task::Id, CheckId>,
    suggestions: JoinSet<Result<Vec<String>, ProofreadError>>,
    suggestion_tasks: HashMap<task::Id, SuggestionRequest>,
    events: broadcast::Sender<SpellcheckEvent>,
    next_check: u64,
}

impl Spellchecker {
    pub fn new(options: SpellcheckerOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            options,
            markers: Arc::new(MarkerSet::new()),
            scheduler: ChangeScheduler::new(),
            interaction: InteractionController::new(),
            pending_checks: Debouncer::new(),
            pending_clicks: Debouncer::new(),
            in_flight: HashMap::new(),
            checks: JoinSet::new(),
            check_tasks: HashMap::new(),
            suggestions: JoinSet::new(),
            suggestion_tasks: HashMap::new(),
            events,
            next_check: 0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SpellcheckEvent> {
        self.events.subscribe()
    }

    pub fn options(&self) -> &SpellcheckerOptions {
        &self.options
    }

    /// The current marker set.
    pub fn markers(&self) -> Arc<MarkerSet> {
        Arc::clone(&self.markers)
    }

    pub fn phase(&self) -> Phase {
        self.scheduler.phase()
    }

    pub fn interaction(&self) -> &InteractionState {
        self.interaction.state()
    }

    pub fn popover(&self) -> Option<&Popover> {
        self.interaction.popover()
    }

    /// True when nothing is pending or in flight.
    pub fn is_idle(&self) -> bool {
        self.pending_checks.is_empty()
            && self.pending_clicks.is_empty()
            && self.checks.is_empty()
            && self.suggestions.is_empty()
    }

    /// Schedule the initial full-document check.
    pub fn init<N: DocNode>(&mut self, doc: &N) {
        let request = document_request(doc);
        self.scheduler.full_check_issued();
        self.pending_checks.schedule(
            CheckKey::Document,
            Instant::now(),
            self.options.debounce.document(),
            request,
        );
    }

    /// Check the whole document now.
    pub fn check_spelling<N: DocNode>(&mut self, doc: &N) {
        self.pending_checks.cancel(&CheckKey::Document);
        self.scheduler.full_check_issued();
        self.issue(document_request(doc));
    }

    /// Feed one transaction through the pipeline.
    pub fn apply<N: DocNode>(&mut self, tr: &Transaction<'_, N>) -> Decision {
        if !tr.mapping.is_empty() {
            self.markers = Arc::new(self.markers.map(&tr.mapping));
            for request in self.in_flight.values_mut() {
                request.since.append(&tr.mapping);
            }
            for request in self.pending_checks.actions_mut() {
                request.since.append(&tr.mapping);
            }
            self.interaction.map(&tr.mapping);
        }

        let decision = self.scheduler.decide(tr);
        let request = match &decision {
            Decision::MapOnly => None,
            Decision::Document { .. } => Some(document_request(tr.doc)),
            Decision::Block { scope, .. } => Some(CheckRequest {
                key: CheckKey::Block(scope.start),
                scope: scope.clone(),
                text: extract(tr.doc, Some(scope.clone())),
                since: Mapping::new(),
            }),
        };
        let Some(request) = request else {
            return decision;
        };
        tracing::debug!(key = ?request.key, scope = ?request.scope, "scheduling check: {:?}", decision);

        match &decision {
            Decision::Document { timing } | Decision::Block { timing, .. } => match timing {
                Timing::Immediate => {
                    self.pending_checks.cancel(&request.key);
                    self.issue(request);
                }
                Timing::Debounced => {
                    let delay = match request.key {
                        CheckKey::Document => self.options.debounce.document(),
                        CheckKey::Block(_) => self.options.debounce.block(),
                    };
                    self.pending_checks
                        .schedule(request.key, Instant::now(), delay, request);
                }
            },
            Decision::MapOnly => {}
        }
        decision
    }

    /// A click on a marker. Rapid clicks collapse into the last one.
    pub fn click(&mut self, marker: MarkerId) {
        self.pending_clicks
            .schedule((), Instant::now(), self.options.debounce.click(), marker);
    }

    /// A click at a document position: opens suggestions for the marker
    /// there, or closes the interaction when there is none.
    pub fn click_at(&mut self, pos: usize) -> Option<MarkerId> {
        match self.markers.at(pos).map(|m| m.id) {
            Some(id) => {
                self.click(id);
                Some(id)
            }
            None => {
                self.click_away();
                None
            }
        }
    }

    /// Close the popover and forget any pending lookup.
    pub fn click_away(&mut self) {
        self.pending_clicks.cancel(&());
        self.interaction.dismiss();
    }

    /// True while a click waits for its debounce.
    pub fn click_pending(&self) -> bool {
        self.pending_clicks.is_pending(&())
    }

    /// Accept a suggestion. The host applies the replacement as a normal edit.
    pub fn accept(&mut self, index: usize) -> Option<Replacement> {
        self.interaction.accept(index)
    }

    /// Like [`Spellchecker::accept`], but only if the open popover is for
    /// `word`.
    pub fn accept_word(&mut self, word: &str, index: usize) -> Option<Replacement> {
        self.interaction.accept_word(word, index)
    }

    /// Wait for the next debounce deadline or task completion and process it.
    ///
    /// Returns `None` when nothing is pending.
    pub async fn next_update(&mut self) -> Option<Update> {
        let deadline = self.next_deadline();
        tokio::select! {
            Some(joined) = self.checks.join_next_with_id() => {
                Some(self.finish_check(joined))
            }
            Some(joined) = self.suggestions.join_next_with_id() => {
                Some(self.finish_suggestions(joined))
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                self.fire_due(Instant::now());
                Some(Update::DebounceFired)
            }
            else => None,
        }
    }

    /// Process updates until nothing is pending.
    pub async fn settle(&mut self) {
        while self.next_update().await.is_some() {}
    }

    fn next_deadline(&self) -> Option<Instant> {
        match (
            self.pending_checks.next_deadline(),
            self.pending_clicks.next_deadline(),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn fire_due(&mut self, now: Instant) {
        for (_, request) in self.pending_checks.take_due(now) {
            self.issue(request);
        }
        for (_, marker) in self.pending_clicks.take_due(now) {
            match self.interaction.begin(&self.markers, marker) {
                Ok(request) => self.request_suggestions(request),
                Err(e) => tracing::warn!("ignoring click: {}", e),
            }
        }
    }

    fn issue(&mut self, request: CheckRequest) {
        if request.text.is_empty() {
            // Nothing to check; the scope simply has no errors.
            self.markers = Arc::new(reconcile(
                &self.markers,
                &request.scope,
                request.text.base,
                &[],
                &request.since,
            ));
            if request.key == CheckKey::Document {
                self.scheduler.full_check_completed(true);
            }
            return;
        }

        self.next_check += 1;
        let id = CheckId(self.next_check);
        let key = request.key;
        let text = request.text.text.clone();
        let proofreader = Arc::clone(&self.options.proofreader);

        tracing::debug!(?id, ?key, chars = request.text.len(), "issuing check");
        let handle = self
            .checks
            .spawn(async move { check_text(proofreader.as_ref(), &text).await });
        self.check_tasks.insert(handle.id(), id);
        self.in_flight.insert(id, request);
        let _ = self.events.send(SpellcheckEvent::CheckStarted { id, key });
    }

    fn finish_check(
        &mut self,
        joined: Result<(task::Id, Result<Vec<MatchResult>, ProofreadError>), JoinError>,
    ) -> Update {
        let (task_id, result) = match joined {
            Ok((task_id, result)) => (task_id, result),
            Err(err) => (err.id(), Err(ProofreadError::from(err))),
        };
        let Some(id) = self.check_tasks.remove(&task_id) else {
            return Update::Ignored;
        };
        let Some(request) = self.in_flight.remove(&id) else {
            return Update::Ignored;
        };

        let ok = result.is_ok();
        let update = match result {
            Ok(matches) => {
                self.markers = Arc::new(reconcile(
                    &self.markers,
                    &request.scope,
                    request.text.base,
                    &matches,
                    &request.since,
                ));
                tracing::debug!(?id, matches = matches.len(), "check finished");
                Update::MarkersChanged(id)
            }
            Err(e) => {
                let err = SpellcheckError::from(e);
                tracing::warn!(?id, "check failed, keeping previous markers: {}", err);
                Update::CheckFailed(id)
            }
        };

        if request.key == CheckKey::Document {
            self.scheduler.full_check_completed(ok);
        }
        let _ = self.events.send(SpellcheckEvent::CheckFinished {
            id,
            key: request.key,
            ok,
        });
        update
    }

    fn request_suggestions(&mut self, request: SuggestionRequest) {
        let proofreader = Arc::clone(&self.options.proofreader);
        let word = request.word.clone();
        let handle = self
            .suggestions
            .spawn(async move { suggest(proofreader.as_ref(), &word).await });
        self.suggestion_tasks.insert(handle.id(), request);
    }

    fn finish_suggestions(
        &mut self,
        joined: Result<(task::Id, Result<Vec<String>, ProofreadError>), JoinError>,
    ) -> Update {
        let (task_id, result) = match joined {
            Ok((task_id, result)) => (task_id, result),
            Err(err) => (err.id(), Err(ProofreadError::from(err))),
        };
        let Some(request) = self.suggestion_tasks.remove(&task_id) else {
            return Update::Ignored;
        };

        match result {
            Ok(suggestions) => {
                match self
                    .interaction
                    .resolve(&request, suggestions, &self.options.ui_strings)
                {
                    Ok(_) => Update::PopoverOpened,
                    Err(e) => {
                        tracing::debug!("{}", e);
                        Update::StaleSuggestions
                    }
                }
            }
            Err(e) => {
                let err = SpellcheckError::from(e);
                tracing::warn!("suggestion lookup for {:?} failed: {}", request.word, err);
                match self.interaction.fail(&request) {
                    Ok(()) => Update::InteractionClosed,
                    Err(_) => Update::StaleSuggestions,
                }
            }
        }
    }
}

fn document_request<N: DocNode>(doc: &N) -> CheckRequest {
    CheckRequest {
        key: CheckKey::Document,
        scope: 0..doc.content_size(),
        text: extract(doc, None),
        since: Mapping::new(),
    }
}
