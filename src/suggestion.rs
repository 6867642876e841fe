//! Click-to-suggest interaction.
//!
//! The controller walks `Idle → AwaitingSuggestions → PopoverOpen → Idle`.
//! Suggestion lookups run elsewhere; their results come back through
//! [`InteractionController::resolve`], which discards anything that no longer
//! belongs to the current interaction.

use std::fmt;
use std::ops::Range;

use crate::decoration::{MarkerId, MarkerSet};
use crate::document::Mapping;
use crate::error::SpellcheckError;
use crate::settings::UiStrings;

/// A screen rectangle in host pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// Host lookup from document positions to screen coordinates.
pub trait ScreenCoords {
    fn coords_at_pos(&self, pos: usize) -> Option<Rect>;

    /// The element the popover is positioned in.
    fn container(&self) -> Rect;
}

/// Popover offset relative to its container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub left: f64,
    pub top: f64,
}

/// A suggestion lookup issued for a clicked marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionRequest {
    pub id: u64,
    pub marker: MarkerId,
    pub word: String,
    /// Current range of the clicked word.
    pub range: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopoverContent {
    Suggestions(Vec<String>),
    /// No suggestions; carries the message shown instead.
    Empty(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popover {
    pub word: String,
    pub range: Range<usize>,
    pub content: PopoverContent,
}

impl Popover {
    pub fn items(&self) -> &[String] {
        match &self.content {
            PopoverContent::Suggestions(items) => items,
            PopoverContent::Empty(_) => &[],
        }
    }

    pub fn can_accept(&self) -> bool {
        !self.items().is_empty()
    }

    /// Position the popover centred under the word, at least a few pixels in
    /// from its left edge.
    pub fn place(&self, coords: &dyn ScreenCoords) -> Option<Placement> {
        let start = coords.coords_at_pos(self.range.start)?;
        let end = coords.coords_at_pos(self.range.end)?;
        let container = coords.container();

        let left = ((start.left + end.left) / 2.0).max(start.left + 3.0) - container.left;
        let top = start.bottom + 5.0 - container.top;
        Some(Placement { left, top })
    }
}

impl fmt::Display for Popover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "popover {:?} at {}..{}",
            self.word, self.range.start, self.range.end
        )?;
        match &self.content {
            PopoverContent::Suggestions(items) => {
                for item in items {
                    writeln!(f, "  - {}", item)?;
                }
            }
            PopoverContent::Empty(message) => writeln!(f, "  ({})", message)?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InteractionState {
    #[default]
    Idle,
    AwaitingSuggestions(SuggestionRequest),
    PopoverOpen(Popover),
}

impl InteractionState {
    pub fn active_word(&self) -> Option<&str> {
        match self {
            InteractionState::Idle => None,
            InteractionState::AwaitingSuggestions(request) => Some(&request.word),
            InteractionState::PopoverOpen(popover) => Some(&popover.word),
        }
    }

    pub fn popover_visible(&self) -> bool {
        matches!(self, InteractionState::PopoverOpen(_))
    }

    pub fn anchor_range(&self) -> Option<Range<usize>> {
        match self {
            InteractionState::Idle => None,
            InteractionState::AwaitingSuggestions(request) => Some(request.range.clone()),
            InteractionState::PopoverOpen(popover) => Some(popover.range.clone()),
        }
    }
}

/// Text the host should put in place of an accepted word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub range: Range<usize>,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct InteractionController {
    state: InteractionState,
    next_request: u64,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn popover(&self) -> Option<&Popover> {
        match &self.state {
            InteractionState::PopoverOpen(popover) => Some(popover),
            _ => None,
        }
    }

    /// Start an interaction for a clicked marker.
    pub fn begin(
        &mut self,
        markers: &MarkerSet,
        marker: MarkerId,
    ) -> Result<SuggestionRequest, SpellcheckError> {
        let (found, payload) = markers.payload(marker)?;
        self.next_request += 1;
        let request = SuggestionRequest {
            id: self.next_request,
            marker,
            word: payload.word.clone(),
            range: found.range(),
        };
        self.state = InteractionState::AwaitingSuggestions(request.clone());
        Ok(request)
    }

    /// Open the popover with the suggestions fetched for `request`.
    pub fn resolve(
        &mut self,
        request: &SuggestionRequest,
        suggestions: Vec<String>,
        ui_strings: &UiStrings,
    ) -> Result<&Popover, SpellcheckError> {
        let pending = match &self.state {
            InteractionState::AwaitingSuggestions(pending)
                if pending.id == request.id && pending.word == request.word =>
            {
                pending
            }
            _ => return Err(SpellcheckError::StaleInteraction { request: request.id }),
        };

        let content = if suggestions.is_empty() {
            PopoverContent::Empty(ui_strings.no_suggestions_text().to_string())
        } else {
            PopoverContent::Suggestions(suggestions)
        };
        let popover = Popover {
            word: pending.word.clone(),
            range: pending.range.clone(),
            content,
        };
        self.state = InteractionState::PopoverOpen(popover);
        self.popover()
            .ok_or(SpellcheckError::StaleInteraction { request: request.id })
    }

    /// Abandon `request` after its lookup failed.
    pub fn fail(&mut self, request: &SuggestionRequest) -> Result<(), SpellcheckError> {
        match &self.state {
            InteractionState::AwaitingSuggestions(pending) if pending.id == request.id => {
                self.state = InteractionState::Idle;
                Ok(())
            }
            _ => Err(SpellcheckError::StaleInteraction { request: request.id }),
        }
    }

    /// Accept the suggestion at `index`, closing the popover.
    pub fn accept(&mut self, index: usize) -> Option<Replacement> {
        let popover = self.popover()?;
        let text = popover.items().get(index)?.clone();
        let range = popover.range.clone();
        self.state = InteractionState::Idle;
        Some(Replacement { range, text })
    }

    /// Accept only if the open popover is still for `word`.
    pub fn accept_word(&mut self, word: &str, index: usize) -> Option<Replacement> {
        let current = &self.popover()?.word;
        if current != word {
            tracing::debug!("popover moved from {:?} to {:?}, not accepting", word, current);
            return None;
        }
        self.accept(index)
    }

    pub fn dismiss(&mut self) {
        self.state = InteractionState::Idle;
    }

    /// Map the anchor through a mutation. A collapsed anchor ends the
    /// interaction.
    pub fn map(&mut self, mapping: &Mapping) {
        let range = match &mut self.state {
            InteractionState::Idle => return,
            InteractionState::AwaitingSuggestions(request) => &mut request.range,
            InteractionState::PopoverOpen(popover) => &mut popover.range,
        };
        match mapping.map_range(range) {
            Some(mapped) => *range = mapped,
            None => {
                tracing::debug!("suggestion anchor collapsed, closing interaction");
                self.state = InteractionState::Idle;
            }
        }
    }
}
