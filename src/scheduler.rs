//! Deciding what to re-check after a mutation.

use std::ops::Range;

use crate::document::{find_changed_block, DocNode, Transaction};

/// Lifecycle of the whole-document check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No check has been issued yet.
    Uninitialized,
    /// A full-document check was issued but none has succeeded yet.
    InitialCheckInFlight,
    /// A full-document check succeeded; edits are checked per block.
    Settled,
}

/// What a check covers. Debounced checks with equal keys supersede each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKey {
    Document,
    /// A block, identified by the position its content starts at.
    Block(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    Immediate,
    Debounced,
}

/// The scheduler's verdict for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Only map existing markers through the mutation.
    MapOnly,
    /// Check the whole document.
    Document { timing: Timing },
    /// Check the content of one block.
    Block { scope: Range<usize>, timing: Timing },
}

impl Decision {
    pub fn key(&self) -> Option<CheckKey> {
        match self {
            Decision::MapOnly => None,
            Decision::Document { .. } => Some(CheckKey::Document),
            Decision::Block { scope, .. } => Some(CheckKey::Block(scope.start)),
        }
    }
}

#[derive(Debug)]
pub struct ChangeScheduler {
    phase: Phase,
    /// Content start of the block touched by the last localized edit.
    last_block: Option<usize>,
}

impl Default for ChangeScheduler {
    fn default() -> Self {
        Self {
            phase: Phase::Uninitialized,
            last_block: None,
        }
    }
}

impl ChangeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Classify a transaction.
    pub fn decide<N: DocNode>(&mut self, tr: &Transaction<'_, N>) -> Decision {
        if tr.meta.spellchecker || !tr.doc_changed {
            return Decision::MapOnly;
        }

        match self.phase {
            Phase::Uninitialized | Phase::InitialCheckInFlight => {
                self.full_check_issued();
                Decision::Document {
                    timing: Timing::Debounced,
                }
            }
            Phase::Settled if tr.meta.paste => Decision::Document {
                timing: Timing::Debounced,
            },
            Phase::Settled => match find_changed_block(tr.doc, &tr.selection) {
                Some(scope) => {
                    let timing = if self.last_block == Some(scope.start) {
                        Timing::Debounced
                    } else {
                        Timing::Immediate
                    };
                    self.last_block = Some(scope.start);
                    Decision::Block { scope, timing }
                }
                None => {
                    tracing::debug!(
                        "selection {:?} is outside every block, checking the document",
                        tr.selection
                    );
                    Decision::Document {
                        timing: Timing::Debounced,
                    }
                }
            },
        }
    }

    /// Record that a full-document check was issued.
    pub fn full_check_issued(&mut self) {
        if self.phase == Phase::Uninitialized {
            self.phase = Phase::InitialCheckInFlight;
        }
    }

    /// Record the outcome of a full-document check.
    pub fn full_check_completed(&mut self, succeeded: bool) {
        if succeeded {
            self.phase = Phase::Settled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Node, StepMap};

    fn doc() -> Node {
        Node::from_plain_text("first line\nsecond line")
    }

    fn settled() -> ChangeScheduler {
        let mut scheduler = ChangeScheduler::new();
        scheduler.full_check_issued();
        scheduler.full_check_completed(true);
        scheduler
    }

    fn typing_at<'a>(doc: &'a Node, pos: usize) -> Transaction<'a, Node> {
        Transaction::edit(doc, StepMap::insert(pos, 1), pos + 1..pos + 1)
    }

    #[test]
    fn edits_before_the_first_success_check_the_document() {
        let doc = doc();
        let mut scheduler = ChangeScheduler::new();

        let decision = scheduler.decide(&typing_at(&doc, 3));
        assert_eq!(
            decision,
            Decision::Document {
                timing: Timing::Debounced
            }
        );
        assert_eq!(scheduler.phase(), Phase::InitialCheckInFlight);

        scheduler.full_check_completed(false);
        assert_eq!(scheduler.phase(), Phase::InitialCheckInFlight);
        assert_eq!(decision.key(), Some(CheckKey::Document));

        scheduler.full_check_completed(true);
        assert_eq!(scheduler.phase(), Phase::Settled);
    }

    #[test]
    fn same_block_debounces_and_new_block_is_immediate() {
        let doc = doc();
        let mut scheduler = settled();

        let first = scheduler.decide(&typing_at(&doc, 3));
        assert_eq!(
            first,
            Decision::Block {
                scope: 1..11,
                timing: Timing::Immediate
            }
        );

        let again = scheduler.decide(&typing_at(&doc, 5));
        assert_eq!(
            again,
            Decision::Block {
                scope: 1..11,
                timing: Timing::Debounced
            }
        );

        let other = scheduler.decide(&typing_at(&doc, 15));
        assert_eq!(
            other,
            Decision::Block {
                scope: 13..24,
                timing: Timing::Immediate
            }
        );
        assert_eq!(other.key(), Some(CheckKey::Block(13)));
    }

    #[test]
    fn pastes_check_the_document() {
        let doc = doc();
        let mut scheduler = settled();
        let decision = scheduler.decide(&typing_at(&doc, 3).pasted());
        assert_eq!(
            decision,
            Decision::Document {
                timing: Timing::Debounced
            }
        );
    }

    #[test]
    fn own_and_non_changing_transactions_only_map() {
        let doc = doc();
        let mut scheduler = ChangeScheduler::new();

        assert_eq!(
            scheduler.decide(&typing_at(&doc, 3).from_spellchecker()),
            Decision::MapOnly
        );
        assert_eq!(
            scheduler.decide(&Transaction::unchanged(&doc, 4..4)),
            Decision::MapOnly
        );
        assert_eq!(scheduler.phase(), Phase::Uninitialized);
    }
}
