//! Keyed debouncing without timers.
//!
//! The [`Debouncer`] only records deadlines; whoever owns it decides when to
//! sleep (see [`next_deadline`](Debouncer::next_deadline)) and collects the
//! actions that came due with [`take_due`](Debouncer::take_due). Scheduling
//! again under a key that is still pending supersedes the pending action.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
struct Pending<A> {
    deadline: Instant,
    action: A,
}

/// Pending actions keyed by `K`, each with its own deadline.
#[derive(Debug)]
pub struct Debouncer<K, A> {
    pending: HashMap<K, Pending<A>>,
}

impl<K, A> Default for Debouncer<K, A> {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, A> Debouncer<K, A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` to fire `delay` after `now`.
    ///
    /// Returns the action this one superseded, if any.
    pub fn schedule(&mut self, key: K, now: Instant, delay: Duration, action: A) -> Option<A> {
        self.pending
            .insert(
                key,
                Pending {
                    deadline: now + delay,
                    action,
                },
            )
            .map(|p| p.action)
    }

    pub fn cancel(&mut self, key: &K) -> Option<A> {
        self.pending.remove(key).map(|p| p.action)
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// The earliest deadline of any pending action.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Remove and return every action whose deadline is at or before `now`,
    /// earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<(K, A)> {
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(k, _)| k.clone())
            .collect();

        let mut fired: Vec<(Instant, K, A)> = due
            .into_iter()
            .filter_map(|key| {
                let pending = self.pending.remove(&key)?;
                Some((pending.deadline, key, pending.action))
            })
            .collect();
        fired.sort_by_key(|(deadline, _, _)| *deadline);
        fired.into_iter().map(|(_, key, action)| (key, action)).collect()
    }

    /// Pending actions, for updating them in place.
    pub fn actions_mut(&mut self) -> impl Iterator<Item = &mut A> {
        self.pending.values_mut().map(|p| &mut p.action)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn rescheduling_supersedes_the_pending_action() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new();

        assert_eq!(debouncer.schedule("block", start, 300 * MS, 1), None);
        assert_eq!(debouncer.schedule("block", start + 100 * MS, 300 * MS, 2), Some(1));

        // The first deadline has passed but it was pushed back.
        assert!(debouncer.take_due(start + 350 * MS).is_empty());
        assert_eq!(debouncer.take_due(start + 400 * MS), vec![("block", 2)]);
        assert!(debouncer.is_empty());
    }

    #[test]
    fn keys_are_independent() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new();
        debouncer.schedule("document", start, 500 * MS, "doc");
        debouncer.schedule("block", start, 300 * MS, "block");

        assert_eq!(debouncer.next_deadline(), Some(start + 300 * MS));
        assert_eq!(debouncer.take_due(start + 300 * MS), vec![("block", "block")]);
        assert_eq!(debouncer.next_deadline(), Some(start + 500 * MS));
    }

    #[test]
    fn due_actions_fire_in_deadline_order() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new();
        debouncer.schedule(1, start, 30 * MS, 'c');
        debouncer.schedule(2, start, 10 * MS, 'a');
        debouncer.schedule(3, start, 20 * MS, 'b');

        let fired: Vec<char> = debouncer
            .take_due(start + 30 * MS)
            .into_iter()
            .map(|(_, a)| a)
            .collect();
        assert_eq!(fired, vec!['a', 'b', 'c']);
    }

    #[test]
    fn zero_delay_is_due_immediately() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new();
        debouncer.schedule((), start, Duration::ZERO, "click");
        assert_eq!(debouncer.take_due(start), vec![((), "click")]);
    }

    #[test]
    fn cancel_and_update_in_place() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new();
        debouncer.schedule("a", start, MS, 1);
        debouncer.schedule("b", start, MS, 2);

        for action in debouncer.actions_mut() {
            *action *= 10;
        }
        assert_eq!(debouncer.cancel(&"a"), Some(10));
        assert!(!debouncer.is_pending(&"a"));
        assert_eq!(debouncer.take_due(start + MS), vec![("b", 20)]);
    }
}
