//! Error markers and their reconciliation.
//!
//! A [`MarkerSet`] is an immutable snapshot: mapping it through a mutation or
//! reconciling a check result produces a new set. Each marker's original
//! [`MatchResult`] is kept in a typed side table keyed by [`MarkerId`], so a
//! click never has to recover the payload from rendered markup.

use std::collections::HashMap;
use std::ops::Range;

use crate::document::Mapping;
use crate::error::SpellcheckError;
use crate::proofread::MatchResult;

/// CSS class the host renders markers with.
pub const MARKER_CLASS: &str = "spell-error";

/// Identity of a marker, stable across position mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(u64);

/// A misspelled span in absolute document coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMarker {
    pub id: MarkerId,
    pub from: usize,
    pub to: usize,
    pub word: String,
}

impl ErrorMarker {
    pub fn range(&self) -> Range<usize> {
        self.from..self.to
    }

    fn intersects(&self, range: &Range<usize>) -> bool {
        self.from < range.end && self.to > range.start
    }
}

/// One entry handed to the host's decoration renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoration {
    pub from: usize,
    pub to: usize,
    pub class: &'static str,
    pub id: MarkerId,
}

/// All live markers of one editor, ordered by position.
#[derive(Debug, Clone, Default)]
pub struct MarkerSet {
    markers: Vec<ErrorMarker>,
    payloads: HashMap<MarkerId, MatchResult>,
    next_id: u64,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorMarker> {
        self.markers.iter()
    }

    /// Markers intersecting `range`.
    pub fn find<'a>(&'a self, range: &'a Range<usize>) -> impl Iterator<Item = &'a ErrorMarker> {
        let end = self.markers.partition_point(|m| m.from < range.end);
        self.markers[..end].iter().filter(move |m| m.intersects(range))
    }

    /// The marker under `pos`, with both edges counting as inside.
    pub fn at(&self, pos: usize) -> Option<&ErrorMarker> {
        self.markers.iter().find(|m| m.from <= pos && pos <= m.to)
    }

    pub fn get(&self, id: MarkerId) -> Option<&ErrorMarker> {
        self.markers.iter().find(|m| m.id == id)
    }

    /// Look up a marker together with the match it was created from.
    pub fn payload(&self, id: MarkerId) -> Result<(&ErrorMarker, &MatchResult), SpellcheckError> {
        let marker = self
            .get(id)
            .ok_or(SpellcheckError::MalformedMarkerPayload(id))?;
        let payload = self
            .payloads
            .get(&id)
            .ok_or(SpellcheckError::MalformedMarkerPayload(id))?;
        Ok((marker, payload))
    }

    /// Render entries for the host.
    pub fn decorations(&self) -> impl Iterator<Item = Decoration> + '_ {
        self.markers.iter().map(|m| Decoration {
            from: m.from,
            to: m.to,
            class: MARKER_CLASS,
            id: m.id,
        })
    }

    /// `(range, word)` of every marker, ignoring identities.
    pub fn spans(&self) -> Vec<(Range<usize>, &str)> {
        self.markers
            .iter()
            .map(|m| (m.range(), m.word.as_str()))
            .collect()
    }

    /// Map every marker through `mapping`, dropping those that collapse.
    pub fn map(&self, mapping: &Mapping) -> MarkerSet {
        if mapping.is_empty() {
            return self.clone();
        }

        let mut markers: Vec<ErrorMarker> = self
            .markers
            .iter()
            .filter_map(|m| {
                let range = mapping.map_range(&m.range())?;
                Some(ErrorMarker {
                    from: range.start,
                    to: range.end,
                    ..m.clone()
                })
            })
            .collect();
        markers.sort_by_key(|m| (m.from, m.to));

        let payloads = markers
            .iter()
            .filter_map(|m| Some((m.id, self.payloads.get(&m.id)?.clone())))
            .collect();

        MarkerSet {
            markers,
            payloads,
            next_id: self.next_id,
        }
    }

    /// Drop every marker intersecting `scope` and insert `fresh` ones.
    ///
    /// A fresh marker with the same range and word as a dropped one keeps
    /// the dropped marker's id.
    fn replace_scope(
        &self,
        scope: &Range<usize>,
        fresh: impl IntoIterator<Item = (Range<usize>, MatchResult)>,
    ) -> MarkerSet {
        let mut next = MarkerSet {
            markers: Vec::with_capacity(self.markers.len()),
            payloads: HashMap::with_capacity(self.payloads.len()),
            next_id: self.next_id,
        };
        let mut replaced: HashMap<Range<usize>, &ErrorMarker> = HashMap::new();

        for marker in &self.markers {
            if marker.intersects(scope) {
                replaced.insert(marker.range(), marker);
                continue;
            }
            if let Some(payload) = self.payloads.get(&marker.id) {
                next.payloads.insert(marker.id, payload.clone());
            }
            next.markers.push(marker.clone());
        }

        for (range, payload) in fresh {
            let id = match replaced.remove(&range) {
                Some(previous) if previous.word == payload.word => previous.id,
                _ => {
                    next.next_id += 1;
                    MarkerId(next.next_id - 1)
                }
            };
            next.markers.push(ErrorMarker {
                id,
                from: range.start,
                to: range.end,
                word: payload.word.clone(),
            });
            next.payloads.insert(id, payload);
        }

        next.markers.sort_by_key(|m| (m.from, m.to));
        next
    }
}

/// Replace the markers of one checked scope with the results of that check.
///
/// `scope` is the absolute range that was checked and `base` the document
/// position of the checked text's first char. `since` holds every mutation
/// applied after the text was extracted; both the scope and the new markers
/// are mapped through it so results land on current coordinates.
pub fn reconcile(
    markers: &MarkerSet,
    scope: &Range<usize>,
    base: usize,
    matches: &[MatchResult],
    since: &Mapping,
) -> MarkerSet {
    let scope = since.map_range_inclusive(scope);
    let fresh = matches.iter().filter_map(|m| {
        let from = base + m.offset;
        let range = since.map_range(&(from..from + m.length))?;
        Some((range, m.clone()))
    });
    markers.replace_scope(&scope, fresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::StepMap;

    fn matches() -> Vec<MatchResult> {
        vec![MatchResult::new(0, 3, "Ths"), MatchResult::new(9, 3, "tst")]
    }

    fn checked() -> MarkerSet {
        reconcile(&MarkerSet::new(), &(1..14), 1, &matches(), &Mapping::new())
    }

    #[test]
    fn matches_become_absolute_markers() {
        assert_eq!(checked().spans(), vec![(1..4, "Ths"), (10..13, "tst")]);
    }

    #[test]
    fn rechecking_is_idempotent() {
        let once = checked();
        let twice = reconcile(&once, &(1..14), 1, &matches(), &Mapping::new());
        assert_eq!(once.spans(), twice.spans());
        assert_eq!(twice.len(), 2);

        let ids = |set: &MarkerSet| set.iter().map(|m| m.id).collect::<Vec<_>>();
        assert_eq!(ids(&once), ids(&twice));
        for id in ids(&twice) {
            assert!(twice.payload(id).is_ok());
        }
    }

    #[test]
    fn changed_words_get_new_ids() {
        let once = checked();
        let first = once.iter().next().unwrap().id;
        let changed = reconcile(
            &once,
            &(1..14),
            1,
            &[MatchResult::new(0, 3, "Thx"), MatchResult::new(9, 3, "tst")],
            &Mapping::new(),
        );

        let ids: Vec<_> = changed.iter().map(|m| m.id).collect();
        assert_ne!(ids[0], first);
        assert_eq!(ids[1], once.iter().nth(1).unwrap().id);
    }

    #[test]
    fn insertion_before_marker_shifts_it() {
        let markers = checked();
        let mapped = markers.map(&StepMap::insert(0, 5).into());
        assert_eq!(mapped.spans(), vec![(6..9, "Ths"), (15..18, "tst")]);

        let first = mapped.iter().next().unwrap();
        let (_, payload) = mapped.payload(first.id).unwrap();
        assert_eq!(payload, &MatchResult::new(0, 3, "Ths"));
    }

    #[test]
    fn empty_recheck_clears_only_its_scope() {
        let markers = reconcile(
            &checked(),
            &(20..30),
            20,
            &[MatchResult::new(2, 4, "wrng")],
            &Mapping::new(),
        );
        assert_eq!(markers.len(), 3);

        let cleared = reconcile(&markers, &(1..14), 1, &[], &Mapping::new());
        assert_eq!(cleared.spans(), vec![(22..26, "wrng")]);
    }

    #[test]
    fn partially_overlapping_markers_are_removed() {
        let cleared = reconcile(&checked(), &(3..5), 3, &[], &Mapping::new());
        assert_eq!(cleared.spans(), vec![(10..13, "tst")]);
    }

    #[test]
    fn late_results_follow_later_edits() {
        // Three chars were typed at the start after the text was extracted.
        let since: Mapping = StepMap::insert(1, 3).into();
        let markers = reconcile(&MarkerSet::new(), &(1..14), 1, &matches(), &since);
        assert_eq!(markers.spans(), vec![(4..7, "Ths"), (13..16, "tst")]);
    }

    #[test]
    fn deleted_markers_lose_their_payload() {
        let markers = checked();
        let first = markers.iter().next().unwrap().id;
        let mapped = markers.map(&StepMap::delete(1..4).into());

        assert_eq!(mapped.len(), 1);
        assert!(matches!(
            mapped.payload(first),
            Err(SpellcheckError::MalformedMarkerPayload(id)) if id == first
        ));
    }

    #[test]
    fn decorations_carry_the_marker_class() {
        let markers = checked();
        let decorations: Vec<_> = markers.decorations().collect();
        assert_eq!(decorations.len(), 2);
        assert!(decorations.iter().all(|d| d.class == MARKER_CLASS));
        assert_eq!((decorations[1].from, decorations[1].to), (10, 13));
    }

    #[test]
    fn find_and_at_query_by_position() {
        let markers = checked();
        assert_eq!(markers.find(&(0..11)).count(), 2);
        assert_eq!(markers.find(&(4..10)).count(), 0);
        assert_eq!(markers.at(4).map(|m| m.word.as_str()), Some("Ths"));
        assert!(markers.at(7).is_none());
    }
}
