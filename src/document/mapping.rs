//! Position mapping and the transaction boundary.
//!
//! A [`StepMap`] records which ranges of the old document were replaced and
//! how large the replacements were. Positions are mapped through it with an
//! [`Assoc`] deciding which side of an insertion they stick to.

use std::ops::Range;

/// Which side of an insertion a mapped position sticks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    /// Stay before text inserted at the position.
    Before,
    /// Move past text inserted at the position.
    After,
}

/// The replaced ranges of a single document step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepMap {
    /// `(start, old_size, new_size)` in pre-step coordinates, sorted by start.
    ranges: Vec<(usize, usize, usize)>,
}

impl StepMap {
    pub fn new(mut ranges: Vec<(usize, usize, usize)>) -> Self {
        ranges.sort_by_key(|&(start, _, _)| start);
        Self { ranges }
    }

    /// A step replacing `old_size` positions at `start` with `new_size` positions.
    pub fn replace(start: usize, old_size: usize, new_size: usize) -> Self {
        Self::new(vec![(start, old_size, new_size)])
    }

    pub fn insert(pos: usize, size: usize) -> Self {
        Self::replace(pos, 0, size)
    }

    pub fn delete(range: Range<usize>) -> Self {
        Self::replace(range.start, range.len(), 0)
    }

    /// Map an old position to its position after this step.
    ///
    /// A position on the start edge of a replaced range stays at the start;
    /// one on the end edge moves past the replacement. `assoc` only decides
    /// for pure insertions and positions strictly inside a replacement.
    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        let mut diff: isize = 0;
        for &(start, old_size, new_size) in &self.ranges {
            if start > pos {
                break;
            }
            let end = start + old_size;
            if pos <= end {
                let side = if old_size == 0 {
                    assoc
                } else if pos == start {
                    Assoc::Before
                } else if pos == end {
                    Assoc::After
                } else {
                    assoc
                };
                let mapped = start as isize + diff;
                return match side {
                    Assoc::Before => mapped as usize,
                    Assoc::After => (mapped + new_size as isize) as usize,
                };
            }
            diff += new_size as isize - old_size as isize;
        }
        (pos as isize + diff) as usize
    }
}

/// A sequence of steps, applied in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.iter().all(|m| m.ranges.is_empty())
    }

    pub fn push(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    /// Append all steps of `other` after the steps already recorded.
    pub fn append(&mut self, other: &Mapping) {
        self.maps.extend(other.maps.iter().cloned());
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.maps.iter().fold(pos, |pos, map| map.map(pos, assoc))
    }

    /// Map a range, letting the start move past insertions at its edge and
    /// keeping the end before them. Returns `None` if the range collapses.
    pub fn map_range(&self, range: &Range<usize>) -> Option<Range<usize>> {
        let from = self.map(range.start, Assoc::After);
        let to = self.map(range.end, Assoc::Before);
        (from < to).then_some(from..to)
    }

    /// Map a range so that it grows to cover text inserted at either edge.
    pub fn map_range_inclusive(&self, range: &Range<usize>) -> Range<usize> {
        let from = self.map(range.start, Assoc::Before);
        let to = self.map(range.end, Assoc::After);
        from..to.max(from)
    }
}

impl From<StepMap> for Mapping {
    fn from(map: StepMap) -> Self {
        Self { maps: vec![map] }
    }
}

/// Metadata attached to a transaction by its originator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionMeta {
    /// The transaction was dispatched by the spellchecker itself.
    pub spellchecker: bool,
    /// The host's paste handler produced this transaction.
    pub paste: bool,
}

/// One document mutation as seen by the spellchecker.
#[derive(Debug, Clone)]
pub struct Transaction<'a, N> {
    /// The document after the mutation.
    pub doc: &'a N,
    pub doc_changed: bool,
    /// Selection after the mutation.
    pub selection: Range<usize>,
    /// Maps pre-mutation positions to post-mutation positions.
    pub mapping: Mapping,
    pub meta: TransactionMeta,
}

impl<'a, N> Transaction<'a, N> {
    /// A document-changing edit leaving the cursor at `selection`.
    pub fn edit(doc: &'a N, mapping: impl Into<Mapping>, selection: Range<usize>) -> Self {
        Self {
            doc,
            doc_changed: true,
            selection,
            mapping: mapping.into(),
            meta: TransactionMeta::default(),
        }
    }

    /// A transaction that only carries metadata or selection changes.
    pub fn unchanged(doc: &'a N, selection: Range<usize>) -> Self {
        Self {
            doc,
            doc_changed: false,
            selection,
            mapping: Mapping::new(),
            meta: TransactionMeta::default(),
        }
    }

    pub fn pasted(mut self) -> Self {
        self.meta.paste = true;
        self
    }

    pub fn from_spellchecker(mut self) -> Self {
        self.meta.spellchecker = true;
        self
    }
}
