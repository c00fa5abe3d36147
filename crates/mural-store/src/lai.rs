// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Locally-available index: the dense subset of a catalogue whose files
//! exist on local storage.
//!
//! Membership in this set is the single source of truth for "this entry can
//! be shown right now". The set is persisted as the tail of the channel
//! cache file and mutated by the download/failure hooks.
//!
//! # Invariants
//!
//! - Every stored index is `< entry_count` of the owning catalogue.
//! - No index occurs twice.
//! - Removal is swap-with-last, so positions are not stable across
//!   mutations; only pickers that re-read positions each call may hold one.

/// Dense array of catalogue indices with O(1) add, swap-pop remove, and
/// uniform random slot access.
///
/// Sizes are small (typically well under a few thousand entries), so the
/// membership scan on [`add`](Self::add) and [`contains`](Self::contains)
/// stays linear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailableSet {
    indices: Vec<u32>,
}

impl AvailableSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from raw indices, dropping duplicates and anything
    /// `>= entry_count`. Returns the set and whether anything was dropped.
    #[must_use]
    pub fn from_raw(raw: Vec<u32>, entry_count: u32) -> (Self, bool) {
        let mut set = Self::new();
        let mut dropped = false;
        for idx in raw {
            if idx >= entry_count || !set.add(idx) {
                dropped = true;
            }
        }
        (set, dropped)
    }

    /// Number of available entries.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.indices.len() as u32
    }

    /// True when no entry is available.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The dense index array, in insertion order (perturbed by removals).
    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.indices
    }

    /// Membership test for a catalogue index.
    #[must_use]
    pub fn contains(&self, idx: u32) -> bool {
        self.indices.contains(&idx)
    }

    /// Appends `idx` unless already present. Returns whether the set grew.
    pub fn add(&mut self, idx: u32) -> bool {
        if self.contains(idx) {
            return false;
        }
        self.indices.push(idx);
        true
    }

    /// Removes `idx` by swapping the last element into its slot. Returns
    /// whether the set shrank.
    pub fn remove(&mut self, idx: u32) -> bool {
        match self.indices.iter().position(|&i| i == idx) {
            Some(pos) => {
                self.indices.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    /// Catalogue index stored at dense position `pos`.
    #[must_use]
    pub fn at(&self, pos: u32) -> Option<u32> {
        self.indices.get(pos as usize).copied()
    }

    /// Uniform slot selection: maps a raw draw onto a catalogue index via
    /// `draw % len`. Returns `None` on an empty set.
    #[must_use]
    pub fn pick(&self, draw: u32) -> Option<u32> {
        if self.indices.is_empty() {
            return None;
        }
        self.at(draw % self.len())
    }

    /// Drops every index. Used when a catalogue is replaced wholesale.
    pub fn clear(&mut self) {
        self.indices.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn add_is_idempotent() {
        let mut set = AvailableSet::new();
        assert!(set.add(3));
        assert!(!set.add(3));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_swaps_last_into_hole() {
        let mut set = AvailableSet::new();
        for idx in [0, 1, 2] {
            set.add(idx);
        }
        assert!(set.remove(0));
        assert_eq!(set.as_slice(), &[2, 1]);
        assert!(!set.remove(0));
    }

    #[test]
    fn pick_wraps_draw_modulo_len() {
        let mut set = AvailableSet::new();
        set.add(10);
        set.add(20);
        assert_eq!(set.pick(0), Some(10));
        assert_eq!(set.pick(3), Some(20));
        assert_eq!(AvailableSet::new().pick(7), None);
    }

    #[test]
    fn from_raw_drops_out_of_range_and_duplicates() {
        let (set, dropped) = AvailableSet::from_raw(vec![0, 2, 2, 9], 4);
        assert!(dropped);
        assert_eq!(set.as_slice(), &[0, 2]);
        let (clean, dropped) = AvailableSet::from_raw(vec![1, 3], 4);
        assert!(!dropped);
        assert_eq!(clean.len(), 2);
    }

    proptest! {
        #[test]
        fn indices_stay_unique_and_bounded(
            ops in prop::collection::vec((0u32..32, prop::bool::ANY), 0..200)
        ) {
            let mut set = AvailableSet::new();
            for (idx, insert) in ops {
                if insert {
                    set.add(idx);
                } else {
                    set.remove(idx);
                }
                let slice = set.as_slice();
                for (i, a) in slice.iter().enumerate() {
                    prop_assert!(*a < 32);
                    prop_assert!(!slice[i + 1..].contains(a));
                }
            }
        }
    }
}
