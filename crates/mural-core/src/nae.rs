// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! New-artwork-event pool: opportunistic exposure for freshly published
//! artworks.
//!
//! Inserted artworks start at priority 0.50. Every time the pool wins the
//! injection coin flip the selected entry's priority halves; once it drops
//! below the floor the entry is gone. Re-inserting an id resets it to 0.50,
//! so a re-published artwork earns a fresh burst of exposure.
//!
//! # Invariants
//!
//! - At most [`NAE_CAPACITY`] entries; insertion at capacity evicts the
//!   minimum-priority entry (ties: oldest).
//! - Every priority stays in `[PRIORITY_FLOOR, 1.0]`.
//! - Selection order is a pure function of the pool contents and the seeded
//!   injection stream.

use tracing::debug;

use crate::artwork::ArtworkRef;
use crate::prng::Pcg32;

/// Most entries the pool will hold.
pub const NAE_CAPACITY: usize = 32;
/// Priority assigned on insertion and re-insertion.
pub const PRIORITY_INITIAL: f32 = 0.50;
/// Entries decayed below this are removed.
pub const PRIORITY_FLOOR: f32 = 0.02;

#[derive(Debug, Clone)]
struct NaeEntry {
    artwork: ArtworkRef,
    priority: f32,
    seq: u64,
}

/// Bounded pool of new-artwork events with priority decay.
#[derive(Debug, Clone)]
pub(crate) struct NaePool {
    entries: Vec<NaeEntry>,
    next_seq: u64,
    rng: Pcg32,
}

impl NaePool {
    /// Creates an empty pool drawing from the given injection stream.
    pub fn new(rng: Pcg32) -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
            rng,
        }
    }

    /// Entries currently pooled.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Inserts or refreshes an event for `artwork`.
    ///
    /// A matching `artwork_id` resets that entry's priority and age instead
    /// of growing the pool; otherwise a full pool evicts its weakest entry.
    pub fn insert(&mut self, artwork: ArtworkRef) {
        let seq = self.next_seq;
        self.next_seq += 1;

        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.artwork.artwork_id == artwork.artwork_id)
        {
            existing.priority = PRIORITY_INITIAL;
            existing.seq = seq;
            existing.artwork = artwork;
            return;
        }
        if self.entries.len() >= NAE_CAPACITY {
            if let Some(victim) = self.weakest() {
                let evicted = self.entries.swap_remove(victim);
                debug!(artwork_id = evicted.artwork.artwork_id, "nae pool evicted");
            }
        }
        self.entries.push(NaeEntry {
            artwork,
            priority: PRIORITY_INITIAL,
            seq,
        });
    }

    /// Runs the injection coin flip and, on success, returns the strongest
    /// event while halving its priority.
    ///
    /// An empty pool returns `None` without consuming a draw, so enabling
    /// the pool does not perturb pick streams until something is inserted.
    pub fn try_select(&mut self) -> Option<ArtworkRef> {
        if self.entries.is_empty() {
            return None;
        }
        let total: f32 = self.entries.iter().map(|e| e.priority).sum();
        let threshold = total.min(1.0);
        if self.rng.next_f32() >= threshold {
            return None;
        }
        let strongest = self.strongest()?;
        let entry = &mut self.entries[strongest];
        entry.priority /= 2.0;
        let artwork = entry.artwork.clone();
        if entry.priority < PRIORITY_FLOOR {
            self.entries.swap_remove(strongest);
        }
        Some(artwork)
    }

    /// Empties the pool. Done on playset execution.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn weakest(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.priority
                    .total_cmp(&b.priority)
                    .then(a.seq.cmp(&b.seq))
            })
            .map(|(idx, _)| idx)
    }

    fn strongest(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                a.priority
                    .total_cmp(&b.priority)
                    .then(b.seq.cmp(&a.seq))
            })
            .map(|(idx, _)| idx)
    }
}
