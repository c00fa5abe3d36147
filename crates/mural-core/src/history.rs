// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bounded playback history with reversible back/forward traversal.
//!
//! A fixed-capacity ring holds the most recently played artworks. A signed
//! position cursor tracks where the viewer is: `-1` means "at head" (the
//! most recent entry); larger values count steps back in time. Pushing a
//! new artwork always snaps the cursor back to the head.
//!
//! # Invariants
//!
//! - Count never exceeds capacity; the oldest entry is overwritten.
//! - `position == -1` ⇔ at head; otherwise `0 ≤ position ≤ count − 2`.
//! - Back-then-forward traversal is lossless while no push intervenes.

use crate::artwork::ArtworkRef;

/// Default ring capacity.
pub const HISTORY_CAPACITY: usize = 32;

/// Fixed-capacity ring of recently played artworks with a traversal cursor.
#[derive(Debug, Clone)]
pub struct HistoryRing {
    slots: Vec<Option<ArtworkRef>>,
    head: usize,
    count: usize,
    position: i32,
}

impl HistoryRing {
    /// Creates an empty ring holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![None; capacity],
            head: 0,
            count: 0,
            position: -1,
        }
    }

    /// Entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// True when nothing has been played yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Current traversal position: `-1` at head, else steps back.
    #[must_use]
    pub fn position(&self) -> i32 {
        self.position
    }

    /// Records a played artwork at the head and snaps the cursor to it.
    ///
    /// A push whose filepath equals the entry already at the head is
    /// dropped; presentation retries must not double-log an artwork.
    pub fn push(&mut self, artwork: ArtworkRef) {
        if let Some(last) = self.from_head(1) {
            if last.filepath == artwork.filepath {
                self.position = -1;
                return;
            }
        }
        let capacity = self.slots.len();
        self.slots[self.head] = Some(artwork);
        self.head = (self.head + 1) % capacity;
        self.count = (self.count + 1).min(capacity);
        self.position = -1;
    }

    /// Whether at least two entries lie at or behind the cursor.
    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.position + 3 <= self.count as i32
    }

    /// Steps one entry further into the past.
    pub fn go_back(&mut self) -> Option<ArtworkRef> {
        if !self.can_go_back() {
            return None;
        }
        self.position += 1;
        self.from_head((self.position + 2) as usize).cloned()
    }

    /// Whether the cursor sits behind the head.
    #[must_use]
    pub fn can_go_forward(&self) -> bool {
        self.position > -1
    }

    /// Steps one entry toward the present.
    pub fn go_forward(&mut self) -> Option<ArtworkRef> {
        if !self.can_go_forward() {
            return None;
        }
        self.position -= 1;
        let steps = if self.position == -1 {
            1
        } else {
            (self.position + 2) as usize
        };
        self.from_head(steps).cloned()
    }

    /// Entry under the cursor: the head at `-1`, else the visited entry.
    #[must_use]
    pub fn current(&self) -> Option<ArtworkRef> {
        let steps = if self.position == -1 {
            1
        } else {
            (self.position + 2) as usize
        };
        self.from_head(steps).cloned()
    }

    fn from_head(&self, steps: usize) -> Option<&ArtworkRef> {
        if steps == 0 || steps > self.count {
            return None;
        }
        let capacity = self.slots.len();
        let idx = (self.head + capacity - steps) % capacity;
        self.slots[idx].as_ref()
    }
}

impl Default for HistoryRing {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}
