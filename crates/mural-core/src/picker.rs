// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-channel next-item selection.
//!
//! One driver handles every channel kind. Two policies exist:
//!
//! - **Recency** walks the channel's effective pool linearly from the
//!   cursor, wrapping at most once, and advances the cursor past the pick.
//! - **Random** draws up to five uniform samples from the seeded pick
//!   stream, then falls back to recency if every sample was rejected.
//!
//! Both skip non-artwork entries and avoid returning the same `post_id`
//! twice in a row unless the pool has shrunk to a single entry. The random
//! policy's final attempt waives only the repeat rule, never the kind rule.

use std::path::PathBuf;

use mural_store::{artwork_path, CatalogueEntry, PickMode};

use crate::artwork::ArtworkRef;
use crate::channel::ChannelState;

/// Random-mode sample budget; the last attempt permits an immediate repeat.
const RANDOM_ATTEMPTS: u32 = 5;

/// Filesystem roots needed to resolve an entry to a playable path.
#[derive(Debug, Clone)]
pub(crate) struct PathContext {
    /// Content-addressed vault for downloaded artwork.
    pub vault: PathBuf,
    /// Directory holding SD-card animation files.
    pub animations: PathBuf,
}

/// Absolute path of the file backing `entry`.
pub(crate) fn entry_path(entry: &CatalogueEntry, paths: &PathContext) -> PathBuf {
    match entry.filename() {
        Some(name) => paths.animations.join(name),
        None => {
            let key = entry.storage_key().unwrap_or_default();
            artwork_path(&paths.vault, &key, entry.asset())
        }
    }
}

/// Resolves catalogue index `idx` of `channel` into an artwork reference.
pub(crate) fn build_artwork(
    channel: &ChannelState,
    idx: u32,
    paths: &PathContext,
) -> Option<ArtworkRef> {
    let entry = channel.cache.entry(idx)?;
    let filepath = entry_path(&entry, paths);
    Some(ArtworkRef {
        artwork_id: entry.post_id(),
        post_id: entry.post_id(),
        filepath,
        storage_key: entry.storage_key().unwrap_or_default(),
        created_at: entry.created_at(),
        dwell_time_ms: entry.dwell_time_ms(),
        asset: entry.asset(),
        channel_index: channel.index,
        channel: channel.kind,
    })
}

/// Picks the channel's next artwork, or `None` when the channel is
/// exhausted for this call.
pub(crate) fn pick_next(
    channel: &mut ChannelState,
    mode: PickMode,
    last_played_id: Option<i32>,
    paths: &PathContext,
) -> Option<ArtworkRef> {
    match mode {
        PickMode::Recency => pick_recency(channel, last_played_id, paths),
        PickMode::Random => pick_random(channel, last_played_id, paths),
    }
}

fn pick_recency(
    channel: &mut ChannelState,
    last_played_id: Option<i32>,
    paths: &PathContext,
) -> Option<ArtworkRef> {
    let pool = channel.effective_count();
    if pool == 0 {
        return None;
    }
    let start = channel.cursor % pool;
    for step in 0..pool {
        let pos = (start + step) % pool;
        let Some(idx) = channel.pool_index(pos) else {
            continue;
        };
        if !acceptable(channel, idx, last_played_id, pool, false) {
            continue;
        }
        let artwork = build_artwork(channel, idx, paths)?;
        channel.cursor = (pos + 1) % pool;
        return Some(artwork);
    }
    None
}

fn pick_random(
    channel: &mut ChannelState,
    last_played_id: Option<i32>,
    paths: &PathContext,
) -> Option<ArtworkRef> {
    let pool = channel.effective_count();
    if pool == 0 {
        return None;
    }
    for attempt in 0..RANDOM_ATTEMPTS {
        let draw = channel.rng.next_u32();
        let Some(idx) = channel.pool_index(draw % pool) else {
            continue;
        };
        let allow_repeat = attempt == RANDOM_ATTEMPTS - 1;
        if !acceptable(channel, idx, last_played_id, pool, allow_repeat) {
            continue;
        }
        return build_artwork(channel, idx, paths);
    }
    pick_recency(channel, last_played_id, paths)
}

fn acceptable(
    channel: &ChannelState,
    idx: u32,
    last_played_id: Option<i32>,
    pool: u32,
    allow_repeat: bool,
) -> bool {
    let Some(entry) = channel.cache.entry(idx) else {
        return false;
    };
    if !entry.is_artwork() {
        return false;
    }
    if !allow_repeat && pool > 1 && last_played_id == Some(entry.post_id()) {
        return false;
    }
    true
}
