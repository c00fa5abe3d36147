// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-channel scheduler state.
//!
//! A channel is one artwork source named by the current playset. All six
//! source kinds share this one representation; the picker drives them
//! through the same code path and only the catalogue format and filepath
//! construction differ.
//!
//! Catalogue entries and the available set live inside the channel's cache
//! and are only reached through the `Arc<ChannelCache>` handle, so a cache
//! reload can never leave this struct holding a stale alias.

use std::sync::Arc;

use mural_store::{
    sanitize_component, ChannelCache, ChannelKind, EntryFormat, PlaysetChannel,
};

use crate::prng::Pcg32;

/// Mutable scheduler state for one playset channel.
#[derive(Debug, Clone)]
pub(crate) struct ChannelState {
    /// Synthesized channel id, e.g. `all`, `user:bob`, `sdcard`.
    pub id: String,
    /// Position of this channel within the current playset.
    pub index: u8,
    /// Source kind.
    pub kind: ChannelKind,
    /// Original playset weight, before normalization.
    pub spec_weight: u32,
    /// Normalized SWRR weight; active channels sum to 65536.
    pub weight: u32,
    /// SWRR deficit counter.
    pub credit: i64,
    /// Recency-pick cursor over the channel's effective pool.
    pub cursor: u32,
    /// Seeded pick stream, reseeded every epoch.
    pub rng: Pcg32,
    /// Catalogue + availability handle.
    pub cache: Arc<ChannelCache>,
    /// Set when the background refresher should reload this channel.
    pub refresh_pending: bool,
}

impl ChannelState {
    /// Entries the picker can currently choose from: the available set for
    /// remote sources, the whole catalogue for the SD card.
    pub fn effective_count(&self) -> u32 {
        match self.kind {
            ChannelKind::Sdcard => self.cache.entry_count(),
            _ => self.cache.available_count(),
        }
    }

    /// Whether this channel participates in weight computation and
    /// selection.
    pub fn is_active(&self) -> bool {
        self.effective_count() > 0
    }

    /// Catalogue index for dense pool position `pos`.
    pub fn pool_index(&self, pos: u32) -> Option<u32> {
        match self.kind {
            ChannelKind::Sdcard => (pos < self.cache.entry_count()).then_some(pos),
            _ => self.cache.available_at(pos),
        }
    }
}

/// Synthesizes the stable channel id for a playset entry.
///
/// NAMED channels use the feed name verbatim; identifier-bearing kinds
/// prefix the sanitized identifier; the SD card is a singleton.
pub(crate) fn channel_id(spec: &PlaysetChannel) -> String {
    match spec.kind {
        ChannelKind::Named => spec.name.clone(),
        ChannelKind::User => format!("user:{}", sanitize_component(&spec.identifier)),
        ChannelKind::Hashtag => format!("hashtag:{}", sanitize_component(&spec.identifier)),
        ChannelKind::Sdcard => "sdcard".to_owned(),
        ChannelKind::Artwork => format!("artwork:{}", sanitize_component(&spec.identifier)),
        ChannelKind::Giphy => format!("giphy:{}", sanitize_component(&spec.identifier)),
    }
}

/// Catalogue record format used by a channel kind.
pub(crate) fn entry_format(kind: ChannelKind) -> EntryFormat {
    match kind {
        ChannelKind::Sdcard => EntryFormat::Local,
        ChannelKind::Giphy => EntryFormat::Compact,
        ChannelKind::Named | ChannelKind::User | ChannelKind::Hashtag | ChannelKind::Artwork => {
            EntryFormat::Remote
        }
    }
}
