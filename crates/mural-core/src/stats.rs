// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Read-only snapshots of scheduler state for status surfaces.

use mural_store::{ChannelKind, ExposureMode, PickMode};

/// Aggregate scheduler statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Current scheduler generation.
    pub epoch: u32,
    /// Channels in the executed playset.
    pub channel_count: usize,
    /// Catalogue entries across all channels.
    pub total_entries: u64,
    /// Locally available entries across all channels.
    pub total_available: u64,
    /// Entries currently in the history ring.
    pub history_len: usize,
    /// Events currently in the NAE pool.
    pub nae_len: usize,
    /// Active exposure mode.
    pub exposure: ExposureMode,
    /// Active pick mode.
    pub pick: PickMode,
    /// Post id of the most recently returned artwork.
    pub last_played_id: Option<i32>,
}

/// Per-channel statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStats {
    /// Synthesized channel id.
    pub id: String,
    /// Source kind.
    pub kind: ChannelKind,
    /// Catalogue entries in the channel's cache.
    pub total_entries: u32,
    /// Entries available locally.
    pub cached: u32,
    /// Current normalized SWRR weight.
    pub weight: u32,
}
