// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Smooth weighted round robin across active channels.
//!
//! Weights are normalized so the active subset always sums to
//! [`WEIGHT_SCALE`]; inactive channels carry weight 0. Selection adds each
//! active channel's weight to its signed credit, takes the maximum (ties to
//! the lowest index), and charges the winner one full scale. Credits
//! persist across calls and reset only on playset execution or explicit
//! reset, which is what smooths the interleave.

use crate::channel::ChannelState;
use mural_store::ExposureMode;

/// Fixed-point weight scale; active weights sum to this exactly.
pub const WEIGHT_SCALE: u32 = 65536;

/// Proportional mode floor and ceiling for a single channel's share.
const SHARE_FLOOR: f64 = 0.02;
const SHARE_CEIL: f64 = 0.40;
/// Blend between catalogue-size share and the recency proxy.
const TOTAL_BLEND: f64 = 0.65;
const RECENT_BLEND: f64 = 0.35;

/// Recomputes every channel's normalized weight for the given mode.
///
/// Channels without effective content get weight 0 and never win
/// selection; the remainder of the fixed-point division goes to the
/// lowest-index active channel so the sum lands exactly on the scale.
pub(crate) fn compute_weights(channels: &mut [ChannelState], mode: ExposureMode) {
    let active: Vec<usize> = (0..channels.len())
        .filter(|&i| channels[i].is_active())
        .collect();
    for ch in channels.iter_mut() {
        ch.weight = 0;
    }
    if active.is_empty() {
        return;
    }

    match mode {
        ExposureMode::Equal => {
            assign_shares(channels, &active, &vec![1.0; active.len()]);
        }
        ExposureMode::Manual => {
            let sum: u64 = active.iter().map(|&i| u64::from(channels[i].spec_weight)).sum();
            if sum == 0 {
                assign_shares(channels, &active, &vec![1.0; active.len()]);
            } else {
                let shares: Vec<f64> = active
                    .iter()
                    .map(|&i| f64::from(channels[i].spec_weight))
                    .collect();
                assign_shares(channels, &active, &shares);
            }
        }
        ExposureMode::Proportional => {
            let counts: Vec<u32> = active.iter().map(|&i| channels[i].effective_count()).collect();
            let total: f64 = counts.iter().map(|&c| f64::from(c)).sum();
            let quarters: Vec<u32> = counts.iter().map(|&c| recency_proxy(c)).collect();
            let quarter_sum: f64 = quarters.iter().map(|&q| f64::from(q)).sum();

            let mut shares: Vec<f64> = counts
                .iter()
                .zip(&quarters)
                .map(|(&c, &q)| {
                    let p_total = f64::from(c) / total;
                    let p_recent = if quarter_sum > 0.0 {
                        f64::from(q) / quarter_sum
                    } else {
                        p_total
                    };
                    (TOTAL_BLEND * p_total + RECENT_BLEND * p_recent)
                        .clamp(SHARE_FLOOR, SHARE_CEIL)
                })
                .collect();
            let norm: f64 = shares.iter().sum();
            for share in &mut shares {
                *share /= norm;
            }
            assign_shares(channels, &active, &shares);
        }
    }
}

/// Recency stand-in until the remote service reports a real recent count.
fn recency_proxy(effective_count: u32) -> u32 {
    effective_count / 4
}

fn assign_shares(channels: &mut [ChannelState], active: &[usize], shares: &[f64]) {
    let total: f64 = shares.iter().sum();
    let mut assigned: u32 = 0;
    for (&idx, &share) in active.iter().zip(shares) {
        let weight = (share / total * f64::from(WEIGHT_SCALE)) as u32;
        channels[idx].weight = weight;
        assigned += weight;
    }
    // Fixed-point remainder lands on the lowest-index active channel.
    channels[active[0]].weight += WEIGHT_SCALE - assigned;
}

/// Runs one SWRR round and returns the winning channel index, or `None`
/// when no channel is active.
pub(crate) fn select(channels: &mut [ChannelState]) -> Option<usize> {
    for ch in channels.iter_mut() {
        if ch.is_active() {
            ch.credit += i64::from(ch.weight);
        }
    }
    let mut best: Option<usize> = None;
    for (idx, ch) in channels.iter().enumerate() {
        if !ch.is_active() {
            continue;
        }
        // Strict comparison keeps ties on the lowest index.
        match best {
            Some(b) if channels[b].credit >= ch.credit => {}
            _ => best = Some(idx),
        }
    }
    let winner = best?;
    channels[winner].credit -= i64::from(WEIGHT_SCALE);
    Some(winner)
}

/// Zeroes every credit; done on playset execution and explicit reset.
pub(crate) fn reset_credits(channels: &mut [ChannelState]) {
    for ch in channels.iter_mut() {
        ch.credit = 0;
    }
}
