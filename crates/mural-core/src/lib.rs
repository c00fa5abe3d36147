// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! mural-core: deterministic multi-channel playback scheduler.
//!
//! The scheduler selects, on demand, the next artwork to render on a single
//! display, drawing from the channels named by the executed playset. Its
//! stream is a pure function of the global seed, the epoch, the modes, the
//! availability state, and the NAE events interleaved — replay the inputs
//! and you replay the artwork, byte for byte.
//!
//! # Structure
//!
//! - [`Scheduler`] owns all mutable state behind one mutex and exposes the
//!   navigation API (`next`/`prev`/`peek_next`/`current`), playset
//!   execution, and the download/failure hooks.
//! - [`HistoryRing`] provides bounded backward navigation.
//! - The NAE pool injects newly published artworks probabilistically.
//! - Port traits ([`Presenter`], [`DeviceStatus`], [`AutoSwap`]) connect
//!   the presenter, the device state, and the runtime's dwell ticker.
//!
//! On-disk concerns (catalogue caches, playsets, load trackers, the vault)
//! live in `mural-store`; thread plumbing lives in `mural-runtime`.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc
)]

mod artwork;
mod channel;
mod error;
mod history;
mod nae;
mod picker;
mod port;
mod prng;
mod scheduler;
mod stats;
mod swrr;

pub use artwork::{ArtworkKey, ArtworkRef};
pub use error::SchedError;
pub use history::{HistoryRing, HISTORY_CAPACITY};
pub use nae::{NAE_CAPACITY, PRIORITY_FLOOR, PRIORITY_INITIAL};
pub use port::{AutoSwap, DeviceStatus, FixedStatus, Presenter, SwapRequest};
pub use prng::{channel_seed, nae_seed, Pcg32, NAE_STREAM_SALT};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use stats::{ChannelStats, SchedulerStats};
pub use swrr::WEIGHT_SCALE;

// The store's value vocabulary is part of this crate's API surface.
pub use mural_store::{
    AssetKind, ChannelKind, ExposureMode, PickMode, Playset, PlaysetChannel,
};
