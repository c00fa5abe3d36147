// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! On-disk artifacts for the Mural display device.
//!
//! `mural-store` owns everything that touches persistent storage: the
//! per-channel catalogue cache (`P3CC`), the playset configuration file
//! (`P3PS`), the load-tracker JSON that blocks broken artwork from being
//! re-downloaded, the content-addressed vault path scheme, and the debounced
//! save worker. It knows nothing about scheduling; `mural-core` layers the
//! playback semantics on top of these handles.
//!
//! # Integrity Policy
//!
//! Binary artifacts carry a magic number, a format version, and a CRC32.
//! Any check failure discards the artifact and surfaces a typed
//! [`StoreError`]; playback continues with whatever remains. Corruption is
//! an inconvenience here, never a crash.
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
    clippy::missing_errors_doc
)]

mod atomic;
mod cache;
mod entry;
mod error;
mod lai;
mod ltf;
mod playset;
mod saver;
mod vault;

pub use cache::{
    ChannelCache, ExistsProbe, CACHE_HEADER_LEN, CACHE_MAGIC, CACHE_VERSION, CACHE_VERSION_LEGACY,
};
pub use entry::{
    local_post_id, AssetKind, CatalogueEntry, CompactEntry, EntryFormat, LocalEntry, RemoteEntry,
    KIND_ARTWORK, KIND_PLAYLIST, MAX_FILENAME_LEN,
};
pub use error::StoreError;
pub use lai::AvailableSet;
pub use ltf::{LoadTracker, MAX_ATTEMPTS};
pub use playset::{
    ChannelKind, ExposureMode, PickMode, Playset, PlaysetChannel, MAX_CHANNELS, PLAYSET_ENTRY_LEN,
    PLAYSET_HEADER_LEN, PLAYSET_MAGIC, PLAYSET_VERSION,
};
pub use saver::{SaveScheduler, DEFAULT_DEBOUNCE};
pub use vault::{
    artwork_path, cache_file_name, format_uuid, ltf_path, sanitize_component, shard_components,
};
