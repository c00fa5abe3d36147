// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Thread plumbing for the Mural scheduler.
//!
//! `mural-core` is deliberately passive: it advances only when called. This
//! crate supplies the threads that call it — the dwell ticker that drives
//! auto-advance and the background refresher that drains pending channel
//! reloads — plus the persistent player settings the application boots
//! from.
//!
//! Wiring is callback-based to keep ownership one-directional: the
//! application hands each thread a closure over its `Arc<Scheduler>`, and
//! attaches the ticker back to the scheduler through the `AutoSwap` port so
//! manual navigation can restart the dwell period.
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
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self,
    clippy::missing_errors_doc,
    clippy::significant_drop_tightening
)]

mod config;
mod refresher;
mod ticker;

pub use config::{ConfigError, PlayerConfig};
pub use refresher::Refresher;
pub use ticker::DwellTicker;
