// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error type for scheduler operations.

use thiserror::Error;

use mural_store::StoreError;

/// Errors emitted by the scheduler's public API.
///
/// These are result values, never control flow: exhaustion (`NotFound`) is
/// an expected state the caller reacts to, not an exception.
#[derive(Debug, Error)]
pub enum SchedError {
    /// A caller-supplied value is out of contract (e.g. more than 64
    /// channels in a playset).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The operation requires an executed playset first.
    #[error("no playset executed")]
    InvalidState,
    /// No artwork is available, or no history entry exists to traverse.
    #[error("not found")]
    NotFound,
    /// The operation needs a collaborator that is not attached.
    #[error("not supported")]
    NotSupported,
    /// A store artifact failed to load or persist.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Filesystem failure outside the store formats.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
