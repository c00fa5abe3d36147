// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error type for on-disk artifact operations.

use thiserror::Error;

/// Errors emitted while reading or writing Mural's on-disk artifacts.
///
/// Integrity failures (`InvalidMagic`, `InvalidVersion`, `InvalidCrc`,
/// `InvalidSize`) mean the artifact was discarded and the caller should
/// proceed as if it never existed. They are never fatal to playback.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The file did not start with the expected magic number.
    #[error("bad magic number")]
    InvalidMagic,
    /// The on-disk format version is not one this build understands.
    #[error("unsupported format version {found} (expected {expected})")]
    InvalidVersion {
        /// Version read from the file header.
        found: u16,
        /// Version this build writes.
        expected: u16,
    },
    /// Stored CRC32 did not match the recomputed payload checksum.
    #[error("crc mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    InvalidCrc {
        /// Checksum read from the header.
        stored: u32,
        /// Checksum recomputed over the payload.
        computed: u32,
    },
    /// The file length is inconsistent with the counts in its header, or a
    /// field exceeds its wire bounds.
    #[error("invalid size: {0}")]
    InvalidSize(&'static str),
    /// Underlying filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Load-tracker JSON could not be parsed or produced.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
