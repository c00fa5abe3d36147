// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Load-tracker files: the three-strike record that stops the device from
//! re-downloading artwork it can never decode.
//!
//! One small JSON file per storage key, sharded next to the artwork blob in
//! the vault. Three failed loads promote the record to terminal; terminal
//! keys are excluded from downloads until an operator intervenes upstream.
//! A successful load clears the record entirely.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::atomic::write_atomic;
use crate::error::StoreError;
use crate::vault::ltf_path;

/// Failures after which a key becomes terminal.
pub const MAX_ATTEMPTS: u8 = 3;

/// Persistent failure record for one storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadTracker {
    /// Failed load attempts so far (1–3).
    pub attempts: u8,
    /// Whether the key is permanently excluded from downloads.
    pub terminal: bool,
    /// Unix seconds of the most recent failure.
    pub last_failure: i64,
    /// Reason string from the most recent failure.
    pub reason: String,
}

impl LoadTracker {
    /// Reads the record for `storage_key`, or `None` when the key has no
    /// recorded failures.
    pub fn load(vault: &Path, storage_key: &str) -> Result<Option<Self>, StoreError> {
        let path = ltf_path(vault, storage_key);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    /// Records one more failure for `storage_key` and persists the updated
    /// record. The third strike sets `terminal`.
    pub fn record_failure(
        vault: &Path,
        storage_key: &str,
        reason: &str,
        now_unix: i64,
    ) -> Result<Self, StoreError> {
        let attempts = Self::load(vault, storage_key)?
            .map_or(0, |t| t.attempts)
            .saturating_add(1)
            .min(MAX_ATTEMPTS);
        let tracker = Self {
            attempts,
            terminal: attempts >= MAX_ATTEMPTS,
            last_failure: now_unix,
            reason: reason.to_owned(),
        };
        let bytes = serde_json::to_vec(&tracker)?;
        write_atomic(&ltf_path(vault, storage_key), &bytes)?;
        Ok(tracker)
    }

    /// Whether `storage_key` is permanently excluded. Unreadable records
    /// count as non-terminal; the downloader will find out the hard way.
    #[must_use]
    pub fn is_terminal(vault: &Path, storage_key: &str) -> bool {
        Self::load(vault, storage_key)
            .ok()
            .flatten()
            .is_some_and(|t| t.terminal)
    }

    /// Deletes the record after a successful load. Missing records are fine.
    pub fn clear(vault: &Path, storage_key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(ltf_path(vault, storage_key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_strikes_promote_to_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let vault = dir.path();
        let key = "11111111-2222-3333-4444-555555555555";

        let first = LoadTracker::record_failure(vault, key, "decode_error", 100).unwrap();
        assert_eq!(first.attempts, 1);
        assert!(!first.terminal);
        assert!(!LoadTracker::is_terminal(vault, key));

        LoadTracker::record_failure(vault, key, "decode_error", 200).unwrap();
        let third = LoadTracker::record_failure(vault, key, "decode_error", 300).unwrap();
        assert_eq!(third.attempts, 3);
        assert!(third.terminal);
        assert_eq!(third.last_failure, 300);
        assert!(LoadTracker::is_terminal(vault, key));
    }

    #[test]
    fn clear_removes_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let vault = dir.path();
        let key = "aaaa";
        LoadTracker::record_failure(vault, key, "io", 1).unwrap();
        LoadTracker::clear(vault, key).unwrap();
        assert_eq!(LoadTracker::load(vault, key).unwrap(), None);
        LoadTracker::clear(vault, key).unwrap();
    }

    #[test]
    fn json_shape_matches_the_contract() {
        let dir = tempfile::tempdir().unwrap();
        let vault = dir.path();
        LoadTracker::record_failure(vault, "k", "oom", 42).unwrap();
        let raw = std::fs::read(crate::vault::ltf_path(vault, "k")).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["attempts"], 1);
        assert_eq!(value["terminal"], false);
        assert_eq!(value["last_failure"], 42);
        assert_eq!(value["reason"], "oom");
    }
}
