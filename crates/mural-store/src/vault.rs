// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Vault path construction and identifier sanitization.
//!
//! The vault is content-addressed local storage, sharded by the first three
//! bytes of `SHA256(storage_key_string)`: a key `k` with digest `ab cd ef …`
//! lives at `<vault>/ab/cd/ef/<k>.<ext>`. The sibling `.ltf` load-tracker
//! file shares the shard.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::entry::AssetKind;

/// Replaces every character outside `[0-9A-Za-z]` with `_`.
///
/// Applied to user- and hashtag-derived identifier components before they
/// participate in channel ids or filenames.
#[must_use]
pub fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Filename of a channel's cache file: the channel id with colons replaced
/// by underscores, plus the `.bin` suffix.
#[must_use]
pub fn cache_file_name(channel_id: &str) -> String {
    format!("{}.bin", channel_id.replace(':', "_"))
}

/// Three shard components for `storage_key`, as lowercase two-digit hex of
/// the first three bytes of its SHA-256 digest.
#[must_use]
pub fn shard_components(storage_key: &str) -> [String; 3] {
    let digest = Sha256::digest(storage_key.as_bytes());
    [
        format!("{:02x}", digest[0]),
        format!("{:02x}", digest[1]),
        format!("{:02x}", digest[2]),
    ]
}

/// Absolute path of an artwork blob inside the vault.
#[must_use]
pub fn artwork_path(vault: &Path, storage_key: &str, asset: AssetKind) -> PathBuf {
    let [a, b, c] = shard_components(storage_key);
    vault
        .join(a)
        .join(b)
        .join(c)
        .join(format!("{storage_key}.{}", asset.ext()))
}

/// Absolute path of the load-tracker file for `storage_key`.
#[must_use]
pub fn ltf_path(vault: &Path, storage_key: &str) -> PathBuf {
    let [a, b, c] = shard_components(storage_key);
    vault.join(a).join(b).join(c).join(format!("{storage_key}.ltf"))
}

/// Renders a raw 16-byte storage key as the canonical lowercase hyphenated
/// UUID string (8-4-4-4-12).
#[must_use]
pub fn format_uuid(raw: &[u8; 16]) -> String {
    let hex = hex::encode(raw);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}
