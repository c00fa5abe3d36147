// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Catalogue entry records and their fixed-width little-endian codecs.
//!
//! Three wire formats exist, selected per cache file by the header's
//! `entry_format` tag: 64-byte remote records, 160-byte SD-card records,
//! and 48-byte compact records for other registered channel kinds. All
//! multi-byte fields are little-endian; reserved regions write as zero and
//! are ignored on read.

use crate::error::StoreError;
use crate::vault::format_uuid;

/// Asset container type of a catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssetKind {
    /// WebP still or animation.
    #[default]
    Webp,
    /// Legacy GIF animation.
    Gif,
    /// PNG still.
    Png,
    /// JPEG still.
    Jpeg,
}

impl AssetKind {
    /// Wire tag for this asset kind.
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::Webp => 0,
            Self::Gif => 1,
            Self::Png => 2,
            Self::Jpeg => 3,
        }
    }

    /// Parses a wire tag. Unknown tags are rejected so a corrupt record
    /// discards the cache instead of mislabeling an asset.
    pub fn from_tag(tag: u8) -> Result<Self, StoreError> {
        match tag {
            0 => Ok(Self::Webp),
            1 => Ok(Self::Gif),
            2 => Ok(Self::Png),
            3 => Ok(Self::Jpeg),
            _ => Err(StoreError::InvalidSize("unknown asset tag")),
        }
    }

    /// File extension without the dot, lowercase.
    #[must_use]
    pub fn ext(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Gif => "gif",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }
}

/// Wire tag for entries whose `kind` field marks a playable artwork.
pub const KIND_ARTWORK: u8 = 0;
/// Wire tag for playlist entries (skipped by pickers).
pub const KIND_PLAYLIST: u8 = 1;

/// Per-cache entry record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFormat {
    /// 64-byte remote-catalogue record.
    Remote,
    /// 160-byte SD-card record.
    Local,
    /// 48-byte compact record for other registered channel kinds.
    Compact,
}

impl EntryFormat {
    /// Record size in bytes.
    #[must_use]
    pub fn record_len(self) -> usize {
        match self {
            Self::Remote => 64,
            Self::Local => 160,
            Self::Compact => 48,
        }
    }

    /// Header tag for this format.
    #[must_use]
    pub fn tag(self) -> u16 {
        match self {
            Self::Remote => 1,
            Self::Local => 2,
            Self::Compact => 3,
        }
    }

    /// Parses a header tag.
    pub fn from_tag(tag: u16) -> Result<Self, StoreError> {
        match tag {
            1 => Ok(Self::Remote),
            2 => Ok(Self::Local),
            3 => Ok(Self::Compact),
            _ => Err(StoreError::InvalidSize("unknown entry format tag")),
        }
    }
}

/// Remote-catalogue record (64 bytes on the wire).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Raw 16-byte storage key; rendered as a hyphenated UUID string.
    pub storage_key_uuid: [u8; 16],
    /// Unix seconds at publication.
    pub created_at: i64,
    /// Unix seconds at last server-side modification.
    pub modified_at: i64,
    /// Server post id (positive).
    pub post_id: i32,
    /// Asset container.
    pub asset: AssetKind,
    /// Entry kind tag; only [`KIND_ARTWORK`] is pickable.
    pub kind: u8,
    /// Server-defined filter bits, carried opaquely.
    pub filter_flags: u16,
}

/// SD-card record (160 bytes on the wire).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    /// Negative hash of the filename; see [`local_post_id`].
    pub post_id: i32,
    /// Unix seconds from the file's modification time.
    pub created_at: i64,
    /// Per-entry dwell override in milliseconds; 0 means the global dwell.
    pub dwell_time_ms: u32,
    /// Asset container.
    pub asset: AssetKind,
    /// Bare filename under the animations directory, at most 143 bytes.
    pub filename: String,
}

/// Compact record for other registered channel kinds (48 bytes on the wire).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactEntry {
    /// Raw 16-byte storage key.
    pub storage_key_uuid: [u8; 16],
    /// Unix seconds at publication.
    pub created_at: i64,
    /// Server post id.
    pub post_id: i32,
    /// Asset container.
    pub asset: AssetKind,
    /// Entry kind tag; only [`KIND_ARTWORK`] is pickable.
    pub kind: u8,
    /// Server-defined filter bits.
    pub filter_flags: u16,
}

/// A catalogue entry in any of the registered wire formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogueEntry {
    /// Remote-catalogue entry.
    Remote(RemoteEntry),
    /// SD-card entry.
    Local(LocalEntry),
    /// Compact entry.
    Compact(CompactEntry),
}

impl CatalogueEntry {
    /// Post id of this entry (negative for SD-card entries).
    #[must_use]
    pub fn post_id(&self) -> i32 {
        match self {
            Self::Remote(e) => e.post_id,
            Self::Local(e) => e.post_id,
            Self::Compact(e) => e.post_id,
        }
    }

    /// Whether pickers may return this entry.
    #[must_use]
    pub fn is_artwork(&self) -> bool {
        match self {
            Self::Remote(e) => e.kind == KIND_ARTWORK,
            Self::Local(_) => true,
            Self::Compact(e) => e.kind == KIND_ARTWORK,
        }
    }

    /// Publication time in unix seconds.
    #[must_use]
    pub fn created_at(&self) -> i64 {
        match self {
            Self::Remote(e) => e.created_at,
            Self::Local(e) => e.created_at,
            Self::Compact(e) => e.created_at,
        }
    }

    /// Per-entry dwell override; 0 defers to the global dwell time.
    #[must_use]
    pub fn dwell_time_ms(&self) -> u32 {
        match self {
            Self::Local(e) => e.dwell_time_ms,
            Self::Remote(_) | Self::Compact(_) => 0,
        }
    }

    /// Asset container of this entry.
    #[must_use]
    pub fn asset(&self) -> AssetKind {
        match self {
            Self::Remote(e) => e.asset,
            Self::Local(e) => e.asset,
            Self::Compact(e) => e.asset,
        }
    }

    /// Hyphenated storage-key string, or `None` for SD-card entries.
    #[must_use]
    pub fn storage_key(&self) -> Option<String> {
        match self {
            Self::Remote(e) => Some(format_uuid(&e.storage_key_uuid)),
            Self::Compact(e) => Some(format_uuid(&e.storage_key_uuid)),
            Self::Local(_) => None,
        }
    }

    /// Bare filename for SD-card entries, `None` otherwise.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        match self {
            Self::Local(e) => Some(&e.filename),
            Self::Remote(_) | Self::Compact(_) => None,
        }
    }

    /// Wire format this entry belongs to.
    #[must_use]
    pub fn format(&self) -> EntryFormat {
        match self {
            Self::Remote(_) => EntryFormat::Remote,
            Self::Local(_) => EntryFormat::Local,
            Self::Compact(_) => EntryFormat::Compact,
        }
    }

    /// Appends the fixed-width record to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), StoreError> {
        let start = buf.len();
        match self {
            Self::Remote(e) => {
                buf.extend_from_slice(&e.storage_key_uuid);
                buf.extend_from_slice(&e.created_at.to_le_bytes());
                buf.extend_from_slice(&e.modified_at.to_le_bytes());
                buf.extend_from_slice(&e.post_id.to_le_bytes());
                buf.push(e.asset.tag());
                buf.push(e.kind);
                buf.extend_from_slice(&e.filter_flags.to_le_bytes());
                buf.resize(start + 64, 0);
            }
            Self::Local(e) => {
                let name = e.filename.as_bytes();
                if name.len() > MAX_FILENAME_LEN {
                    return Err(StoreError::InvalidSize("filename exceeds 143 bytes"));
                }
                buf.extend_from_slice(&e.post_id.to_le_bytes());
                buf.extend_from_slice(&e.created_at.to_le_bytes());
                buf.extend_from_slice(&e.dwell_time_ms.to_le_bytes());
                buf.push(e.asset.tag());
                buf.extend_from_slice(name);
                buf.resize(start + 160, 0);
            }
            Self::Compact(e) => {
                buf.extend_from_slice(&e.storage_key_uuid);
                buf.extend_from_slice(&e.created_at.to_le_bytes());
                buf.extend_from_slice(&e.post_id.to_le_bytes());
                buf.push(e.asset.tag());
                buf.push(e.kind);
                buf.extend_from_slice(&e.filter_flags.to_le_bytes());
                buf.resize(start + 48, 0);
            }
        }
        Ok(())
    }

    /// Decodes one record of `format` from `raw`, which must be exactly one
    /// record long.
    pub fn decode(format: EntryFormat, raw: &[u8]) -> Result<Self, StoreError> {
        if raw.len() != format.record_len() {
            return Err(StoreError::InvalidSize("record length mismatch"));
        }
        match format {
            EntryFormat::Remote => Ok(Self::Remote(RemoteEntry {
                storage_key_uuid: take16(raw, 0),
                created_at: i64::from_le_bytes(take8(raw, 16)),
                modified_at: i64::from_le_bytes(take8(raw, 24)),
                post_id: i32::from_le_bytes(take4(raw, 32)),
                asset: AssetKind::from_tag(raw[36])?,
                kind: raw[37],
                filter_flags: u16::from_le_bytes([raw[38], raw[39]]),
            })),
            EntryFormat::Local => {
                let name_bytes = &raw[17..160];
                let end = name_bytes
                    .iter()
                    .position(|&b| b == 0)
                    .unwrap_or(name_bytes.len());
                let filename = String::from_utf8_lossy(&name_bytes[..end]).into_owned();
                Ok(Self::Local(LocalEntry {
                    post_id: i32::from_le_bytes(take4(raw, 0)),
                    created_at: i64::from_le_bytes(take8(raw, 4)),
                    dwell_time_ms: u32::from_le_bytes(take4(raw, 12)),
                    asset: AssetKind::from_tag(raw[16])?,
                    filename,
                }))
            }
            EntryFormat::Compact => Ok(Self::Compact(CompactEntry {
                storage_key_uuid: take16(raw, 0),
                created_at: i64::from_le_bytes(take8(raw, 16)),
                post_id: i32::from_le_bytes(take4(raw, 24)),
                asset: AssetKind::from_tag(raw[28])?,
                kind: raw[29],
                filter_flags: u16::from_le_bytes([raw[30], raw[31]]),
            })),
        }
    }
}

/// Longest filename an SD-card record can carry.
pub const MAX_FILENAME_LEN: usize = 143;

/// Derives the stable negative post id for an SD-card file from its bare
/// filename (FNV-1a over the UTF-8 bytes, folded into `[-0x7FFF_FFFF, -1]`).
#[must_use]
pub fn local_post_id(filename: &str) -> i32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in filename.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    let folded = (hash & 0x7FFF_FFFF).max(1);
    -(folded as i32)
}

fn take4(raw: &[u8], at: usize) -> [u8; 4] {
    [raw[at], raw[at + 1], raw[at + 2], raw[at + 3]]
}

fn take8(raw: &[u8], at: usize) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&raw[at..at + 8]);
    out
}

fn take16(raw: &[u8], at: usize) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(&raw[at..at + 16]);
    out
}
