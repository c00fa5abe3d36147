// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Playset files: the declarative configuration that names channels and the
//! scheduling modes.
//!
//! Layout (little-endian), 32-byte header then 144-byte channel entries:
//!
//! ```text
//! offset  size  field
//!      0     4  magic "P3PS"
//!      4     2  version (10)
//!      6     2  flags, reserved zero
//!      8     1  exposure_mode
//!      9     1  pick_mode
//!     10     2  channel_count (1–64)
//!     12     4  crc32 over the whole file with this field zeroed
//!     16    16  reserved, zero
//!     32     …  channel entries:
//!               1 type, 33 name, 33 identifier, 65 display_name,
//!               4 weight, 8 reserved
//! ```
//!
//! A version mismatch deletes the file; stale playsets never limp along.

use std::path::Path;

use crate::atomic::write_atomic;
use crate::error::StoreError;

/// Playset file magic: `P3PS`.
pub const PLAYSET_MAGIC: [u8; 4] = *b"P3PS";
/// Playset format version.
pub const PLAYSET_VERSION: u16 = 10;
/// Fixed header length.
pub const PLAYSET_HEADER_LEN: usize = 32;
/// Fixed channel entry length.
pub const PLAYSET_ENTRY_LEN: usize = 144;
/// Most channels a playset may name.
pub const MAX_CHANNELS: usize = 64;

/// Cross-channel exposure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExposureMode {
    /// Every active channel gets the same share.
    #[default]
    Equal,
    /// Shares follow the playset's per-channel weights.
    Manual,
    /// Shares follow catalogue size with a recency bias.
    Proportional,
}

impl ExposureMode {
    /// Wire tag.
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::Equal => 0,
            Self::Manual => 1,
            Self::Proportional => 2,
        }
    }

    /// Parses a wire tag.
    pub fn from_tag(tag: u8) -> Result<Self, StoreError> {
        match tag {
            0 => Ok(Self::Equal),
            1 => Ok(Self::Manual),
            2 => Ok(Self::Proportional),
            _ => Err(StoreError::InvalidSize("unknown exposure mode")),
        }
    }
}

/// Per-channel next-item selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickMode {
    /// Deterministic linear cursor over the available set.
    #[default]
    Recency,
    /// Seeded uniform draws from the available set.
    Random,
}

impl PickMode {
    /// Wire tag.
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::Recency => 0,
            Self::Random => 1,
        }
    }

    /// Parses a wire tag.
    pub fn from_tag(tag: u8) -> Result<Self, StoreError> {
        match tag {
            0 => Ok(Self::Recency),
            1 => Ok(Self::Random),
            _ => Err(StoreError::InvalidSize("unknown pick mode")),
        }
    }
}

/// Kind of artwork source a channel draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Curated named feed.
    Named,
    /// A user's published artworks.
    User,
    /// A hashtag feed.
    Hashtag,
    /// Files on the local SD card.
    Sdcard,
    /// A single pinned artwork.
    Artwork,
    /// Giphy search feed.
    Giphy,
}

impl ChannelKind {
    /// Wire tag.
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::Named => 0,
            Self::User => 1,
            Self::Hashtag => 2,
            Self::Sdcard => 3,
            Self::Artwork => 4,
            Self::Giphy => 5,
        }
    }

    /// Parses a wire tag.
    pub fn from_tag(tag: u8) -> Result<Self, StoreError> {
        match tag {
            0 => Ok(Self::Named),
            1 => Ok(Self::User),
            2 => Ok(Self::Hashtag),
            3 => Ok(Self::Sdcard),
            4 => Ok(Self::Artwork),
            5 => Ok(Self::Giphy),
            _ => Err(StoreError::InvalidSize("unknown channel kind")),
        }
    }
}

/// One channel named by a playset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaysetChannel {
    /// Source kind.
    pub kind: ChannelKind,
    /// Feed name (NAMED channels); at most 32 bytes.
    pub name: String,
    /// Kind-specific identifier (user handle, hashtag, …); at most 32 bytes.
    pub identifier: String,
    /// Human-readable label; at most 64 bytes.
    pub display_name: String,
    /// Manual-exposure weight before normalization.
    pub weight: u32,
}

/// A decoded playset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playset {
    /// Cross-channel exposure policy.
    pub exposure: ExposureMode,
    /// Per-channel pick policy.
    pub pick: PickMode,
    /// Channels, in priority order for tie-breaks. 1 to 64 entries.
    pub channels: Vec<PlaysetChannel>,
}

impl Playset {
    /// Encodes the playset, computing the checksum over the zeroed field.
    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        if self.channels.is_empty() || self.channels.len() > MAX_CHANNELS {
            return Err(StoreError::InvalidSize("channel count out of range"));
        }
        let mut out =
            Vec::with_capacity(PLAYSET_HEADER_LEN + self.channels.len() * PLAYSET_ENTRY_LEN);
        out.extend_from_slice(&PLAYSET_MAGIC);
        out.extend_from_slice(&PLAYSET_VERSION.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.push(self.exposure.tag());
        out.push(self.pick.tag());
        out.extend_from_slice(&(self.channels.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // crc, patched below
        out.resize(PLAYSET_HEADER_LEN, 0);

        for channel in &self.channels {
            let start = out.len();
            out.push(channel.kind.tag());
            push_str_field(&mut out, &channel.name, 33, "name exceeds 32 bytes")?;
            push_str_field(&mut out, &channel.identifier, 33, "identifier exceeds 32 bytes")?;
            push_str_field(
                &mut out,
                &channel.display_name,
                65,
                "display name exceeds 64 bytes",
            )?;
            out.extend_from_slice(&channel.weight.to_le_bytes());
            out.resize(start + PLAYSET_ENTRY_LEN, 0);
        }

        let crc = crc32fast::hash(&out);
        out[12..16].copy_from_slice(&crc.to_le_bytes());
        Ok(out)
    }

    /// Decodes a playset buffer, verifying magic, version, size, and CRC.
    pub fn decode(raw: &[u8]) -> Result<Self, StoreError> {
        if raw.len() < PLAYSET_HEADER_LEN {
            return Err(StoreError::InvalidSize("file shorter than header"));
        }
        if raw[0..4] != PLAYSET_MAGIC {
            return Err(StoreError::InvalidMagic);
        }
        let version = u16::from_le_bytes([raw[4], raw[5]]);
        if version != PLAYSET_VERSION {
            return Err(StoreError::InvalidVersion {
                found: version,
                expected: PLAYSET_VERSION,
            });
        }
        let exposure = ExposureMode::from_tag(raw[8])?;
        let pick = PickMode::from_tag(raw[9])?;
        let channel_count = u16::from_le_bytes([raw[10], raw[11]]) as usize;
        if channel_count == 0 || channel_count > MAX_CHANNELS {
            return Err(StoreError::InvalidSize("channel count out of range"));
        }
        if raw.len() != PLAYSET_HEADER_LEN + channel_count * PLAYSET_ENTRY_LEN {
            return Err(StoreError::InvalidSize("length disagrees with channel count"));
        }

        let stored_crc = u32::from_le_bytes([raw[12], raw[13], raw[14], raw[15]]);
        let mut zeroed = raw.to_vec();
        zeroed[12..16].fill(0);
        let computed = crc32fast::hash(&zeroed);
        if computed != stored_crc {
            return Err(StoreError::InvalidCrc {
                stored: stored_crc,
                computed,
            });
        }

        let mut channels = Vec::with_capacity(channel_count);
        for i in 0..channel_count {
            let rec = &raw[PLAYSET_HEADER_LEN + i * PLAYSET_ENTRY_LEN..];
            channels.push(PlaysetChannel {
                kind: ChannelKind::from_tag(rec[0])?,
                name: read_str_field(&rec[1..34]),
                identifier: read_str_field(&rec[34..67]),
                display_name: read_str_field(&rec[67..132]),
                weight: u32::from_le_bytes([rec[132], rec[133], rec[134], rec[135]]),
            });
        }
        Ok(Self {
            exposure,
            pick,
            channels,
        })
    }

    /// Loads a playset file. A version mismatch deletes the file before the
    /// error is returned.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read(path)?;
        match Self::decode(&raw) {
            Ok(playset) => Ok(playset),
            Err(err @ StoreError::InvalidVersion { .. }) => {
                let _ = std::fs::remove_file(path);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Writes the playset atomically.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let bytes = self.encode()?;
        write_atomic(path, &bytes)?;
        Ok(())
    }
}

fn push_str_field(
    out: &mut Vec<u8>,
    value: &str,
    width: usize,
    oversize: &'static str,
) -> Result<(), StoreError> {
    let bytes = value.as_bytes();
    // Width includes the mandatory NUL terminator.
    if bytes.len() >= width {
        return Err(StoreError::InvalidSize(oversize));
    }
    let start = out.len();
    out.extend_from_slice(bytes);
    out.resize(start + width, 0);
    Ok(())
}

fn read_str_field(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Playset {
        Playset {
            exposure: ExposureMode::Equal,
            pick: PickMode::Recency,
            channels: vec![
                PlaysetChannel {
                    kind: ChannelKind::Named,
                    name: "all".to_owned(),
                    identifier: String::new(),
                    display_name: "Everything".to_owned(),
                    weight: 1,
                },
                PlaysetChannel {
                    kind: ChannelKind::User,
                    name: String::new(),
                    identifier: "bob".to_owned(),
                    display_name: "Bob's wall".to_owned(),
                    weight: 3,
                },
            ],
        }
    }

    #[test]
    fn encode_decode_round_trips() {
        let playset = fixture();
        let bytes = playset.encode().unwrap();
        assert_eq!(bytes.len(), PLAYSET_HEADER_LEN + 2 * PLAYSET_ENTRY_LEN);
        assert_eq!(Playset::decode(&bytes).unwrap(), playset);
    }

    #[test]
    fn version_mismatch_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evening.playset");
        fixture().save(&path).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[4] = 9;
        // Re-seal the CRC so only the version is wrong.
        bytes[12..16].fill(0);
        let crc = crc32fast::hash(&bytes);
        bytes[12..16].copy_from_slice(&crc.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        let err = Playset::load(&path).unwrap_err();
        assert!(matches!(err, StoreError::InvalidVersion { found: 9, .. }));
        assert!(!path.exists());
    }

    #[test]
    fn crc_damage_is_detected() {
        let playset = fixture();
        let mut bytes = playset.encode().unwrap();
        bytes[40] ^= 0x01;
        assert!(matches!(
            Playset::decode(&bytes),
            Err(StoreError::InvalidCrc { .. })
        ));
    }

    #[test]
    fn channel_count_bounds_are_enforced() {
        let mut playset = fixture();
        playset.channels.clear();
        assert!(playset.encode().is_err());
        playset.channels = (0..65)
            .map(|i| PlaysetChannel {
                kind: ChannelKind::Named,
                name: format!("ch{i}"),
                identifier: String::new(),
                display_name: String::new(),
                weight: 1,
            })
            .collect();
        assert!(playset.encode().is_err());
    }

    #[test]
    fn oversize_name_is_rejected() {
        let mut playset = fixture();
        playset.channels[0].name = "n".repeat(33);
        assert!(matches!(
            playset.encode(),
            Err(StoreError::InvalidSize("name exceeds 32 bytes"))
        ));
    }
}
