// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persistent per-channel catalogue cache.
//!
//! One binary file per channel holds the catalogue entries followed by the
//! locally-available index. Layout (all little-endian):
//!
//! ```text
//! offset  size  field
//!      0     4  magic "P3CC"
//!      4     2  version        (current 2; 1 accepted as legacy, no LAi)
//!      6     2  entry_format   (1 remote/64B, 2 local/160B, 3 compact/48B)
//!      8     4  entry_count
//!     12     4  lai_count
//!     16     4  crc32 over the payload (entries + LAi)
//!     20    12  reserved, zero
//!     32     …  entry_count records, then lai_count u32 indices
//! ```
//!
//! Integrity failures discard the file and report a typed error; the channel
//! then plays empty until a refresh rebuilds the cache. Version-1 files have
//! no LAi section: availability is synthesized by probing each entry's file
//! and the cache is marked dirty so the upgraded form gets written back.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use crate::atomic::write_atomic;
use crate::entry::{CatalogueEntry, EntryFormat};
use crate::error::StoreError;
use crate::lai::AvailableSet;

/// Cache file magic: `P3CC`.
pub const CACHE_MAGIC: [u8; 4] = *b"P3CC";
/// Version written by this build.
pub const CACHE_VERSION: u16 = 2;
/// Last version without a persisted LAi section.
pub const CACHE_VERSION_LEGACY: u16 = 1;
/// Fixed header length.
pub const CACHE_HEADER_LEN: usize = 32;

/// Probe deciding whether an entry's file currently exists locally.
///
/// Used only when upgrading legacy caches; the live system trusts the
/// persisted LAi and the download/failure hooks.
pub type ExistsProbe<'a> = &'a dyn Fn(&CatalogueEntry) -> bool;

#[derive(Debug)]
struct CacheState {
    format: EntryFormat,
    entries: Vec<CatalogueEntry>,
    available: AvailableSet,
    dirty: bool,
}

/// A channel's catalogue plus availability, with interior locking.
///
/// Shared as `Arc<ChannelCache>` between the scheduler (reads, LAi edits)
/// and the save scheduler (writes). The scheduler never holds references
/// into the cache across calls; every access goes through this handle, so a
/// refresh that replaces the contents can never leave a stale alias behind.
#[derive(Debug)]
pub struct ChannelCache {
    path: PathBuf,
    state: Mutex<CacheState>,
}

impl ChannelCache {
    /// Creates an empty, clean cache that will persist to `path`.
    #[must_use]
    pub fn empty(path: PathBuf, format: EntryFormat) -> Self {
        Self {
            path,
            state: Mutex::new(CacheState {
                format,
                entries: Vec::new(),
                available: AvailableSet::new(),
                dirty: false,
            }),
        }
    }

    /// Loads the cache at `path`.
    ///
    /// A missing file yields an empty cache (absence is not an error). A
    /// file that fails magic, version, CRC, or size checks is deleted from
    /// disk and the error returned; callers treat the channel as empty.
    /// After a legacy upgrade or an LAi sanitization the cache reports
    /// dirty and should be handed to the save scheduler.
    pub fn load(
        path: PathBuf,
        format: EntryFormat,
        probe: ExistsProbe<'_>,
    ) -> Result<Self, StoreError> {
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::empty(path, format));
            }
            Err(err) => return Err(err.into()),
        };
        match Self::decode(&raw, probe) {
            Ok(state) => Ok(Self {
                path,
                state: Mutex::new(state),
            }),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "discarding channel cache");
                let _ = std::fs::remove_file(&path);
                Err(err)
            }
        }
    }

    /// Re-reads the file backing this cache, replacing the in-memory state.
    ///
    /// Used when a download-complete event references an entry the current
    /// state does not know (the background refresher may have replaced the
    /// file since the last load).
    pub fn reload(&self, probe: ExistsProbe<'_>) -> Result<(), StoreError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        let fresh = Self::decode(&raw, probe)?;
        *self.lock() = fresh;
        Ok(())
    }

    /// Persists the current state atomically and clears the dirty flag.
    pub fn save(&self) -> Result<(), StoreError> {
        let mut state = self.lock();
        let bytes = Self::encode(&state)?;
        write_atomic(&self.path, &bytes)?;
        state.dirty = false;
        Ok(())
    }

    /// File this cache persists to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entry record format of this cache.
    #[must_use]
    pub fn format(&self) -> EntryFormat {
        self.lock().format
    }

    /// Total catalogue entries.
    #[must_use]
    pub fn entry_count(&self) -> u32 {
        self.lock().entries.len() as u32
    }

    /// Entries currently available locally.
    #[must_use]
    pub fn available_count(&self) -> u32 {
        self.lock().available.len()
    }

    /// Clones the entry at catalogue index `idx`.
    #[must_use]
    pub fn entry(&self, idx: u32) -> Option<CatalogueEntry> {
        self.lock().entries.get(idx as usize).cloned()
    }

    /// Catalogue index at dense LAi position `pos`.
    #[must_use]
    pub fn available_at(&self, pos: u32) -> Option<u32> {
        self.lock().available.at(pos)
    }

    /// Uniform LAi slot selection from a raw PRNG draw.
    #[must_use]
    pub fn pick_available(&self, draw: u32) -> Option<u32> {
        self.lock().available.pick(draw)
    }

    /// Whether catalogue index `idx` is locally available.
    #[must_use]
    pub fn is_available(&self, idx: u32) -> bool {
        self.lock().available.contains(idx)
    }

    /// Marks `idx` available. Returns whether the set changed; a change
    /// marks the cache dirty.
    pub fn add_available(&self, idx: u32) -> bool {
        let mut state = self.lock();
        if idx as usize >= state.entries.len() {
            return false;
        }
        let grew = state.available.add(idx);
        state.dirty |= grew;
        grew
    }

    /// Removes `idx` from the available set (swap-pop). A change marks the
    /// cache dirty.
    pub fn remove_available(&self, idx: u32) -> bool {
        let mut state = self.lock();
        let shrank = state.available.remove(idx);
        state.dirty |= shrank;
        shrank
    }

    /// Finds the catalogue index carrying `post_id`.
    #[must_use]
    pub fn find_by_post_id(&self, post_id: i32) -> Option<u32> {
        let state = self.lock();
        state
            .entries
            .iter()
            .position(|e| e.post_id() == post_id)
            .map(|pos| pos as u32)
    }

    /// Finds the catalogue index whose storage key renders as `key`.
    #[must_use]
    pub fn find_by_storage_key(&self, key: &str) -> Option<u32> {
        let state = self.lock();
        state
            .entries
            .iter()
            .position(|e| e.storage_key().as_deref() == Some(key))
            .map(|pos| pos as u32)
    }

    /// Whether unsaved mutations are pending.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    /// Installs a freshly fetched catalogue, replacing entries and LAi, and
    /// marks the cache dirty.
    pub fn replace_contents(&self, entries: Vec<CatalogueEntry>, available: AvailableSet) {
        let mut state = self.lock();
        let (available, _) = AvailableSet::from_raw(
            available.as_slice().to_vec(),
            entries.len() as u32,
        );
        state.entries = entries;
        state.available = available;
        state.dirty = true;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn encode(state: &CacheState) -> Result<Vec<u8>, StoreError> {
        let mut payload = Vec::with_capacity(
            state.entries.len() * state.format.record_len()
                + state.available.as_slice().len() * 4,
        );
        for entry in &state.entries {
            entry.encode_into(&mut payload)?;
        }
        for idx in state.available.as_slice() {
            payload.extend_from_slice(&idx.to_le_bytes());
        }
        let crc = crc32fast::hash(&payload);

        let mut out = Vec::with_capacity(CACHE_HEADER_LEN + payload.len());
        out.extend_from_slice(&CACHE_MAGIC);
        out.extend_from_slice(&CACHE_VERSION.to_le_bytes());
        out.extend_from_slice(&state.format.tag().to_le_bytes());
        out.extend_from_slice(&(state.entries.len() as u32).to_le_bytes());
        out.extend_from_slice(&state.available.len().to_le_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out.resize(CACHE_HEADER_LEN, 0);
        out.extend_from_slice(&payload);
        Ok(out)
    }

    fn decode(raw: &[u8], probe: ExistsProbe<'_>) -> Result<CacheState, StoreError> {
        if raw.len() < CACHE_HEADER_LEN {
            return Err(StoreError::InvalidSize("file shorter than header"));
        }
        if raw[0..4] != CACHE_MAGIC {
            return Err(StoreError::InvalidMagic);
        }
        let version = u16::from_le_bytes([raw[4], raw[5]]);
        if version != CACHE_VERSION && version != CACHE_VERSION_LEGACY {
            return Err(StoreError::InvalidVersion {
                found: version,
                expected: CACHE_VERSION,
            });
        }
        let format = EntryFormat::from_tag(u16::from_le_bytes([raw[6], raw[7]]))?;
        let entry_count = u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]) as usize;
        let lai_count = if version == CACHE_VERSION_LEGACY {
            0
        } else {
            u32::from_le_bytes([raw[12], raw[13], raw[14], raw[15]]) as usize
        };
        let stored_crc = u32::from_le_bytes([raw[16], raw[17], raw[18], raw[19]]);

        let expected_len = CACHE_HEADER_LEN + entry_count * format.record_len() + lai_count * 4;
        if raw.len() != expected_len {
            return Err(StoreError::InvalidSize("length disagrees with header counts"));
        }
        let payload = &raw[CACHE_HEADER_LEN..];
        let computed = crc32fast::hash(payload);
        if computed != stored_crc {
            return Err(StoreError::InvalidCrc {
                stored: stored_crc,
                computed,
            });
        }

        let record_len = format.record_len();
        let mut entries = Vec::with_capacity(entry_count);
        for i in 0..entry_count {
            let record = &payload[i * record_len..(i + 1) * record_len];
            entries.push(CatalogueEntry::decode(format, record)?);
        }

        let (available, dirty) = if version == CACHE_VERSION_LEGACY {
            let mut synthesized = AvailableSet::new();
            for (idx, entry) in entries.iter().enumerate() {
                if probe(entry) {
                    synthesized.add(idx as u32);
                }
            }
            (synthesized, true)
        } else {
            let lai_bytes = &payload[entry_count * record_len..];
            let raw_indices: Vec<u32> = lai_bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect();
            AvailableSet::from_raw(raw_indices, entries.len() as u32)
        };

        Ok(CacheState {
            format,
            entries,
            available,
            dirty,
        })
    }
}
