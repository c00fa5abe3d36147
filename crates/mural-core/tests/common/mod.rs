// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared fixtures for scheduler integration tests: a recording presenter,
//! a temp-dir device layout, and channel cache builders.
#![allow(dead_code)]

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use mural_core::{
    DeviceStatus, ExposureMode, PickMode, Playset, PlaysetChannel, Presenter, Scheduler,
    SchedulerConfig, SwapRequest,
};
use mural_store::{
    artwork_path, cache_file_name, AssetKind, AvailableSet, CatalogueEntry, ChannelCache,
    ChannelKind, EntryFormat, RemoteEntry, KIND_ARTWORK,
};

/// Presenter that records every swap request and message.
#[derive(Default)]
pub struct RecordingPresenter {
    swaps: Mutex<Vec<SwapRequest>>,
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingPresenter {
    pub fn swaps(&self) -> Vec<SwapRequest> {
        self.swaps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn presented_posts(&self) -> Vec<i32> {
        self.swaps().iter().map(|s| s.post_id).collect()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Presenter for RecordingPresenter {
    fn request_swap(&self, request: &SwapRequest) {
        self.swaps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
    }

    fn display_message(&self, title: &str, body: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((title.to_owned(), body.to_owned()));
    }
}

/// Mutable device status shared with the scheduler.
#[derive(Debug, Default)]
pub struct SharedStatus {
    pub playback: Mutex<bool>,
    pub wifi: Mutex<bool>,
    pub busy: Mutex<bool>,
}

impl SharedStatus {
    pub fn playback_idle() -> Self {
        Self {
            playback: Mutex::new(true),
            wifi: Mutex::new(true),
            busy: Mutex::new(false),
        }
    }

    pub fn set_busy(&self, busy: bool) {
        *self.busy.lock().unwrap_or_else(PoisonError::into_inner) = busy;
    }
}

impl DeviceStatus for SharedStatus {
    fn playback_active(&self) -> bool {
        *self.playback.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wifi_up(&self) -> bool {
        *self.wifi.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn downloader_busy(&self) -> bool {
        *self.busy.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A scheduler wired to temp directories and recording collaborators.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub presenter: Arc<RecordingPresenter>,
    pub status: Arc<SharedStatus>,
    pub scheduler: Scheduler,
}

impl Fixture {
    pub fn new(seed: u64) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let presenter = Arc::new(RecordingPresenter::default());
        let status = Arc::new(SharedStatus::playback_idle());
        let mut config = SchedulerConfig::new(
            dir.path().join("channels"),
            dir.path().join("vault"),
            dir.path().join("animations"),
        );
        config.global_seed = seed;
        config.save_debounce = Duration::from_millis(10);
        let scheduler = Scheduler::new(
            config,
            Arc::clone(&presenter) as Arc<dyn Presenter>,
            Arc::clone(&status) as Arc<dyn DeviceStatus>,
        );
        Self {
            dir,
            presenter,
            status,
            scheduler,
        }
    }

    pub fn vault(&self) -> std::path::PathBuf {
        self.dir.path().join("vault")
    }

    /// Writes a remote channel cache with the given post ids, marks the
    /// listed catalogue indices available, and materializes a vault file
    /// for every entry so existence checks pass.
    pub fn install_remote_channel(&self, channel_id: &str, posts: &[i32], available: &[u32]) {
        let path = self
            .dir
            .path()
            .join("channels")
            .join(cache_file_name(channel_id));
        let entries: Vec<CatalogueEntry> = posts.iter().map(|&p| remote_entry(p)).collect();
        let mut lai = AvailableSet::new();
        for &idx in available {
            lai.add(idx);
        }
        let cache = ChannelCache::empty(path, EntryFormat::Remote);
        cache.replace_contents(entries.clone(), lai);
        cache.save().expect("cache save");

        for entry in &entries {
            let key = entry.storage_key().expect("remote key");
            let file = artwork_path(&self.vault(), &key, entry.asset());
            if let Some(parent) = file.parent() {
                std::fs::create_dir_all(parent).expect("vault dirs");
            }
            std::fs::write(file, b"webp").expect("vault file");
        }
    }

    pub fn presented_posts(&self) -> Vec<i32> {
        self.presenter.presented_posts()
    }
}

/// Deterministic storage key material for a post id.
pub fn uuid_for_post(post_id: i32) -> [u8; 16] {
    let mut uuid = [0u8; 16];
    uuid[..4].copy_from_slice(&post_id.to_le_bytes());
    uuid[4] = 0xA5;
    uuid
}

pub fn remote_entry(post_id: i32) -> CatalogueEntry {
    CatalogueEntry::Remote(RemoteEntry {
        storage_key_uuid: uuid_for_post(post_id),
        created_at: 1_700_000_000 + i64::from(post_id),
        modified_at: 0,
        post_id,
        asset: AssetKind::Webp,
        kind: KIND_ARTWORK,
        filter_flags: 0,
    })
}

pub fn storage_key_for_post(post_id: i32) -> String {
    mural_store::format_uuid(&uuid_for_post(post_id))
}

/// Builds a playset of NAMED channels.
pub fn named_playset(
    channels: &[(&str, u32)],
    exposure: ExposureMode,
    pick: PickMode,
) -> Playset {
    Playset {
        exposure,
        pick,
        channels: channels
            .iter()
            .map(|&(name, weight)| PlaysetChannel {
                kind: ChannelKind::Named,
                name: name.to_owned(),
                identifier: String::new(),
                display_name: name.to_owned(),
                weight,
            })
            .collect(),
    }
}

/// Convenience: a made-up artwork reference whose file exists, for NAE
/// insertion tests.
pub fn nae_artwork(fixture: &Fixture, artwork_id: i32) -> mural_core::ArtworkRef {
    let key = storage_key_for_post(artwork_id);
    let file = artwork_path(&fixture.vault(), &key, AssetKind::Webp);
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent).expect("vault dirs");
    }
    std::fs::write(&file, b"webp").expect("vault file");
    mural_core::ArtworkRef {
        artwork_id,
        post_id: artwork_id,
        filepath: file,
        storage_key: key,
        created_at: 0,
        dwell_time_ms: 0,
        asset: AssetKind::Webp,
        channel_index: 0,
        channel: ChannelKind::Named,
    }
}

/// Path of the vault blob backing `post_id`.
pub fn vault_file_for_post(fixture: &Fixture, post_id: i32) -> std::path::PathBuf {
    artwork_path(&fixture.vault(), &storage_key_for_post(post_id), AssetKind::Webp)
}
