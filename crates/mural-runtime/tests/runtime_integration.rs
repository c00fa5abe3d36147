// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end wiring: scheduler + dwell ticker + refresher over a temp
//! device layout.
#![allow(missing_docs, clippy::expect_used, clippy::unwrap_used)]

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use mural_core::{
    AutoSwap, DeviceStatus, ExposureMode, FixedStatus, PickMode, Playset, PlaysetChannel,
    Presenter, Scheduler, SchedulerConfig, SwapRequest,
};
use mural_runtime::{DwellTicker, Refresher};
use mural_store::{
    artwork_path, cache_file_name, AssetKind, AvailableSet, CatalogueEntry, ChannelCache,
    ChannelKind, EntryFormat, RemoteEntry, KIND_ARTWORK,
};

#[derive(Default)]
struct CountingPresenter {
    swaps: Mutex<Vec<SwapRequest>>,
}

impl CountingPresenter {
    fn count(&self) -> usize {
        self.swaps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Presenter for CountingPresenter {
    fn request_swap(&self, request: &SwapRequest) {
        self.swaps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
    }

    fn display_message(&self, _title: &str, _body: &str) {}
}

fn write_channel(dir: &std::path::Path, vault: &std::path::Path, channel_id: &str, posts: &[i32]) {
    let entries: Vec<CatalogueEntry> = posts
        .iter()
        .map(|&post_id| {
            let mut uuid = [0u8; 16];
            uuid[..4].copy_from_slice(&post_id.to_le_bytes());
            CatalogueEntry::Remote(RemoteEntry {
                storage_key_uuid: uuid,
                created_at: 0,
                modified_at: 0,
                post_id,
                asset: AssetKind::Webp,
                kind: KIND_ARTWORK,
                filter_flags: 0,
            })
        })
        .collect();
    let mut lai = AvailableSet::new();
    for idx in 0..posts.len() as u32 {
        lai.add(idx);
    }
    for entry in &entries {
        let file = artwork_path(vault, &entry.storage_key().unwrap(), entry.asset());
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(file, b"webp").unwrap();
    }
    let cache = ChannelCache::empty(dir.join(cache_file_name(channel_id)), EntryFormat::Remote);
    cache.replace_contents(entries, lai);
    cache.save().unwrap();
}

fn playset(name: &str) -> Playset {
    Playset {
        exposure: ExposureMode::Equal,
        pick: PickMode::Recency,
        channels: vec![PlaysetChannel {
            kind: ChannelKind::Named,
            name: name.to_owned(),
            identifier: String::new(),
            display_name: name.to_owned(),
            weight: 1,
        }],
    }
}

fn build_scheduler(dir: &std::path::Path, presenter: Arc<CountingPresenter>) -> Arc<Scheduler> {
    let mut config = SchedulerConfig::new(
        dir.join("channels"),
        dir.join("vault"),
        dir.join("animations"),
    );
    config.global_seed = 0xBEE;
    config.save_debounce = Duration::from_millis(10);
    Arc::new(Scheduler::new(
        config,
        presenter as Arc<dyn Presenter>,
        Arc::new(FixedStatus::playback_idle()) as Arc<dyn DeviceStatus>,
    ))
}

fn wait_until(budget: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + budget;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn dwell_ticker_auto_advances_playback() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let dir = tempfile::tempdir().unwrap();
    write_channel(
        &dir.path().join("channels"),
        &dir.path().join("vault"),
        "all",
        &[1, 2, 3],
    );

    let presenter = Arc::new(CountingPresenter::default());
    let scheduler = build_scheduler(dir.path(), Arc::clone(&presenter));

    let tick_target = Arc::clone(&scheduler);
    let ticker = DwellTicker::spawn(Duration::from_millis(40), move || {
        tick_target.tick();
    });
    scheduler.execute_playset(&playset("all")).unwrap();
    assert!(presenter.count() >= 1);

    assert!(wait_until(Duration::from_secs(10), || presenter.count() >= 4));
    drop(ticker);
}

#[test]
fn pause_stops_auto_advance_and_resume_continues() {
    let dir = tempfile::tempdir().unwrap();
    write_channel(
        &dir.path().join("channels"),
        &dir.path().join("vault"),
        "all",
        &[1, 2, 3],
    );

    let presenter = Arc::new(CountingPresenter::default());
    let scheduler = build_scheduler(dir.path(), Arc::clone(&presenter));

    let tick_target = Arc::clone(&scheduler);
    let ticker = DwellTicker::spawn(Duration::from_millis(30), move || {
        tick_target.tick();
    });
    scheduler.execute_playset(&playset("all")).unwrap();

    ticker.pause();
    let frozen = presenter.count();
    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(presenter.count(), frozen);

    ticker.resume();
    assert!(wait_until(Duration::from_secs(10), || presenter.count()
        > frozen));
    drop(ticker);
}

#[test]
fn refresher_picks_up_replaced_cache_files() {
    let dir = tempfile::tempdir().unwrap();
    let channels = dir.path().join("channels");
    let vault = dir.path().join("vault");
    write_channel(&channels, &vault, "all", &[1, 2]);

    let presenter = Arc::new(CountingPresenter::default());
    let scheduler = build_scheduler(dir.path(), Arc::clone(&presenter));
    scheduler.execute_playset(&playset("all")).unwrap();
    // Drain the initial refresh requests so only ours remains.
    scheduler.process_pending_refreshes();
    assert_eq!(scheduler.total_available(), 2);

    // The catalogue fetcher collaborator replaces the cache on disk with a
    // bigger one, then wakes the refresher.
    write_channel(&channels, &vault, "all", &[1, 2, 3, 4, 5]);

    let refresh_target = Arc::clone(&scheduler);
    let refresher = Refresher::spawn(None, move || {
        refresh_target.process_pending_refreshes();
    });

    scheduler.request_refresh(Some("all"));
    refresher.wake();
    assert!(wait_until(Duration::from_secs(10), || scheduler
        .total_available()
        == 5));
    drop(refresher);
}
