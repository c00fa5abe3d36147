// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The playback scheduler: playset execution, navigation, hooks, and the
//! unavailable-message policy.
//!
//! All mutable state lives behind one mutex inside [`Scheduler`]. Public
//! entry points lock it, compute, release it, and only then call out to the
//! presenter, so presenter callbacks can re-enter the scheduler without
//! deadlocking.
//!
//! `next()` resolution order: forward history if the viewer navigated back,
//! else the NAE pool's injection coin flip, else smooth weighted round
//! robin over the channels and that channel's picker. Every successful
//! call leaves the artwork at the history head and records its post id for
//! immediate-repeat avoidance.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use mural_store::{
    cache_file_name, CatalogueEntry, ChannelCache, ExposureMode, LoadTracker, PickMode, Playset,
    SaveScheduler, DEFAULT_DEBOUNCE, MAX_CHANNELS,
};

use crate::artwork::{ArtworkKey, ArtworkRef};
use crate::channel::{channel_id, entry_format, ChannelState};
use crate::error::SchedError;
use crate::history::{HistoryRing, HISTORY_CAPACITY};
use crate::nae::NaePool;
use crate::picker::{self, PathContext};
use crate::port::{AutoSwap, DeviceStatus, Presenter, SwapRequest};
use crate::prng::{channel_seed, nae_seed, Pcg32};
use crate::stats::{ChannelStats, SchedulerStats};
use crate::swrr;

/// Construction-time configuration for a [`Scheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Directory holding channel cache and playset files.
    pub channel_dir: PathBuf,
    /// Content-addressed vault root for downloaded artwork.
    pub vault_dir: PathBuf,
    /// Directory holding SD-card animation files.
    pub animations_dir: PathBuf,
    /// Seed for every derived pick and injection stream.
    pub global_seed: u64,
    /// Auto-advance period in seconds; 0 disables the dwell timer.
    pub dwell_seconds: u32,
    /// History ring capacity.
    pub history_capacity: usize,
    /// Debounce window for cache saves.
    pub save_debounce: Duration,
}

impl SchedulerConfig {
    /// Configuration with default seed, dwell, history, and debounce.
    #[must_use]
    pub fn new(channel_dir: PathBuf, vault_dir: PathBuf, animations_dir: PathBuf) -> Self {
        Self {
            channel_dir,
            vault_dir,
            animations_dir,
            global_seed: 0,
            dwell_seconds: 30,
            history_capacity: HISTORY_CAPACITY,
            save_debounce: DEFAULT_DEBOUNCE,
        }
    }
}

#[derive(Clone)]
struct Inner {
    exposure: ExposureMode,
    pick: PickMode,
    channels: Vec<ChannelState>,
    history: HistoryRing,
    nae: NaePool,
    nae_enabled: bool,
    epoch: u32,
    last_played_id: Option<i32>,
    dwell_seconds: u32,
    presented: bool,
    playset_loaded: bool,
}

/// The playback scheduler. One instance per display.
///
/// Created at application init and dropped at shutdown; the drop path
/// flushes pending cache saves. Timer and refresher threads live in the
/// runtime crate and drive this object through [`Scheduler::tick`] and
/// [`Scheduler::process_pending_refreshes`].
pub struct Scheduler {
    inner: Mutex<Inner>,
    presenter: Arc<dyn Presenter>,
    status: Arc<dyn DeviceStatus>,
    auto_swap: Mutex<Option<Arc<dyn AutoSwap>>>,
    saver: SaveScheduler,
    paths: PathContext,
    channel_dir: PathBuf,
    global_seed: u64,
}

impl Scheduler {
    /// Builds a scheduler wired to the given presenter and device status.
    #[must_use]
    pub fn new(
        config: SchedulerConfig,
        presenter: Arc<dyn Presenter>,
        status: Arc<dyn DeviceStatus>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                exposure: ExposureMode::Equal,
                pick: PickMode::Recency,
                channels: Vec::new(),
                history: HistoryRing::new(config.history_capacity),
                nae: NaePool::new(Pcg32::from_seed(nae_seed(config.global_seed, 0))),
                nae_enabled: true,
                epoch: 0,
                last_played_id: None,
                dwell_seconds: config.dwell_seconds,
                presented: false,
                playset_loaded: false,
            }),
            presenter,
            status,
            auto_swap: Mutex::new(None),
            saver: SaveScheduler::new(config.save_debounce),
            paths: PathContext {
                vault: config.vault_dir,
                animations: config.animations_dir,
            },
            channel_dir: config.channel_dir,
            global_seed: config.global_seed,
        }
    }

    /// Attaches the dwell-ticker control surface and syncs its period.
    pub fn attach_auto_swap(&self, ticker: Arc<dyn AutoSwap>) {
        ticker.set_period(self.lock().dwell_seconds);
        *self.auto_lock() = Some(ticker);
    }

    /// Executes a playset: replaces the channel set, bumps the epoch,
    /// reseeds every stream, clears the NAE pool, and starts playback if
    /// anything is playable. History survives.
    pub fn execute_playset(&self, cmd: &Playset) -> Result<(), SchedError> {
        if cmd.channels.is_empty() {
            return Err(SchedError::InvalidArgument("playset names no channels"));
        }
        if cmd.channels.len() > MAX_CHANNELS {
            return Err(SchedError::InvalidArgument("playset names too many channels"));
        }

        let total = {
            let mut inner = self.lock();
            inner.epoch += 1;
            let epoch = inner.epoch;

            let probe = self.probe();
            let mut channels = Vec::with_capacity(cmd.channels.len());
            for (index, spec) in cmd.channels.iter().enumerate() {
                let id = channel_id(spec);
                let format = entry_format(spec.kind);
                let path = self.channel_dir.join(cache_file_name(&id));
                let cache = match ChannelCache::load(path.clone(), format, &probe) {
                    Ok(cache) => Arc::new(cache),
                    Err(err) => {
                        warn!(channel = %id, error = %err, "cache unusable, starting empty");
                        Arc::new(ChannelCache::empty(path, format))
                    }
                };
                if cache.is_dirty() {
                    self.saver.schedule(&cache);
                }
                channels.push(ChannelState {
                    id,
                    index: index as u8,
                    kind: spec.kind,
                    spec_weight: spec.weight,
                    weight: 0,
                    credit: 0,
                    cursor: 0,
                    rng: Pcg32::from_seed(channel_seed(self.global_seed, index as u8, epoch)),
                    cache,
                    refresh_pending: true,
                });
            }

            inner.channels = channels;
            inner.exposure = cmd.exposure;
            inner.pick = cmd.pick;
            swrr::compute_weights(&mut inner.channels, cmd.exposure);
            inner.nae = NaePool::new(Pcg32::from_seed(nae_seed(self.global_seed, epoch)));
            inner.presented = false;
            inner.playset_loaded = true;
            info!(
                epoch,
                channels = inner.channels.len(),
                "playset executed"
            );
            total_available(&inner)
        };

        if total > 0 {
            let _ = self.next();
        } else {
            self.surface_unavailable();
        }
        Ok(())
    }

    /// Loads a playset file from the channel directory and executes it.
    pub fn execute_playset_file(&self, name: &str) -> Result<(), SchedError> {
        let path = self.channel_dir.join(format!("{name}.playset"));
        let playset = Playset::load(&path)?;
        self.execute_playset(&playset)
    }

    /// Advances playback and asks the presenter to show the result.
    pub fn next(&self) -> Result<ArtworkRef, SchedError> {
        let advanced = {
            let mut inner = self.lock();
            if !inner.playset_loaded {
                return Err(SchedError::InvalidState);
            }
            self.advance(&mut inner)
                .map(|art| (art, resolve_dwell(&inner)))
        };
        match advanced {
            Ok((art, global_dwell_ms)) => {
                let dwell = if art.dwell_time_ms > 0 {
                    art.dwell_time_ms
                } else {
                    global_dwell_ms
                };
                self.presenter.request_swap(&SwapRequest::new(&art, dwell));
                self.reset_ticker();
                Ok(art)
            }
            Err(err) => {
                self.surface_unavailable();
                Err(err)
            }
        }
    }

    /// Steps back through history and re-presents that artwork. Pickers,
    /// credits, and the forward stream are untouched.
    pub fn prev(&self) -> Result<ArtworkRef, SchedError> {
        let stepped = {
            let mut inner = self.lock();
            if !inner.playset_loaded {
                return Err(SchedError::InvalidState);
            }
            if !inner.history.can_go_back() {
                return Err(SchedError::NotFound);
            }
            let art = inner.history.go_back().ok_or(SchedError::NotFound)?;
            (art, resolve_dwell(&inner))
        };
        let (art, global_dwell_ms) = stepped;
        let dwell = if art.dwell_time_ms > 0 {
            art.dwell_time_ms
        } else {
            global_dwell_ms
        };
        self.presenter.request_swap(&SwapRequest::new(&art, dwell));
        self.reset_ticker();
        Ok(art)
    }

    /// Computes what `next()` would return without changing any state and
    /// without touching the presenter.
    pub fn peek_next(&self) -> Result<ArtworkRef, SchedError> {
        let inner = self.lock();
        if !inner.playset_loaded {
            return Err(SchedError::InvalidState);
        }
        let mut shadow = (*inner).clone();
        self.advance(&mut shadow)
    }

    /// The artwork under the history cursor.
    pub fn current(&self) -> Result<ArtworkRef, SchedError> {
        self.lock().history.current().ok_or(SchedError::NotFound)
    }

    /// Clears the NAE pool, resets cursors and credits, reseeds every pick
    /// stream, and bumps the epoch. History survives.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.epoch += 1;
        let epoch = inner.epoch;
        for ch in &mut inner.channels {
            ch.cursor = 0;
            ch.rng = Pcg32::from_seed(channel_seed(self.global_seed, ch.index, epoch));
        }
        swrr::reset_credits(&mut inner.channels);
        inner.nae = NaePool::new(Pcg32::from_seed(nae_seed(self.global_seed, epoch)));
        debug!(epoch, "scheduler reset");
    }

    /// Dwell-timer callback: auto-advances when the device is in playback
    /// and more than one artwork is available.
    pub fn tick(&self) {
        if !self.status.playback_active() {
            return;
        }
        let total = {
            let inner = self.lock();
            if !inner.playset_loaded {
                return;
            }
            total_available(&inner)
        };
        if total > 1 {
            let _ = self.next();
        }
    }

    /// Switches the per-channel pick policy.
    pub fn set_pick_mode(&self, mode: PickMode) {
        self.lock().pick = mode;
    }

    /// Current pick policy.
    #[must_use]
    pub fn pick_mode(&self) -> PickMode {
        self.lock().pick
    }

    /// Sets the global dwell period and reprograms the ticker.
    pub fn set_dwell_time(&self, seconds: u32) {
        self.lock().dwell_seconds = seconds;
        if let Some(ticker) = self.auto_lock().as_ref() {
            ticker.set_period(seconds);
        }
    }

    /// Current global dwell period in seconds.
    #[must_use]
    pub fn dwell_time(&self) -> u32 {
        self.lock().dwell_seconds
    }

    /// Restarts the dwell ticker's full period.
    pub fn reset_timer(&self) {
        self.reset_ticker();
    }

    /// Pauses auto-advance, preserving the remaining interval.
    pub fn pause_auto_swap(&self) {
        if let Some(ticker) = self.auto_lock().as_ref() {
            ticker.pause();
        }
    }

    /// Resumes auto-advance with the preserved interval.
    pub fn resume_auto_swap(&self) {
        if let Some(ticker) = self.auto_lock().as_ref() {
            ticker.resume();
        }
    }

    /// Enables or disables NAE injection.
    pub fn set_nae_enabled(&self, enabled: bool) {
        self.lock().nae_enabled = enabled;
    }

    /// Whether NAE injection is enabled.
    #[must_use]
    pub fn is_nae_enabled(&self) -> bool {
        self.lock().nae_enabled
    }

    /// Submits a new-artwork event for opportunistic exposure.
    pub fn nae_insert(&self, artwork: ArtworkRef) {
        self.lock().nae.insert(artwork);
    }

    /// Aggregate statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let inner = self.lock();
        SchedulerStats {
            epoch: inner.epoch,
            channel_count: inner.channels.len(),
            total_entries: inner
                .channels
                .iter()
                .map(|c| u64::from(c.cache.entry_count()))
                .sum(),
            total_available: total_available(&inner),
            history_len: inner.history.len(),
            nae_len: inner.nae.len(),
            exposure: inner.exposure,
            pick: inner.pick,
            last_played_id: inner.last_played_id,
        }
    }

    /// Ids of the channels in the executed playset, in playset order.
    #[must_use]
    pub fn active_channel_ids(&self) -> Vec<String> {
        self.lock().channels.iter().map(|c| c.id.clone()).collect()
    }

    /// Statistics for one channel.
    pub fn channel_stats(&self, channel_id: &str) -> Result<ChannelStats, SchedError> {
        let inner = self.lock();
        let ch = inner
            .channels
            .iter()
            .find(|c| c.id == channel_id)
            .ok_or(SchedError::NotFound)?;
        Ok(ChannelStats {
            id: ch.id.clone(),
            kind: ch.kind,
            total_entries: ch.cache.entry_count(),
            cached: ch.effective_count(),
            weight: ch.weight,
        })
    }

    /// Locally available artworks across every channel.
    #[must_use]
    pub fn total_available(&self) -> u64 {
        total_available(&self.lock())
    }

    /// Flags channels for a background reload: one channel by id, or all
    /// of them. Called when the catalogue fetcher replaces cache files.
    pub fn request_refresh(&self, channel_id: Option<&str>) {
        let mut inner = self.lock();
        for ch in &mut inner.channels {
            if channel_id.is_none_or(|id| id == ch.id) {
                ch.refresh_pending = true;
            }
        }
    }

    /// Reloads every channel whose refresh flag is set. Returns how many
    /// were processed. Driven by the background refresher thread.
    pub fn process_pending_refreshes(&self) -> usize {
        let mut inner = self.lock();
        let probe = self.probe();
        let mut processed = 0;
        for ch in &mut inner.channels {
            if !ch.refresh_pending {
                continue;
            }
            ch.refresh_pending = false;
            processed += 1;
            if let Err(err) = ch.cache.reload(&probe) {
                warn!(channel = %ch.id, error = %err, "refresh reload failed");
            }
            if ch.cache.is_dirty() {
                self.saver.schedule(&ch.cache);
            }
        }
        if processed > 0 {
            let exposure = inner.exposure;
            swrr::compute_weights(&mut inner.channels, exposure);
        }
        processed
    }

    /// Download hook: marks the downloaded entry available and starts
    /// playback on a zero-to-one availability transition.
    pub fn on_download_complete(
        &self,
        channel_id: &str,
        key: &ArtworkKey,
    ) -> Result<(), SchedError> {
        let start_playback = {
            let mut inner = self.lock();
            let prev_total = total_available(&inner);
            let probe = self.probe();
            let ch = inner
                .channels
                .iter_mut()
                .find(|c| c.id == channel_id)
                .ok_or(SchedError::NotFound)?;

            let idx = match find_entry(&ch.cache, key) {
                Some(idx) => idx,
                None => {
                    // The refresher may have replaced the file since our
                    // last load; pick up the new catalogue and retry.
                    if let Err(err) = ch.cache.reload(&probe) {
                        warn!(channel = %ch.id, error = %err, "reload for download failed");
                    }
                    find_entry(&ch.cache, key).ok_or(SchedError::NotFound)?
                }
            };
            if ch.cache.add_available(idx) {
                self.saver.schedule(&ch.cache);
            }
            let exposure = inner.exposure;
            swrr::compute_weights(&mut inner.channels, exposure);
            prev_total == 0 && total_available(&inner) > 0
        };

        if start_playback {
            let _ = self.next();
        }
        Ok(())
    }

    /// Failure hook: records the strike, unlinks the file, removes the
    /// entry from availability, and either advances or surfaces a notice.
    pub fn on_load_failed(
        &self,
        storage_key: &str,
        channel_id: Option<&str>,
        reason: Option<&str>,
    ) {
        match LoadTracker::record_failure(
            &self.paths.vault,
            storage_key,
            reason.unwrap_or("load_failed"),
            now_unix(),
        ) {
            Ok(tracker) if tracker.terminal => {
                warn!(storage_key, attempts = tracker.attempts, "artwork is terminal");
            }
            Ok(_) => {}
            Err(err) => warn!(storage_key, error = %err, "load tracker update failed"),
        }

        let advance = {
            let mut inner = self.lock();
            for ch in &mut inner.channels {
                if channel_id.is_some_and(|id| id != ch.id) {
                    continue;
                }
                if let Some(idx) = ch.cache.find_by_storage_key(storage_key) {
                    if let Some(entry) = ch.cache.entry(idx) {
                        let path = picker::entry_path(&entry, &self.paths);
                        let _ = std::fs::remove_file(path);
                    }
                    if ch.cache.remove_available(idx) {
                        self.saver.schedule(&ch.cache);
                    }
                }
            }
            let exposure = inner.exposure;
            swrr::compute_weights(&mut inner.channels, exposure);
            total_available(&inner) > 0
        };

        if advance {
            let _ = self.next();
        } else {
            self.surface_unavailable();
        }
    }

    /// Flushes pending cache saves; useful before shutdown.
    pub fn flush_saves(&self) {
        self.saver.flush();
    }

    fn advance(&self, inner: &mut Inner) -> Result<ArtworkRef, SchedError> {
        // Every branch funnels through the same existence check: a missing
        // file is a hard failure no matter which source produced it.

        // 1. Forward history, if the viewer navigated back.
        if inner.history.can_go_forward() {
            let art = inner.history.go_forward().ok_or(SchedError::NotFound)?;
            require_on_disk(&art)?;
            inner.last_played_id = Some(art.post_id);
            return Ok(art);
        }

        // 2. NAE injection coin flip. The event carries a caller-supplied
        // filepath, so it gets the same scrutiny as a picker result.
        if inner.nae_enabled {
            if let Some(art) = inner.nae.try_select() {
                require_on_disk(&art)?;
                inner.history.push(art.clone());
                inner.last_played_id = Some(art.post_id);
                inner.presented = true;
                return Ok(art);
            }
        }

        // 3. SWRR over the channels, trying each active channel at most
        // once before giving up.
        let active = inner.channels.iter().filter(|c| c.is_active()).count();
        if active == 0 {
            return Err(SchedError::NotFound);
        }
        let pick = inner.pick;
        let last = inner.last_played_id;
        for _ in 0..active {
            let Some(winner) = swrr::select(&mut inner.channels) else {
                break;
            };
            let Some(art) =
                picker::pick_next(&mut inner.channels[winner], pick, last, &self.paths)
            else {
                debug!(channel = %inner.channels[winner].id, "channel exhausted");
                continue;
            };
            require_on_disk(&art)?;
            inner.history.push(art.clone());
            inner.last_played_id = Some(art.post_id);
            inner.presented = true;
            return Ok(art);
        }
        Err(SchedError::NotFound)
    }

    fn surface_unavailable(&self) {
        if !self.status.playback_active() {
            return;
        }
        let (presented, refresh_pending) = {
            let inner = self.lock();
            (
                inner.presented,
                inner.channels.iter().any(|c| c.refresh_pending),
            )
        };
        if presented {
            return;
        }
        let body = if self.status.wifi_up() && refresh_pending {
            "Loading…"
        } else if self.status.wifi_up() && self.status.downloader_busy() {
            "Downloading…"
        } else {
            "No playable files available"
        };
        self.presenter.display_message("Playback", body);
    }

    fn reset_ticker(&self) {
        if let Some(ticker) = self.auto_lock().as_ref() {
            ticker.reset();
        }
    }

    fn probe(&self) -> impl Fn(&CatalogueEntry) -> bool + '_ {
        move |entry| picker::entry_path(entry, &self.paths).exists()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn auto_lock(&self) -> MutexGuard<'_, Option<Arc<dyn AutoSwap>>> {
        self.auto_swap.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn total_available(inner: &Inner) -> u64 {
    inner
        .channels
        .iter()
        .map(|c| u64::from(c.effective_count()))
        .sum()
}

fn resolve_dwell(inner: &Inner) -> u32 {
    inner.dwell_seconds.saturating_mul(1000)
}

fn require_on_disk(art: &ArtworkRef) -> Result<(), SchedError> {
    if art.filepath.exists() {
        return Ok(());
    }
    warn!(path = %art.filepath.display(), "selected artwork missing on disk");
    Err(SchedError::NotFound)
}

fn find_entry(cache: &ChannelCache, key: &ArtworkKey) -> Option<u32> {
    match key {
        ArtworkKey::PostId(id) => cache.find_by_post_id(*id),
        ArtworkKey::StorageKey(k) => cache.find_by_storage_key(k),
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i64)
}
