// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Debounced cache persistence.
//!
//! Every LAi mutation marks its cache dirty and schedules a save here. The
//! worker coalesces schedules that land within the debounce window, so a
//! burst of downloads produces one write, and saves run on this thread —
//! never under the scheduler's lock.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::cache::ChannelCache;

/// Default coalescing window between the first schedule and the write.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);

enum Msg {
    Schedule(Arc<ChannelCache>),
    Flush(mpsc::SyncSender<()>),
    Stop,
}

/// Handle to the background save worker. Dropping it flushes pending saves
/// and joins the thread.
#[derive(Debug)]
pub struct SaveScheduler {
    tx: Sender<Msg>,
    worker: Option<JoinHandle<()>>,
}

impl SaveScheduler {
    /// Spawns the worker with the given debounce window.
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        let (tx, rx) = mpsc::channel::<Msg>();
        let worker = std::thread::spawn(move || {
            let mut pending: Vec<(Instant, Arc<ChannelCache>)> = Vec::new();
            loop {
                let msg = match pending.iter().map(|(due, _)| *due).min() {
                    Some(due) => {
                        let now = Instant::now();
                        if due <= now {
                            flush_due(&mut pending, now);
                            continue;
                        }
                        match rx.recv_timeout(due - now) {
                            Ok(msg) => msg,
                            Err(RecvTimeoutError::Timeout) => continue,
                            Err(RecvTimeoutError::Disconnected) => break,
                        }
                    }
                    None => match rx.recv() {
                        Ok(msg) => msg,
                        Err(_) => break,
                    },
                };
                match msg {
                    Msg::Schedule(cache) => {
                        // Coalesce on the earliest deadline so a steady
                        // mutation stream still hits disk within one window.
                        if !pending.iter().any(|(_, c)| Arc::ptr_eq(c, &cache)) {
                            pending.push((Instant::now() + debounce, cache));
                        }
                    }
                    Msg::Flush(ack) => {
                        save_all(&mut pending);
                        let _ = ack.send(());
                    }
                    Msg::Stop => break,
                }
            }
            save_all(&mut pending);
        });
        Self {
            tx,
            worker: Some(worker),
        }
    }

    /// Queues `cache` for a save once the debounce window elapses.
    pub fn schedule(&self, cache: &Arc<ChannelCache>) {
        let _ = self.tx.send(Msg::Schedule(Arc::clone(cache)));
    }

    /// Forces every pending save through and waits for completion.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::sync_channel(1);
        if self.tx.send(Msg::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}

impl Drop for SaveScheduler {
    fn drop(&mut self) {
        let _ = self.tx.send(Msg::Stop);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn flush_due(pending: &mut Vec<(Instant, Arc<ChannelCache>)>, now: Instant) {
    let mut remaining = Vec::with_capacity(pending.len());
    for (due, cache) in pending.drain(..) {
        if due <= now {
            save_one(&cache);
        } else {
            remaining.push((due, cache));
        }
    }
    *pending = remaining;
}

fn save_all(pending: &mut Vec<(Instant, Arc<ChannelCache>)>) {
    for (_, cache) in pending.drain(..) {
        save_one(&cache);
    }
}

fn save_one(cache: &Arc<ChannelCache>) {
    if !cache.is_dirty() {
        return;
    }
    match cache.save() {
        Ok(()) => debug!(path = %cache.path().display(), "cache saved"),
        Err(err) => warn!(path = %cache.path().display(), error = %err, "cache save failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{AssetKind, CatalogueEntry, EntryFormat, RemoteEntry, KIND_ARTWORK};
    use crate::lai::AvailableSet;

    fn dirty_cache(path: std::path::PathBuf) -> Arc<ChannelCache> {
        let cache = Arc::new(ChannelCache::empty(path, EntryFormat::Remote));
        cache.replace_contents(
            vec![CatalogueEntry::Remote(RemoteEntry {
                storage_key_uuid: [9u8; 16],
                created_at: 0,
                modified_at: 0,
                post_id: 1,
                asset: AssetKind::Webp,
                kind: KIND_ARTWORK,
                filter_flags: 0,
            })],
            AvailableSet::new(),
        );
        cache
    }

    #[test]
    fn flush_writes_scheduled_caches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ch.bin");
        let cache = dirty_cache(path.clone());
        let saver = SaveScheduler::new(Duration::from_secs(60));
        saver.schedule(&cache);
        assert!(!path.exists());
        saver.flush();
        assert!(path.exists());
        assert!(!cache.is_dirty());
    }

    #[test]
    fn debounce_window_elapses_without_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ch.bin");
        let cache = dirty_cache(path.clone());
        let saver = SaveScheduler::new(Duration::from_millis(20));
        saver.schedule(&cache);
        saver.schedule(&cache);
        let deadline = Instant::now() + Duration::from_secs(5);
        while !path.exists() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(path.exists());
        drop(saver);
    }

    #[test]
    fn drop_flushes_pending_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ch.bin");
        let cache = dirty_cache(path.clone());
        let saver = SaveScheduler::new(Duration::from_secs(60));
        saver.schedule(&cache);
        drop(saver);
        assert!(path.exists());
    }
}
