// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Background refresher: wakes on demand (or on a polling interval) and
//! drains the scheduler's pending channel refreshes.
//!
//! The remote-catalogue fetcher is an external collaborator; it replaces
//! channel cache files on disk and calls [`Refresher::wake`]. This thread
//! then routes into [`Scheduler::process_pending_refreshes`], which reloads
//! the marked channels. Stopping is deterministic: `stop` (or drop) wakes
//! the thread and joins it.
//!
//! [`Scheduler::process_pending_refreshes`]: mural_core::Scheduler::process_pending_refreshes

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::debug;

#[derive(Debug, Default)]
struct RefreshState {
    wake_requested: bool,
    stop: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<RefreshState>,
    wake: Condvar,
}

/// Handle to the background refresh thread.
#[derive(Debug)]
pub struct Refresher {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Refresher {
    /// Spawns the refresher. With `poll` set, the callback also runs every
    /// interval even without an explicit wake.
    #[must_use]
    pub fn spawn<F>(poll: Option<Duration>, callback: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::spawn(move || loop {
            {
                let mut state = worker_shared
                    .state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                loop {
                    if state.stop {
                        return;
                    }
                    if state.wake_requested {
                        state.wake_requested = false;
                        break;
                    }
                    match poll {
                        Some(interval) => {
                            let (next, timeout) = worker_shared
                                .wake
                                .wait_timeout(state, interval)
                                .unwrap_or_else(PoisonError::into_inner);
                            state = next;
                            if timeout.timed_out() {
                                if state.stop {
                                    return;
                                }
                                // Poll tick: run a pass without a wake.
                                break;
                            }
                        }
                        None => {
                            state = worker_shared
                                .wake
                                .wait(state)
                                .unwrap_or_else(PoisonError::into_inner);
                        }
                    }
                }
            }
            callback();
        });
        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Requests one refresh pass. Coalesces with an already pending wake.
    pub fn wake(&self) {
        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.wake_requested = true;
        drop(state);
        self.shared.wake.notify_all();
        debug!("refresher woken");
    }
}

impl Drop for Refresher {
    fn drop(&mut self) {
        {
            let mut state = self
                .shared
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            state.stop = true;
        }
        self.shared.wake.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
