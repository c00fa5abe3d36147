// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The dwell ticker: a deadline thread that drives auto-advance.
//!
//! The ticker fires a callback every dwell period. The owning application
//! routes the callback into [`Scheduler::tick`], which decides whether an
//! advance is actually due. Pausing preserves the remaining interval, so a
//! viewer who pauses with 7 seconds left resumes with 7 seconds left, and
//! manual navigation resets the full period through the [`AutoSwap`] port.
//!
//! [`Scheduler::tick`]: mural_core::Scheduler::tick
//! [`AutoSwap`]: mural_core::AutoSwap

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use mural_core::AutoSwap;
use tracing::debug;

#[derive(Debug)]
struct TickerState {
    period: Duration,
    deadline: Option<Instant>,
    paused_remaining: Option<Duration>,
    stop: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<TickerState>,
    wake: Condvar,
}

/// Periodic dwell timer with pause/resume that keeps accumulated time.
#[derive(Debug)]
pub struct DwellTicker {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl DwellTicker {
    /// Spawns the ticker thread. A zero `period` starts disabled; the
    /// callback fires once per elapsed period otherwise.
    #[must_use]
    pub fn spawn<F>(period: Duration, callback: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(TickerState {
                period,
                deadline: arm(period),
                paused_remaining: None,
                stop: false,
            }),
            wake: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::spawn(move || loop {
            let mut state = lock(&worker_shared.state);
            if state.stop {
                break;
            }
            let Some(deadline) = state.deadline else {
                // Disabled or paused: sleep until someone re-arms us.
                let _unused = lock_wait(&worker_shared.wake, state);
                continue;
            };
            let now = Instant::now();
            if now < deadline {
                let (next, _) = worker_shared
                    .wake
                    .wait_timeout(state, deadline - now)
                    .unwrap_or_else(PoisonError::into_inner);
                drop(next);
                continue;
            }
            state.deadline = Some(now + state.period);
            drop(state);
            callback();
        });
        Self {
            shared,
            worker: Some(worker),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut TickerState) -> R) -> R {
        let mut state = lock(&self.shared.state);
        let result = f(&mut state);
        drop(state);
        self.shared.wake.notify_all();
        result
    }
}

impl AutoSwap for DwellTicker {
    fn reset(&self) {
        self.with_state(|state| {
            state.paused_remaining = None;
            state.deadline = arm(state.period);
        });
    }

    fn pause(&self) {
        self.with_state(|state| {
            if let Some(deadline) = state.deadline.take() {
                state.paused_remaining =
                    Some(deadline.saturating_duration_since(Instant::now()));
            }
        });
        debug!("dwell ticker paused");
    }

    fn resume(&self) {
        self.with_state(|state| {
            if state.period.is_zero() {
                return;
            }
            let remaining = state.paused_remaining.take().unwrap_or(state.period);
            state.deadline = Some(Instant::now() + remaining);
        });
        debug!("dwell ticker resumed");
    }

    fn set_period(&self, seconds: u32) {
        self.with_state(|state| {
            state.period = Duration::from_secs(u64::from(seconds));
            state.paused_remaining = None;
            state.deadline = arm(state.period);
        });
    }
}

impl Drop for DwellTicker {
    fn drop(&mut self) {
        self.with_state(|state| state.stop = true);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn arm(period: Duration) -> Option<Instant> {
    (!period.is_zero()).then(|| Instant::now() + period)
}

fn lock<'a>(mutex: &'a Mutex<TickerState>) -> MutexGuard<'a, TickerState> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn lock_wait<'a>(
    wake: &Condvar,
    guard: MutexGuard<'a, TickerState>,
) -> MutexGuard<'a, TickerState> {
    wake.wait(guard).unwrap_or_else(PoisonError::into_inner)
}
