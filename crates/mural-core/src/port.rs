// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ports to the scheduler's external collaborators.
//!
//! The presenter renders artwork and surfaces notices; the device status
//! port reports the little system state the unavailable-message policy
//! needs; the auto-swap port controls the dwell ticker. All are called with
//! the scheduler's lock released, so implementations may call back into the
//! scheduler freely.

use std::path::PathBuf;

use mural_store::AssetKind;

use crate::artwork::ArtworkRef;

/// A request to put one artwork on the display.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapRequest {
    /// Absolute path of the file to decode and present.
    pub filepath: PathBuf,
    /// Asset container type.
    pub asset: AssetKind,
    /// Post id of the artwork, for view tracking.
    pub post_id: i32,
    /// Resolved dwell time in milliseconds.
    pub dwell_time_ms: u32,
    /// Synchronized-start wall-clock hook; always 0 from this core.
    pub start_time_ms: u64,
    /// Synchronized-start frame hook; always 0 from this core.
    pub start_frame: u32,
}

impl SwapRequest {
    /// Builds a request from an artwork reference and the resolved dwell.
    #[must_use]
    pub fn new(artwork: &ArtworkRef, dwell_time_ms: u32) -> Self {
        Self {
            filepath: artwork.filepath.clone(),
            asset: artwork.asset,
            post_id: artwork.post_id,
            dwell_time_ms,
            start_time_ms: 0,
            start_frame: 0,
        }
    }
}

/// Sink for swap requests and user-facing notices.
pub trait Presenter: Send + Sync {
    /// Asks the frame presenter to show an artwork.
    fn request_swap(&self, request: &SwapRequest);
    /// Shows a short textual notice instead of artwork.
    fn display_message(&self, title: &str, body: &str);
}

/// Read-only view of device state consulted by the message policy and the
/// dwell tick.
pub trait DeviceStatus: Send + Sync {
    /// Whether the device's top-level UI state is artwork playback.
    fn playback_active(&self) -> bool;
    /// Whether Wi-Fi is connected.
    fn wifi_up(&self) -> bool;
    /// Whether the background downloader is mid-transfer.
    fn downloader_busy(&self) -> bool;
}

/// Control surface of the dwell ticker, attached by the runtime.
pub trait AutoSwap: Send + Sync {
    /// Restarts the full dwell period (manual navigation happened).
    fn reset(&self);
    /// Pauses the ticker, preserving the remaining interval.
    fn pause(&self);
    /// Resumes a paused ticker with its preserved interval.
    fn resume(&self);
    /// Changes the dwell period; 0 disables auto-advance.
    fn set_period(&self, seconds: u32);
}

/// Fixed device status for tests and single-purpose installations.
#[derive(Debug, Clone, Copy)]
pub struct FixedStatus {
    /// Reported playback state.
    pub playback: bool,
    /// Reported Wi-Fi state.
    pub wifi: bool,
    /// Reported downloader state.
    pub busy: bool,
}

impl FixedStatus {
    /// A device that is always in playback with Wi-Fi up and an idle
    /// downloader.
    #[must_use]
    pub fn playback_idle() -> Self {
        Self {
            playback: true,
            wifi: true,
            busy: false,
        }
    }
}

impl DeviceStatus for FixedStatus {
    fn playback_active(&self) -> bool {
        self.playback
    }

    fn wifi_up(&self) -> bool {
        self.wifi
    }

    fn downloader_busy(&self) -> bool {
        self.busy
    }
}
