// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persistent player settings.
//!
//! The device carries exactly one configuration value: the player settings
//! that seed the scheduler at boot. They live in a single JSON file under
//! the config directory; a missing file means factory defaults, unknown
//! fields are ignored, and absent fields fall back field-by-field so a
//! settings file written by an older build keeps working.

use std::fs;
use std::path::{Path, PathBuf};

use mural_core::SchedulerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Error type for settings load/save.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error while reading or writing the settings file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The settings file exists but is not valid JSON for this shape.
    #[error("malformed settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistent player settings, loaded at init and mutated via setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Auto-advance period in seconds; 0 disables the dwell timer.
    pub dwell_seconds: u32,
    /// Seed for every derived playback stream.
    pub global_seed: u64,
    /// Whether new-artwork injection is enabled.
    pub nae_enabled: bool,
    /// Directory holding channel cache and playset files.
    pub channel_dir: PathBuf,
    /// Content-addressed vault root.
    pub vault_dir: PathBuf,
    /// SD-card animations directory.
    pub animations_dir: PathBuf,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            dwell_seconds: 30,
            global_seed: 0,
            nae_enabled: true,
            channel_dir: PathBuf::from("/data/channels"),
            vault_dir: PathBuf::from("/data/vault"),
            animations_dir: PathBuf::from("/sdcard/animations"),
        }
    }
}

impl PlayerConfig {
    /// Settings filename inside the config directory.
    pub const FILE_NAME: &'static str = "player.json";

    /// Reads the settings from `config_dir`. A missing file yields the
    /// defaults; a present-but-malformed file is an error, so a corrupt
    /// settings write never silently resets the device.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(Self::FILE_NAME);
        match fs::read(&path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file, using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Persists the settings to `config_dir`, creating it as needed.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        fs::create_dir_all(config_dir)?;
        let bytes = serde_json::to_vec_pretty(self)?;
        fs::write(config_dir.join(Self::FILE_NAME), bytes)?;
        Ok(())
    }

    /// Maps these settings into the scheduler's construction config.
    ///
    /// `nae_enabled` is not part of the construction config; apply it via
    /// `Scheduler::set_nae_enabled` after building.
    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        let mut config = SchedulerConfig::new(
            self.channel_dir.clone(),
            self.vault_dir.clone(),
            self.animations_dir.clone(),
        );
        config.global_seed = self.global_seed;
        config.dwell_seconds = self.dwell_seconds;
        config
    }
}
