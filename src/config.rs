//! Config module.
//! Manages I/O for boardwatch.json (clock budget, sampling cadence, classifier, frame source).
//! Uses serde for JSON serialization.
//! Missing file falls back to defaults; any field left out of the file takes its default.

use crate::capture::BoardBounds;
use crate::classify::ClassifierMode;
use crate::clock::DEFAULT_BUDGET_SECS;
use crate::engine::IdentityPolicy;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "boardwatch.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Starting budget per side, in seconds.
    pub initial_seconds: u32,
    pub sample_interval_ms: u64,
    pub identity_policy: IdentityPolicy,
    pub classifier: ClassifierMode,
    /// Latest camera frame written by the capture collaborator.
    pub frame_path: Option<PathBuf>,
    pub board_bounds: Option<BoardBounds>,
    /// JSON-lines snapshot file for `ClassifierMode::Replay`.
    pub replay_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            initial_seconds: DEFAULT_BUDGET_SECS,
            sample_interval_ms: 500,
            identity_policy: IdentityPolicy::Trust,
            classifier: ClassifierMode::Stub,
            frame_path: None,
            board_bounds: None,
            replay_path: None,
        }
    }
}

impl Config {
    pub fn load_or_default(path: &Path) -> Result<Config> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, raw).with_context(|| format!("Failed to write config: {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_interval_ms == 0 {
            bail!("sample_interval_ms must be greater than zero");
        }
        if self.classifier == ClassifierMode::Replay && self.replay_path.is_none() {
            bail!("Replay classifier selected but no replay_path configured");
        }
        if let Some(bounds) = &self.board_bounds {
            bounds.validate()?;
        }
        Ok(())
    }
}
