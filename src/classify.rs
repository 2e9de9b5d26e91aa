//! Classifier facade - turns a board frame into a snapshot, or declines.
//! - **Stub mode**: always declines. No vision model is wired in yet.
//! - **Replay mode**: ignores the frame and yields recorded snapshots from a JSON-lines file,
//!   one per call, so the tracker can be driven without a camera.

use crate::board::BoardSnapshot;
use anyhow::{Context, Result};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierMode {
    #[default]
    Stub,
    Replay,
}

impl fmt::Display for ClassifierMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierMode::Stub => write!(f, "Stub (declines every frame)"),
            ClassifierMode::Replay => write!(f, "Replay (recorded snapshots)"),
        }
    }
}

#[derive(Debug)]
pub struct Classifier {
    mode: ClassifierMode,
    queue: VecDeque<BoardSnapshot>,
}

impl Classifier {
    pub fn stub() -> Self {
        Classifier {
            mode: ClassifierMode::Stub,
            queue: VecDeque::new(),
        }
    }

    pub fn replay(snapshots: impl IntoIterator<Item = BoardSnapshot>) -> Self {
        Classifier {
            mode: ClassifierMode::Replay,
            queue: snapshots.into_iter().collect(),
        }
    }

    /// Reads one snapshot per non-empty line; lines starting with `#` are comments.
    pub fn replay_from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay file: {}", path.display()))?;
        let snapshots = parse_replay(&raw)
            .with_context(|| format!("Failed to parse replay file: {}", path.display()))?;
        log::info!("Loaded {} snapshots from {}", snapshots.len(), path.display());
        Ok(Classifier::replay(snapshots))
    }

    pub fn mode(&self) -> ClassifierMode {
        self.mode
    }

    /// Snapshots still queued in replay mode.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// `true` once a replay has nothing left to hand out. A stub never finishes.
    pub fn is_exhausted(&self) -> bool {
        self.mode == ClassifierMode::Replay && self.queue.is_empty()
    }

    /// Classifies `frame`. `None` means the classifier declined this cycle.
    pub fn classify(&mut self, _frame: Option<&DynamicImage>) -> Option<BoardSnapshot> {
        match self.mode {
            ClassifierMode::Stub => None,
            ClassifierMode::Replay => self.queue.pop_front(),
        }
    }
}

fn parse_replay(raw: &str) -> Result<Vec<BoardSnapshot>> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("line {}: invalid snapshot", i + 1))
        })
        .collect()
}
