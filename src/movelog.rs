//! Append-only move log, the only history the tracker keeps.

use crate::piece::{PieceId, Side};
use crate::square::Square;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    pub piece: PieceId,
    pub from: Square,
    pub to: Square,
    /// Side that was on move when the record was accepted.
    pub side: Side,
}

impl fmt::Display for MoveRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} → {}", self.piece, self.from, self.to)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct MoveLog {
    entries: Vec<MoveRecord>,
}

impl MoveLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: MoveRecord) {
        self.entries.push(record);
    }

    pub fn entries(&self) -> &[MoveRecord] {
        &self.entries
    }

    pub fn last(&self) -> Option<&MoveRecord> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_for(&self, side: Side) -> usize {
        self.entries.iter().filter(|r| r.side == side).count()
    }

    /// One line per move, oldest first.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
