//! Reconciliation engine.
//! Owns the canonical board, the turn clock and the move log. Every new snapshot goes
//! through `reconcile`, which diffs it against the board, infers a move and, when one is
//! accepted, applies it, logs it and hands the turn over inside the same call.
//! Latency: pure in-memory work; 64 comparisons per cycle.

use crate::board::{BoardError, BoardSnapshot, BoardState};
use crate::clock::{TurnClock, TurnClockState};
use crate::diff::changed_squares;
use crate::inference::{Inference, infer_move};
use crate::movelog::{MoveLog, MoveRecord};
use crate::piece::{PieceId, Side};
use crate::square::Square;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// What to do with snapshots that place one identity on several squares.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityPolicy {
    /// Assume the classifier is right and diff the snapshot as-is.
    #[default]
    Trust,
    /// Refuse the snapshot before diffing.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    NoChange,
    MoveAccepted(MoveRecord),
    AmbiguousUnrecognizedShape(Vec<Square>),
    AmbiguousUnsupportedCardinality(Vec<Square>),
    /// Only produced under `IdentityPolicy::Reject`.
    RejectedSnapshot(Vec<(PieceId, Vec<Square>)>),
    /// Inference and board disagreed; the cycle was aborted with nothing mutated.
    Fault(BoardError),
}

impl ReconcileOutcome {
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            ReconcileOutcome::AmbiguousUnrecognizedShape(_)
                | ReconcileOutcome::AmbiguousUnsupportedCardinality(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    board: BoardState,
    clock: TurnClock,
    log: MoveLog,
    policy: IdentityPolicy,
}

impl Reconciler {
    pub fn new(budget_secs: u32, policy: IdentityPolicy) -> Self {
        Reconciler {
            board: BoardState::new(),
            clock: TurnClock::new(budget_secs),
            log: MoveLog::new(),
            policy,
        }
    }

    /// Back to the starting position, fresh clocks, empty log.
    pub fn restart(&mut self) {
        self.board.initialize();
        self.clock.reset();
        self.log.clear();
        info!("Tracker restarted from the initial position");
    }

    pub fn reconcile(&mut self, next: &BoardSnapshot) -> ReconcileOutcome {
        if self.policy == IdentityPolicy::Reject {
            let dups = next.duplicate_identities();
            if !dups.is_empty() {
                warn!("Rejected snapshot with duplicated identities: {:?}", dups);
                return ReconcileOutcome::RejectedSnapshot(dups);
            }
        }

        let previous = self.board.current_snapshot();
        let changed = changed_squares(previous, next);
        debug!("Changed squares: {:?}", changed);

        match infer_move(&changed, previous, next) {
            Inference::NoChange => ReconcileOutcome::NoChange,
            Inference::UnrecognizedShape => {
                warn!("Move detection unclear, unrecognized shape: {}", labels(&changed));
                ReconcileOutcome::AmbiguousUnrecognizedShape(changed)
            }
            Inference::UnsupportedCardinality => {
                warn!(
                    "Move detection unclear, {} squares changed: {}",
                    changed.len(),
                    labels(&changed)
                );
                ReconcileOutcome::AmbiguousUnsupportedCardinality(changed)
            }
            Inference::SimpleMove { piece, from, to } => self.accept(piece, from, to),
        }
    }

    fn accept(&mut self, piece: PieceId, from: Square, to: Square) -> ReconcileOutcome {
        if let Err(e) = self.board.apply_move(&piece, from, to) {
            warn!("Aborting reconciliation cycle: {}", e);
            return ReconcileOutcome::Fault(e);
        }

        let record = MoveRecord {
            piece,
            from,
            to,
            side: self.clock.active_side(),
        };
        info!("Move: {}", record);
        self.log.push(record.clone());

        if !self.clock.switch_turn() {
            info!("Clock has expired; move recorded without switching the turn");
        }
        ReconcileOutcome::MoveAccepted(record)
    }

    /// One elapsed second for the armed clock.
    pub fn tick(&mut self) -> Option<Side> {
        let fallen = self.clock.tick();
        if let Some(side) = fallen {
            info!("{} has run out of time", side);
        }
        fallen
    }

    /// `secs` elapsed seconds, one `tick` each.
    pub fn advance(&mut self, secs: u32) -> Option<Side> {
        let mut fallen = None;
        for _ in 0..secs {
            if let Some(side) = self.tick() {
                fallen = Some(side);
            }
        }
        fallen
    }

    /// Stops the running countdown; whose turn it is does not change.
    pub fn pause(&mut self) {
        self.clock.pause();
        info!("Clock paused");
    }

    pub fn resume(&mut self) {
        self.clock.resume();
        info!("Clock resumed for {}", self.clock.active_side());
    }

    pub fn current_snapshot(&self) -> &BoardSnapshot {
        self.board.current_snapshot()
    }

    pub fn turn_clock_state(&self) -> TurnClockState {
        self.clock.state()
    }

    pub fn clock(&self) -> &TurnClock {
        &self.clock
    }

    pub fn move_log(&self) -> &MoveLog {
        &self.log
    }

    pub fn policy(&self) -> IdentityPolicy {
        self.policy
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Reconciler::new(crate::clock::DEFAULT_BUDGET_SECS, IdentityPolicy::default())
    }
}

fn labels(squares: &[Square]) -> String {
    squares
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
