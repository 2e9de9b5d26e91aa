//! Physical chessboard tracker.
//! Reconciles successive board snapshots from a classifier into a canonical,
//! identity-aware board, infers moves, and drives per-side countdown clocks.

pub mod board;
pub mod capture;
pub mod classify;
pub mod clock;
pub mod config;
pub mod diff;
pub mod engine;
pub mod inference;
pub mod movelog;
pub mod piece;
pub mod square;

pub use board::{BoardError, BoardSnapshot, BoardState};
pub use clock::{ClockPhase, TurnClock, TurnClockState, format_clock};
pub use engine::{IdentityPolicy, ReconcileOutcome, Reconciler};
pub use movelog::{MoveLog, MoveRecord};
pub use piece::{PieceId, Side};
pub use square::Square;
