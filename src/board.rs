//! Board state store.
//! `BoardSnapshot` is a total mapping of all 64 squares to a piece identity or empty.
//! `BoardState` holds the canonical snapshot and is only mutated through `apply_move`.
//! Snapshots serialise as a JSON object of occupied squares (`{"e4": "WP5"}`);
//! absent squares and explicit `null`s read back as empty.

use crate::piece::{PieceId, PieceKind, Side};
use crate::square::Square;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

type SnapshotRepr = BTreeMap<Square, Option<PieceId>>;
type OccupiedRepr = BTreeMap<Square, PieceId>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("expected {expected} on {square}, found {}", describe(.found))]
    VacatedMismatch {
        square: Square,
        expected: PieceId,
        found: Option<PieceId>,
    },
    #[error("{square} already holds {piece}")]
    LandingUnchanged { square: Square, piece: PieceId },
    #[error("move from {0} to itself")]
    NullMove(Square),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FenError {
    #[error("piece '{piece}' on {square} has no colour/type flags")]
    UnknownPiece { square: Square, piece: PieceId },
    #[error("exported FEN '{fen}' failed validation: {reason}")]
    Invalid { fen: String, reason: String },
}

fn describe(found: &Option<PieceId>) -> String {
    match found {
        Some(p) => p.to_string(),
        None => "empty".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SnapshotRepr", into = "OccupiedRepr")]
pub struct BoardSnapshot {
    squares: [Option<PieceId>; 64],
}

impl BoardSnapshot {
    pub fn empty() -> Self {
        BoardSnapshot {
            squares: std::array::from_fn(|_| None),
        }
    }

    /// Standard opening layout. Instance indices run a-file to h-file, so the
    /// pawn on e2 is `WP5` and the queenside rook is `WR1`.
    pub fn starting_position() -> Self {
        const BACK_RANK: [(PieceKind, Option<u8>); 8] = [
            (PieceKind::Rook, Some(1)),
            (PieceKind::Knight, Some(1)),
            (PieceKind::Bishop, Some(1)),
            (PieceKind::Queen, None),
            (PieceKind::King, None),
            (PieceKind::Bishop, Some(2)),
            (PieceKind::Knight, Some(2)),
            (PieceKind::Rook, Some(2)),
        ];

        let mut snapshot = BoardSnapshot::empty();
        for (side, back, pawns) in [(Side::White, 0u8, 1u8), (Side::Black, 7, 6)] {
            for file in 0..8u8 {
                let (kind, index) = BACK_RANK[file as usize];
                snapshot.squares[(back * 8 + file) as usize] =
                    Some(PieceId::compose(side, kind, index));
                snapshot.squares[(pawns * 8 + file) as usize] =
                    Some(PieceId::compose(side, PieceKind::Pawn, Some(file + 1)));
            }
        }
        snapshot
    }

    pub fn get(&self, square: Square) -> Option<&PieceId> {
        self.squares[square.index()].as_ref()
    }

    pub fn set(&mut self, square: Square, piece: Option<PieceId>) {
        self.squares[square.index()] = piece;
    }

    /// Every square paired with its occupant, in `Square::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (Square, Option<&PieceId>)> + '_ {
        Square::ALL.iter().map(move |&sq| (sq, self.get(sq)))
    }

    pub fn occupied(&self) -> impl Iterator<Item = (Square, &PieceId)> + '_ {
        self.iter().filter_map(|(sq, p)| p.map(|p| (sq, p)))
    }

    /// Identities that appear on more than one square, with the squares holding them.
    pub fn duplicate_identities(&self) -> Vec<(PieceId, Vec<Square>)> {
        let mut seen: HashMap<&PieceId, Vec<Square>> = HashMap::new();
        for (sq, piece) in self.occupied() {
            seen.entry(piece).or_default().push(sq);
        }
        let mut dups: Vec<_> = seen
            .into_iter()
            .filter(|(_, squares)| squares.len() > 1)
            .map(|(piece, squares)| (piece.clone(), squares))
            .collect();
        dups.sort();
        dups
    }

    /// Exports the placement as a full FEN string with `side_to_move`.
    /// Castling and en passant are always `-` because neither is tracked.
    pub fn to_fen(&self, side_to_move: Side) -> Result<String, FenError> {
        let mut ranks = Vec::with_capacity(8);
        for rank in (0..8u8).rev() {
            let mut row = String::new();
            let mut empty_run = 0;
            for file in 0..8u8 {
                let sq = Square::ALL[(rank * 8 + file) as usize];
                match self.get(sq) {
                    None => empty_run += 1,
                    Some(piece) => {
                        let c = piece.fen_char().ok_or_else(|| FenError::UnknownPiece {
                            square: sq,
                            piece: piece.clone(),
                        })?;
                        if empty_run > 0 {
                            row.push_str(&empty_run.to_string());
                            empty_run = 0;
                        }
                        row.push(c);
                    }
                }
            }
            if empty_run > 0 {
                row.push_str(&empty_run.to_string());
            }
            ranks.push(row);
        }

        let fen = format!("{} {} - - 0 1", ranks.join("/"), side_to_move.fen_char());
        shakmaty::fen::Fen::from_ascii(fen.as_bytes()).map_err(|e| FenError::Invalid {
            fen: fen.clone(),
            reason: e.to_string(),
        })?;
        Ok(fen)
    }
}

impl Default for BoardSnapshot {
    fn default() -> Self {
        BoardSnapshot::empty()
    }
}

impl From<SnapshotRepr> for BoardSnapshot {
    fn from(repr: SnapshotRepr) -> Self {
        let mut snapshot = BoardSnapshot::empty();
        for (sq, piece) in repr {
            snapshot.set(sq, piece);
        }
        snapshot
    }
}

impl From<BoardSnapshot> for OccupiedRepr {
    fn from(snapshot: BoardSnapshot) -> Self {
        snapshot
            .occupied()
            .map(|(sq, piece)| (sq, piece.clone()))
            .collect()
    }
}

/// The canonical board. Holds no history; the move log lives with the reconciler.
#[derive(Debug, Clone)]
pub struct BoardState {
    snapshot: BoardSnapshot,
}

impl BoardState {
    pub fn new() -> Self {
        BoardState {
            snapshot: BoardSnapshot::starting_position(),
        }
    }

    /// Re-establishes the starting layout.
    pub fn initialize(&mut self) {
        self.snapshot = BoardSnapshot::starting_position();
    }

    pub fn current_snapshot(&self) -> &BoardSnapshot {
        &self.snapshot
    }

    /// Moves `piece` from `from` to `to`. On a precondition failure the board is untouched.
    pub fn apply_move(&mut self, piece: &PieceId, from: Square, to: Square) -> Result<(), BoardError> {
        if from == to {
            return Err(BoardError::NullMove(from));
        }
        if self.snapshot.get(from) != Some(piece) {
            return Err(BoardError::VacatedMismatch {
                square: from,
                expected: piece.clone(),
                found: self.snapshot.get(from).cloned(),
            });
        }
        if self.snapshot.get(to) == Some(piece) {
            return Err(BoardError::LandingUnchanged {
                square: to,
                piece: piece.clone(),
            });
        }

        self.snapshot.set(to, Some(piece.clone()));
        self.snapshot.set(from, None);
        Ok(())
    }
}

impl Default for BoardState {
    fn default() -> Self {
        BoardState::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(label: &str) -> Square {
        label.parse().unwrap()
    }

    #[test]
    fn test_starting_position_layout() {
        let start = BoardSnapshot::starting_position();
        assert_eq!(start.iter().count(), 64);
        assert_eq!(start.occupied().count(), 32);
        assert_eq!(start.get(sq("a1")).unwrap().as_str(), "WR1");
        assert_eq!(start.get(sq("d1")).unwrap().as_str(), "WQ");
        assert_eq!(start.get(sq("e1")).unwrap().as_str(), "WK");
        assert_eq!(start.get(sq("e2")).unwrap().as_str(), "WP5");
        assert_eq!(start.get(sq("g8")).unwrap().as_str(), "BN2");
        assert_eq!(start.get(sq("h7")).unwrap().as_str(), "BP8");
        assert!(start.get(sq("e4")).is_none());
        assert!(start.duplicate_identities().is_empty());
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut state = BoardState::new();
        state.apply_move(&PieceId::from("WP5"), sq("e2"), sq("e4")).unwrap();
        state.initialize();
        let once = state.current_snapshot().clone();
        state.initialize();
        assert_eq!(state.current_snapshot(), &once);
        assert_eq!(once, BoardSnapshot::starting_position());
    }

    #[test]
    fn test_apply_move_transfers_identity() {
        let mut state = BoardState::new();
        let pawn = PieceId::from("WP5");
        state.apply_move(&pawn, sq("e2"), sq("e4")).unwrap();
        assert!(state.current_snapshot().get(sq("e2")).is_none());
        assert_eq!(state.current_snapshot().get(sq("e4")), Some(&pawn));
        assert_eq!(state.current_snapshot().occupied().count(), 32);
    }

    #[test]
    fn test_apply_move_rejects_wrong_origin_without_mutating() {
        let mut state = BoardState::new();
        let before = state.current_snapshot().clone();
        let err = state
            .apply_move(&PieceId::from("WP4"), sq("e2"), sq("e4"))
            .unwrap_err();
        assert!(matches!(err, BoardError::VacatedMismatch { .. }));
        assert!(err.to_string().contains("found WP5"));
        assert_eq!(state.current_snapshot(), &before);

        let err = state
            .apply_move(&PieceId::from("WP5"), sq("e3"), sq("e4"))
            .unwrap_err();
        assert!(err.to_string().contains("found empty"));
        assert_eq!(
            state.apply_move(&PieceId::from("WP5"), sq("e2"), sq("e2")),
            Err(BoardError::NullMove(sq("e2")))
        );
        assert_eq!(state.current_snapshot(), &before);
    }

    #[test]
    fn test_duplicate_identities_reported() {
        let mut snap = BoardSnapshot::starting_position();
        snap.set(sq("e4"), Some(PieceId::from("WP5")));
        let dups = snap.duplicate_identities();
        assert_eq!(dups, vec![(PieceId::from("WP5"), vec![sq("e2"), sq("e4")])]);
    }

    #[test]
    fn test_fen_export() {
        let start = BoardSnapshot::starting_position();
        assert_eq!(
            start.to_fen(Side::White).unwrap(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w - - 0 1"
        );

        let mut state = BoardState::new();
        state.apply_move(&PieceId::from("WP5"), sq("e2"), sq("e4")).unwrap();
        assert_eq!(
            state.current_snapshot().to_fen(Side::Black).unwrap(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b - - 0 1"
        );
    }

    #[test]
    fn test_fen_export_rejects_unknown_labels() {
        let mut snap = BoardSnapshot::empty();
        snap.set(sq("c3"), Some(PieceId::from("??")));
        assert!(matches!(snap.to_fen(Side::White), Err(FenError::UnknownPiece { .. })));
    }

    #[test]
    fn test_json_lists_occupied_squares_only() {
        let mut snap = BoardSnapshot::empty();
        snap.set(sq("e4"), Some(PieceId::from("WP5")));
        snap.set(sq("a8"), Some(PieceId::from("BR1")));
        let json = serde_json::to_string(&snap).unwrap();
        assert_eq!(json, r#"{"e4":"WP5","a8":"BR1"}"#);

        let back: BoardSnapshot = serde_json::from_str(r#"{"a8":"BR1","e4":"WP5","d5":null}"#).unwrap();
        assert_eq!(back, snap);
    }
}
