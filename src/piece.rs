//! Piece identities.
//! A `PieceId` is an opaque label such as `"WR1"` (white rook, instance 1) or `"BQ"`.
//! The engine only ever compares identities as whole strings; the colour/type
//! accessors here are for display and FEN export.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    White,
    Black,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// Turn indicator used in FEN ('w' / 'b').
    pub fn fen_char(self) -> char {
        match self {
            Side::White => 'w',
            Side::Black => 'b',
        }
    }

    fn flag(self) -> char {
        match self {
            Side::White => 'W',
            Side::Black => 'B',
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => write!(f, "White"),
            Side::Black => write!(f, "Black"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    fn from_flag(c: char) -> Option<Self> {
        match c {
            'P' => Some(PieceKind::Pawn),
            'N' => Some(PieceKind::Knight),
            'B' => Some(PieceKind::Bishop),
            'R' => Some(PieceKind::Rook),
            'Q' => Some(PieceKind::Queen),
            'K' => Some(PieceKind::King),
            _ => None,
        }
    }

    fn flag(self) -> char {
        match self {
            PieceKind::Pawn => 'P',
            PieceKind::Knight => 'N',
            PieceKind::Bishop => 'B',
            PieceKind::Rook => 'R',
            PieceKind::Queen => 'Q',
            PieceKind::King => 'K',
        }
    }
}

/// Stable identity of one physical piece for its whole lifetime on the board.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PieceId(String);

impl PieceId {
    pub fn new(id: impl Into<String>) -> Self {
        PieceId(id.into())
    }

    /// Builds the conventional label: colour flag, type flag, optional instance index.
    /// Kings and queens are normally built with `index = None`.
    pub fn compose(side: Side, kind: PieceKind, index: Option<u8>) -> Self {
        let mut id = format!("{}{}", side.flag(), kind.flag());
        if let Some(i) = index {
            id.push_str(&i.to_string());
        }
        PieceId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn side(&self) -> Option<Side> {
        match self.0.chars().next()? {
            'W' => Some(Side::White),
            'B' => Some(Side::Black),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<PieceKind> {
        self.0.chars().nth(1).and_then(PieceKind::from_flag)
    }

    /// FEN letter for this piece: uppercase for White, lowercase for Black.
    /// `None` when the label does not follow the colour/type convention.
    pub fn fen_char(&self) -> Option<char> {
        let letter = self.kind()?.flag();
        match self.side()? {
            Side::White => Some(letter),
            Side::Black => Some(letter.to_ascii_lowercase()),
        }
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PieceId {
    fn from(id: &str) -> Self {
        PieceId::new(id)
    }
}
