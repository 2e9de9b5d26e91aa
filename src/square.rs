//! Board coordinates.
//! A square is addressed by file (`a`-`h`) and rank (`1`-`8`) and serialises as its
//! two-character label, e.g. `"e4"`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const FILES: &[u8; 8] = b"abcdefgh";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SquareError {
    #[error("invalid square label '{0}' (expected file a-h followed by rank 1-8)")]
    InvalidLabel(String),
    #[error("square coordinates out of range: file {file}, rank {rank}")]
    OutOfRange { file: u8, rank: u8 },
}

/// One of the 64 board squares. File and rank are zero-based internally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square {
    // Field order gives rank-major ordering, matching `Square::ALL`.
    rank: u8,
    file: u8,
}

impl Square {
    /// All squares in a1, b1, ..., h1, a2, ..., h8 order.
    pub const ALL: [Square; 64] = {
        let mut all = [Square { rank: 0, file: 0 }; 64];
        let mut i = 0;
        while i < 64 {
            all[i] = Square { rank: (i / 8) as u8, file: (i % 8) as u8 };
            i += 1;
        }
        all
    };

    /// Builds a square from zero-based file and rank.
    pub fn new(file: u8, rank: u8) -> Result<Self, SquareError> {
        if file > 7 || rank > 7 {
            return Err(SquareError::OutOfRange { file, rank });
        }
        Ok(Square { rank, file })
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Position in `Square::ALL`.
    pub fn index(self) -> usize {
        self.rank as usize * 8 + self.file as usize
    }

    pub fn file(self) -> u8 {
        self.file
    }

    pub fn rank(self) -> u8 {
        self.rank
    }

    pub fn file_char(self) -> char {
        FILES[self.file as usize] as char
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_char(), self.rank + 1)
    }
}

impl FromStr for Square {
    type Err = SquareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(SquareError::InvalidLabel(s.to_string()));
        }
        let file = FILES
            .iter()
            .position(|&f| f == bytes[0].to_ascii_lowercase())
            .ok_or_else(|| SquareError::InvalidLabel(s.to_string()))?;
        let rank = match bytes[1] {
            b'1'..=b'8' => bytes[1] - b'1',
            _ => return Err(SquareError::InvalidLabel(s.to_string())),
        };
        Square::new(file as u8, rank)
    }
}

impl TryFrom<String> for Square {
    type Error = SquareError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Square> for String {
    fn from(square: Square) -> Self {
        square.to_string()
    }
}
