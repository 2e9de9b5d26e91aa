//! Snapshot differ.
//! Pure comparison of two snapshots by identity equality per square (empty included).

use crate::board::BoardSnapshot;
use crate::square::Square;

/// Squares whose occupant differs between `previous` and `next`, in `Square::ALL` order.
pub fn changed_squares(previous: &BoardSnapshot, next: &BoardSnapshot) -> Vec<Square> {
    Square::ALL
        .iter()
        .copied()
        .filter(|&sq| previous.get(sq) != next.get(sq))
        .collect()
}
