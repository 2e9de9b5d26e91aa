//! Move inference.
//! Classifies a diff. Only a two-square diff where one square was vacated and the
//! other newly occupied by the same identity is accepted as a move; captures,
//! castling and en passant all fall into the ambiguous outcomes.

use crate::board::BoardSnapshot;
use crate::piece::PieceId;
use crate::square::Square;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inference {
    NoChange,
    SimpleMove { piece: PieceId, from: Square, to: Square },
    UnrecognizedShape,
    UnsupportedCardinality,
}

/// Never mutates anything; the caller decides whether to apply the move.
pub fn infer_move(changed: &[Square], previous: &BoardSnapshot, next: &BoardSnapshot) -> Inference {
    match changed {
        [] => Inference::NoChange,
        [a, b] => {
            let Some((from, to)) = vacated_then_landed(*a, *b, previous, next)
                .or_else(|| vacated_then_landed(*b, *a, previous, next))
            else {
                return Inference::UnrecognizedShape;
            };
            match (previous.get(from), next.get(to)) {
                (Some(moved), Some(landed)) if moved == landed => Inference::SimpleMove {
                    piece: moved.clone(),
                    from,
                    to,
                },
                _ => Inference::UnrecognizedShape,
            }
        }
        _ => Inference::UnsupportedCardinality,
    }
}

/// `Some((from, to))` when `from` went occupied -> empty and `to` went empty -> occupied.
fn vacated_then_landed(
    from: Square,
    to: Square,
    previous: &BoardSnapshot,
    next: &BoardSnapshot,
) -> Option<(Square, Square)> {
    let vacated = previous.get(from).is_some() && next.get(from).is_none();
    let landed = previous.get(to).is_none() && next.get(to).is_some();
    (vacated && landed).then_some((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::changed_squares;

    fn sq(label: &str) -> Square {
        label.parse().unwrap()
    }

    fn classify(prev: &BoardSnapshot, next: &BoardSnapshot) -> Inference {
        infer_move(&changed_squares(prev, next), prev, next)
    }

    #[test]
    fn test_no_change() {
        let start = BoardSnapshot::starting_position();
        assert_eq!(classify(&start, &start), Inference::NoChange);
    }

    #[test]
    fn test_simple_move_either_direction_on_the_board() {
        let start = BoardSnapshot::starting_position();
        let mut next = start.clone();
        next.set(sq("e2"), None);
        next.set(sq("e4"), Some(PieceId::from("WP5")));
        assert_eq!(
            classify(&start, &next),
            Inference::SimpleMove { piece: PieceId::from("WP5"), from: sq("e2"), to: sq("e4") }
        );

        // Landing square sorts before the vacated one.
        let mut back = start.clone();
        back.set(sq("g8"), None);
        back.set(sq("f6"), Some(PieceId::from("BN2")));
        assert_eq!(
            classify(&start, &back),
            Inference::SimpleMove { piece: PieceId::from("BN2"), from: sq("g8"), to: sq("f6") }
        );
    }

    #[test]
    fn test_identity_mismatch_is_unrecognized() {
        let start = BoardSnapshot::starting_position();
        let mut next = start.clone();
        next.set(sq("e2"), None);
        next.set(sq("e4"), Some(PieceId::from("WP4")));
        assert_eq!(classify(&start, &next), Inference::UnrecognizedShape);
    }

    #[test]
    fn test_two_new_pieces_is_unrecognized() {
        let start = BoardSnapshot::starting_position();
        let mut next = start.clone();
        next.set(sq("e4"), Some(PieceId::from("WQ")));
        next.set(sq("d4"), Some(PieceId::from("BQ")));
        assert_eq!(classify(&start, &next), Inference::UnrecognizedShape);
    }

    #[test]
    fn test_identity_swap_is_unrecognized() {
        let start = BoardSnapshot::starting_position();
        let mut next = start.clone();
        next.set(sq("a2"), Some(PieceId::from("WP2")));
        next.set(sq("b2"), Some(PieceId::from("WP1")));
        assert_eq!(classify(&start, &next), Inference::UnrecognizedShape);
    }

    #[test]
    fn test_other_cardinalities_are_unsupported() {
        let start = BoardSnapshot::starting_position();

        let mut one = start.clone();
        one.set(sq("e2"), None);
        assert_eq!(classify(&start, &one), Inference::UnsupportedCardinality);

        // A capture touches two squares but the landing square was occupied.
        let mut capture = start.clone();
        capture.set(sq("e2"), None);
        capture.set(sq("d7"), Some(PieceId::from("WP5")));
        assert_eq!(classify(&start, &capture), Inference::UnrecognizedShape);

        let mut three = start.clone();
        three.set(sq("e2"), None);
        three.set(sq("e4"), Some(PieceId::from("WP5")));
        three.set(sq("h5"), Some(PieceId::from("BQ")));
        assert_eq!(classify(&start, &three), Inference::UnsupportedCardinality);
    }
}
