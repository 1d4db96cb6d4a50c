//! Attack sets for each piece role.
//!
//! Sliding attacks are computed by walking rays until the first occupied square
//! (which is included). The tactical heuristics built on top of this crate inspect a
//! handful of positions per training item, so ray walking is fast enough and keeps the
//! code free of lookup-table generation.

use super::{bit_board::BitBoard, square::Color, square::Square};

const KNIGHT_DELTAS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

const KING_DELTAS: [(i8, i8); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

pub(crate) const ROOK_DIRECTIONS: [(i8, i8); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
pub(crate) const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

fn leaper(square: Square, deltas: &[(i8, i8)]) -> BitBoard {
    deltas
        .iter()
        .filter_map(|&(df, dr)| square.offset(df, dr))
        .collect()
}

fn slider(square: Square, occupied: BitBoard, directions: &[(i8, i8)]) -> BitBoard {
    let mut attacks = BitBoard::EMPTY;
    for &(df, dr) in directions {
        let mut current = square;
        while let Some(next) = current.offset(df, dr) {
            attacks = attacks.with(next);
            if occupied.contains(next) {
                break;
            }
            current = next;
        }
    }
    attacks
}

#[must_use]
pub fn knight_attacks(square: Square) -> BitBoard {
    leaper(square, &KNIGHT_DELTAS)
}

#[must_use]
pub fn king_attacks(square: Square) -> BitBoard {
    leaper(square, &KING_DELTAS)
}

/// Squares attacked by a pawn of `color` standing on `square`.
#[must_use]
pub fn pawn_attacks(color: Color, square: Square) -> BitBoard {
    let dr = color.forward();
    leaper(square, &[(-1, dr), (1, dr)])
}

#[must_use]
pub fn bishop_attacks(square: Square, occupied: BitBoard) -> BitBoard {
    slider(square, occupied, &BISHOP_DIRECTIONS)
}

#[must_use]
pub fn rook_attacks(square: Square, occupied: BitBoard) -> BitBoard {
    slider(square, occupied, &ROOK_DIRECTIONS)
}

#[must_use]
pub fn queen_attacks(square: Square, occupied: BitBoard) -> BitBoard {
    bishop_attacks(square, occupied) | rook_attacks(square, occupied)
}

/// Unit step from `from` towards `to` if both lie on a common rank, file or diagonal.
#[must_use]
pub fn direction(from: Square, to: Square) -> Option<(i8, i8)> {
    if from == to {
        return None;
    }
    #[expect(clippy::cast_possible_wrap)]
    let df = to.file() as i8 - from.file() as i8;
    #[expect(clippy::cast_possible_wrap)]
    let dr = to.rank() as i8 - from.rank() as i8;
    if df == 0 || dr == 0 || df.abs() == dr.abs() {
        Some((df.signum(), dr.signum()))
    } else {
        None
    }
}

/// Whether a step of `(df, dr)` moves along a rank or file (rather than a diagonal).
#[must_use]
pub fn is_orthogonal((df, dr): (i8, i8)) -> bool {
    df == 0 || dr == 0
}

/// Squares strictly between `a` and `b`; empty unless they are aligned.
#[must_use]
pub fn between(a: Square, b: Square) -> BitBoard {
    let Some((df, dr)) = direction(a, b) else {
        return BitBoard::EMPTY;
    };
    let mut squares = BitBoard::EMPTY;
    let mut current = a;
    while let Some(next) = current.offset(df, dr) {
        if next == b {
            break;
        }
        squares = squares.with(next);
        current = next;
    }
    squares
}

/// Squares from `from` (exclusive) walking in `(df, dr)` to the board edge.
pub fn ray(from: Square, (df, dr): (i8, i8)) -> impl Iterator<Item = Square> {
    let mut current = from;
    std::iter::from_fn(move || {
        let next = current.offset(df, dr)?;
        current = next;
        Some(next)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn test_knight_attacks_corner_and_center() {
        assert_eq!(knight_attacks(sq("a1")).count(), 2);
        assert_eq!(knight_attacks(sq("e4")).count(), 8);
        assert!(knight_attacks(sq("g1")).contains(sq("f3")));
    }

    #[test]
    fn test_pawn_attacks_direction() {
        let white = pawn_attacks(Color::White, sq("e4"));
        assert!(white.contains(sq("d5")) && white.contains(sq("f5")));
        let black = pawn_attacks(Color::Black, sq("a7"));
        assert_eq!(black.single(), Some(sq("b6")));
    }

    #[test]
    fn test_slider_stops_at_blocker() {
        let occupied = sq("d6").bit();
        let attacks = rook_attacks(sq("d4"), occupied);
        assert!(attacks.contains(sq("d5")));
        assert!(attacks.contains(sq("d6")));
        assert!(!attacks.contains(sq("d7")));
        assert_eq!(rook_attacks(sq("d4"), BitBoard::EMPTY).count(), 14);
        assert_eq!(bishop_attacks(sq("d4"), BitBoard::EMPTY).count(), 13);
    }

    #[test]
    fn test_between() {
        let squares: Vec<_> = between(sq("a1"), sq("d4")).iter().map(|s| s.to_string()).collect();
        assert_eq!(squares, ["b2", "c3"]);
        assert!(between(sq("a1"), sq("b3")).is_empty());
        assert!(between(sq("e1"), sq("e2")).is_empty());
    }

    #[test]
    fn test_direction() {
        assert_eq!(direction(sq("e1"), sq("e8")), Some((0, 1)));
        assert_eq!(direction(sq("h8"), sq("a1")), Some((-1, -1)));
        assert_eq!(direction(sq("a1"), sq("b3")), None);
    }
}
