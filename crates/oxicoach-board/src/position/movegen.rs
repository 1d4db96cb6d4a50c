use arrayvec::ArrayVec;

use crate::core::{BitBoard, Color, Piece, Role, Square};

use super::{CastlingSide, Move, Position};

/// Legal moves of a position.
///
/// [`Position::from_fen`] caps material at what promotions can produce, so a side
/// never has more than nine queens (27 moves each), two rooks (14), two bishops (13),
/// two knights (8), a king (8) and two castling moves: 323 pseudo-legal moves.
pub type MoveList = ArrayVec<Move, 384>;

impl Position {
    /// Generates every legal move for the side to move.
    ///
    /// Pseudo-legal moves are generated first and each one is verified by playing it
    /// and checking that the mover's king is not left attacked.
    #[must_use]
    pub fn legal_moves(&self) -> MoveList {
        let mut pseudo = MoveList::new();
        self.push_pseudo_legal(&mut pseudo);
        self.push_castling(&mut pseudo);

        let us = self.turn();
        pseudo
            .into_iter()
            .filter(|&mv| {
                let next = self.play_unchecked(mv);
                next.king(us)
                    .is_none_or(|king| !next.is_attacked(king, us.opposite()))
            })
            .collect()
    }

    /// Legal moves of the piece standing on `from`.
    pub fn legal_moves_from(&self, from: Square) -> impl Iterator<Item = Move> {
        self.legal_moves().into_iter().filter(move |mv| mv.from() == from)
    }

    fn push_pseudo_legal(&self, moves: &mut MoveList) {
        let us = self.turn();
        let own = self.by_color(us);
        let enemy = self.by_color(us.opposite());

        for from in own {
            let Some(piece) = self.piece_at(from) else {
                continue;
            };
            if piece.role == Role::Pawn {
                self.push_pawn_moves(moves, from, us, enemy);
                continue;
            }
            for to in self.attacks_from(from) & !own {
                moves.push(Move::new(from, to));
            }
        }
    }

    fn push_pawn_moves(&self, moves: &mut MoveList, from: Square, us: Color, enemy: BitBoard) {
        let occupied = self.occupied();
        let forward = us.forward();
        let mut targets = BitBoard::EMPTY;

        if let Some(one) = from.offset(0, forward) {
            if !occupied.contains(one) {
                targets = targets.with(one);
                if from.relative_rank(us) == 1 {
                    if let Some(two) = one.offset(0, forward) {
                        if !occupied.contains(two) {
                            targets = targets.with(two);
                        }
                    }
                }
            }
        }

        let mut capturable = enemy;
        if let Some(ep) = self.ep_square() {
            capturable = capturable.with(ep);
        }
        targets |= self.attacks_from(from) & capturable;

        for to in targets {
            if to.relative_rank(us) == 7 {
                for role in Role::PROMOTIONS {
                    moves.push(Move::with_promotion(from, to, role));
                }
            } else {
                moves.push(Move::new(from, to));
            }
        }
    }

    fn push_castling(&self, moves: &mut MoveList) {
        let us = self.turn();
        let rank = us.home_rank();
        let king_from = Square::new(4, rank);
        if self.piece_at(king_from) != Some(Piece::new(us, Role::King)) || self.is_check() {
            return;
        }
        let enemy = us.opposite();

        for side in [CastlingSide::KingSide, CastlingSide::QueenSide] {
            if !self.castling().has(us, side) {
                continue;
            }
            let rook_from = Square::new(side.rook_file(), rank);
            if self.piece_at(rook_from) != Some(Piece::new(us, Role::Rook)) {
                continue;
            }
            let path = crate::core::attacks::between(king_from, rook_from);
            if (path & self.occupied()).any() {
                continue;
            }
            let king_to = Square::new(side.king_to_file(), rank);
            let transit = Square::new(side.rook_to_file(), rank);
            if self.is_attacked(transit, enemy) || self.is_attacked(king_to, enemy) {
                continue;
            }
            moves.push(Move::new(king_from, king_to));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perft(pos: &Position, depth: u32) -> u64 {
        if depth == 0 {
            return 1;
        }
        let moves = pos.legal_moves();
        if depth == 1 {
            return moves.len() as u64;
        }
        moves
            .iter()
            .map(|&mv| perft(&pos.play_unchecked(mv), depth - 1))
            .sum()
    }

    #[test]
    fn test_perft_starting_position() {
        let start = Position::starting();
        assert_eq!(perft(&start, 1), 20);
        assert_eq!(perft(&start, 2), 400);
        assert_eq!(perft(&start, 3), 8902);
    }

    #[test]
    fn test_perft_kiwipete() {
        let pos = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&pos, 1), 48);
        assert_eq!(perft(&pos, 2), 2039);
    }

    #[test]
    fn test_perft_en_passant_and_promotion_heavy() {
        // "position 3" of the common perft suite
        let pos = Position::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap();
        assert_eq!(perft(&pos, 1), 14);
        assert_eq!(perft(&pos, 2), 191);
        assert_eq!(perft(&pos, 3), 2812);
    }

    #[test]
    fn test_cannot_castle_through_attack() {
        // black rook on f8 covers f1
        let pos = Position::from_fen("5r1k/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
        let castle = Move::from_uci("e1g1").unwrap();
        assert!(!pos.legal_moves().contains(&castle));
    }

    #[test]
    fn test_promotions_generated() {
        let pos = Position::from_fen("8/P7/8/8/8/8/8/k6K w - - 0 1").unwrap();
        let promotions = pos
            .legal_moves()
            .iter()
            .filter(|mv| mv.promotion().is_some())
            .count();
        assert_eq!(promotions, 4);
    }

    #[test]
    fn test_maximal_material_fits_move_list() {
        let pos = Position::from_fen("QQQQ1QQQ/QQ6/7k/8/8/8/8/RRBBNNK1 w - - 0 1").unwrap();
        let moves = pos.legal_moves();
        assert!(moves.len() > 100);
        assert!(moves.len() <= moves.capacity());
    }

    #[test]
    fn test_legal_moves_from_square() {
        let start = Position::starting();
        let knight: Vec<_> = start
            .legal_moves_from(Square::new(6, 0))
            .map(|mv| mv.to_string())
            .collect();
        assert_eq!(knight.len(), 2);
        assert!(knight.contains(&"g1f3".to_owned()));
    }
}
