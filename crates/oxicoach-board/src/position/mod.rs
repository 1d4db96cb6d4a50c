//! Immutable chess positions and the rules for moving between them.
//!
//! - [`Position`] - Piece placement plus side to move, castling rights, en passant
//!   square and move clocks
//! - [`Move`] - Coordinate move (`e2e4`), the unit exchanged with analysis engines
//! - [`MoveList`] - Fixed-capacity list of legal moves
//!
//! Positions never change in place: [`Position::play`] returns the successor position.
//! Every query the tactical heuristics need (attackers of a square, absolute pins,
//! check/checkmate) is answered from the snapshot alone.
//!
//! # Example
//!
//! ```
//! use oxicoach_board::Position;
//!
//! let start = Position::starting();
//! let mv = start.parse_san("e4").unwrap();
//! let next = start.play(mv).unwrap();
//! assert_eq!(
//!     next.to_fen(),
//!     "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
//! );
//! ```

pub use self::{chess_move::*, fen::*, movegen::*, san::*};

use crate::{
    IllegalMoveError,
    core::{
        BitBoard, Color, Piece, Role, Square,
        attacks::{
            self, bishop_attacks, king_attacks, knight_attacks, pawn_attacks, queen_attacks,
            rook_attacks,
        },
    },
};

mod chess_move;
mod fen;
mod movegen;
mod san;

/// Side of the board a castling move goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastlingSide {
    KingSide,
    QueenSide,
}

impl CastlingSide {
    /// File the rook starts on.
    #[must_use]
    pub const fn rook_file(self) -> u8 {
        match self {
            Self::KingSide => 7,
            Self::QueenSide => 0,
        }
    }

    /// File the king lands on.
    #[must_use]
    pub const fn king_to_file(self) -> u8 {
        match self {
            Self::KingSide => 6,
            Self::QueenSide => 2,
        }
    }

    /// File the rook lands on.
    #[must_use]
    pub const fn rook_to_file(self) -> u8 {
        match self {
            Self::KingSide => 5,
            Self::QueenSide => 3,
        }
    }
}

/// Remaining castling rights, one bit per color and side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0b1111);

    const fn mask(color: Color, side: CastlingSide) -> u8 {
        let shift = match (color, side) {
            (Color::White, CastlingSide::KingSide) => 0,
            (Color::White, CastlingSide::QueenSide) => 1,
            (Color::Black, CastlingSide::KingSide) => 2,
            (Color::Black, CastlingSide::QueenSide) => 3,
        };
        1 << shift
    }

    #[must_use]
    pub const fn has(self, color: Color, side: CastlingSide) -> bool {
        self.0 & Self::mask(color, side) != 0
    }

    #[must_use]
    pub const fn with(self, color: Color, side: CastlingSide) -> Self {
        Self(self.0 | Self::mask(color, side))
    }

    #[must_use]
    pub const fn without(self, color: Color, side: CastlingSide) -> Self {
        Self(self.0 & !Self::mask(color, side))
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Drops the rights affected by a piece leaving or arriving on `square`.
    fn touch(self, square: Square) -> Self {
        let mut rights = self;
        for color in Color::ALL {
            let rank = color.home_rank();
            if square == Square::new(4, rank) {
                rights = rights
                    .without(color, CastlingSide::KingSide)
                    .without(color, CastlingSide::QueenSide);
            }
            for side in [CastlingSide::KingSide, CastlingSide::QueenSide] {
                if square == Square::new(side.rook_file(), rank) {
                    rights = rights.without(color, side);
                }
            }
        }
        rights
    }
}

/// A chess position: placement, side to move, castling rights, en passant target
/// and the two move clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    by_role: [BitBoard; Role::LEN],
    by_color: [BitBoard; 2],
    turn: Color,
    castling: CastlingRights,
    ep_square: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
}

impl Default for Position {
    fn default() -> Self {
        Self::starting()
    }
}

impl Position {
    const EMPTY: Self = Self {
        by_role: [BitBoard::EMPTY; Role::LEN],
        by_color: [BitBoard::EMPTY; 2],
        turn: Color::White,
        castling: CastlingRights::NONE,
        ep_square: None,
        halfmove_clock: 0,
        fullmove_number: 1,
    };

    /// The standard initial position.
    #[must_use]
    pub fn starting() -> Self {
        const BACK_RANK: [Role; 8] = [
            Role::Rook,
            Role::Knight,
            Role::Bishop,
            Role::Queen,
            Role::King,
            Role::Bishop,
            Role::Knight,
            Role::Rook,
        ];
        let mut pos = Self::EMPTY;
        for (file, role) in (0..8).zip(BACK_RANK) {
            pos.put(Square::new(file, 0), Piece::new(Color::White, role));
            pos.put(Square::new(file, 1), Piece::new(Color::White, Role::Pawn));
            pos.put(Square::new(file, 6), Piece::new(Color::Black, Role::Pawn));
            pos.put(Square::new(file, 7), Piece::new(Color::Black, role));
        }
        pos.castling = CastlingRights::ALL;
        pos
    }

    pub(crate) fn put(&mut self, square: Square, piece: Piece) {
        self.remove(square);
        self.by_role[piece.role.index()] |= square.bit();
        self.by_color[piece.color.index()] |= square.bit();
    }

    pub(crate) fn remove(&mut self, square: Square) -> Option<Piece> {
        let piece = self.piece_at(square)?;
        self.by_role[piece.role.index()] = self.by_role[piece.role.index()].without(square);
        self.by_color[piece.color.index()] = self.by_color[piece.color.index()].without(square);
        Some(piece)
    }

    #[must_use]
    pub fn turn(&self) -> Color {
        self.turn
    }

    #[must_use]
    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    #[must_use]
    pub fn ep_square(&self) -> Option<Square> {
        self.ep_square
    }

    #[must_use]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    #[must_use]
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    #[must_use]
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        let color = if self.by_color[Color::White.index()].contains(square) {
            Color::White
        } else if self.by_color[Color::Black.index()].contains(square) {
            Color::Black
        } else {
            return None;
        };
        let role = Role::ALL
            .into_iter()
            .find(|role| self.by_role[role.index()].contains(square))?;
        Some(Piece::new(color, role))
    }

    #[must_use]
    pub fn occupied(&self) -> BitBoard {
        self.by_color[0] | self.by_color[1]
    }

    #[must_use]
    pub fn by_color(&self, color: Color) -> BitBoard {
        self.by_color[color.index()]
    }

    #[must_use]
    pub fn by_role(&self, role: Role) -> BitBoard {
        self.by_role[role.index()]
    }

    #[must_use]
    pub fn pieces(&self, color: Color, role: Role) -> BitBoard {
        self.by_color(color) & self.by_role(role)
    }

    #[must_use]
    pub fn king(&self, color: Color) -> Option<Square> {
        self.pieces(color, Role::King).first()
    }

    /// Iterates over every occupied square and its piece.
    pub fn piece_map(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.occupied()
            .iter()
            .filter_map(|square| self.piece_at(square).map(|piece| (square, piece)))
    }

    /// Squares attacked by the piece on `square` (empty if the square is empty).
    #[must_use]
    pub fn attacks_from(&self, square: Square) -> BitBoard {
        let Some(piece) = self.piece_at(square) else {
            return BitBoard::EMPTY;
        };
        let occupied = self.occupied();
        match piece.role {
            Role::Pawn => pawn_attacks(piece.color, square),
            Role::Knight => knight_attacks(square),
            Role::Bishop => bishop_attacks(square, occupied),
            Role::Rook => rook_attacks(square, occupied),
            Role::Queen => queen_attacks(square, occupied),
            Role::King => king_attacks(square),
        }
    }

    /// Pieces of `attacker` attacking `square`, given an explicit occupancy.
    #[must_use]
    pub fn attackers_with(&self, square: Square, attacker: Color, occupied: BitBoard) -> BitBoard {
        let diagonal = self.by_role(Role::Bishop) | self.by_role(Role::Queen);
        let orthogonal = self.by_role(Role::Rook) | self.by_role(Role::Queen);
        let attackers = (knight_attacks(square) & self.by_role(Role::Knight))
            | (king_attacks(square) & self.by_role(Role::King))
            | (pawn_attacks(attacker.opposite(), square) & self.by_role(Role::Pawn))
            | (bishop_attacks(square, occupied) & diagonal)
            | (rook_attacks(square, occupied) & orthogonal);
        attackers & self.by_color(attacker) & occupied
    }

    /// Pieces of `attacker` attacking `square`.
    ///
    /// Also counts as "defenders" when `attacker` owns the piece on `square`.
    #[must_use]
    pub fn attackers(&self, square: Square, attacker: Color) -> BitBoard {
        self.attackers_with(square, attacker, self.occupied())
    }

    #[must_use]
    pub fn is_attacked(&self, square: Square, by: Color) -> bool {
        self.attackers(square, by).any()
    }

    /// Enemy pieces giving check to the side to move.
    #[must_use]
    pub fn checkers(&self) -> BitBoard {
        match self.king(self.turn) {
            Some(king) => self.attackers(king, self.turn.opposite()),
            None => BitBoard::EMPTY,
        }
    }

    #[must_use]
    pub fn is_check(&self) -> bool {
        self.checkers().any()
    }

    #[must_use]
    pub fn is_checkmate(&self) -> bool {
        self.is_check() && self.legal_moves().is_empty()
    }

    #[must_use]
    pub fn is_stalemate(&self) -> bool {
        !self.is_check() && self.legal_moves().is_empty()
    }

    /// Pieces of `color` absolutely pinned to their own king.
    ///
    /// A piece is pinned when it is the only piece between its king and an enemy
    /// slider that moves along that line.
    #[must_use]
    pub fn pinned(&self, color: Color) -> BitBoard {
        let Some(king) = self.king(color) else {
            return BitBoard::EMPTY;
        };
        let enemy = color.opposite();
        let queens = self.pieces(enemy, Role::Queen);
        let snipers = (rook_attacks(king, BitBoard::EMPTY)
            & (self.pieces(enemy, Role::Rook) | queens))
            | (bishop_attacks(king, BitBoard::EMPTY) & (self.pieces(enemy, Role::Bishop) | queens));

        let mut pinned = BitBoard::EMPTY;
        for sniper in snipers {
            let blockers = attacks::between(king, sniper) & self.occupied();
            if let Some(blocker) = blockers.single() {
                if self.by_color(color).contains(blocker) {
                    pinned = pinned.with(blocker);
                }
            }
        }
        pinned
    }

    #[must_use]
    pub fn is_pinned(&self, color: Color, square: Square) -> bool {
        self.pinned(color).contains(square)
    }

    #[must_use]
    pub fn is_en_passant(&self, mv: Move) -> bool {
        self.ep_square == Some(mv.to())
            && self.by_role(Role::Pawn).contains(mv.from())
            && mv.from().file() != mv.to().file()
            && self.piece_at(mv.to()).is_none()
    }

    #[must_use]
    pub fn castling_side(&self, mv: Move) -> Option<CastlingSide> {
        if !self.by_role(Role::King).contains(mv.from()) || mv.from().rank() != mv.to().rank() {
            return None;
        }
        match (mv.from().file(), mv.to().file()) {
            (4, 6) => Some(CastlingSide::KingSide),
            (4, 2) => Some(CastlingSide::QueenSide),
            _ => None,
        }
    }

    /// Square of the piece `mv` would capture, if any (accounts for en passant).
    #[must_use]
    pub fn captured_square(&self, mv: Move) -> Option<Square> {
        let mover = self.piece_at(mv.from())?;
        if self.is_en_passant(mv) {
            return Some(Square::new(mv.to().file(), mv.from().rank()));
        }
        match self.piece_at(mv.to()) {
            Some(target) if target.color != mover.color => Some(mv.to()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_capture(&self, mv: Move) -> bool {
        self.captured_square(mv).is_some()
    }

    /// Plays `mv` without checking legality.
    ///
    /// The origin square must hold a piece; otherwise the position is returned with
    /// only the side to move flipped.
    #[must_use]
    pub fn play_unchecked(&self, mv: Move) -> Self {
        let mut next = *self;
        let us = self.turn;
        next.turn = us.opposite();
        next.ep_square = None;
        if us == Color::Black {
            next.fullmove_number += 1;
        }

        let Some(piece) = self.piece_at(mv.from()) else {
            return next;
        };
        let captured = self.captured_square(mv);
        let castling = self.castling_side(mv);

        if let Some(square) = captured {
            next.remove(square);
        }
        next.remove(mv.from());
        let role = mv.promotion().unwrap_or(piece.role);
        next.put(mv.to(), Piece::new(us, role));

        if let Some(side) = castling {
            let rank = us.home_rank();
            let rook_from = Square::new(side.rook_file(), rank);
            next.remove(rook_from);
            next.put(
                Square::new(side.rook_to_file(), rank),
                Piece::new(us, Role::Rook),
            );
        }

        next.castling = self.castling.touch(mv.from()).touch(mv.to());

        if piece.role == Role::Pawn && mv.from().rank().abs_diff(mv.to().rank()) == 2 {
            let skipped = Square::new(mv.from().file(), u8::midpoint(mv.from().rank(), mv.to().rank()));
            // only recorded when an enemy pawn could actually take en passant
            if (pawn_attacks(us, skipped) & self.pieces(us.opposite(), Role::Pawn)).any() {
                next.ep_square = Some(skipped);
            }
        }

        next.halfmove_clock = if piece.role == Role::Pawn || captured.is_some() {
            0
        } else {
            self.halfmove_clock + 1
        };

        next
    }

    /// Plays `mv` if it is legal in this position.
    pub fn play(&self, mv: Move) -> Result<Self, IllegalMoveError> {
        if self.is_legal(mv) {
            Ok(self.play_unchecked(mv))
        } else {
            Err(IllegalMoveError {
                mv,
                fen: self.to_fen(),
            })
        }
    }

    #[must_use]
    pub fn is_legal(&self, mv: Move) -> bool {
        self.legal_moves().contains(&mv)
    }

    /// Whether the (legal) move `mv` checks the opponent.
    #[must_use]
    pub fn gives_check(&self, mv: Move) -> bool {
        self.play_unchecked(mv).is_check()
    }
}
