use oxicoach_board::{Color, Move, Piece, Position};

/// Board states around one move, shared by all motif detectors.
#[derive(Debug, Clone)]
pub struct MoveAnalysis {
    before: Position,
    mv: Move,
    after: Position,
    moved: Piece,
}

impl MoveAnalysis {
    /// Analyzes `mv` played from `before`; `None` if the move is not legal there.
    #[must_use]
    pub fn new(before: &Position, mv: Move) -> Option<Self> {
        let after = before.play(mv).ok()?;
        let moved = after.piece_at(mv.to())?;
        Some(Self {
            before: *before,
            mv,
            after,
            moved,
        })
    }

    #[must_use]
    pub fn before(&self) -> &Position {
        &self.before
    }

    #[must_use]
    pub fn mv(&self) -> Move {
        self.mv
    }

    #[must_use]
    pub fn after(&self) -> &Position {
        &self.after
    }

    /// Piece standing on the destination square after the move (promoted role included).
    #[must_use]
    pub fn moved(&self) -> Piece {
        self.moved
    }

    /// Side playing the move.
    #[must_use]
    pub fn mover(&self) -> Color {
        self.before.turn()
    }

    /// Side on the receiving end.
    #[must_use]
    pub fn defender(&self) -> Color {
        self.before.turn().opposite()
    }
}

#[cfg(test)]
mod tests {
    use oxicoach_board::Role;

    use super::*;

    #[test]
    fn test_illegal_move_has_no_analysis() {
        let pos = Position::starting();
        assert!(MoveAnalysis::new(&pos, Move::from_uci("e2e5").unwrap()).is_none());
        assert!(MoveAnalysis::new(&pos, Move::from_uci("e7e5").unwrap()).is_none());
    }

    #[test]
    fn test_promotion_reports_new_role() {
        let pos: Position = "8/P6k/8/8/8/8/8/K7 w - - 0 1".parse().unwrap();
        let analysis = MoveAnalysis::new(&pos, Move::from_uci("a7a8q").unwrap()).unwrap();
        assert_eq!(analysis.moved().role, Role::Queen);
        assert_eq!(analysis.mover(), Color::White);
        assert_eq!(analysis.defender(), Color::Black);
    }
}
