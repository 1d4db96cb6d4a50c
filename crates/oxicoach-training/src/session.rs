//! Daily puzzle sessions.
//!
//! A session is a short list of the player's own training items, ordered to fit the
//! day's fatigue and annotated with a coarse area and a one-line hint.
//!
//! | Tier      | Order                                                      |
//! |-----------|------------------------------------------------------------|
//! | Exhausted | solved first, smallest swing, fewest attempts              |
//! | Steady    | unsolved first, largest swing                              |
//! | Fresh     | unsolved first, largest swing, fewest attempts             |

use std::cmp::Ordering;

use oxicoach_board::{Color, Move, Position};
use oxicoach_tactics::{evaluation::Score, motif::MotifSet};
use serde::{Deserialize, Serialize};

use crate::{
    fatigue::{Fatigue, FatigueTier},
    item::{ItemId, TrainingItem},
};

/// Training area a puzzle is presented under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleArea {
    Mate,
    Endgame,
    Opening,
    Tactics,
}

const MATE_SWING: i32 = Score::MATE_SENTINEL - 10_000;
const ENDGAME_MAX_PIECES: usize = 8;
const OPENING_MAX_PLY: usize = 20;

impl PuzzleArea {
    /// Mate-sized swings first, then few pieces, then early plies.
    #[must_use]
    pub fn classify(position: &Position, ply: usize, swing_cp: i32) -> Self {
        if swing_cp >= MATE_SWING {
            Self::Mate
        } else if position.occupied().count() <= ENDGAME_MAX_PIECES {
            Self::Endgame
        } else if ply <= OPENING_MAX_PLY {
            Self::Opening
        } else {
            Self::Tactics
        }
    }

    #[must_use]
    pub fn hint(self, to_move: Color) -> String {
        let side = match to_move {
            Color::White => "White",
            Color::Black => "Black",
        };
        let advice = match self {
            Self::Mate => "There is a decisive tactic: look for mate or a forced win, checks first.",
            Self::Endgame => "Technical endgame: active king, passed pawns, short calculation.",
            Self::Opening => "Opening: development, king safety, punish inaccuracies.",
            Self::Tactics => "Tactics: checks, captures, threats. Find the most forcing move.",
        };
        format!("{side} to move. {advice}")
    }
}

/// Sort order of session candidates for one fatigue tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOrder(FatigueTier);

impl SessionOrder {
    #[must_use]
    pub fn for_fatigue(fatigue: Fatigue) -> Self {
        Self(fatigue.tier())
    }

    #[must_use]
    pub fn compare(self, a: &TrainingItem, b: &TrainingItem) -> Ordering {
        let (sa, sb) = (&a.stat, &b.stat);
        match self.0 {
            FatigueTier::Exhausted => sb
                .solved
                .cmp(&sa.solved)
                .then(a.swing_cp.cmp(&b.swing_cp))
                .then(sa.attempts.cmp(&sb.attempts)),
            FatigueTier::Steady => sa.solved.cmp(&sb.solved).then(b.swing_cp.cmp(&a.swing_cp)),
            FatigueTier::Fresh => sa
                .solved
                .cmp(&sb.solved)
                .then(b.swing_cp.cmp(&a.swing_cp))
                .then(sa.attempts.cmp(&sb.attempts)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionItem {
    pub item_id: ItemId,
    pub game_id: String,
    pub ply: usize,
    pub fen: String,
    pub best: Move,
    pub tags: MotifSet,
    pub area: PuzzleArea,
    pub hint: String,
}

/// Picks and annotates up to `limit` items for today's session.
///
/// Items whose stored position cannot be parsed are skipped.
#[must_use]
pub fn build_session(mut candidates: Vec<TrainingItem>, fatigue: Fatigue, limit: usize) -> Vec<SessionItem> {
    let order = SessionOrder::for_fatigue(fatigue);
    candidates.sort_by(|a, b| order.compare(a, b));

    candidates
        .into_iter()
        .filter_map(|item| match Position::from_fen(&item.fen_before) {
            Ok(position) => Some((item, position)),
            Err(err) => {
                tracing::warn!(item = %item.id, %err, "skipping item with invalid position");
                None
            }
        })
        .take(limit)
        .map(|(item, position)| {
            let area = PuzzleArea::classify(&position, item.ply, item.swing_cp);
            SessionItem {
                item_id: item.id,
                game_id: item.game_id,
                ply: item.ply,
                fen: item.fen_before,
                best: item.best,
                tags: item.tags,
                area,
                hint: area.hint(position.turn()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::test_util::item;

    fn candidates() -> Vec<TrainingItem> {
        let mut solved = item(1, "g1", 30, 200, &[]);
        solved.stat.attempts = 2;
        solved.stat.solved = true;
        let mut tried = item(2, "g2", 30, 900, &[]);
        tried.stat.attempts = 3;
        let fresh_big = item(3, "g3", 30, 900, &[]);
        let fresh_small = item(4, "g4", 30, 300, &[]);
        vec![solved, tried, fresh_big, fresh_small]
    }

    fn ids(session: &[SessionItem]) -> Vec<i64> {
        session.iter().map(|s| s.item_id.0).collect()
    }

    #[test]
    fn test_order_per_tier() {
        assert_eq!(ids(&build_session(candidates(), Fatigue::new(9), 10)), [1, 4, 3, 2]);
        assert_eq!(ids(&build_session(candidates(), Fatigue::new(5), 10)), [2, 3, 4, 1]);
        assert_eq!(ids(&build_session(candidates(), Fatigue::new(1), 10)), [3, 2, 4, 1]);
        assert_eq!(build_session(candidates(), Fatigue::new(1), 2).len(), 2);
    }

    #[test]
    fn test_area_classification() {
        let start = Position::starting();
        assert_eq!(PuzzleArea::classify(&start, 40, Score::MATE_SENTINEL), PuzzleArea::Mate);
        assert_eq!(PuzzleArea::classify(&start, 12, 300), PuzzleArea::Opening);
        assert_eq!(PuzzleArea::classify(&start, 30, 300), PuzzleArea::Tactics);
        let ending = Position::from_fen("8/5k2/8/3p4/3P4/8/5K2/8 w - - 0 50").unwrap();
        assert_eq!(PuzzleArea::classify(&ending, 12, 300), PuzzleArea::Endgame);
    }

    #[test]
    fn test_hint_names_side_to_move() {
        let session = build_session(vec![item(1, "g", 10, 300, &[])], Fatigue::NEUTRAL, 5);
        assert_eq!(session[0].area, PuzzleArea::Opening);
        assert!(session[0].hint.starts_with("White to move."));

        let mut broken = item(2, "g", 10, 300, &[]);
        broken.fen_before = "not a fen".to_owned();
        assert!(build_session(vec![broken], Fatigue::NEUTRAL, 5).is_empty());
    }
}
