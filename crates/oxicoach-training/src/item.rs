//! Training items: flagged positions the player re-solves.
//!
//! An item is created from one [`Blunder`] and never changes afterwards, except for
//! two things:
//!
//! - Its motif tags, which may be back-filled once if tagging failed at creation
//! - Its [`ItemStat`] counters, updated on every attempt
//!
//! # Solving an Item
//!
//! The expected solution is the principal line (or just the best move when no line
//! was recorded). The player submits one move per step; [`TrainingItem::check_attempt`]
//! compares it with the line at that step:
//!
//! ```text
//! step in range?  ── no ──► OutOfRange (nothing recorded)
//!       │
//!      yes
//!       ▼
//! move == line[step]?  ── no ──► Incorrect (attempt recorded, unsolved)
//!       │
//!      yes
//!       ▼
//! last step?  ── no ──► Correct { done: false } (attempt recorded, unsolved)
//!       │
//!      yes ──► Correct { done: true } (attempt recorded, solved)
//! ```

use chrono::{DateTime, Utc};
use oxicoach_board::Move;
use oxicoach_tactics::{blunder_miner::Blunder, motif::MotifSet};
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
#[display("{_0}")]
pub struct ItemId(pub i64);

/// Item content before the repository assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTrainingItem {
    pub platform: String,
    pub game_id: String,
    pub ply: usize,
    pub fen_before: String,
    pub played: Move,
    pub best: Move,
    pub pv: Vec<Move>,
    pub swing_cp: i32,
    /// Empty until tagged.
    pub tags: MotifSet,
    pub created_at: DateTime<Utc>,
}

impl NewTrainingItem {
    #[must_use]
    pub fn from_blunder(blunder: Blunder, tags: MotifSet, created_at: DateTime<Utc>) -> Self {
        Self {
            platform: blunder.platform,
            game_id: blunder.game_id,
            ply: blunder.ply,
            fen_before: blunder.fen_before,
            played: blunder.played,
            best: blunder.best,
            pv: blunder.pv,
            swing_cp: blunder.swing_cp,
            tags,
            created_at,
        }
    }
}

/// Per-item practice counters.
///
/// `attempts` never decreases and `solved` never goes back to `false`, so
/// `solved` implies `attempts >= 1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStat {
    pub attempts: u32,
    pub solved: bool,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl ItemStat {
    pub fn record(&mut self, solved: bool, at: DateTime<Utc>) {
        self.attempts += 1;
        self.solved |= solved;
        self.last_attempt_at = Some(at);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingItem {
    pub id: ItemId,
    pub username: String,
    pub platform: String,
    pub game_id: String,
    pub ply: usize,
    pub fen_before: String,
    pub played: Move,
    pub best: Move,
    pub pv: Vec<Move>,
    pub swing_cp: i32,
    pub tags: MotifSet,
    pub created_at: DateTime<Utc>,
    pub stat: ItemStat,
}

impl TrainingItem {
    #[must_use]
    pub fn from_new(id: ItemId, username: &str, item: NewTrainingItem) -> Self {
        Self {
            id,
            username: username.to_owned(),
            platform: item.platform,
            game_id: item.game_id,
            ply: item.ply,
            fen_before: item.fen_before,
            played: item.played,
            best: item.best,
            pv: item.pv,
            swing_cp: item.swing_cp,
            tags: item.tags,
            created_at: item.created_at,
            stat: ItemStat::default(),
        }
    }

    /// Move sequence the player has to find.
    #[must_use]
    pub fn solution(&self) -> Vec<Move> {
        if self.pv.is_empty() {
            vec![self.best]
        } else {
            self.pv.clone()
        }
    }

    /// Checks move `mv` submitted at `step` (0-based) of the solution.
    #[must_use]
    pub fn check_attempt(&self, step: usize, mv: Move) -> AttemptOutcome {
        let solution = self.solution();
        let Some(&expected) = solution.get(step) else {
            return AttemptOutcome::OutOfRange {
                expected: solution[0],
            };
        };
        if mv != expected {
            return AttemptOutcome::Incorrect { expected };
        }
        let next = solution.get(step + 1).copied();
        AttemptOutcome::Correct {
            done: next.is_none(),
            next,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// `step` lies outside the solution; nothing is recorded.
    OutOfRange { expected: Move },
    Incorrect { expected: Move },
    Correct { done: bool, next: Option<Move> },
}

impl AttemptOutcome {
    /// Value to record as "solved" for this attempt, or `None` if the attempt does not
    /// count.
    #[must_use]
    pub fn recorded_result(self) -> Option<bool> {
        match self {
            Self::OutOfRange { .. } => None,
            Self::Incorrect { .. } => Some(false),
            Self::Correct { done, .. } => Some(done),
        }
    }
}


#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::{test_util::*, *};

    #[test]
    fn test_attempt_walks_the_line() {
        let it = item(1, "g", 10, 300, &[]);
        assert_eq!(
            it.check_attempt(0, uci("e2e4")),
            AttemptOutcome::Correct {
                done: false,
                next: Some(uci("e7e5"))
            }
        );
        assert_eq!(
            it.check_attempt(2, uci("g1f3")),
            AttemptOutcome::Correct {
                done: true,
                next: None
            }
        );
        assert_eq!(
            it.check_attempt(1, uci("d7d5")),
            AttemptOutcome::Incorrect {
                expected: uci("e7e5")
            }
        );
        assert_eq!(
            it.check_attempt(3, uci("e2e4")),
            AttemptOutcome::OutOfRange {
                expected: uci("e2e4")
            }
        );
    }

    #[test]
    fn test_empty_line_falls_back_to_best_move() {
        let mut it = item(1, "g", 10, 300, &[]);
        it.pv.clear();
        let outcome = it.check_attempt(0, uci("e2e4"));
        assert_eq!(outcome.recorded_result(), Some(true));
        assert_eq!(it.check_attempt(1, uci("e2e4")).recorded_result(), None);
    }

    #[test]
    fn test_solved_is_sticky() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let mut stat = ItemStat::default();
        stat.record(true, at);
        stat.record(false, at);
        assert_eq!(stat.attempts, 2);
        assert!(stat.solved);
        assert_eq!(stat.last_attempt_at, Some(at));
    }
}
