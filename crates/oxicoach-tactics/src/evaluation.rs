//! The evaluation port: the boundary to an external position-evaluation engine.
//!
//! The pipeline never searches positions itself. Everything it knows about the quality
//! of a move comes from an [`EvaluationPort`], which answers one question per call:
//! given a position, what is the score for the side to move, what is the best move and
//! what is the expected continuation?
//!
//! # Scores
//!
//! A [`Score`] is either a centipawn value or a forced-mate distance, never both.
//! To compare the two on one axis, mate scores are mapped to a saturating sentinel
//! ([`Score::MATE_SENTINEL`], ±100000) by [`Score::saturated`]. The sentinel is far
//! above any realistic centipawn value, so a forced mate dominates every ordering
//! without needing a separate sort key.
//!
//! # Failures
//!
//! A port that cannot answer returns an [`EvaluationError`]. Callers must treat it as
//! fatal for the current run: an unavailable engine is not the same as "no errors
//! found", and silently turning one into the other would hide real problems.

use oxicoach_board::{Move, Position};
use serde::{Deserialize, Serialize};

/// Engine score from the point of view of the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    /// Centipawn advantage (positive favors the side to move).
    Centipawns(i32),
    /// Forced mate in `n` moves; positive if the side to move mates, zero or negative
    /// if it gets mated.
    MateIn(i32),
}

impl Score {
    /// Magnitude forced mates are mapped to.
    pub const MATE_SENTINEL: i32 = 100_000;

    /// Collapses the score onto the centipawn axis, mapping forced mates to
    /// ±[`Self::MATE_SENTINEL`].
    ///
    /// Centipawn values are clamped into the sentinel range so that no centipawn
    /// score can outrank a mate.
    #[must_use]
    pub fn saturated(self) -> i32 {
        match self {
            Self::Centipawns(cp) => cp.clamp(-Self::MATE_SENTINEL, Self::MATE_SENTINEL),
            Self::MateIn(n) if n > 0 => Self::MATE_SENTINEL,
            Self::MateIn(_) => -Self::MATE_SENTINEL,
        }
    }

    /// Distance to a forced mate in favor of the side to move, if there is one.
    #[must_use]
    pub fn winning_mate_distance(self) -> Option<u32> {
        match self {
            Self::MateIn(n) if n > 0 => Some(n.unsigned_abs()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_mate(self) -> bool {
        matches!(self, Self::MateIn(_))
    }
}

/// Answer of an [`EvaluationPort`] for one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: Score,
    /// `None` when the position has no legal moves or the engine gave no move.
    pub best_move: Option<Move>,
    /// Principal line starting with `best_move`.
    pub pv: Vec<Move>,
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum EvaluationError {
    #[display("evaluation engine is unavailable: {reason}")]
    Unavailable {
        #[error(not(source))]
        reason: String,
    },
    #[display("evaluation engine I/O failed")]
    Io(std::io::Error),
    #[display("unexpected evaluation engine output: {output:?}")]
    Protocol {
        #[error(not(source))]
        output: String,
    },
}

/// Position evaluation capability.
///
/// Implementations must be deterministic enough that two calls on the same position
/// within one run are comparable. Timeouts and cancellation are the implementation's
/// responsibility.
pub trait EvaluationPort {
    fn analyze(&mut self, position: &Position) -> Result<Evaluation, EvaluationError>;
}

impl<T> EvaluationPort for &mut T
where
    T: EvaluationPort + ?Sized,
{
    fn analyze(&mut self, position: &Position) -> Result<Evaluation, EvaluationError> {
        (**self).analyze(position)
    }
}

impl<T> EvaluationPort for Box<T>
where
    T: EvaluationPort + ?Sized,
{
    fn analyze(&mut self, position: &Position) -> Result<Evaluation, EvaluationError> {
        (**self).analyze(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturated_maps_mates_to_sentinel() {
        assert_eq!(Score::MateIn(3).saturated(), Score::MATE_SENTINEL);
        assert_eq!(Score::MateIn(-2).saturated(), -Score::MATE_SENTINEL);
        assert_eq!(Score::MateIn(0).saturated(), -Score::MATE_SENTINEL);
        assert_eq!(Score::Centipawns(-35).saturated(), -35);
        assert_eq!(
            Score::Centipawns(i32::MAX).saturated(),
            Score::MATE_SENTINEL
        );
    }

    #[test]
    fn test_winning_mate_distance() {
        assert_eq!(Score::MateIn(4).winning_mate_distance(), Some(4));
        assert_eq!(Score::MateIn(-4).winning_mate_distance(), None);
        assert_eq!(Score::Centipawns(900).winning_mate_distance(), None);
    }

    #[test]
    fn test_score_serde_shape() {
        let json = serde_json::to_string(&Score::MateIn(2)).unwrap();
        assert_eq!(json, r#"{"mate_in":2}"#);
        let back: Score = serde_json::from_str(r#"{"centipawns":-120}"#).unwrap();
        assert_eq!(back, Score::Centipawns(-120));
    }
}
