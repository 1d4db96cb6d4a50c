//! Blunder mining: finding the plies where a player's choice cost significant value.
//!
//! # How It Works
//!
//! For every game, the miner replays the main line one ply at a time:
//!
//! 1. **Evaluate before** - Ask the [`EvaluationPort`] about the position before the move
//! 2. **Compare** - If the engine has no best move, or the played move *is* the best
//!    move, the ply is skipped (no second engine call)
//! 3. **Evaluate after** - Ask about the position after the played move
//! 4. **Swing** - Compute the value lost from the mover's perspective:
//!
//! ```text
//! swing = before_for_mover - after_for_mover
//!       = before.saturated() - (-after.saturated())
//! ```
//!
//! The second evaluation is from the opponent's point of view (the turn alternates),
//! hence the sign flip. The swing is capped at [`Score::MATE_SENTINEL`].
//!
//! A ply is flagged when `swing >= swing_threshold_cp`, or when the position before
//! the move had a short forced mate (`<= mate_distance`) for the mover.
//!
//! # Bounds
//!
//! Engine calls are the expensive part: at most two per inspected ply. Mining stops as
//! soon as `max_items` blunders were found, and `max_games` / `max_plies_per_game`
//! bound the total number of evaluated positions on long histories.
//!
//! # Ordering
//!
//! Results are sorted descending by `(is_mate, swing_cp)`: mate-flagged items always
//! come before pure centipawn swings.
//!
//! # Failures
//!
//! - An unparseable game is logged and skipped
//! - An evaluation failure aborts the run with [`MiningError`]

use oxicoach_board::{Move, Position};
use serde::{Deserialize, Serialize};

use crate::{
    evaluation::{EvaluationError, EvaluationPort, Score},
    game::Game,
};

/// Tuning values for [`BlunderMiner`].
///
/// The thresholds are empirical; nothing suggests they are optimal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Minimum swing, in centipawns, for a ply to be flagged.
    pub swing_threshold_cp: i32,
    /// A forced mate for the mover within this many moves flags the ply regardless of
    /// the swing.
    pub mate_distance: u32,
    /// Number of principal-line moves kept per blunder.
    pub pv_length: usize,
    /// Mining stops once this many blunders were found.
    pub max_items: usize,
    /// Only the first `max_games` games are inspected.
    pub max_games: usize,
    /// Only the first `max_plies_per_game` plies of a game are inspected.
    pub max_plies_per_game: usize,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            swing_threshold_cp: 250,
            mate_distance: 5,
            pv_length: 8,
            max_items: 20,
            max_games: 100,
            max_plies_per_game: 200,
        }
    }
}

/// One flagged ply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blunder {
    pub platform: String,
    pub game_id: String,
    /// 1-based index of the flagged ply.
    pub ply: usize,
    pub fen_before: String,
    pub played: Move,
    pub best: Move,
    /// Principal line from the position before the move, truncated to `pv_length`.
    pub pv: Vec<Move>,
    pub swing_cp: i32,
    pub is_mate: bool,
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("evaluating ply {ply} of game {game_id} failed")]
pub struct MiningError {
    #[error(not(source))]
    pub game_id: String,
    #[error(not(source))]
    pub ply: usize,
    pub source: EvaluationError,
}

#[derive(Debug, Clone, Default)]
pub struct BlunderMiner {
    config: MiningConfig,
}

impl BlunderMiner {
    #[must_use]
    pub fn new(config: MiningConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &MiningConfig {
        &self.config
    }

    /// Mines `games` for blunders.
    ///
    /// When `player` is given, only plies played by that account are inspected in games
    /// where it appears as white or black; other games are inspected for both sides.
    pub fn mine<P>(
        &self,
        games: &[Game],
        port: &mut P,
        player: Option<&str>,
    ) -> Result<Vec<Blunder>, MiningError>
    where
        P: EvaluationPort + ?Sized,
    {
        let mut found = Vec::new();

        'games: for game in games.iter().take(self.config.max_games) {
            let (start, moves) = match game.replay() {
                Ok(replay) => replay,
                Err(err) => {
                    tracing::warn!(game_id = %game.game_id, error = %err, "skipping unparseable game");
                    continue;
                }
            };
            let mover_filter = player.and_then(|name| game.color_of(name));

            let mut position = start;
            for (index, &played) in moves
                .iter()
                .enumerate()
                .take(self.config.max_plies_per_game)
            {
                let before = position;
                position = before.play_unchecked(played);
                if mover_filter.is_some_and(|color| color != before.turn()) {
                    continue;
                }

                let ply = index + 1;
                let blunder = self
                    .inspect_ply(game, ply, &before, played, &position, port)
                    .map_err(|source| MiningError {
                        game_id: game.game_id.clone(),
                        ply,
                        source,
                    })?;
                if let Some(blunder) = blunder {
                    tracing::debug!(
                        game_id = %blunder.game_id,
                        ply = blunder.ply,
                        swing_cp = blunder.swing_cp,
                        is_mate = blunder.is_mate,
                        "blunder flagged"
                    );
                    found.push(blunder);
                    if found.len() >= self.config.max_items {
                        break 'games;
                    }
                }
            }
        }

        sort_blunders(&mut found);
        Ok(found)
    }

    fn inspect_ply<P>(
        &self,
        game: &Game,
        ply: usize,
        before: &Position,
        played: Move,
        after: &Position,
        port: &mut P,
    ) -> Result<Option<Blunder>, EvaluationError>
    where
        P: EvaluationPort + ?Sized,
    {
        let before_eval = port.analyze(before)?;
        let Some(best) = before_eval.best_move else {
            return Ok(None);
        };
        if best == played {
            return Ok(None);
        }

        let after_eval = port.analyze(after)?;
        let swing_cp = swing(before_eval.score, after_eval.score);
        let is_mate = before_eval
            .score
            .winning_mate_distance()
            .is_some_and(|distance| distance <= self.config.mate_distance);
        if swing_cp < self.config.swing_threshold_cp && !is_mate {
            return Ok(None);
        }

        let mut pv = before_eval.pv;
        pv.truncate(self.config.pv_length);
        Ok(Some(Blunder {
            platform: game.platform.clone(),
            game_id: game.game_id.clone(),
            ply,
            fen_before: before.to_fen(),
            played,
            best,
            pv,
            swing_cp,
            is_mate,
        }))
    }
}

/// Value lost by the mover, given the score before its move (mover to play) and the
/// score after it (opponent to play).
#[must_use]
pub fn swing(before: Score, after: Score) -> i32 {
    let before_for_mover = before.saturated();
    let after_for_mover = -after.saturated();
    (before_for_mover - after_for_mover).min(Score::MATE_SENTINEL)
}

/// Sorts descending by `(is_mate, swing_cp)`, keeping discovery order among equals.
pub fn sort_blunders(blunders: &mut [Blunder]) {
    blunders.sort_by(|a, b| (b.is_mate, b.swing_cp).cmp(&(a.is_mate, a.swing_cp)));
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use oxicoach_board::Square;

    use super::*;
    use crate::{evaluation::Evaluation, game::test_util::game};

    const ITALIAN_MISS: &str = "1. e4 e5 2. Bc4 Nc6 3. Qh5 Nf6 4. Qf3 *";
    const BEFORE_QXF7: &str = "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";

    fn uci(s: &str) -> Move {
        Move::from_uci(s).unwrap()
    }

    /// Answers from a FEN table; unknown positions are level with no best move.
    #[derive(Default)]
    struct ScriptedPort {
        answers: HashMap<String, Evaluation>,
        calls: usize,
    }

    impl ScriptedPort {
        fn with(mut self, fen: &str, score: Score, pv: &[&str]) -> Self {
            let pv: Vec<Move> = pv.iter().map(|s| uci(s)).collect();
            self.answers.insert(
                fen.to_owned(),
                Evaluation {
                    score,
                    best_move: pv.first().copied(),
                    pv,
                },
            );
            self
        }
    }

    impl EvaluationPort for ScriptedPort {
        fn analyze(&mut self, position: &Position) -> Result<Evaluation, EvaluationError> {
            self.calls += 1;
            Ok(self
                .answers
                .get(&position.to_fen())
                .cloned()
                .unwrap_or(Evaluation {
                    score: Score::Centipawns(0),
                    best_move: None,
                    pv: vec![],
                }))
        }
    }

    /// Claims every position is +5 for the side to move with an unplayable best move,
    /// so every inspected ply loses 500 centipawns.
    #[derive(Default)]
    struct PessimistPort {
        calls: usize,
    }

    impl EvaluationPort for PessimistPort {
        fn analyze(&mut self, _position: &Position) -> Result<Evaluation, EvaluationError> {
            self.calls += 1;
            let best = Move::new(Square::A1, Square::H8);
            Ok(Evaluation {
                score: Score::Centipawns(500),
                best_move: Some(best),
                pv: vec![best],
            })
        }
    }

    /// Every position is equal and the best move never matches, so no swing occurs.
    struct LevelPort;

    impl EvaluationPort for LevelPort {
        fn analyze(&mut self, _position: &Position) -> Result<Evaluation, EvaluationError> {
            let best = Move::new(Square::A1, Square::H8);
            Ok(Evaluation {
                score: Score::Centipawns(0),
                best_move: Some(best),
                pv: vec![best],
            })
        }
    }

    struct DeadPort;

    impl EvaluationPort for DeadPort {
        fn analyze(&mut self, _position: &Position) -> Result<Evaluation, EvaluationError> {
            Err(EvaluationError::Unavailable {
                reason: "engine binary not found".to_owned(),
            })
        }
    }

    #[test]
    fn test_missed_mate_is_flagged_with_saturated_swing() {
        let games = [game("italian", ITALIAN_MISS)];
        let mut port =
            ScriptedPort::default().with(BEFORE_QXF7, Score::MateIn(1), &["h5f7"]);

        let blunders = BlunderMiner::default().mine(&games, &mut port, None).unwrap();

        assert_eq!(blunders.len(), 1);
        let blunder = &blunders[0];
        assert_eq!(blunder.ply, 7);
        assert_eq!(blunder.fen_before, BEFORE_QXF7);
        assert_eq!(blunder.played, uci("h5f3"));
        assert_eq!(blunder.best, uci("h5f7"));
        assert_eq!(blunder.pv, [uci("h5f7")]);
        assert_eq!(blunder.swing_cp, Score::MATE_SENTINEL);
        assert!(blunder.is_mate);
        // 7 "before" calls, one "after" call for the only ply with a best move
        assert_eq!(port.calls, 8);
    }

    #[test]
    fn test_no_swing_means_no_items() {
        let games = [game("quiet", "1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 *")];
        let blunders = BlunderMiner::default()
            .mine(&games, &mut LevelPort, None)
            .unwrap();
        assert!(blunders.is_empty());
    }

    #[test]
    fn test_cap_stops_mining_early() {
        let games = [
            game("a", "1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 *"),
            game("b", "1. d4 d5 2. c4 e6 *"),
        ];
        let miner = BlunderMiner::new(MiningConfig {
            max_items: 3,
            ..MiningConfig::default()
        });
        let mut port = PessimistPort::default();
        let blunders = miner.mine(&games, &mut port, None).unwrap();
        assert_eq!(blunders.len(), 3);
        assert!(blunders.iter().all(|b| b.game_id == "a"));
        assert_eq!(port.calls, 6);
    }

    #[test]
    fn test_player_filter_inspects_only_own_plies() {
        let games = [game("a", "1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 *")];
        let mut port = PessimistPort::default();
        let blunders = BlunderMiner::default()
            .mine(&games, &mut port, Some("Bob"))
            .unwrap();
        let plies: Vec<_> = blunders.iter().map(|b| b.ply).collect();
        assert_eq!(plies, [2, 4, 6]);
    }

    #[test]
    fn test_ply_bounds_limit_engine_calls() {
        let games = [game("a", "1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 *")];
        let miner = BlunderMiner::new(MiningConfig {
            max_plies_per_game: 2,
            ..MiningConfig::default()
        });
        let mut port = PessimistPort::default();
        let blunders = miner.mine(&games, &mut port, None).unwrap();
        assert_eq!(blunders.len(), 2);
        assert_eq!(port.calls, 4);
    }

    #[test]
    fn test_unparseable_game_is_skipped() {
        let games = [
            game("broken", "1. e4 e5 2. Qxf7 *"),
            game("italian", ITALIAN_MISS),
        ];
        let mut port =
            ScriptedPort::default().with(BEFORE_QXF7, Score::MateIn(1), &["h5f7"]);
        let blunders = BlunderMiner::default().mine(&games, &mut port, None).unwrap();
        assert_eq!(blunders.len(), 1);
        assert_eq!(blunders[0].game_id, "italian");
    }

    #[test]
    fn test_engine_failure_is_fatal() {
        let games = [game("a", "1. e4 e5 *")];
        let err = BlunderMiner::default()
            .mine(&games, &mut DeadPort, None)
            .unwrap_err();
        assert_eq!(err.game_id, "a");
        assert_eq!(err.ply, 1);
        assert!(matches!(err.source, EvaluationError::Unavailable { .. }));
    }

    #[test]
    fn test_long_mate_or_getting_mated_is_not_a_mate_flag() {
        let mut port = ScriptedPort::default()
            .with(BEFORE_QXF7, Score::MateIn(6), &["h5f7"]);
        let blunders = BlunderMiner::default()
            .mine(&[game("italian", ITALIAN_MISS)], &mut port, None)
            .unwrap();
        // still flagged by swing, but not as a mate
        assert_eq!(blunders.len(), 1);
        assert!(!blunders[0].is_mate);

        assert_eq!(swing(Score::MateIn(-2), Score::Centipawns(0)), -Score::MATE_SENTINEL);
    }

    #[test]
    fn test_swing_from_mover_perspective() {
        // +1.50 before, opponent +2.00 after: mover lost 350
        assert_eq!(swing(Score::Centipawns(150), Score::Centipawns(200)), 350);
        // improving moves have negative swing
        assert_eq!(swing(Score::Centipawns(0), Score::Centipawns(-80)), -80);
        // mate for the mover thrown away into getting mated is capped
        assert_eq!(
            swing(Score::MateIn(2), Score::MateIn(3)),
            Score::MATE_SENTINEL
        );
    }

    #[test]
    fn test_sort_puts_mates_first_then_swing() {
        let make = |ply, swing_cp, is_mate| Blunder {
            platform: "lichess".to_owned(),
            game_id: "g".to_owned(),
            ply,
            fen_before: String::new(),
            played: uci("e2e4"),
            best: uci("d2d4"),
            pv: vec![],
            swing_cp,
            is_mate,
        };
        let mut blunders = vec![
            make(1, 900, false),
            make(2, 300, true),
            make(3, 2500, false),
            make(4, 100_000, true),
        ];
        sort_blunders(&mut blunders);
        let plies: Vec<_> = blunders.iter().map(|b| b.ply).collect();
        assert_eq!(plies, [4, 2, 3, 1]);
    }
}
