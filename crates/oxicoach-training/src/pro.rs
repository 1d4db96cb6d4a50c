//! Game-phase and conversion statistics over a player's mined items.
//!
//! Items are bucketed by move number (`max(1, (ply + 1) / 2)`):
//!
//! ```text
//! move  1 ..= 12   opening
//! move 13 ..= 39   middlegame
//! move 40 ..       endgame
//! ```
//!
//! Three reports are derived:
//!
//! - **Phase stats**: average swing and number of large swings (>= 150 cp) per phase,
//!   per game and in total.
//! - **Opening breakpoints**: for each game, the first large swing inside the opening,
//!   grouped by `(opening, move)`. Frequent breakpoints show where a repertoire leaks.
//! - **Conversion**: of the games that contain a large swing, how many the player still
//!   won.
//!
//! Swing magnitudes are used throughout; the sign is ignored.

use std::collections::BTreeMap;

use oxicoach_board::Color;
use oxicoach_tactics::game::Game;
use serde::{Deserialize, Serialize};

use crate::item::TrainingItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProConfig {
    pub opening_max_move: usize,
    pub endgame_min_move: usize,
    /// Swing (cp) counted as a blunder and as an opening breakpoint.
    pub breakpoint_swing_cp: i32,
    /// Swing (cp) after which a game counts as having had an advantage to convert.
    pub advantage_cp: i32,
    pub max_breakpoints: usize,
}

impl Default for ProConfig {
    fn default() -> Self {
        Self {
            opening_max_move: 12,
            endgame_min_move: 40,
            breakpoint_swing_cp: 150,
            advantage_cp: 150,
            max_breakpoints: 25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

/// Move number of a ply (1-based, both plies of a move share it).
#[must_use]
pub fn move_number(ply: usize) -> usize {
    ((ply + 1) / 2).max(1)
}

/// Swing totals of one phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseSwings {
    pub positions: usize,
    pub avg_swing: f64,
    pub blunders: usize,
    #[serde(skip)]
    total_swing: u64,
}

impl PhaseSwings {
    fn add(&mut self, swing: u32, is_blunder: bool) {
        self.positions += 1;
        self.total_swing += u64::from(swing);
        self.blunders += usize::from(is_blunder);
        #[expect(clippy::cast_precision_loss)]
        let avg = self.total_swing as f64 / self.positions as f64;
        self.avg_swing = avg;
    }

    fn merge(&mut self, other: &Self) {
        self.positions += other.positions;
        self.total_swing += other.total_swing;
        self.blunders += other.blunders;
        if self.positions > 0 {
            #[expect(clippy::cast_precision_loss)]
            let avg = self.total_swing as f64 / self.positions as f64;
            self.avg_swing = avg;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseStats {
    pub opening: PhaseSwings,
    pub middlegame: PhaseSwings,
    pub endgame: PhaseSwings,
}

impl PhaseStats {
    fn phase_mut(&mut self, phase: GamePhase) -> &mut PhaseSwings {
        match phase {
            GamePhase::Opening => &mut self.opening,
            GamePhase::Middlegame => &mut self.middlegame,
            GamePhase::Endgame => &mut self.endgame,
        }
    }

    fn merge(&mut self, other: &Self) {
        self.opening.merge(&other.opening);
        self.middlegame.merge(&other.middlegame);
        self.endgame.merge(&other.endgame);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamePhaseStats {
    pub game_id: String,
    pub phases: PhaseStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub summary: PhaseStats,
    pub games_analyzed: usize,
    pub per_game: Vec<GamePhaseStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningBreakpoint {
    pub opening: String,
    pub move_number: usize,
    pub count: usize,
    pub avg_swing: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_advantaged: usize,
    pub failed_conversions: usize,
    /// Share of advantaged games that were won; 0 without advantaged games.
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProDiagnostics {
    pub username: String,
    pub phases: PhaseReport,
    pub opening_breakpoints: Vec<OpeningBreakpoint>,
    pub conversion: ConversionStats,
}

#[derive(Debug, Clone, Default)]
pub struct ProAnalyzer {
    config: ProConfig,
}

impl ProAnalyzer {
    #[must_use]
    pub fn new(config: ProConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn phase_of(&self, ply: usize) -> GamePhase {
        let number = move_number(ply);
        if number <= self.config.opening_max_move {
            GamePhase::Opening
        } else if number >= self.config.endgame_min_move {
            GamePhase::Endgame
        } else {
            GamePhase::Middlegame
        }
    }

    #[must_use]
    pub fn analyze(&self, username: &str, games: &[Game], items: &[TrainingItem]) -> ProDiagnostics {
        let by_game = group_by_game(items);
        let phases = self.phase_report(&by_game);
        let opening_breakpoints = self.opening_breakpoints(games, &by_game);
        let conversion = self.conversion(username, games, &by_game);
        tracing::debug!(
            username,
            games = games.len(),
            items = items.len(),
            breakpoints = opening_breakpoints.len(),
            "pro diagnostics computed"
        );
        ProDiagnostics {
            username: username.to_owned(),
            phases,
            opening_breakpoints,
            conversion,
        }
    }

    fn phase_report(&self, by_game: &BTreeMap<&str, Vec<&TrainingItem>>) -> PhaseReport {
        let mut summary = PhaseStats::default();
        let per_game: Vec<_> = by_game
            .iter()
            .map(|(game_id, items)| {
                let mut phases = PhaseStats::default();
                for item in items {
                    let swing = item.swing_cp.unsigned_abs();
                    let is_blunder = swing >= self.config.breakpoint_swing_cp.unsigned_abs();
                    phases.phase_mut(self.phase_of(item.ply)).add(swing, is_blunder);
                }
                summary.merge(&phases);
                GamePhaseStats {
                    game_id: (*game_id).to_owned(),
                    phases,
                }
            })
            .collect();
        PhaseReport {
            summary,
            games_analyzed: per_game.len(),
            per_game,
        }
    }

    fn opening_breakpoints(
        &self,
        games: &[Game],
        by_game: &BTreeMap<&str, Vec<&TrainingItem>>,
    ) -> Vec<OpeningBreakpoint> {
        let threshold = self.config.breakpoint_swing_cp.unsigned_abs();
        let mut groups = BTreeMap::<(&str, usize), Vec<u32>>::new();
        for game in games {
            let Some(items) = by_game.get(game.game_id.as_str()) else {
                continue;
            };
            let breakpoint = items
                .iter()
                .take_while(|item| move_number(item.ply) <= self.config.opening_max_move)
                .find(|item| item.swing_cp.unsigned_abs() >= threshold);
            if let Some(item) = breakpoint {
                groups
                    .entry((game.opening_name(), move_number(item.ply)))
                    .or_default()
                    .push(item.swing_cp.unsigned_abs());
            }
        }

        let mut breakpoints: Vec<_> = groups
            .into_iter()
            .map(|((opening, move_number), swings)| {
                let total: u64 = swings.iter().map(|&swing| u64::from(swing)).sum();
                #[expect(clippy::cast_precision_loss)]
                let avg_swing = total as f64 / swings.len() as f64;
                OpeningBreakpoint {
                    opening: opening.to_owned(),
                    move_number,
                    count: swings.len(),
                    avg_swing,
                }
            })
            .collect();
        breakpoints.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then(b.avg_swing.total_cmp(&a.avg_swing))
        });
        breakpoints.truncate(self.config.max_breakpoints);
        breakpoints
    }

    fn conversion(
        &self,
        username: &str,
        games: &[Game],
        by_game: &BTreeMap<&str, Vec<&TrainingItem>>,
    ) -> ConversionStats {
        let threshold = self.config.advantage_cp.unsigned_abs();
        let mut total_advantaged = 0;
        let mut failed_conversions = 0;
        for game in games {
            let had_advantage = by_game.get(game.game_id.as_str()).is_some_and(|items| {
                items
                    .iter()
                    .any(|item| item.swing_cp.unsigned_abs() >= threshold)
            });
            if !had_advantage {
                continue;
            }
            total_advantaged += 1;
            let is_white = game.color_of(username) == Some(Color::White);
            let won = match game.result.trim() {
                "1-0" => is_white,
                "0-1" => !is_white,
                _ => false,
            };
            if !won {
                failed_conversions += 1;
            }
        }
        let conversion_rate = if total_advantaged == 0 {
            0.0
        } else {
            #[expect(clippy::cast_precision_loss)]
            let rate = (total_advantaged - failed_conversions) as f64 / total_advantaged as f64;
            rate
        };
        ConversionStats {
            total_advantaged,
            failed_conversions,
            conversion_rate,
        }
    }
}

/// Items grouped per game, in ply order.
fn group_by_game(items: &[TrainingItem]) -> BTreeMap<&str, Vec<&TrainingItem>> {
    let mut by_game = BTreeMap::<&str, Vec<&TrainingItem>>::new();
    for item in items {
        by_game.entry(item.game_id.as_str()).or_default().push(item);
    }
    for items in by_game.values_mut() {
        items.sort_by_key(|item| item.ply);
    }
    by_game
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone as _, Utc};

    use super::*;
    use crate::item::test_util::item;

    fn game(game_id: &str, opening: Option<&str>, result: &str) -> Game {
        Game {
            platform: "lichess".to_owned(),
            game_id: game_id.to_owned(),
            played_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            white: "Alice".to_owned(),
            black: "bob".to_owned(),
            result: result.to_owned(),
            move_text: "1. e4 e5".to_owned(),
            opening: opening.map(str::to_owned),
            time_control: None,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_move_number_and_phase() {
        assert_eq!(move_number(0), 1);
        assert_eq!(move_number(1), 1);
        assert_eq!(move_number(2), 1);
        assert_eq!(move_number(3), 2);
        let analyzer = ProAnalyzer::default();
        assert_eq!(analyzer.phase_of(24), GamePhase::Opening);
        assert_eq!(analyzer.phase_of(25), GamePhase::Middlegame);
        assert_eq!(analyzer.phase_of(79), GamePhase::Endgame);
    }

    #[test]
    fn test_phase_report() {
        let items = [
            item(1, "g1", 10, 300, &[]),
            item(2, "g1", 12, -100, &[]),
            item(3, "g1", 50, 500, &[]),
            item(4, "g2", 90, 200, &[]),
        ];
        let report = ProAnalyzer::default().analyze("alice", &[], &items).phases;
        assert_eq!(report.games_analyzed, 2);
        assert_eq!(report.per_game[0].game_id, "g1");
        let g1 = &report.per_game[0].phases;
        assert_eq!(g1.opening.positions, 2);
        assert!(approx(g1.opening.avg_swing, 200.0));
        assert_eq!(g1.opening.blunders, 1);
        assert_eq!(g1.middlegame.blunders, 1);
        assert_eq!(report.summary.endgame.positions, 1);
        assert!(approx(report.summary.endgame.avg_swing, 200.0));
        assert!(approx(report.summary.middlegame.avg_swing, 500.0));
    }

    #[test]
    fn test_breakpoints_take_first_opening_swing() {
        let g1 = game("g1", Some("Italian Game"), "1-0");
        let g2 = game("g2", Some("Italian Game"), "0-1");
        let g3 = game("g3", None, "1/2-1/2");
        let items = [
            item(1, "g1", 9, 400, &[]),
            item(2, "g1", 15, 900, &[]),
            item(3, "g2", 10, 200, &[]),
            item(4, "g3", 8, 100, &[]),
            item(5, "g3", 40, 800, &[]),
        ];
        let breakpoints = ProAnalyzer::default()
            .analyze("alice", &[g1, g2, g3], &items)
            .opening_breakpoints;
        assert_eq!(breakpoints.len(), 1);
        assert_eq!(breakpoints[0].opening, "Italian Game");
        assert_eq!(breakpoints[0].move_number, 5);
        assert_eq!(breakpoints[0].count, 2);
        assert!(approx(breakpoints[0].avg_swing, 300.0));
    }

    #[test]
    fn test_conversion() {
        let won = game("g1", None, "1-0");
        let lost = game("g2", None, "0-1");
        let quiet = game("g3", None, "0-1");
        let items = [
            item(1, "g1", 20, 400, &[]),
            item(2, "g2", 20, 300, &[]),
            item(3, "g3", 20, 50, &[]),
        ];
        let conversion = ProAnalyzer::default()
            .analyze("alice", &[won, lost, quiet], &items)
            .conversion;
        assert_eq!(conversion.total_advantaged, 2);
        assert_eq!(conversion.failed_conversions, 1);
        assert!(approx(conversion.conversion_rate, 0.5));
    }
}
