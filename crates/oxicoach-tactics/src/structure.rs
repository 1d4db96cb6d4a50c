//! Pawn-structure archetypes recognized in a player's games.
//!
//! Each game is replayed up to a fixed sample depth (default: 20 plies, or the end of
//! the game if it is shorter) and the resulting snapshot is classified by a set of pure
//! predicates over the [`Position`]. A [`StructureReport`] counts, per archetype, how
//! many sampled games showed it; turning counts into urgency happens one layer up.
//!
//! # Archetypes
//!
//! | Tag                      | Rule (for either side)                                        |
//! |--------------------------|---------------------------------------------------------------|
//! | `isolated_queen_pawn`    | d-pawn, no own pawn on the c- or e-file                       |
//! | `hanging_pawns`          | c- and d-pawns, no own pawn on the b- or e-file               |
//! | `carlsbad`               | d+e pawns without c vs. c+d pawns without e                   |
//! | `open_file`              | a central file (c to f) without any pawn                      |
//! | `opposite_side_castling` | both kings on their home rank, one on the king side, one on the queen side |
//!
//! A single snapshot per game is a coarse approximation: structures that appear later
//! in the middlegame are invisible, and transient structures at the sample ply count
//! the same as stable ones.

use std::{collections::BTreeMap, fmt, str::FromStr};

use oxicoach_board::{Color, Position, Role};
use serde::{Deserialize, Serialize};

use crate::game::Game;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StructureTag {
    IsolatedQueenPawn,
    HangingPawns,
    Carlsbad,
    OpenFile,
    OppositeSideCastling,
}

impl StructureTag {
    pub const ALL: [Self; 5] = [
        Self::IsolatedQueenPawn,
        Self::HangingPawns,
        Self::Carlsbad,
        Self::OpenFile,
        Self::OppositeSideCastling,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IsolatedQueenPawn => "isolated_queen_pawn",
            Self::HangingPawns => "hanging_pawns",
            Self::Carlsbad => "carlsbad",
            Self::OpenFile => "open_file",
            Self::OppositeSideCastling => "opposite_side_castling",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::IsolatedQueenPawn => "Isolated Queen Pawn",
            Self::HangingPawns => "Hanging Pawns",
            Self::Carlsbad => "Carlsbad Structure",
            Self::OpenFile => "Open File",
            Self::OppositeSideCastling => "Opposite-Side Castling",
        }
    }
}

impl fmt::Display for StructureTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown structure tag: {_0:?}")]
pub struct ParseStructureTagError(#[error(not(source))] pub String);

impl FromStr for StructureTag {
    type Err = ParseStructureTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| ParseStructureTagError(s.to_owned()))
    }
}

const FILE_B: u8 = 1;
const FILE_C: u8 = 2;
const FILE_D: u8 = 3;
const FILE_E: u8 = 4;
const FILE_F: u8 = 5;

/// Bit mask of the files holding at least one pawn of `color` (bit `n` = file `n`).
#[must_use]
pub fn pawn_files(position: &Position, color: Color) -> u8 {
    position
        .pieces(color, Role::Pawn)
        .iter()
        .fold(0, |mask, square| mask | (1 << square.file()))
}

fn has_file(mask: u8, file: u8) -> bool {
    mask & (1 << file) != 0
}

#[must_use]
pub fn isolated_queen_pawn(position: &Position, color: Color) -> bool {
    let files = pawn_files(position, color);
    has_file(files, FILE_D) && !has_file(files, FILE_C) && !has_file(files, FILE_E)
}

#[must_use]
pub fn hanging_pawns(position: &Position, color: Color) -> bool {
    let files = pawn_files(position, color);
    has_file(files, FILE_C)
        && has_file(files, FILE_D)
        && !has_file(files, FILE_B)
        && !has_file(files, FILE_E)
}

/// Carlsbad formation where `color` holds the d+e pawns (and can launch the minority
/// attack) against the opponent's c+d pawns.
#[must_use]
pub fn carlsbad(position: &Position, color: Color) -> bool {
    let own = pawn_files(position, color);
    let their = pawn_files(position, color.opposite());
    has_file(own, FILE_D)
        && has_file(own, FILE_E)
        && !has_file(own, FILE_C)
        && has_file(their, FILE_C)
        && has_file(their, FILE_D)
        && !has_file(their, FILE_E)
}

#[must_use]
pub fn open_central_file(position: &Position) -> bool {
    let files = pawn_files(position, Color::White) | pawn_files(position, Color::Black);
    (FILE_C..=FILE_F).any(|file| !has_file(files, file))
}

#[must_use]
pub fn opposite_side_castling(position: &Position) -> bool {
    let wing = |color: Color| {
        let king = position.king(color)?;
        if king.rank() != color.home_rank() {
            return None;
        }
        match king.file() {
            0..=2 => Some(false),
            6..=7 => Some(true),
            _ => None,
        }
    };
    match (wing(Color::White), wing(Color::Black)) {
        (Some(white), Some(black)) => white != black,
        _ => false,
    }
}

/// Every archetype present in `position`, in declaration order.
#[must_use]
pub fn classify(position: &Position) -> Vec<StructureTag> {
    let either = |predicate: fn(&Position, Color) -> bool| {
        Color::ALL.into_iter().any(|color| predicate(position, color))
    };
    let mut tags = Vec::new();
    if either(isolated_queen_pawn) {
        tags.push(StructureTag::IsolatedQueenPawn);
    }
    if either(hanging_pawns) {
        tags.push(StructureTag::HangingPawns);
    }
    if either(carlsbad) {
        tags.push(StructureTag::Carlsbad);
    }
    if open_central_file(position) {
        tags.push(StructureTag::OpenFile);
    }
    if opposite_side_castling(position) {
        tags.push(StructureTag::OppositeSideCastling);
    }
    tags
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Ply after which the snapshot is taken.
    pub sample_ply: usize,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self { sample_ply: 20 }
    }
}

/// Per-archetype game counts over a sample of games.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureReport {
    pub games_sampled: usize,
    pub counts: BTreeMap<StructureTag, usize>,
}

impl StructureReport {
    /// Archetypes seen in at least one game.
    #[must_use]
    pub fn present(&self) -> Vec<StructureTag> {
        self.counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(tag, _)| *tag)
            .collect()
    }

    /// Sum of all archetype occurrences.
    #[must_use]
    pub fn total_occurrences(&self) -> usize {
        self.counts.values().sum()
    }

    /// Share of `tag` among all archetype occurrences (0 when nothing was detected).
    #[must_use]
    pub fn frequency(&self, tag: StructureTag) -> f64 {
        let total = self.total_occurrences();
        if total == 0 {
            return 0.0;
        }
        let count = self.counts.get(&tag).copied().unwrap_or(0);
        #[expect(clippy::cast_precision_loss)]
        let frequency = count as f64 / total as f64;
        frequency
    }

    /// Builds a report from a plain list of archetypes, counting each once.
    #[must_use]
    pub fn from_tags(tags: &[StructureTag]) -> Self {
        let mut report = Self::default();
        for tag in tags {
            report.counts.insert(*tag, 1);
        }
        report
    }
}

#[derive(Debug, Clone, Default)]
pub struct StructureDetector {
    config: StructureConfig,
}

impl StructureDetector {
    #[must_use]
    pub fn new(config: StructureConfig) -> Self {
        Self { config }
    }

    /// Position after `sample_ply` plies (or the final position of a shorter game).
    ///
    /// `None` if the game cannot be replayed.
    #[must_use]
    pub fn snapshot(&self, game: &Game) -> Option<Position> {
        let (start, moves) = match game.replay() {
            Ok(replay) => replay,
            Err(err) => {
                tracing::warn!(game_id = %game.game_id, error = %err, "skipping unparseable game");
                return None;
            }
        };
        let position = moves
            .iter()
            .take(self.config.sample_ply)
            .fold(start, |position, &mv| position.play_unchecked(mv));
        Some(position)
    }

    /// Counts archetypes over `games`, at most once per game.
    #[must_use]
    pub fn detect(&self, games: &[Game]) -> StructureReport {
        let mut report = StructureReport::default();
        for position in games.iter().filter_map(|game| self.snapshot(game)) {
            report.games_sampled += 1;
            for tag in classify(&position) {
                *report.counts.entry(tag).or_default() += 1;
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::test_util::game;

    fn pos(fen: &str) -> Position {
        fen.parse().unwrap()
    }

    fn game_from(id: &str, fen: &str) -> Game {
        game(id, &format!("[FEN \"{fen}\"]\n\n*"))
    }

    const IQP: &str = "r1bq1rk1/pp2bppp/2n2n2/3p4/3N4/2N1B3/PP2BPPP/R2Q1RK1 b - - 0 1";
    const HANGING: &str = "4k3/pp3ppp/8/8/2PP4/8/P4PPP/4K3 w - - 0 1";
    const CARLSBAD: &str = "4k3/pp3ppp/2p5/3p4/3P4/4P3/PP3PPP/4K3 w - - 0 1";

    #[test]
    fn test_isolated_queen_pawn() {
        let p = pos(IQP);
        assert!(isolated_queen_pawn(&p, Color::Black));
        assert!(!isolated_queen_pawn(&p, Color::White));
        assert!(classify(&p).contains(&StructureTag::IsolatedQueenPawn));
    }

    #[test]
    fn test_hanging_pawns() {
        let p = pos(HANGING);
        assert!(hanging_pawns(&p, Color::White));
        assert!(!isolated_queen_pawn(&p, Color::White));
        assert!(open_central_file(&p));
    }

    #[test]
    fn test_carlsbad() {
        let p = pos(CARLSBAD);
        assert!(carlsbad(&p, Color::White));
        assert!(!carlsbad(&p, Color::Black));
        assert_eq!(classify(&p), [StructureTag::Carlsbad]);
    }

    #[test]
    fn test_opposite_side_castling() {
        assert!(opposite_side_castling(&pos(
            "2kr4/ppp5/8/8/8/8/5PPP/6K1 w - - 0 1"
        )));
        assert!(!opposite_side_castling(&Position::starting()));
    }

    #[test]
    fn test_starting_position_has_no_archetype() {
        assert!(classify(&Position::starting()).is_empty());
    }

    #[test]
    fn test_snapshot_stops_at_sample_ply() {
        let detector = StructureDetector::new(StructureConfig { sample_ply: 2 });
        let g = game("g", "1. e4 e5 2. Nf3 Nc6 *");
        let snapshot = detector.snapshot(&g).unwrap();
        assert_eq!(
            snapshot.to_fen(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2"
        );
    }

    #[test]
    fn test_detect_counts_once_per_game() {
        let games = [
            game_from("iqp1", IQP),
            game_from("iqp2", IQP),
            game_from("carlsbad", CARLSBAD),
            game("broken", "1. e4 e5 2. Qxf7 *"),
            game("short", "1. e4 *"),
        ];
        let report = StructureDetector::default().detect(&games);
        assert_eq!(report.games_sampled, 4);
        assert_eq!(report.counts[&StructureTag::IsolatedQueenPawn], 2);
        assert_eq!(report.counts[&StructureTag::Carlsbad], 1);
        // the IQP snapshots also have open c- and e-files
        assert_eq!(report.counts[&StructureTag::OpenFile], 2);
        assert_eq!(
            report.present(),
            [
                StructureTag::IsolatedQueenPawn,
                StructureTag::Carlsbad,
                StructureTag::OpenFile
            ]
        );
        assert!((report.frequency(StructureTag::Carlsbad) - 0.2).abs() < 1e-9);
        assert!(report.frequency(StructureTag::HangingPawns).abs() < f64::EPSILON);
    }
}
