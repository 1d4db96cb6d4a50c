use chrono::{DateTime, Utc};
use oxicoach_board::{Color, Move, PgnError, PgnGame, Position};
use serde::{Deserialize, Serialize};

/// A finished game as fetched from a playing platform.
///
/// Identity is `(username, platform, game_id)`; the username is the account the game
/// was imported for and is held by the repository, not by the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub platform: String,
    pub game_id: String,
    pub played_at: DateTime<Utc>,
    pub white: String,
    pub black: String,
    /// `1-0`, `0-1`, `1/2-1/2` or `*`.
    pub result: String,
    /// Full PGN, tags included.
    pub move_text: String,
    #[serde(default)]
    pub opening: Option<String>,
    #[serde(default)]
    pub time_control: Option<String>,
}

impl Game {
    /// Start position and main-line moves of the game.
    pub fn replay(&self) -> Result<(Position, Vec<Move>), PgnError> {
        PgnGame::parse(&self.move_text).mainline()
    }

    /// Color `username` played with, compared case-insensitively.
    #[must_use]
    pub fn color_of(&self, username: &str) -> Option<Color> {
        if self.white.eq_ignore_ascii_case(username) {
            Some(Color::White)
        } else if self.black.eq_ignore_ascii_case(username) {
            Some(Color::Black)
        } else {
            None
        }
    }

    /// Opening name, or `"Unknown"` when the platform did not provide one.
    #[must_use]
    pub fn opening_name(&self) -> &str {
        self.opening.as_deref().unwrap_or("Unknown")
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum GameSourceError {
    #[display("user {username:?} not found on {platform}")]
    UserNotFound {
        #[error(not(source))]
        username: String,
        #[error(not(source))]
        platform: String,
    },
    #[display("fetching games failed: {reason}")]
    Transport {
        #[error(not(source))]
        reason: String,
    },
}

/// Capability to fetch a player's games from a platform.
pub trait GameSource {
    /// Platform identifier stored with every fetched game (e.g. `lichess`).
    fn platform(&self) -> &str;

    /// Fetches up to `limit` games of `username`, newest first when possible.
    fn fetch_games(&mut self, username: &str, limit: usize) -> Result<Vec<Game>, GameSourceError>;
}

#[cfg(test)]
pub(crate) mod test_util {
    use chrono::TimeZone as _;

    use super::*;

    pub(crate) fn game(game_id: &str, move_text: &str) -> Game {
        Game {
            platform: "lichess".to_owned(),
            game_id: game_id.to_owned(),
            played_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            white: "alice".to_owned(),
            black: "bob".to_owned(),
            result: "*".to_owned(),
            move_text: move_text.to_owned(),
            opening: None,
            time_control: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{test_util::game, *};

    #[test]
    fn test_replay_and_color() {
        let g = game("g1", "[White \"alice\"]\n\n1. e4 e5 2. Nf3 *");
        let (start, moves) = g.replay().unwrap();
        assert_eq!(start, Position::starting());
        assert_eq!(moves.len(), 3);
        assert_eq!(g.color_of("ALICE"), Some(Color::White));
        assert_eq!(g.color_of("bob"), Some(Color::Black));
        assert_eq!(g.color_of("carol"), None);
    }

    #[test]
    fn test_replay_rejects_broken_move_text() {
        let g = game("g2", "1. e4 e5 2. Qxf7");
        assert!(g.replay().is_err());
    }

    #[test]
    fn test_opening_name_defaults_to_unknown() {
        let mut g = game("g3", "");
        assert_eq!(g.opening_name(), "Unknown");
        g.opening = Some("Sicilian Defense".to_owned());
        assert_eq!(g.opening_name(), "Sicilian Defense");
    }
}
