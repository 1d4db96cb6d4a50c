//! Minimal PGN reading: tag pairs, main-line movetext and multi-game exports.

use crate::position::{FenError, Move, Position};

use super::move_text::{MoveTextError, replay_san};

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum PgnError {
    #[display("invalid FEN tag: {_0}")]
    Fen(FenError),
    #[display("{_0}")]
    MoveText(MoveTextError),
}

/// A single game split into its tag pairs and movetext.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgnGame {
    pub headers: Vec<(String, String)>,
    pub movetext: String,
}

impl PgnGame {
    /// Splits `text` into tag pairs and movetext. Never fails: lines that look like
    /// malformed tags are treated as movetext and rejected later by [`Self::mainline`].
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut game = Self::default();
        for line in text.lines() {
            let trimmed = line.trim();
            if let Some(tag) = parse_tag(trimmed) {
                game.headers.push(tag);
                continue;
            }
            if !trimmed.is_empty() {
                if !game.movetext.is_empty() {
                    game.movetext.push('\n');
                }
                game.movetext.push_str(trimmed);
            }
        }
        game
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Initial position: the `FEN` tag when present, the standard setup otherwise.
    pub fn start_position(&self) -> Result<Position, FenError> {
        match self.header("FEN") {
            Some(fen) => Position::from_fen(fen),
            None => Ok(Position::starting()),
        }
    }

    /// Start position and main-line moves.
    pub fn mainline(&self) -> Result<(Position, Vec<Move>), PgnError> {
        let start = self.start_position()?;
        let moves = replay_san(&start, &self.movetext)?;
        Ok((start, moves))
    }
}

fn parse_tag(line: &str) -> Option<(String, String)> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    let (name, rest) = inner.split_once(char::is_whitespace)?;
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let value = rest.trim().strip_prefix('"')?.strip_suffix('"')?;
    Some((name.to_owned(), value.replace("\\\"", "\"")))
}

/// Splits a multi-game PGN export into one chunk per game.
///
/// A new game starts at every `[Event ` tag that follows some content.
#[must_use]
pub fn split_games(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.starts_with("[Event ") && !current.is_empty() {
            let chunk = current.join("\n");
            if !chunk.trim().is_empty() {
                chunks.push(chunk.trim().to_owned());
            }
            current.clear();
        }
        current.push(line);
    }
    let last = current.join("\n");
    if !last.trim().is_empty() {
        chunks.push(last.trim().to_owned());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_GAMES: &str = r#"[Event "Rated blitz game"]
[Site "https://lichess.org/abcd1234"]
[White "alice"]
[Black "bob"]
[Result "1-0"]
[Opening "Italian Game"]

1. e4 e5 2. Bc4 Nc6 3. Qh5 Nf6 4. Qxf7# 1-0

[Event "Rated rapid game"]
[Site "https://lichess.org/efgh5678"]
[White "bob"]
[Black "alice"]
[Result "0-1"]

1. d4 d5 0-1
"#;

    #[test]
    fn test_split_games() {
        let games = split_games(TWO_GAMES);
        assert_eq!(games.len(), 2);
        assert!(games[0].starts_with("[Event \"Rated blitz game\"]"));
        assert!(games[1].contains("efgh5678"));
    }

    #[test]
    fn test_parse_headers_and_mainline() {
        let chunk = &split_games(TWO_GAMES)[0];
        let game = PgnGame::parse(chunk);
        assert_eq!(game.header("White"), Some("alice"));
        assert_eq!(game.header("Opening"), Some("Italian Game"));
        assert_eq!(game.header("ECO"), None);

        let (start, moves) = game.mainline().unwrap();
        assert_eq!(start, Position::starting());
        assert_eq!(moves.len(), 7);
        assert_eq!(moves[6].to_string(), "h5f7");
    }

    #[test]
    fn test_fen_tag_sets_start() {
        let game = PgnGame::parse(
            "[FEN \"4k3/8/8/8/8/8/4P3/4K3 w - - 0 1\"]\n[SetUp \"1\"]\n\n1. e4 Kd7 *",
        );
        let (start, moves) = game.mainline().unwrap();
        assert_eq!(start.occupied().count(), 3);
        assert_eq!(moves.len(), 2);
    }

    #[test]
    fn test_garbage_movetext_is_an_error() {
        let game = PgnGame::parse("1. e4 e5 2. Qxf7");
        assert!(matches!(game.mainline(), Err(PgnError::MoveText(_))));
        let game = PgnGame::parse("[FEN \"not a fen\"]\n1. e4");
        assert!(matches!(game.mainline(), Err(PgnError::Fen(_))));
    }
}
