//! Move sequences as text.
//!
//! Two forms are handled:
//!
//! - PGN movetext (`1. e4 e5 2. Nf3 {comment} Nc6 (2... d6) 1-0`), resolved move by
//!   move against a starting position
//! - Space-separated UCI lines (`e2e4 e7e5 g1f3`), the form principal lines are stored
//!   in; [`join_uci`] and [`split_uci`] round-trip exactly

use crate::position::{Move, ParseMoveError, Position, SanError};

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("move {token:?} at ply {ply} could not be played: {source}")]
pub struct MoveTextError {
    pub ply: usize,
    #[error(not(source))]
    pub token: String,
    pub source: SanError,
}

const RESULTS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

/// Extracts the SAN tokens of the main line.
///
/// Comments (`{...}` and `;` to end of line), variations, NAGs, move numbers and
/// game results are dropped.
#[must_use]
pub fn san_tokens(movetext: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut variation_depth = 0usize;
    let mut in_brace = false;
    let mut in_line_comment = false;

    for c in movetext.chars() {
        if in_line_comment {
            in_line_comment = c != '\n';
            continue;
        }
        if in_brace {
            in_brace = c != '}';
            continue;
        }
        match c {
            '{' => {
                flush(&mut current, &mut tokens);
                in_brace = true;
            }
            ';' => {
                flush(&mut current, &mut tokens);
                in_line_comment = true;
            }
            '(' => {
                flush(&mut current, &mut tokens);
                variation_depth += 1;
            }
            ')' => {
                flush(&mut current, &mut tokens);
                variation_depth = variation_depth.saturating_sub(1);
            }
            c if c.is_whitespace() => flush(&mut current, &mut tokens),
            c if variation_depth == 0 => current.push(c),
            _ => {}
        }
    }
    flush(&mut current, &mut tokens);
    tokens
}

fn flush(current: &mut String, tokens: &mut Vec<String>) {
    if let Some(token) = clean_token(current) {
        tokens.push(token);
    }
    current.clear();
}

fn clean_token(raw: &str) -> Option<String> {
    // "12." / "12..." / "12.e4"
    let token = match raw.rfind('.') {
        Some(dot) if raw[..dot].trim_end_matches('.').chars().all(|c| c.is_ascii_digit()) => {
            &raw[dot + 1..]
        }
        _ => raw,
    };
    if token.is_empty() || token.starts_with('$') || RESULTS.contains(&token) {
        return None;
    }
    Some(token.to_owned())
}

/// Resolves PGN movetext into moves, starting from `start`.
pub fn replay_san(start: &Position, movetext: &str) -> Result<Vec<Move>, MoveTextError> {
    let mut pos = *start;
    let mut moves = Vec::new();
    for (index, token) in san_tokens(movetext).into_iter().enumerate() {
        let mv = pos.parse_san(&token).map_err(|source| MoveTextError {
            ply: index + 1,
            token: token.clone(),
            source,
        })?;
        pos = pos.play_unchecked(mv);
        moves.push(mv);
    }
    Ok(moves)
}

/// Joins moves into a space-separated UCI line.
#[must_use]
pub fn join_uci(moves: &[Move]) -> String {
    moves
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits a space-separated UCI line into moves. An empty line yields no moves.
pub fn split_uci(line: &str) -> Result<Vec<Move>, ParseMoveError> {
    line.split_whitespace().map(Move::from_uci).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_san_tokens_strip_decorations() {
        let text = "1. e4 {best by test} e5 2.Nf3 $1 Nc6 (2... d6 3. d4) 3. Bb5 ; Spanish\n a6 1-0";
        assert_eq!(
            san_tokens(text),
            ["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"]
        );
    }

    #[test]
    fn test_black_move_number_and_castling_digits() {
        let text = "12... O-O 13. 0-0-0 *";
        assert_eq!(san_tokens(text), ["O-O", "0-0-0"]);
    }

    #[test]
    fn test_replay_san() {
        let moves = replay_san(&Position::starting(), "1. e4 e5 2. Nf3 Nc6").unwrap();
        assert_eq!(join_uci(&moves), "e2e4 e7e5 g1f3 b8c6");
    }

    #[test]
    fn test_replay_reports_failing_ply() {
        let err = replay_san(&Position::starting(), "1. e4 e5 2. Ke3").unwrap_err();
        assert_eq!(err.ply, 3);
        assert_eq!(err.token, "Ke3");
    }

    #[test]
    fn test_uci_line_roundtrip() {
        let line = "e2e4 e7e5 g1f3 b8c6 f1b5 a7a6 e1g1 g8f6 a2a4 f6e4 b5c6 d7c6 a4a5 b7b5 a5b6 e4c3 b6b7 c3d1 b7a8q";
        let moves = split_uci(line).unwrap();
        assert_eq!(moves.len(), 19);
        assert_eq!(join_uci(&moves), line);
        assert!(split_uci("").unwrap().is_empty());
        assert!(split_uci("e2e4 nonsense").is_err());
    }
}
