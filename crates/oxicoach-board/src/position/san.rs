use crate::core::{Role, Square};

use super::{CastlingSide, Move, Position};

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum SanError {
    #[display("malformed SAN: {san:?}")]
    Syntax {
        #[error(not(source))]
        san: String,
    },
    #[display("SAN {san:?} matches no legal move")]
    Illegal {
        #[error(not(source))]
        san: String,
    },
    #[display("SAN {san:?} is ambiguous")]
    Ambiguous {
        #[error(not(source))]
        san: String,
    },
}

#[derive(Debug, Clone, Copy)]
struct SanPattern {
    role: Role,
    to: Square,
    promotion: Option<Role>,
    from_file: Option<u8>,
    from_rank: Option<u8>,
}

impl SanPattern {
    fn parse(san: &str) -> Option<Self> {
        let bytes = san.as_bytes();
        let (role, rest) = match bytes.first()? {
            c @ (b'N' | b'B' | b'R' | b'Q' | b'K') => {
                (Role::from_char(char::from(*c))?, &bytes[1..])
            }
            _ => (Role::Pawn, bytes),
        };

        let (rest, promotion) = match rest {
            [head @ .., b'=', p] | [head @ .., p @ (b'N' | b'B' | b'R' | b'Q')]
                if role == Role::Pawn =>
            {
                let promotion = Role::from_char(char::from(*p))?;
                if !Role::PROMOTIONS.contains(&promotion) {
                    return None;
                }
                (head, Some(promotion))
            }
            _ => (rest, None),
        };

        let [qualifier @ .., file @ b'a'..=b'h', rank @ b'1'..=b'8'] = rest else {
            return None;
        };
        let to = Square::new(file - b'a', rank - b'1');

        let mut from_file = None;
        let mut from_rank = None;
        for &c in qualifier {
            match c {
                b'a'..=b'h' if from_file.is_none() && from_rank.is_none() => {
                    from_file = Some(c - b'a');
                }
                b'1'..=b'8' if from_rank.is_none() => from_rank = Some(c - b'1'),
                b'x' | b'-' | b':' => {}
                _ => return None,
            }
        }

        Some(Self {
            role,
            to,
            promotion,
            from_file,
            from_rank,
        })
    }

    fn matches(&self, pos: &Position, mv: Move) -> bool {
        pos.piece_at(mv.from()).map(|p| p.role) == Some(self.role)
            && mv.to() == self.to
            && mv.promotion() == self.promotion
            && pos.castling_side(mv).is_none()
            && self.from_file.is_none_or(|f| mv.from().file() == f)
            && self.from_rank.is_none_or(|r| mv.from().rank() == r)
    }
}

impl Position {
    /// Resolves a Standard Algebraic Notation move against this position.
    ///
    /// Check/mate markers and annotation glyphs (`+`, `#`, `!`, `?`) are ignored.
    /// Castling may be written with letter O or digit zero.
    pub fn parse_san(&self, san: &str) -> Result<Move, SanError> {
        let trimmed = san.trim_end_matches(['+', '#', '!', '?']);
        let castling = match trimmed {
            "O-O" | "0-0" => Some(CastlingSide::KingSide),
            "O-O-O" | "0-0-0" => Some(CastlingSide::QueenSide),
            _ => None,
        };

        let legal = self.legal_moves();
        let candidates: Vec<Move> = if let Some(side) = castling {
            legal
                .iter()
                .copied()
                .filter(|&mv| self.castling_side(mv) == Some(side))
                .collect()
        } else {
            let pattern = SanPattern::parse(trimmed).ok_or_else(|| SanError::Syntax {
                san: san.to_owned(),
            })?;
            legal
                .iter()
                .copied()
                .filter(|&mv| pattern.matches(self, mv))
                .collect()
        };

        match candidates.as_slice() {
            [mv] => Ok(*mv),
            [] => Err(SanError::Illegal {
                san: san.to_owned(),
            }),
            _ => Err(SanError::Ambiguous {
                san: san.to_owned(),
            }),
        }
    }

    /// Formats a legal move in Standard Algebraic Notation, including the check or
    /// mate suffix.
    #[must_use]
    pub fn san(&self, mv: Move) -> String {
        let mut san = String::new();
        match self.castling_side(mv) {
            Some(CastlingSide::KingSide) => san.push_str("O-O"),
            Some(CastlingSide::QueenSide) => san.push_str("O-O-O"),
            None => {
                let role = self.piece_at(mv.from()).map_or(Role::Pawn, |p| p.role);
                let capture = self.is_capture(mv);
                match role.san_char() {
                    Some(c) => {
                        san.push(c);
                        san.push_str(&self.disambiguation(mv, role));
                    }
                    None if capture => san.push(mv.from().file_char()),
                    None => {}
                }
                if capture {
                    san.push('x');
                }
                san.push_str(&mv.to().to_string());
                if let Some(promotion) = mv.promotion() {
                    san.push('=');
                    san.push(promotion.san_char().unwrap_or('Q'));
                }
            }
        }

        let next = self.play_unchecked(mv);
        if next.is_checkmate() {
            san.push('#');
        } else if next.is_check() {
            san.push('+');
        }
        san
    }

    fn disambiguation(&self, mv: Move, role: Role) -> String {
        let rivals: Vec<Square> = self
            .legal_moves()
            .iter()
            .filter(|other| {
                other.to() == mv.to()
                    && other.from() != mv.from()
                    && self.piece_at(other.from()).map(|p| p.role) == Some(role)
            })
            .map(|other| other.from())
            .collect();
        if rivals.is_empty() {
            return String::new();
        }
        let from = mv.from();
        if rivals.iter().all(|sq| sq.file() != from.file()) {
            from.file_char().to_string()
        } else if rivals.iter().all(|sq| sq.rank() != from.rank()) {
            from.rank_char().to_string()
        } else {
            from.to_string()
        }
    }
}
