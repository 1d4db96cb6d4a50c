use std::fmt;

use serde::{Deserialize, Serialize};

use super::square::Color;

/// Kind of a chess piece, independent of its color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Role {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl Role {
    /// Number of roles (6).
    pub const LEN: usize = 6;

    pub const ALL: [Self; Self::LEN] = [
        Self::Pawn,
        Self::Knight,
        Self::Bishop,
        Self::Rook,
        Self::Queen,
        Self::King,
    ];

    /// Roles a pawn may promote to, strongest first.
    pub const PROMOTIONS: [Self; 4] = [Self::Queen, Self::Rook, Self::Bishop, Self::Knight];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Conventional material value in pawns.
    ///
    /// The king has no material value; it is given a value larger than every other
    /// role so that "worth at least a rook" style comparisons include it.
    #[must_use]
    pub const fn value(self) -> u32 {
        match self {
            Self::Pawn => 1,
            Self::Knight | Self::Bishop => 3,
            Self::Rook => 5,
            Self::Queen => 9,
            Self::King => 100,
        }
    }

    #[must_use]
    pub const fn is_slider(self) -> bool {
        matches!(self, Self::Bishop | Self::Rook | Self::Queen)
    }

    /// Lowercase letter used by FEN and UCI (`p`, `n`, `b`, `r`, `q`, `k`).
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Pawn => 'p',
            Self::Knight => 'n',
            Self::Bishop => 'b',
            Self::Rook => 'r',
            Self::Queen => 'q',
            Self::King => 'k',
        }
    }

    /// Uppercase letter used by SAN (`N`, `B`, `R`, `Q`, `K`; empty for pawns).
    #[must_use]
    pub const fn san_char(self) -> Option<char> {
        match self {
            Self::Pawn => None,
            Self::Knight => Some('N'),
            Self::Bishop => Some('B'),
            Self::Rook => Some('R'),
            Self::Queen => Some('Q'),
            Self::King => Some('K'),
        }
    }

    /// Parses a role from either case of its letter.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(Self::Pawn),
            'n' => Some(Self::Knight),
            'b' => Some(Self::Bishop),
            'r' => Some(Self::Rook),
            'q' => Some(Self::Queen),
            'k' => Some(Self::King),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pawn => "pawn",
            Self::Knight => "knight",
            Self::Bishop => "bishop",
            Self::Rook => "rook",
            Self::Queen => "queen",
            Self::King => "king",
        };
        f.write_str(name)
    }
}

/// A colored piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub color: Color,
    pub role: Role,
}

impl Piece {
    #[must_use]
    pub const fn new(color: Color, role: Role) -> Self {
        Self { color, role }
    }

    /// FEN letter: uppercase for white, lowercase for black.
    #[must_use]
    pub const fn as_char(self) -> char {
        let c = self.role.as_char();
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        let Some(role) = Role::from_char(c) else {
            return None;
        };
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Self { color, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piece_char_roundtrip() {
        for c in "PNBRQKpnbrqk".chars() {
            let piece = Piece::from_char(c).unwrap();
            assert_eq!(piece.as_char(), c);
        }
        assert_eq!(Piece::from_char('x'), None);
    }

    #[test]
    fn test_king_outvalues_everything() {
        for role in Role::ALL {
            if role != Role::King {
                assert!(Role::King.value() > role.value());
            }
        }
        assert!(Role::Queen.value() >= Role::Rook.value());
    }
}
