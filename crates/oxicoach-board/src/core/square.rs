use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::bit_board::BitBoard;

/// Side to move / owner of a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub const ALL: [Self; 2] = [Self::White, Self::Black];

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Rank the pieces of this color start on (0 for white, 7 for black).
    #[must_use]
    pub const fn home_rank(self) -> u8 {
        match self {
            Self::White => 0,
            Self::Black => 7,
        }
    }

    /// Rank direction in which pawns of this color advance.
    #[must_use]
    pub const fn forward(self) -> i8 {
        match self {
            Self::White => 1,
            Self::Black => -1,
        }
    }

    #[must_use]
    pub const fn fold<T: Copy>(self, white: T, black: T) -> T {
        match self {
            Self::White => white,
            Self::Black => black,
        }
    }

    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::White => 'w',
            Self::Black => 'b',
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.fold("white", "black"))
    }
}

/// A square of the board, indexed `0..64` from a1 to h8 (rank-major).
///
/// `file` and `rank` are zero-based: a1 is `(0, 0)`, h8 is `(7, 7)`.
///
/// # Example
///
/// ```
/// use oxicoach_board::Square;
///
/// let e4: Square = "e4".parse().unwrap();
/// assert_eq!(e4.file(), 4);
/// assert_eq!(e4.rank(), 3);
/// assert_eq!(e4.to_string(), "e4");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Square(u8);

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid square: {_0:?}")]
pub struct ParseSquareError(#[error(not(source))] pub String);

impl Square {
    pub const A1: Self = Self(0);
    pub const E1: Self = Self(4);
    pub const H1: Self = Self(7);
    pub const A8: Self = Self(56);
    pub const E8: Self = Self(60);
    pub const H8: Self = Self(63);

    #[must_use]
    pub const fn new(file: u8, rank: u8) -> Self {
        assert!(file < 8 && rank < 8);
        Self(rank * 8 + file)
    }

    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 64 { Some(Self(index)) } else { None }
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..64).map(Self)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub const fn file(self) -> u8 {
        self.0 & 7
    }

    #[must_use]
    pub const fn rank(self) -> u8 {
        self.0 >> 3
    }

    #[must_use]
    pub const fn bit(self) -> BitBoard {
        BitBoard::from_bits(1 << self.0)
    }

    /// Returns the square shifted by `(file_delta, rank_delta)`, or `None` when it
    /// falls off the board.
    #[must_use]
    #[expect(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub const fn offset(self, file_delta: i8, rank_delta: i8) -> Option<Self> {
        let file = self.file() as i8 + file_delta;
        let rank = self.rank() as i8 + rank_delta;
        if file < 0 || file > 7 || rank < 0 || rank > 7 {
            return None;
        }
        Some(Self::new(file as u8, rank as u8))
    }

    /// Rank as seen from `color`'s side (0 = its home rank).
    #[must_use]
    pub const fn relative_rank(self, color: Color) -> u8 {
        match color {
            Color::White => self.rank(),
            Color::Black => 7 - self.rank(),
        }
    }

    #[must_use]
    pub const fn file_char(self) -> char {
        (b'a' + self.file()) as char
    }

    #[must_use]
    pub const fn rank_char(self) -> char {
        (b'1' + self.rank()) as char
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_char(), self.rank_char())
    }
}

impl FromStr for Square {
    type Err = ParseSquareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let &[file, rank] = s.as_bytes() else {
            return Err(ParseSquareError(s.to_owned()));
        };
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return Err(ParseSquareError(s.to_owned()));
        }
        Ok(Self::new(file - b'a', rank - b'1'))
    }
}

impl Serialize for Square {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Square {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
