use std::{
    fmt,
    ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, Not},
};

use super::square::Square;

/// Set of squares packed into a `u64`.
///
/// Bit `N` corresponds to [`Square`] index `N` (a1 = bit 0, h8 = bit 63).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BitBoard(u64);

impl BitBoard {
    pub const EMPTY: Self = Self(0);
    pub const ALL: Self = Self(!0);

    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// All squares on the given file (0 = a-file).
    #[must_use]
    pub const fn file(file: u8) -> Self {
        Self(0x0101_0101_0101_0101 << file)
    }

    /// All squares on the given rank (0 = first rank).
    #[must_use]
    pub const fn rank(rank: u8) -> Self {
        Self(0xff << (rank * 8))
    }

    #[must_use]
    pub const fn contains(self, square: Square) -> bool {
        self.0 & (1 << square.index()) != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn any(self) -> bool {
        self.0 != 0
    }

    #[must_use]
    pub const fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    #[must_use]
    pub const fn with(self, square: Square) -> Self {
        Self(self.0 | (1 << square.index()))
    }

    #[must_use]
    pub const fn without(self, square: Square) -> Self {
        Self(self.0 & !(1 << square.index()))
    }

    /// Lowest-index square in the set.
    #[must_use]
    pub fn first(self) -> Option<Square> {
        if self.0 == 0 {
            return None;
        }
        #[expect(clippy::cast_possible_truncation)]
        let index = self.0.trailing_zeros() as u8;
        Square::from_index(index)
    }

    /// Returns the only square in the set, or `None` if it holds zero or several.
    #[must_use]
    pub fn single(self) -> Option<Square> {
        if self.count() == 1 { self.first() } else { None }
    }

    pub fn iter(self) -> impl Iterator<Item = Square> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            #[expect(clippy::cast_possible_truncation)]
            let index = bits.trailing_zeros() as u8;
            bits &= bits - 1;
            Square::from_index(index)
        })
    }
}

impl IntoIterator for BitBoard {
    type Item = Square;
    type IntoIter = Box<dyn Iterator<Item = Square>>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl FromIterator<Square> for BitBoard {
    fn from_iter<T: IntoIterator<Item = Square>>(iter: T) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl BitAnd for BitBoard {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for BitBoard {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl BitOr for BitBoard {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for BitBoard {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitXor for BitBoard {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

impl Not for BitBoard {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Debug for BitBoard {
    /// Renders the set as an 8x8 grid, rank 8 on top.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BitBoard({:#018x})", self.0)?;
        for rank in (0..8).rev() {
            for file in 0..8 {
                let c = if self.contains(Square::new(file, rank)) {
                    'x'
                } else {
                    '.'
                };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn test_file_and_rank_masks() {
        let d_file = BitBoard::file(3);
        assert_eq!(d_file.count(), 8);
        assert!(d_file.contains(sq("d1")));
        assert!(d_file.contains(sq("d8")));
        assert!(!d_file.contains(sq("e4")));

        let second = BitBoard::rank(1);
        assert_eq!(second.count(), 8);
        assert!(second.contains(sq("a2")));
        assert!(second.contains(sq("h2")));
    }

    #[test]
    fn test_iter_visits_squares_in_index_order() {
        let set: BitBoard = [sq("h8"), sq("a1"), sq("e4")].into_iter().collect();
        let squares: Vec<_> = set.iter().map(|s| s.to_string()).collect();
        assert_eq!(squares, ["a1", "e4", "h8"]);
    }

    #[test]
    fn test_single() {
        assert_eq!(BitBoard::EMPTY.single(), None);
        assert_eq!(sq("c3").bit().single(), Some(sq("c3")));
        assert_eq!((sq("c3").bit() | sq("c4").bit()).single(), None);
    }

    #[test]
    fn test_with_without() {
        let set = BitBoard::EMPTY.with(sq("b2")).with(sq("g7"));
        assert_eq!(set.count(), 2);
        let set = set.without(sq("b2"));
        assert_eq!(set.first(), Some(sq("g7")));
    }
}
