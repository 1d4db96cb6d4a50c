pub use self::{bit_board::*, piece::*, square::*};

pub mod attacks;
pub(crate) mod bit_board;
pub(crate) mod piece;
pub(crate) mod square;
