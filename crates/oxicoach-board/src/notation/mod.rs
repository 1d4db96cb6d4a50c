//! Text notations built on top of [`Position`](crate::Position): PGN games and move lines.

pub use self::{move_text::*, pgn::*};

mod move_text;
mod pgn;
