//! Chess rules for the training pipeline.
//!
//! This crate provides the board model every other crate builds on:
//!
//! - [`core`] - Squares, colors, pieces, bitboards and attack sets
//! - [`position`] - Immutable positions, legal move generation, FEN and SAN
//! - [`notation`] - PGN games and space-separated UCI move lines
//!
//! Positions are small `Copy` values, so analysis code can freely keep the position
//! before and after a move side by side.

pub use self::{core::*, notation::*, position::*};

pub mod core;
pub mod notation;
pub mod position;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("illegal move {mv} in position {fen}")]
pub struct IllegalMoveError {
    #[error(not(source))]
    pub mv: Move,
    #[error(not(source))]
    pub fen: String,
}
