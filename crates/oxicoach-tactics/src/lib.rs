//! Turning played games into tagged training positions.
//!
//! This crate covers the analysis half of the training pipeline:
//!
//! 1. **Blunder Mining** ([`blunder_miner`]) - Replays games ply by ply, asks an
//!    [`EvaluationPort`](evaluation::EvaluationPort) about each position and flags the
//!    plies where the played move lost significant value.
//!
//! 2. **Motif Tagging** ([`motif`]) - Labels a flagged position with the tactical themes
//!    its best line exploits (mate, fork, pin, ...).
//!
//! 3. **Structure Detection** ([`structure`]) - Classifies a fixed-depth snapshot of each
//!    game into pawn-structure archetypes.
//!
//! # Architecture
//!
//! ```text
//! GameSource ──► Game ──► BlunderMiner ──► Blunder ──► MotifTagger ──► MotifSet
//!                  │            ▲
//!                  │     EvaluationPort
//!                  ▼
//!          StructureDetector ──► StructureReport
//! ```
//!
//! Both external capabilities, [`GameSource`](game::GameSource) and
//! [`EvaluationPort`](evaluation::EvaluationPort), are traits. Callers construct the
//! adapters and pass them in; nothing here owns a process or a connection.
//!
//! # Design Principles
//!
//! ## Pure Predicates
//!
//! Motif and structure rules are small functions over an immutable
//! [`Position`](oxicoach_board::Position) snapshot. Each one can be tested on a single
//! FEN string without any engine.
//!
//! ## Loud Failures, Soft Data Gaps
//!
//! An evaluation failure aborts mining with a typed error; an unparseable game or an
//! unplayable principal line is skipped and the stage continues with what is left.
//!
//! # Current Limitations
//!
//! - **First move only**: motif rules only look at the first move of the principal line.
//! - **Single snapshot**: structures are sampled at one ply per game.
//! - **Fixed thresholds**: swing and mate thresholds are empirical and configurable, not
//!   derived from data.

pub mod blunder_miner;
pub mod evaluation;
pub mod game;
pub mod motif;
pub mod structure;
