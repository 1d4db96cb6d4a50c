//! From tagged training positions to a personal training programme.
//!
//! This crate covers the coaching half of the training pipeline:
//!
//! 1. **Statistics** ([`tag_stats`], [`diagnostics`]) - Folds attempt counters of
//!    training items into per-tag solve rates and merges them with structure and
//!    opening frequencies into one ranked list of skill signals.
//!
//! 2. **Planning** ([`plan`], [`curriculum`], [`courses`]) - Turns the ranked signals
//!    and the day's [`Fatigue`](fatigue::Fatigue) into a daily plan, a seven-day
//!    curriculum and course material.
//!
//! 3. **Practice** ([`session`], [`review`]) - Picks puzzles for a session and
//!    schedules spaced reviews of unsolved items.
//!
//! 4. **Deep Diagnostics** ([`pro`]) - Phase-of-game swings, opening breakpoints and
//!    conversion of advantages.
//!
//! [`Coach`](coach::Coach) wires every stage to a [`Repository`](repository::Repository).
//!
//! # Architecture
//!
//! ```text
//!               ┌─────────────── Repository ───────────────┐
//!               │ games · items · reviews · check-ins · curricula
//!               └───────────────────┬──────────────────────┘
//!                                   │
//!                                 Coach
//!        ┌──────────┬───────────┬───┴──────┬─────────────┬──────────┐
//!   TagStats   Diagnostics   PlanBuilder  CurriculumBuilder  Session   ProAnalyzer
//!                                │              │
//!                         TextGenerator?   ReviewScheduler
//! ```
//!
//! # Design Principles
//!
//! ## Stages Are Pure
//!
//! Every stage takes plain data and returns plain data. Only the coach and the review
//! scheduler touch the repository, and the clock is always an argument.
//!
//! ## Optional Capabilities
//!
//! Opening statistics are a repository capability, text generation is an optional
//! argument. Without either, the pipeline produces the same shape of output with less
//! content.
//!
//! ## Bounded Output
//!
//! Scores lie in `[0, 1]`, plans fit their minute budget and every listing takes a
//! limit.

pub mod coach;
pub mod config;
pub mod courses;
pub mod curriculum;
pub mod diagnostics;
pub mod fatigue;
pub mod item;
pub mod memory;
pub mod plan;
pub mod pro;
pub mod repository;
pub mod review;
pub mod session;
pub mod tag_stats;
pub mod text;
