//! Concrete implementations of the pipeline's external capabilities.

pub mod lichess;
pub mod ollama;
pub mod uci;
