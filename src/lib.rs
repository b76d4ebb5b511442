//! Tactica engine library.
//!
//! Deterministic tactical evaluation for turn-based tabletop wargames:
//! game-state model, vector encoding and position hashing, heuristic
//! evaluation, legal action generation, opening-book lookup and greedy
//! action recommendation. The game rules themselves are supplied by the
//! caller through [`search::ApplyAction`].

pub mod board;
pub mod config;
pub mod encoding;
pub mod engine;
pub mod eval;
pub mod movegen;
pub mod numeric;
pub mod opening_book;
pub mod protocol;
pub mod search;

pub use board::{Action, GameState, Side};
pub use config::{ConfigError, EngineConfig};
pub use engine::Engine;
pub use eval::{Evaluate, Evaluation, HeuristicEvaluator};
pub use search::{ApplyAction, Recommend, Recommendation};
