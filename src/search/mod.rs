//! Action recommendation.
//!
//! Picks an action for the side to move by applying each legal candidate
//! through an injected rules engine and scoring the successors. The rules of
//! the game live outside this crate; [`ApplyAction`] is the seam. Deeper
//! searches plug in as further [`Recommend`] implementations.

pub mod greedy;

use serde::{Deserialize, Serialize};

use crate::board::{Action, GameState, Side};
use crate::config::{check_range, ConfigError};
use crate::eval::{EvalError, Evaluation};

pub use greedy::{BookPolicy, GreedyRecommender};

/// Error type rules engines report through [`ApplyAction`].
pub type ApplyError = Box<dyn std::error::Error + Send + Sync>;

/// Produces the successor of a state after an action.
pub trait ApplyAction: Send + Sync {
    fn apply(&self, state: &GameState, action: &Action) -> Result<GameState, ApplyError>;
}

impl<F> ApplyAction for F
where
    F: Fn(&GameState, &Action) -> Result<GameState, ApplyError> + Send + Sync,
{
    fn apply(&self, state: &GameState, action: &Action) -> Result<GameState, ApplyError> {
        self(state, action)
    }
}

/// Recommendation errors. Surfaced as-is; no fallback action is chosen.
#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("evaluation failed: {0}")]
    Evaluate(#[from] EvalError),

    #[error("rules engine rejected {action:?}: {source}")]
    Apply {
        action: Action,
        #[source]
        source: ApplyError,
    },
}

/// Where a recommendation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Book,
    Calculated,
}

/// The chosen action and the evaluation of the state it leads to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub action: Action,
    pub evaluation: Evaluation,
    pub source: Source,
    /// Legal actions considered.
    pub candidates: usize,
}

/// Chooses actions.
pub trait Recommend {
    fn recommend(&self, state: &GameState, perspective: Side) -> Result<Recommendation, RecommendError>;
}

/// Recommender policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    /// Minimum book confidence for playing a book follow-up. `None` never
    /// consults the book.
    pub book_threshold: Option<f64>,
    /// Faction whose book entries are eligible; `None` admits every entry.
    pub faction: Option<String>,
    /// Evaluate candidates on the rayon pool.
    pub parallel: bool,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        RecommendConfig {
            book_threshold: None,
            faction: None,
            parallel: true,
        }
    }
}

impl RecommendConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(t) = self.book_threshold {
            check_range("book_threshold", t, 0.0, 1.0)?;
        }
        Ok(())
    }
}
