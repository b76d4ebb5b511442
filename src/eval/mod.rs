//! Position evaluation.
//!
//! Scores a game state from one side's perspective. The score lies in
//! [0, 1] with 0.5 meaning an even position, and the two sides' scores of
//! the same state always sum to 1. Evaluators are interchangeable behind
//! the [`Evaluate`] trait so a learned model can replace the heuristic.

pub(crate) mod heuristic;

use std::time::Duration;

use rayon::prelude::*;
use serde::{Deserialize, Serialize, Serializer};

use crate::board::{GameState, Side};
use crate::config::ConfigError;
use crate::numeric::Diagnostic;

pub use heuristic::{HeuristicEvaluator, OBJECTIVE_RANGE};

/// Allowed deviation of the weight sum from 1.0.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Evaluation errors.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("evaluator backend failed: {0}")]
    Backend(String),
}

/// Scores game states.
pub trait Evaluate: Send + Sync {
    fn evaluate(&self, state: &GameState, perspective: Side) -> Result<Evaluation, EvalError>;
}

/// The weighted heuristic terms, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Material,
    ObjectiveControl,
    VictoryPoints,
    Tempo,
}

pub const ALL_FACTORS: [Factor; 4] = [
    Factor::Material,
    Factor::ObjectiveControl,
    Factor::VictoryPoints,
    Factor::Tempo,
];

impl Factor {
    pub const fn name(self) -> &'static str {
        match self {
            Factor::Material => "material",
            Factor::ObjectiveControl => "objective_control",
            Factor::VictoryPoints => "victory_points",
            Factor::Tempo => "tempo",
        }
    }
}

/// Weight per factor. Must be finite, non-negative and sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalWeights {
    pub material: f64,
    pub objective_control: f64,
    pub victory_points: f64,
    pub tempo: f64,
}

impl Default for EvalWeights {
    fn default() -> Self {
        EvalWeights {
            material: 0.4,
            objective_control: 0.2,
            victory_points: 0.3,
            tempo: 0.1,
        }
    }
}

impl EvalWeights {
    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Material => self.material,
            Factor::ObjectiveControl => self.objective_control,
            Factor::VictoryPoints => self.victory_points,
            Factor::Tempo => self.tempo,
        }
    }

    pub fn sum(&self) -> f64 {
        ALL_FACTORS.iter().map(|f| self.get(*f)).sum()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for f in ALL_FACTORS {
            let value = self.get(f);
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    factor: f.name(),
                    value,
                });
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::WeightSum { sum });
        }
        Ok(())
    }

    /// The weights divided by their sum, so they add to 1 exactly enough for
    /// the two perspectives to complement each other.
    pub(crate) fn normalized(&self) -> EvalWeights {
        let s = self.sum();
        EvalWeights {
            material: self.material / s,
            objective_control: self.objective_control / s,
            victory_points: self.victory_points / s,
            tempo: self.tempo / s,
        }
    }
}

/// One factor's share of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FactorScore {
    pub factor: Factor,
    pub weight: f64,
    /// Normalized value for the perspective side, in [0, 1].
    pub value: f64,
    /// `weight * value`.
    pub contribution: f64,
}

/// Result of evaluating one state from one side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub perspective: Side,
    pub score: f64,
    pub factors: Vec<FactorScore>,
    pub confidence: f64,
    #[serde(rename = "elapsed_us", serialize_with = "as_micros")]
    pub elapsed: Duration,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

fn as_micros<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_micros() as u64)
}

impl Evaluation {
    /// Score rescaled to [-1, 1]; positive favours the perspective side.
    pub fn advantage(&self) -> f64 {
        2.0 * self.score - 1.0
    }

    pub fn is_winning(&self, threshold: f64) -> bool {
        self.advantage() >= threshold
    }

    pub fn is_losing(&self, threshold: f64) -> bool {
        self.advantage() <= -threshold
    }

    pub fn factor(&self, factor: Factor) -> Option<&FactorScore> {
        self.factors.iter().find(|f| f.factor == factor)
    }

    /// Factors that moved the score away from even, largest effect first.
    pub fn key_factors(&self) -> Vec<Factor> {
        let mut v: Vec<(Factor, f64)> = self
            .factors
            .iter()
            .map(|f| (f.factor, (f.weight * (f.value - 0.5)).abs()))
            .filter(|(_, d)| *d > 1e-9)
            .collect();
        // Stable sort keeps report order among equal effects.
        v.sort_by(|a, b| b.1.total_cmp(&a.1));
        v.into_iter().map(|(f, _)| f).collect()
    }

    /// Same evaluation without timing, for comparing repeated runs.
    pub fn without_timing(&self) -> Evaluation {
        Evaluation {
            elapsed: Duration::ZERO,
            ..self.clone()
        }
    }
}

/// Evaluates many states in parallel, preserving input order. The first
/// error in input order is returned.
pub fn evaluate_batch<E: Evaluate + ?Sized>(
    evaluator: &E,
    states: &[GameState],
    perspective: Side,
) -> Result<Vec<Evaluation>, EvalError> {
    let results: Vec<Result<Evaluation, EvalError>> = states
        .par_iter()
        .map(|s| evaluator.evaluate(s, perspective))
        .collect();
    results.into_iter().collect()
}

