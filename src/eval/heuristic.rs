//! Heuristic position evaluation.
//!
//! Evaluates a game state using four handcrafted factors: surviving
//! material, objective control, victory points and tempo. Every factor is
//! computed once from side One's view as a value in [0, 1]; side Two's value
//! is its complement, so the two perspectives always sum to 1.
//!
//! Evaluation does no allocation beyond the returned report and never
//! touches I/O.

use std::time::Instant;

use crate::board::{GameState, Side, ALL_SIDES};
use crate::config::ConfigError;
use crate::numeric::{sanitize, share, Diagnostic};

use super::{EvalError, EvalWeights, Evaluate, Evaluation, Factor, FactorScore, ALL_FACTORS};

/// Chebyshev distance within which a unit contests an objective.
pub const OBJECTIVE_RANGE: u16 = 3;

/// Turn from which the game-progress part of confidence is saturated.
const CONFIDENCE_TURNS: u16 = 5;

/// Weighted-factor evaluator.
#[derive(Debug, Clone)]
pub struct HeuristicEvaluator {
    weights: EvalWeights,
}

impl HeuristicEvaluator {
    /// Rejects weights that are negative, non-finite, or do not sum to 1.
    pub fn new(weights: EvalWeights) -> Result<Self, ConfigError> {
        weights.validate()?;
        Ok(HeuristicEvaluator {
            weights: weights.normalized(),
        })
    }

    pub fn weights(&self) -> &EvalWeights {
        &self.weights
    }
}

impl Default for HeuristicEvaluator {
    fn default() -> Self {
        HeuristicEvaluator {
            weights: EvalWeights::default().normalized(),
        }
    }
}

impl Evaluate for HeuristicEvaluator {
    fn evaluate(&self, state: &GameState, perspective: Side) -> Result<Evaluation, EvalError> {
        let start = Instant::now();
        let mut diagnostics = Vec::new();
        let side_one = side_one_values(state, &mut diagnostics);

        let mut factors = Vec::with_capacity(ALL_FACTORS.len());
        let mut score = 0.0;
        for (i, factor) in ALL_FACTORS.into_iter().enumerate() {
            let value = match perspective {
                Side::One => side_one[i],
                Side::Two => 1.0 - side_one[i],
            };
            let weight = self.weights.get(factor);
            let contribution = weight * value;
            score += contribution;
            factors.push(FactorScore {
                factor,
                weight,
                value,
                contribution,
            });
        }
        let score = sanitize(score, 0.0, 1.0, 0.5, "score", &mut diagnostics);
        let confidence = confidence(state.turn(), score, &mut diagnostics);

        Ok(Evaluation {
            perspective,
            score,
            factors,
            confidence,
            elapsed: start.elapsed(),
            diagnostics,
        })
    }
}

/// Factor values for side One, in `ALL_FACTORS` order.
fn side_one_values(state: &GameState, d: &mut Vec<Diagnostic>) -> [f64; 4] {
    [
        material(state, d),
        objective_control(state),
        share(
            state.victory_points(Side::One) as f64,
            state.victory_points(Side::Two) as f64,
            Factor::VictoryPoints.name(),
            d,
        ),
        tempo(state),
    ]
}

/// Fraction of starting points still on the table, compared between sides.
fn material(state: &GameState, d: &mut Vec<Diagnostic>) -> f64 {
    let mut ratio = [0.0f64; 2];
    for side in ALL_SIDES {
        let starting: f64 = state.units(side).iter().map(|u| u.points() as f64).sum();
        if starting == 0.0 {
            continue;
        }
        let surviving: f64 = state.alive_units(side).map(|u| u.surviving_value()).sum();
        ratio[side.index()] = sanitize(surviving / starting, 0.0, 1.0, 0.0, "material.ratio", d);
    }
    share(ratio[0], ratio[1], Factor::Material.name(), d)
}

/// Share of objectives held by side One. An objective is held by the side
/// with more living health in range; equal presence, including none, counts
/// half to each side.
fn objective_control(state: &GameState) -> f64 {
    let objectives = state.objectives();
    if objectives.is_empty() {
        return 0.5;
    }
    let mut held = 0.0;
    for &obj in objectives {
        let mut presence = [0u64; 2];
        for side in ALL_SIDES {
            presence[side.index()] = state
                .alive_units(side)
                .filter(|u| u.position().distance(obj) <= OBJECTIVE_RANGE)
                .map(|u| u.health() as u64)
                .sum();
        }
        held += match presence[0].cmp(&presence[1]) {
            std::cmp::Ordering::Greater => 1.0,
            std::cmp::Ordering::Equal => 0.5,
            std::cmp::Ordering::Less => 0.0,
        };
    }
    held / objectives.len() as f64
}

/// Initiative of the active side, strongest early in its turn.
fn tempo(state: &GameState) -> f64 {
    let remaining = state.phase().remaining() as f64 / 4.0;
    let active = 0.5 + 0.25 * (1.0 + remaining);
    match state.active_side() {
        Side::One => active,
        Side::Two => 1.0 - active,
    }
}

fn confidence(turn: u16, score: f64, d: &mut Vec<Diagnostic>) -> f64 {
    let progress = turn.min(CONFIDENCE_TURNS) as f64 / CONFIDENCE_TURNS as f64;
    let decisiveness = (2.0 * score - 1.0).abs();
    sanitize(
        0.2 + 0.5 * progress + 0.3 * decisiveness,
        0.0,
        1.0,
        0.2,
        "confidence",
        d,
    )
}
