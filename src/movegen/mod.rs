//! Legal action generation.
//!
//! Enumerates the candidate actions for the active side in the current
//! phase. The list always starts with `Pass` and is otherwise ordered by
//! acting unit id, then action kind, then the action's parameters, so equal
//! states always yield identical lists.

pub mod combat;
pub mod command;
pub mod movement;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::board::{Action, GameState, Phase, Unit, UnitId};

pub use combat::ENGAGEMENT_RANGE;

/// Returns true if the unit may act at all: it belongs to the active side,
/// is alive and has not acted yet this phase.
fn can_act(state: &GameState, unit: &Unit) -> bool {
    unit.side() == state.active_side() && unit.is_alive() && !unit.status().has_acted
}

/// Returns true if the unit's capabilities and status allow it to take
/// part in the phase. A unit that may not act in a phase is not offered
/// stratagems in it either.
fn fits_phase(phase: Phase, unit: &Unit) -> bool {
    let caps = unit.capabilities();
    let engaged = unit.status().engaged;
    match phase {
        Phase::Command => true,
        Phase::Movement => caps.can_move && !engaged,
        Phase::Shooting => caps.can_shoot,
        Phase::Charge => caps.can_charge && !engaged,
        Phase::Fight => caps.can_fight,
    }
}

/// Appends the phase-appropriate actions of one eligible unit.
fn push_unit_actions(state: &GameState, unit: &Unit, out: &mut Vec<Action>) {
    if !fits_phase(state.phase(), unit) {
        return;
    }
    command::stratagem_actions(state, unit, out);
    match state.phase() {
        Phase::Command => {}
        Phase::Movement => movement::move_actions(state, unit, out),
        Phase::Shooting => combat::shoot_actions(state, unit, out),
        Phase::Charge => combat::charge_actions(state, unit, out),
        Phase::Fight => combat::fight_actions(state, unit, out),
    }
}

/// Generates every legal action for the active side. `Pass` is always the
/// first element and appears exactly once.
pub fn generate(state: &GameState) -> Vec<Action> {
    let mut actors: Vec<&Unit> = state
        .units(state.active_side())
        .iter()
        .filter(|u| can_act(state, u))
        .collect();
    actors.sort_by_key(|u| u.id());

    let mut actions = vec![Action::Pass];
    for unit in actors {
        push_unit_actions(state, unit, &mut actions);
    }
    actions
}

/// Legal actions of a single unit, in generator order. Empty if the unit
/// does not exist or cannot act.
pub fn legal_unit_actions(state: &GameState, id: UnitId) -> Vec<Action> {
    let mut actions = Vec::new();
    if let Some(unit) = state.unit(id) {
        if can_act(state, unit) {
            push_unit_actions(state, unit, &mut actions);
        }
    }
    actions
}

/// Picks one legal action uniformly at random.
pub fn random_action(state: &GameState, rng: &mut impl Rng) -> Action {
    generate(state).choose(rng).copied().unwrap_or(Action::Pass)
}
