//! Shooting, charge and fight generation.
//!
//! Shooting and charges may target any living enemy; range and line of
//! sight belong to the rules engine. Fights are limited to enemies within
//! engagement range.

use crate::board::{Action, GameState, Unit, UnitId};

/// Chebyshev distance at which two units are in melee.
pub const ENGAGEMENT_RANGE: u16 = 1;

/// Living enemy units of the acting unit, by ascending id.
fn enemies<'a>(state: &'a GameState, unit: &Unit) -> Vec<&'a Unit> {
    let mut v: Vec<&Unit> = state.alive_units(unit.side().opponent()).collect();
    v.sort_by_key(|u| u.id());
    v
}

pub(super) fn shoot_actions(state: &GameState, unit: &Unit, out: &mut Vec<Action>) {
    let id = unit.id();
    out.extend(enemies(state, unit).into_iter().map(|t| Action::Shoot {
        unit: id,
        target: t.id(),
    }));
}

pub(super) fn charge_actions(state: &GameState, unit: &Unit, out: &mut Vec<Action>) {
    let id = unit.id();
    out.extend(enemies(state, unit).into_iter().map(|t| Action::Charge {
        unit: id,
        target: t.id(),
    }));
}

pub(super) fn fight_actions(state: &GameState, unit: &Unit, out: &mut Vec<Action>) {
    let id = unit.id();
    out.extend(
        engaged_enemies(state, unit)
            .into_iter()
            .map(|target| Action::Fight { unit: id, target }),
    );
}

/// Living enemies within engagement range, by ascending id. Ignores phase
/// and activation.
pub fn engaged_enemies(state: &GameState, unit: &Unit) -> Vec<UnitId> {
    enemies(state, unit)
        .into_iter()
        .filter(|t| t.position().distance(unit.position()) <= ENGAGEMENT_RANGE)
        .map(|t| t.id())
        .collect()
}
