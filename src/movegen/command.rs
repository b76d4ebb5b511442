//! Stratagem generation.
//!
//! A stratagem may be used in the phase it names, by the side that owns
//! it, while that side can afford its command point cost. Every eligible
//! unit of the active side may be its target.

use crate::board::{Action, GameState, Stratagem, Unit};

/// Stratagems the active side can use now, by ascending id.
pub fn usable_stratagems(state: &GameState) -> Vec<&Stratagem> {
    let side = state.active_side();
    let cp = state.command_points(side);
    let mut usable: Vec<&Stratagem> = state
        .stratagems()
        .iter()
        .filter(|s| s.side == side && s.phase == state.phase() && s.cost <= cp)
        .collect();
    usable.sort_by_key(|s| s.id);
    usable
}

pub(super) fn stratagem_actions(state: &GameState, unit: &Unit, out: &mut Vec<Action>) {
    for s in usable_stratagems(state) {
        out.push(Action::UseStratagem {
            unit: unit.id(),
            stratagem: s.id,
        });
    }
}
