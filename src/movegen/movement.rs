//! Movement-phase generation.

use crate::board::{Action, GameState, Unit};

/// Appends a `Move` to every free on-board cell within the unit's move
/// range, in row-major order.
pub(super) fn move_actions(state: &GameState, unit: &Unit, out: &mut Vec<Action>) {
    let from = unit.position();
    for to in state.board().cells_within(from, unit.move_range()) {
        if to == from || state.is_occupied(to) {
            continue;
        }
        out.push(Action::Move { unit: unit.id(), to });
    }
}
