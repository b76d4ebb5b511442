//! Action types for all phases.
//!
//! Each variant carries exactly the data needed to specify the action
//! unambiguously. `Pass` is the only variant without an acting unit.

use serde::{Deserialize, Serialize};

use super::geometry::Position;
use super::state::StratagemId;
use super::unit::UnitId;

/// Kind of an action, in generator order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    Pass,
    UseStratagem,
    Move,
    Shoot,
    Charge,
    Fight,
}

/// An action a side may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// End the unit activations for this phase.
    Pass,

    /// Move a unit to a board cell.
    Move { unit: UnitId, to: Position },

    /// Shoot at an enemy unit.
    Shoot { unit: UnitId, target: UnitId },

    /// Declare a charge against an enemy unit.
    Charge { unit: UnitId, target: UnitId },

    /// Fight an enemy unit in engagement range.
    Fight { unit: UnitId, target: UnitId },

    /// Spend command points on a stratagem targeting one of our units.
    UseStratagem { unit: UnitId, stratagem: StratagemId },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Pass => ActionKind::Pass,
            Action::Move { .. } => ActionKind::Move,
            Action::Shoot { .. } => ActionKind::Shoot,
            Action::Charge { .. } => ActionKind::Charge,
            Action::Fight { .. } => ActionKind::Fight,
            Action::UseStratagem { .. } => ActionKind::UseStratagem,
        }
    }

    /// The acting unit, or `None` for `Pass`.
    pub fn unit(&self) -> Option<UnitId> {
        match *self {
            Action::Pass => None,
            Action::Move { unit, .. }
            | Action::Shoot { unit, .. }
            | Action::Charge { unit, .. }
            | Action::Fight { unit, .. }
            | Action::UseStratagem { unit, .. } => Some(unit),
        }
    }

    /// The targeted unit for shoot, charge and fight actions.
    pub fn target(&self) -> Option<UnitId> {
        match *self {
            Action::Shoot { target, .. }
            | Action::Charge { target, .. }
            | Action::Fight { target, .. } => Some(target),
            _ => None,
        }
    }
}
