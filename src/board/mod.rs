//! Board representation and game-state types.
//!
//! Contains the core data structures for positions, units, actions, and
//! the overall game state.

pub mod action;
pub mod geometry;
pub mod state;
pub mod unit;

pub use action::{Action, ActionKind};
pub use geometry::{BoardSize, Position};
pub use state::{
    GameState, GameStateBuilder, GameStateRecord, Phase, SideRecord, StateError, Stratagem,
    StratagemId, ALL_PHASES,
};
pub use unit::{Capabilities, Side, Status, Unit, UnitId, UnitRecord, ALL_SIDES, DEFAULT_MOVE_RANGE};
