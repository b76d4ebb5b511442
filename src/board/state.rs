//! Game state representation.
//!
//! Holds the complete snapshot of a game at a point in time: both sides'
//! units, turn and phase, victory and command points, objectives and the
//! stratagems in play. A `GameState` is only obtainable through
//! [`GameStateBuilder::build`] (or deserialization, which runs the same
//! checks), so every value in circulation satisfies the data-model
//! invariants. There is no mutating API.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::geometry::{BoardSize, Position};
use super::unit::{Side, Unit, UnitId, UnitRecord, ALL_SIDES};

/// Errors raised when a game state or unit violates a data-model invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("unit {unit:?}: max_health must be at least 1")]
    ZeroMaxHealth { unit: UnitId },

    #[error("unit {unit:?}: health {health} exceeds max_health {max_health}")]
    HealthOutOfRange {
        unit: UnitId,
        health: u16,
        max_health: u16,
    },

    #[error("turn must be at least 1")]
    TurnZero,

    #[error("board dimensions must be non-zero, got {width}x{height}")]
    EmptyBoard { width: u16, height: u16 },

    #[error("unit {unit:?}: position ({x}, {y}) lies outside the {width}x{height} board")]
    UnitOffBoard {
        unit: UnitId,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    },

    #[error("unit {unit:?} is owned by {owner:?} but listed under {listed:?}")]
    SideMismatch {
        unit: UnitId,
        owner: Side,
        listed: Side,
    },

    #[error("duplicate unit id {0:?}")]
    DuplicateUnit(UnitId),

    #[error("objective ({x}, {y}) lies outside the board")]
    ObjectiveOffBoard { x: u16, y: u16 },

    #[error("duplicate stratagem id {0:?}")]
    DuplicateStratagem(StratagemId),
}

/// The phase within a game turn, in play order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Command,
    Movement,
    Shooting,
    Charge,
    Fight,
}

/// All phases in play order.
pub const ALL_PHASES: [Phase; 5] = [
    Phase::Command,
    Phase::Movement,
    Phase::Shooting,
    Phase::Charge,
    Phase::Fight,
];

impl Phase {
    /// Returns the position of the phase within the turn (0..=4).
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Phase::Command => 0,
            Phase::Movement => 1,
            Phase::Shooting => 2,
            Phase::Charge => 3,
            Phase::Fight => 4,
        }
    }

    pub fn from_index(i: usize) -> Option<Phase> {
        ALL_PHASES.get(i).copied()
    }

    /// Returns the following phase, wrapping from Fight back to Command.
    pub const fn next(self) -> Phase {
        match self {
            Phase::Command => Phase::Movement,
            Phase::Movement => Phase::Shooting,
            Phase::Shooting => Phase::Charge,
            Phase::Charge => Phase::Fight,
            Phase::Fight => Phase::Command,
        }
    }

    /// Phases still to come in this turn, after the current one.
    pub const fn remaining(self) -> usize {
        ALL_PHASES.len() - 1 - self.index()
    }
}

/// Identifier of a stratagem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StratagemId(pub u16);

/// A stratagem a side may spend command points on during one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stratagem {
    pub id: StratagemId,
    pub side: Side,
    pub cost: u32,
    pub phase: Phase,
}

/// Complete game state at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GameStateRecord", into = "GameStateRecord")]
pub struct GameState {
    turn: u16,
    phase: Phase,
    active_side: Side,
    board: BoardSize,
    units: [Vec<Unit>; 2],
    victory_points: [u32; 2],
    command_points: [u32; 2],
    objectives: Vec<Position>,
    stratagems: Vec<Stratagem>,
}

impl GameState {
    /// Starts building a state on the given board: turn 1, Command phase,
    /// side One active, no units.
    pub fn builder(board: BoardSize) -> GameStateBuilder {
        GameStateBuilder {
            turn: 1,
            phase: Phase::Command,
            active_side: Side::One,
            board,
            units: [Vec::new(), Vec::new()],
            victory_points: [0; 2],
            command_points: [0; 2],
            objectives: Vec::new(),
            stratagems: Vec::new(),
        }
    }

    /// Returns a builder pre-filled with this state, for constructing a
    /// successor position.
    pub fn to_builder(&self) -> GameStateBuilder {
        GameStateBuilder {
            turn: self.turn,
            phase: self.phase,
            active_side: self.active_side,
            board: self.board,
            units: self.units.clone(),
            victory_points: self.victory_points,
            command_points: self.command_points,
            objectives: self.objectives.clone(),
            stratagems: self.stratagems.clone(),
        }
    }

    pub fn turn(&self) -> u16 {
        self.turn
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn active_side(&self) -> Side {
        self.active_side
    }

    pub fn board(&self) -> BoardSize {
        self.board
    }

    /// Units of one side in list order, including removed units.
    pub fn units(&self, side: Side) -> &[Unit] {
        &self.units[side.index()]
    }

    /// Living units of one side in list order.
    pub fn alive_units(&self, side: Side) -> impl Iterator<Item = &Unit> {
        self.units[side.index()].iter().filter(|u| u.is_alive())
    }

    /// Every unit of both sides, side One first.
    pub fn all_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().flat_map(|list| list.iter())
    }

    /// Finds a unit by id.
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.all_units().find(|u| u.id() == id)
    }

    pub fn victory_points(&self, side: Side) -> u32 {
        self.victory_points[side.index()]
    }

    pub fn command_points(&self, side: Side) -> u32 {
        self.command_points[side.index()]
    }

    pub fn objectives(&self) -> &[Position] {
        &self.objectives
    }

    pub fn stratagems(&self) -> &[Stratagem] {
        &self.stratagems
    }

    /// Returns true if a living unit stands on the cell.
    pub fn is_occupied(&self, p: Position) -> bool {
        self.all_units().any(|u| u.is_alive() && u.position() == p)
    }
}

/// Accumulates the parts of a [`GameState`] and validates them on `build`.
#[derive(Debug, Clone)]
pub struct GameStateBuilder {
    turn: u16,
    phase: Phase,
    active_side: Side,
    board: BoardSize,
    units: [Vec<Unit>; 2],
    victory_points: [u32; 2],
    command_points: [u32; 2],
    objectives: Vec<Position>,
    stratagems: Vec<Stratagem>,
}

impl GameStateBuilder {
    pub fn turn(mut self, turn: u16) -> Self {
        self.turn = turn;
        self
    }

    pub fn phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub fn active_side(mut self, side: Side) -> Self {
        self.active_side = side;
        self
    }

    pub fn victory_points(mut self, side: Side, vp: u32) -> Self {
        self.victory_points[side.index()] = vp;
        self
    }

    pub fn command_points(mut self, side: Side, cp: u32) -> Self {
        self.command_points[side.index()] = cp;
        self
    }

    /// Appends a unit to its owner's list.
    pub fn unit(mut self, unit: Unit) -> Self {
        self.units[unit.side().index()].push(unit);
        self
    }

    /// Replaces the unit with the same id, keeping its list slot, or appends
    /// it if no such unit exists.
    pub fn update_unit(mut self, unit: Unit) -> Self {
        for list in self.units.iter_mut() {
            if let Some(slot) = list.iter_mut().find(|u| u.id() == unit.id()) {
                *slot = unit;
                return self;
            }
        }
        self.unit(unit)
    }

    /// Replaces one side's whole unit list.
    pub fn units(mut self, side: Side, units: Vec<Unit>) -> Self {
        self.units[side.index()] = units;
        self
    }

    pub fn objective(mut self, p: Position) -> Self {
        self.objectives.push(p);
        self
    }

    pub fn stratagem(mut self, s: Stratagem) -> Self {
        self.stratagems.push(s);
        self
    }

    /// Validates and produces the state.
    pub fn build(self) -> Result<GameState, StateError> {
        if self.turn == 0 {
            return Err(StateError::TurnZero);
        }
        let board = self.board;
        if board.width == 0 || board.height == 0 {
            return Err(StateError::EmptyBoard {
                width: board.width,
                height: board.height,
            });
        }

        let mut seen = HashSet::new();
        for side in ALL_SIDES {
            for u in &self.units[side.index()] {
                if u.side() != side {
                    return Err(StateError::SideMismatch {
                        unit: u.id(),
                        owner: u.side(),
                        listed: side,
                    });
                }
                if !seen.insert(u.id()) {
                    return Err(StateError::DuplicateUnit(u.id()));
                }
                let p = u.position();
                if !board.contains(p) {
                    return Err(StateError::UnitOffBoard {
                        unit: u.id(),
                        x: p.x,
                        y: p.y,
                        width: board.width,
                        height: board.height,
                    });
                }
            }
        }

        if let Some(p) = self.objectives.iter().find(|p| !board.contains(**p)) {
            return Err(StateError::ObjectiveOffBoard { x: p.x, y: p.y });
        }

        let mut strat_ids = HashSet::new();
        for s in &self.stratagems {
            if !strat_ids.insert(s.id) {
                return Err(StateError::DuplicateStratagem(s.id));
            }
        }

        Ok(GameState {
            turn: self.turn,
            phase: self.phase,
            active_side: self.active_side,
            board,
            units: self.units,
            victory_points: self.victory_points,
            command_points: self.command_points,
            objectives: self.objectives,
            stratagems: self.stratagems,
        })
    }
}

/// Per-side section of the serialized state. Units stay unvalidated until
/// the record is converted, so every invariant error is a [`StateError`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SideRecord {
    #[serde(default)]
    pub units: Vec<UnitRecord>,
    #[serde(default)]
    pub victory_points: u32,
    #[serde(default)]
    pub command_points: u32,
}

/// Serialized form of a game state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStateRecord {
    pub turn: u16,
    pub phase: Phase,
    pub active_side: Side,
    pub board: BoardSize,
    pub sides: [SideRecord; 2],
    #[serde(default)]
    pub objectives: Vec<Position>,
    #[serde(default)]
    pub stratagems: Vec<Stratagem>,
}

impl TryFrom<GameStateRecord> for GameState {
    type Error = StateError;

    fn try_from(r: GameStateRecord) -> Result<Self, Self::Error> {
        let [one, two] = r.sides;
        let units = |records: Vec<UnitRecord>| {
            records
                .into_iter()
                .map(Unit::try_from)
                .collect::<Result<Vec<Unit>, StateError>>()
        };
        let mut b = GameState::builder(r.board)
            .turn(r.turn)
            .phase(r.phase)
            .active_side(r.active_side)
            .victory_points(Side::One, one.victory_points)
            .victory_points(Side::Two, two.victory_points)
            .command_points(Side::One, one.command_points)
            .command_points(Side::Two, two.command_points)
            .units(Side::One, units(one.units)?)
            .units(Side::Two, units(two.units)?);
        for p in r.objectives {
            b = b.objective(p);
        }
        for s in r.stratagems {
            b = b.stratagem(s);
        }
        b.build()
    }
}

impl From<GameState> for GameStateRecord {
    fn from(s: GameState) -> Self {
        let [u1, u2] = s.units;
        GameStateRecord {
            turn: s.turn,
            phase: s.phase,
            active_side: s.active_side,
            board: s.board,
            sides: [
                SideRecord {
                    units: u1.into_iter().map(UnitRecord::from).collect(),
                    victory_points: s.victory_points[0],
                    command_points: s.command_points[0],
                },
                SideRecord {
                    units: u2.into_iter().map(UnitRecord::from).collect(),
                    victory_points: s.victory_points[1],
                    command_points: s.command_points[1],
                },
            ],
            objectives: s.objectives,
            stratagems: s.stratagems,
        }
    }
}
