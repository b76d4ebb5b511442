//! Sides and units.
//!
//! A unit's health invariant is enforced at construction: fields are private
//! and the only setters touch flag sets, which carry no invariants.

use serde::{Deserialize, Serialize};

use super::geometry::Position;
use super::state::StateError;

/// One of the two opposing sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    One,
    Two,
}

/// Both sides in index order.
pub const ALL_SIDES: [Side; 2] = [Side::One, Side::Two];

impl Side {
    /// Returns the stable index (0 or 1).
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Side::One => 0,
            Side::Two => 1,
        }
    }

    /// Returns the opposing side.
    #[inline]
    pub const fn opponent(self) -> Side {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }

    pub fn from_index(i: usize) -> Option<Side> {
        match i {
            0 => Some(Side::One),
            1 => Some(Side::Two),
            _ => None,
        }
    }
}

/// Identifier assigned to a unit by the rules engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u32);

/// Battlefield status flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    pub engaged: bool,
    pub has_acted: bool,
    pub routed: bool,
}

/// Which kinds of action the rules engine currently allows for a unit.
/// Fields missing from serialized input default to enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub can_move: bool,
    pub can_shoot: bool,
    pub can_charge: bool,
    pub can_fight: bool,
}

impl Capabilities {
    /// All four capabilities enabled.
    pub const ALL: Capabilities = Capabilities {
        can_move: true,
        can_shoot: true,
        can_charge: true,
        can_fight: true,
    };

    /// No capabilities.
    pub const NONE: Capabilities = Capabilities {
        can_move: false,
        can_shoot: false,
        can_charge: false,
        can_fight: false,
    };
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::ALL
    }
}

/// A unit on the battlefield.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "UnitRecord", into = "UnitRecord")]
pub struct Unit {
    id: UnitId,
    side: Side,
    position: Position,
    health: u16,
    max_health: u16,
    points: u16,
    move_range: u16,
    status: Status,
    capabilities: Capabilities,
}

impl Unit {
    /// Creates a unit with default status and all capabilities enabled.
    ///
    /// Rejects a zero maximum health and a current health above the maximum.
    pub fn new(
        id: UnitId,
        side: Side,
        position: Position,
        health: u16,
        max_health: u16,
        points: u16,
    ) -> Result<Self, StateError> {
        if max_health == 0 {
            return Err(StateError::ZeroMaxHealth { unit: id });
        }
        if health > max_health {
            return Err(StateError::HealthOutOfRange {
                unit: id,
                health,
                max_health,
            });
        }
        Ok(Unit {
            id,
            side,
            position,
            health,
            max_health,
            points,
            move_range: DEFAULT_MOVE_RANGE,
            status: Status::default(),
            capabilities: Capabilities::default(),
        })
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_move_range(mut self, move_range: u16) -> Self {
        self.move_range = move_range;
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Returns the unit with a new current health, checked against its max.
    pub fn with_health(mut self, health: u16) -> Result<Self, StateError> {
        if health > self.max_health {
            return Err(StateError::HealthOutOfRange {
                unit: self.id,
                health,
                max_health: self.max_health,
            });
        }
        self.health = health;
        Ok(self)
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn health(&self) -> u16 {
        self.health
    }

    pub fn max_health(&self) -> u16 {
        self.max_health
    }

    pub fn points(&self) -> u16 {
        self.points
    }

    pub fn move_range(&self) -> u16 {
        self.move_range
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// A unit with zero health has been removed from play.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Point value scaled by remaining health.
    pub fn surviving_value(&self) -> f64 {
        self.points as f64 * self.health as f64 / self.max_health as f64
    }
}

/// Move range given to units built without an explicit one.
pub const DEFAULT_MOVE_RANGE: u16 = 6;

fn default_move_range() -> u16 {
    DEFAULT_MOVE_RANGE
}

/// Serialized form of a unit; validated into a [`Unit`] on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitRecord {
    pub id: UnitId,
    pub side: Side,
    pub position: Position,
    pub health: u16,
    pub max_health: u16,
    #[serde(default)]
    pub points: u16,
    #[serde(default = "default_move_range")]
    pub move_range: u16,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub capabilities: Capabilities,
}

impl TryFrom<UnitRecord> for Unit {
    type Error = StateError;

    fn try_from(r: UnitRecord) -> Result<Self, Self::Error> {
        Ok(Unit::new(r.id, r.side, r.position, r.health, r.max_health, r.points)?
            .with_move_range(r.move_range)
            .with_status(r.status)
            .with_capabilities(r.capabilities))
    }
}

impl From<Unit> for UnitRecord {
    fn from(u: Unit) -> Self {
        UnitRecord {
            id: u.id,
            side: u.side,
            position: u.position,
            health: u.health,
            max_health: u.max_health,
            points: u.points,
            move_range: u.move_range,
            status: u.status,
            capabilities: u.capabilities,
        }
    }
}
