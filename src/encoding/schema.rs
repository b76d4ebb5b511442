//! Encoding schema v1.
//!
//! The schema fixes the vector layout and the caps every field is
//! normalized against. It is a stable, versioned contract: the version and
//! every cap feed the position hash, so changing any of them invalidates
//! stored opening-book keys.
//!
//! ### Layout (v1)
//! Flat vector = global block ‖ side One slots ‖ side Two slots.
//!
//! Global block (`GLOBAL_DIM` = 12):
//! - turn / max_turn
//! - phase index / 4
//! - active side (0 = One, 1 = Two)
//! - victory points One, Two / max_victory_points
//! - victory point balance, 0.5 + (vp1 - vp2) / (2 * max_victory_points), clamped (derived)
//! - living units One, Two / max_units_per_side
//! - command points One, Two / max_command_points
//! - board width, height / max_board_dim
//!
//! Unit slot (`UNIT_DIM` = 14):
//! - x / board width, y / board height
//! - health / max_health (derived)
//! - health / max_health_cap, max_health / max_health_cap
//! - points / max_points
//! - move range / max_move_range
//! - engaged, has_acted, routed
//! - can_move, can_shoot, can_charge, can_fight
//!
//! Total: `GLOBAL_DIM + 2 * max_units_per_side * UNIT_DIM` (292 with defaults).

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Increment this whenever the layout changes.
pub const SCHEMA_VERSION: u32 = 1;

/// Global block length.
pub const GLOBAL_DIM: usize = 12;

/// Per-unit slot length.
pub const UNIT_DIM: usize = 14;

/// Global block offsets.
pub const G_TURN: usize = 0;
pub const G_PHASE: usize = 1;
pub const G_ACTIVE_SIDE: usize = 2;
pub const G_VP: usize = 3;
pub const G_VP_BALANCE: usize = 5;
pub const G_ALIVE: usize = 6;
pub const G_CP: usize = 8;
pub const G_BOARD: usize = 10;

/// Unit slot offsets.
pub const U_POS: usize = 0;
pub const U_HEALTH_RATIO: usize = 2;
pub const U_HEALTH: usize = 3;
pub const U_MAX_HEALTH: usize = 4;
pub const U_POINTS: usize = 5;
pub const U_MOVE_RANGE: usize = 6;
pub const U_STATUS: usize = 7;
pub const U_CAPS: usize = 10;

/// Largest cap for which every integer decodes exactly from an `f32` ratio.
const MAX_EXACT_CAP: u64 = 1 << 20;

/// Number of phases minus one; the phase field is `index / PHASE_SCALE`.
pub(crate) const PHASE_SCALE: f64 = 4.0;

/// Layout and normalization caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingSchema {
    pub version: u32,
    pub max_units_per_side: usize,
    pub max_turn: u16,
    pub max_victory_points: u32,
    pub max_command_points: u32,
    pub max_health: u16,
    pub max_points: u16,
    pub max_move_range: u16,
    pub max_board_dim: u16,
}

impl Default for EncodingSchema {
    fn default() -> Self {
        EncodingSchema {
            version: SCHEMA_VERSION,
            max_units_per_side: 20,
            max_turn: 20,
            max_victory_points: 200,
            max_command_points: 20,
            max_health: 64,
            max_points: 1000,
            max_move_range: 32,
            max_board_dim: 1024,
        }
    }
}

impl EncodingSchema {
    /// Total flat vector length.
    pub fn dim(&self) -> usize {
        GLOBAL_DIM + 2 * self.max_units_per_side * UNIT_DIM
    }

    /// Offset of a unit slot in the flat vector.
    pub fn slot_offset(&self, side_index: usize, slot: usize) -> usize {
        GLOBAL_DIM + (side_index * self.max_units_per_side + slot) * UNIT_DIM
    }

    /// Checks the version and that every cap is at least 1 and small enough
    /// to decode exactly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != SCHEMA_VERSION {
            return Err(ConfigError::SchemaVersion {
                found: self.version,
                expected: SCHEMA_VERSION,
            });
        }
        let caps: [(&'static str, u64); 8] = [
            ("max_units_per_side", self.max_units_per_side as u64),
            ("max_turn", self.max_turn as u64),
            ("max_victory_points", self.max_victory_points as u64),
            ("max_command_points", self.max_command_points as u64),
            ("max_health", self.max_health as u64),
            ("max_points", self.max_points as u64),
            ("max_move_range", self.max_move_range as u64),
            ("max_board_dim", self.max_board_dim as u64),
        ];
        for (field, value) in caps {
            if value == 0 || value > MAX_EXACT_CAP {
                return Err(ConfigError::SchemaLimit { field, value });
            }
        }
        Ok(())
    }

    /// Stable 64-bit identity of the schema, mixed into every position hash.
    pub fn fingerprint(&self) -> u64 {
        let mut h = super::hash::HASH_SEED;
        for x in [
            self.version as u64,
            self.max_units_per_side as u64,
            self.max_turn as u64,
            self.max_victory_points as u64,
            self.max_command_points as u64,
            self.max_health as u64,
            self.max_points as u64,
            self.max_move_range as u64,
            self.max_board_dim as u64,
            GLOBAL_DIM as u64,
            UNIT_DIM as u64,
        ] {
            super::hash::mix(&mut h, x);
        }
        h
    }

    /// Labels for the global block.
    pub fn global_feature_names() -> [&'static str; GLOBAL_DIM] {
        [
            "turn_progress",
            "phase_norm",
            "active_side",
            "side_one_vp_norm",
            "side_two_vp_norm",
            "vp_balance",
            "side_one_units_alive",
            "side_two_units_alive",
            "side_one_cp_norm",
            "side_two_cp_norm",
            "board_width_norm",
            "board_height_norm",
        ]
    }

    /// Labels for one unit slot.
    pub fn feature_names() -> [&'static str; UNIT_DIM] {
        [
            "position_x",
            "position_y",
            "health_ratio",
            "health_norm",
            "max_health_norm",
            "points_norm",
            "move_range_norm",
            "engaged",
            "has_acted",
            "routed",
            "can_move",
            "can_shoot",
            "can_charge",
            "can_fight",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dim() {
        let schema = EncodingSchema::default();
        assert_eq!(schema.dim(), 12 + 2 * 20 * 14);
        assert_eq!(schema.slot_offset(0, 0), GLOBAL_DIM);
        assert_eq!(schema.slot_offset(1, 0), GLOBAL_DIM + 20 * UNIT_DIM);
        assert_eq!(schema.slot_offset(1, 19) + UNIT_DIM, schema.dim());
    }

    #[test]
    fn default_validates() {
        assert!(EncodingSchema::default().validate().is_ok());
    }

    #[test]
    fn zero_cap_rejected() {
        let schema = EncodingSchema {
            max_turn: 0,
            ..EncodingSchema::default()
        };
        assert!(matches!(
            schema.validate(),
            Err(ConfigError::SchemaLimit {
                field: "max_turn",
                ..
            })
        ));
    }

    #[test]
    fn oversized_cap_rejected() {
        let schema = EncodingSchema {
            max_victory_points: u32::MAX,
            ..EncodingSchema::default()
        };
        assert!(schema.validate().is_err());
    }

    #[test]
    fn wrong_version_rejected() {
        let schema = EncodingSchema {
            version: 2,
            ..EncodingSchema::default()
        };
        assert!(matches!(
            schema.validate(),
            Err(ConfigError::SchemaVersion { found: 2, .. })
        ));
    }

    #[test]
    fn fingerprint_tracks_every_cap() {
        let base = EncodingSchema::default();
        let other = EncodingSchema {
            max_points: 999,
            ..base
        };
        assert_ne!(base.fingerprint(), other.fingerprint());
        assert_eq!(base.fingerprint(), EncodingSchema::default().fingerprint());
    }

    #[test]
    fn feature_name_counts() {
        assert_eq!(EncodingSchema::global_feature_names().len(), GLOBAL_DIM);
        assert_eq!(EncodingSchema::feature_names().len(), UNIT_DIM);
    }
}
