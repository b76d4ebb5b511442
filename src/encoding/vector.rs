//! Game state -> vector encoding and its inverse.
//!
//! Produces the flat `f32` vector and per-side masks described in
//! [`super::schema`]. Every modeled field is either an integer scaled by a
//! schema cap or a 0/1 flag, so decoding by rounding reproduces it exactly.
//! Values beyond a cap are rejected rather than clamped.

use serde::Serialize;

use crate::board::{BoardSize, Capabilities, GameState, Phase, Position, Side, Status, ALL_SIDES};
use crate::numeric::{sanitize, unit_ratio, Diagnostic};

use super::hash::{hash_encoded, PositionHash};
use super::schema::*;

/// Errors raised when a state cannot be encoded under a schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("side {side:?} has {count} living units, schema allows at most {max}")]
    TooManyUnits { side: Side, count: usize, max: usize },

    #[error("{field} = {value} exceeds the schema cap {max}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },
}

/// Errors raised when a vector does not decode under its schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("expected {expected} values, got {found}")]
    WrongLength { expected: usize, found: usize },

    #[error("side {side:?} mask has {found} entries, expected {expected}")]
    WrongMaskLength {
        side: Side,
        expected: usize,
        found: usize,
    },

    #[error("schema version {found} is not supported (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },

    #[error("vector was encoded under a different schema")]
    SchemaMismatch,

    #[error("{field} at index {index} is {value}, outside [0, 1]")]
    OutOfUnitRange {
        field: &'static str,
        index: usize,
        value: f32,
    },

    #[error("{field} does not decode to a valid value")]
    InvalidCode { field: &'static str },

    #[error("side {side:?} padding slot {slot} holds non-zero data")]
    PaddingNotZero { side: Side, slot: usize },

    #[error("{field} is inconsistent with the rest of the encoding")]
    Inconsistent { field: &'static str },
}

/// Fixed-length encoding of a game state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedState {
    #[serde(skip)]
    schema: EncodingSchema,
    values: Vec<f32>,
    masks: [Vec<bool>; 2],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<Diagnostic>,
}

impl EncodedState {
    /// Wraps raw parts, checking only the lengths. Content is checked by
    /// [`decode`].
    pub fn from_parts(
        schema: EncodingSchema,
        values: Vec<f32>,
        masks: [Vec<bool>; 2],
    ) -> Result<Self, DecodeError> {
        if values.len() != schema.dim() {
            return Err(DecodeError::WrongLength {
                expected: schema.dim(),
                found: values.len(),
            });
        }
        for side in ALL_SIDES {
            let found = masks[side.index()].len();
            if found != schema.max_units_per_side {
                return Err(DecodeError::WrongMaskLength {
                    side,
                    expected: schema.max_units_per_side,
                    found,
                });
            }
        }
        Ok(EncodedState {
            schema,
            values,
            masks,
            diagnostics: Vec::new(),
        })
    }

    pub fn schema(&self) -> &EncodingSchema {
        &self.schema
    }

    /// The flat vector: global block, then side One slots, then side Two.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn masks(&self) -> &[Vec<bool>; 2] {
        &self.masks
    }

    /// Real-vs-padding mask for one side; authoritative over slot contents.
    pub fn mask(&self, side: Side) -> &[bool] {
        &self.masks[side.index()]
    }

    pub fn global(&self) -> &[f32] {
        &self.values[..GLOBAL_DIM]
    }

    pub fn slot(&self, side: Side, slot: usize) -> &[f32] {
        let off = self.schema.slot_offset(side.index(), slot);
        &self.values[off..off + UNIT_DIM]
    }

    /// Values sanitized while encoding.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Transposition key of this encoding.
    pub fn hash(&self) -> PositionHash {
        hash_encoded(self)
    }
}

/// The encoded subset of a unit. `slot` replaces the unit id, which is not
/// part of the encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodedUnit {
    pub slot: usize,
    pub position: Position,
    pub health: u16,
    pub max_health: u16,
    pub points: u16,
    pub move_range: u16,
    pub status: Status,
    pub capabilities: Capabilities,
}

/// The encoded subset of a game state.
///
/// Not modeled: unit ids, removed units, objectives and the stratagem list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecodedState {
    pub turn: u16,
    pub phase: Phase,
    pub active_side: Side,
    pub board: BoardSize,
    pub victory_points: [u32; 2],
    pub command_points: [u32; 2],
    pub units: [Vec<DecodedUnit>; 2],
}

impl DecodedState {
    /// Projects a game state onto the encoded subset without going through
    /// the vector.
    pub fn project(state: &GameState) -> DecodedState {
        let side_units = |side: Side| {
            state
                .alive_units(side)
                .enumerate()
                .map(|(slot, u)| DecodedUnit {
                    slot,
                    position: u.position(),
                    health: u.health(),
                    max_health: u.max_health(),
                    points: u.points(),
                    move_range: u.move_range(),
                    status: u.status(),
                    capabilities: u.capabilities(),
                })
                .collect::<Vec<_>>()
        };
        DecodedState {
            turn: state.turn(),
            phase: state.phase(),
            active_side: state.active_side(),
            board: state.board(),
            victory_points: [
                state.victory_points(Side::One),
                state.victory_points(Side::Two),
            ],
            command_points: [
                state.command_points(Side::One),
                state.command_points(Side::Two),
            ],
            units: [side_units(Side::One), side_units(Side::Two)],
        }
    }
}

#[inline]
fn flag(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn check_cap(field: &'static str, value: u64, max: u64) -> Result<(), EncodeError> {
    if value > max {
        return Err(EncodeError::OutOfRange { field, value, max });
    }
    Ok(())
}

/// Rejects anything the schema cannot represent exactly.
fn check_limits(state: &GameState, schema: &EncodingSchema) -> Result<(), EncodeError> {
    check_cap("turn", state.turn() as u64, schema.max_turn as u64)?;
    let board = state.board();
    check_cap("board.width", board.width as u64, schema.max_board_dim as u64)?;
    check_cap("board.height", board.height as u64, schema.max_board_dim as u64)?;
    for side in ALL_SIDES {
        check_cap(
            "victory_points",
            state.victory_points(side) as u64,
            schema.max_victory_points as u64,
        )?;
        check_cap(
            "command_points",
            state.command_points(side) as u64,
            schema.max_command_points as u64,
        )?;
        let count = state.alive_units(side).count();
        if count > schema.max_units_per_side {
            return Err(EncodeError::TooManyUnits {
                side,
                count,
                max: schema.max_units_per_side,
            });
        }
        for u in state.alive_units(side) {
            check_cap("unit.max_health", u.max_health() as u64, schema.max_health as u64)?;
            check_cap("unit.points", u.points() as u64, schema.max_points as u64)?;
            check_cap("unit.move_range", u.move_range() as u64, schema.max_move_range as u64)?;
        }
    }
    Ok(())
}

/// Encodes a game state. Deterministic: attribute-wise equal states give
/// bit-identical output.
pub fn encode(state: &GameState, schema: &EncodingSchema) -> Result<EncodedState, EncodeError> {
    check_limits(state, schema)?;

    let mut values = vec![0.0f32; schema.dim()];
    let mut masks = [
        vec![false; schema.max_units_per_side],
        vec![false; schema.max_units_per_side],
    ];
    let mut diag = Vec::new();
    let d = &mut diag;

    let board = state.board();
    let max_vp = schema.max_victory_points as f64;
    let vp1 = state.victory_points(Side::One) as f64;
    let vp2 = state.victory_points(Side::Two) as f64;

    values[G_TURN] = unit_ratio(state.turn() as f64, schema.max_turn as f64, 0.0, "turn", d) as f32;
    values[G_PHASE] = (state.phase().index() as f64 / PHASE_SCALE) as f32;
    values[G_ACTIVE_SIDE] = state.active_side().index() as f32;
    values[G_VP] = unit_ratio(vp1, max_vp, 0.0, "victory_points", d) as f32;
    values[G_VP + 1] = unit_ratio(vp2, max_vp, 0.0, "victory_points", d) as f32;
    values[G_VP_BALANCE] =
        sanitize(0.5 + (vp1 - vp2) / (2.0 * max_vp), 0.0, 1.0, 0.5, "vp_balance", d) as f32;
    for side in ALL_SIDES {
        let i = side.index();
        let alive = state.alive_units(side).count() as f64;
        values[G_ALIVE + i] =
            unit_ratio(alive, schema.max_units_per_side as f64, 0.0, "units_alive", d) as f32;
        values[G_CP + i] = unit_ratio(
            state.command_points(side) as f64,
            schema.max_command_points as f64,
            0.0,
            "command_points",
            d,
        ) as f32;
    }
    let max_dim = schema.max_board_dim as f64;
    values[G_BOARD] = unit_ratio(board.width as f64, max_dim, 0.0, "board.width", d) as f32;
    values[G_BOARD + 1] = unit_ratio(board.height as f64, max_dim, 0.0, "board.height", d) as f32;

    for side in ALL_SIDES {
        for (slot, u) in state.alive_units(side).enumerate() {
            masks[side.index()][slot] = true;
            let off = schema.slot_offset(side.index(), slot);
            let s = &mut values[off..off + UNIT_DIM];
            let p = u.position();
            let health = u.health() as f64;
            let max_health = u.max_health() as f64;
            let cap = schema.max_health as f64;

            s[U_POS] = unit_ratio(p.x as f64, board.width as f64, 0.0, "unit.x", d) as f32;
            s[U_POS + 1] = unit_ratio(p.y as f64, board.height as f64, 0.0, "unit.y", d) as f32;
            s[U_HEALTH_RATIO] = unit_ratio(health, max_health, 0.0, "unit.health_ratio", d) as f32;
            s[U_HEALTH] = unit_ratio(health, cap, 0.0, "unit.health", d) as f32;
            s[U_MAX_HEALTH] = unit_ratio(max_health, cap, 0.0, "unit.max_health", d) as f32;
            s[U_POINTS] = unit_ratio(
                u.points() as f64,
                schema.max_points as f64,
                0.0,
                "unit.points",
                d,
            ) as f32;
            s[U_MOVE_RANGE] = unit_ratio(
                u.move_range() as f64,
                schema.max_move_range as f64,
                0.0,
                "unit.move_range",
                d,
            ) as f32;

            let st = u.status();
            s[U_STATUS] = flag(st.engaged);
            s[U_STATUS + 1] = flag(st.has_acted);
            s[U_STATUS + 2] = flag(st.routed);

            let c = u.capabilities();
            s[U_CAPS] = flag(c.can_move);
            s[U_CAPS + 1] = flag(c.can_shoot);
            s[U_CAPS + 2] = flag(c.can_charge);
            s[U_CAPS + 3] = flag(c.can_fight);
        }
    }

    Ok(EncodedState {
        schema: *schema,
        values,
        masks,
        diagnostics: diag,
    })
}

/// Encodes and hashes a state in one step.
pub fn position_hash(state: &GameState, schema: &EncodingSchema) -> Result<PositionHash, EncodeError> {
    Ok(encode(state, schema)?.hash())
}

/// Reads a value that must lie in [0, 1].
fn read(values: &[f32], index: usize, field: &'static str) -> Result<f64, DecodeError> {
    let value = values[index];
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(DecodeError::OutOfUnitRange {
            field,
            index,
            value,
        });
    }
    Ok(value as f64)
}

/// Reads an integer stored as `n / scale`.
fn read_int(values: &[f32], index: usize, scale: f64, field: &'static str) -> Result<u64, DecodeError> {
    Ok((read(values, index, field)? * scale).round() as u64)
}

fn read_flag(values: &[f32], index: usize, field: &'static str) -> Result<bool, DecodeError> {
    let v = read(values, index, field)?;
    if v == 0.0 {
        Ok(false)
    } else if v == 1.0 {
        Ok(true)
    } else {
        Err(DecodeError::InvalidCode { field })
    }
}

fn to_u16(v: u64, field: &'static str) -> Result<u16, DecodeError> {
    u16::try_from(v).map_err(|_| DecodeError::InvalidCode { field })
}

fn to_u32(v: u64, field: &'static str) -> Result<u32, DecodeError> {
    u32::try_from(v).map_err(|_| DecodeError::InvalidCode { field })
}

/// Reconstructs the encoded subset of a state.
pub fn decode(encoded: &EncodedState, schema: &EncodingSchema) -> Result<DecodedState, DecodeError> {
    if schema.version != SCHEMA_VERSION {
        return Err(DecodeError::SchemaVersion {
            found: schema.version,
            expected: SCHEMA_VERSION,
        });
    }
    if encoded.schema() != schema {
        return Err(DecodeError::SchemaMismatch);
    }
    let v = encoded.values();

    let turn = to_u16(read_int(v, G_TURN, schema.max_turn as f64, "turn")?, "turn")?;
    if turn == 0 {
        return Err(DecodeError::InvalidCode { field: "turn" });
    }
    let phase_idx = read_int(v, G_PHASE, PHASE_SCALE, "phase")? as usize;
    let phase = Phase::from_index(phase_idx).ok_or(DecodeError::InvalidCode { field: "phase" })?;
    let active_side = match read_flag(v, G_ACTIVE_SIDE, "active_side")? {
        false => Side::One,
        true => Side::Two,
    };

    let max_vp = schema.max_victory_points as f64;
    let max_cp = schema.max_command_points as f64;
    let mut victory_points = [0u32; 2];
    let mut command_points = [0u32; 2];
    for i in 0..2 {
        victory_points[i] = to_u32(read_int(v, G_VP + i, max_vp, "victory_points")?, "victory_points")?;
        command_points[i] = to_u32(read_int(v, G_CP + i, max_cp, "command_points")?, "command_points")?;
    }
    read(v, G_VP_BALANCE, "vp_balance")?;

    let max_dim = schema.max_board_dim as f64;
    let width = to_u16(read_int(v, G_BOARD, max_dim, "board.width")?, "board.width")?;
    let height = to_u16(read_int(v, G_BOARD + 1, max_dim, "board.height")?, "board.height")?;
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidCode { field: "board" });
    }
    let board = BoardSize::new(width, height);

    let mut units: [Vec<DecodedUnit>; 2] = [Vec::new(), Vec::new()];
    for side in ALL_SIDES {
        let si = side.index();
        let mask = encoded.mask(side);
        let mut padded = false;
        for (slot, &real) in mask.iter().enumerate() {
            let off = schema.slot_offset(si, slot);
            if !real {
                if v[off..off + UNIT_DIM].iter().any(|x| *x != 0.0) {
                    return Err(DecodeError::PaddingNotZero { side, slot });
                }
                padded = true;
                continue;
            }
            // Occupied slots form a prefix.
            if padded {
                return Err(DecodeError::Inconsistent { field: "mask" });
            }
            units[si].push(decode_unit(v, off, slot, board, schema)?);
        }

        let alive = read_int(v, G_ALIVE + si, schema.max_units_per_side as f64, "units_alive")?;
        if alive as usize != units[si].len() {
            return Err(DecodeError::Inconsistent {
                field: "units_alive",
            });
        }
    }

    Ok(DecodedState {
        turn,
        phase,
        active_side,
        board,
        victory_points,
        command_points,
        units,
    })
}

fn decode_unit(
    v: &[f32],
    off: usize,
    slot: usize,
    board: BoardSize,
    schema: &EncodingSchema,
) -> Result<DecodedUnit, DecodeError> {
    let cap = schema.max_health as f64;
    let x = to_u16(read_int(v, off + U_POS, board.width as f64, "unit.x")?, "unit.x")?;
    let y = to_u16(read_int(v, off + U_POS + 1, board.height as f64, "unit.y")?, "unit.y")?;
    let position = Position::new(x, y);
    if !board.contains(position) {
        return Err(DecodeError::InvalidCode { field: "unit.position" });
    }
    let health = to_u16(read_int(v, off + U_HEALTH, cap, "unit.health")?, "unit.health")?;
    let max_health = to_u16(read_int(v, off + U_MAX_HEALTH, cap, "unit.max_health")?, "unit.max_health")?;
    if max_health == 0 || health == 0 || health > max_health {
        return Err(DecodeError::Inconsistent {
            field: "unit.health",
        });
    }
    read(v, off + U_HEALTH_RATIO, "unit.health_ratio")?;
    let points = to_u16(
        read_int(v, off + U_POINTS, schema.max_points as f64, "unit.points")?,
        "unit.points",
    )?;
    let move_range = to_u16(
        read_int(v, off + U_MOVE_RANGE, schema.max_move_range as f64, "unit.move_range")?,
        "unit.move_range",
    )?;
    let status = Status {
        engaged: read_flag(v, off + U_STATUS, "unit.engaged")?,
        has_acted: read_flag(v, off + U_STATUS + 1, "unit.has_acted")?,
        routed: read_flag(v, off + U_STATUS + 2, "unit.routed")?,
    };
    let capabilities = Capabilities {
        can_move: read_flag(v, off + U_CAPS, "unit.can_move")?,
        can_shoot: read_flag(v, off + U_CAPS + 1, "unit.can_shoot")?,
        can_charge: read_flag(v, off + U_CAPS + 2, "unit.can_charge")?,
        can_fight: read_flag(v, off + U_CAPS + 3, "unit.can_fight")?,
    };
    Ok(DecodedUnit {
        slot,
        position,
        health,
        max_health,
        points,
        move_range,
        status,
        capabilities,
    })
}
