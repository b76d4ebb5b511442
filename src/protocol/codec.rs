//! Encoding and decoding of protocol values.
//!
//! States are parsed in two steps, JSON into the raw record and the record
//! into a validated `GameState`, so a syntax error and an invalid state stay
//! distinguishable.

use thiserror::Error;

use crate::board::{Action, GameState, GameStateRecord, Side, StateError};
use crate::eval::{EvalError, Evaluation};
use crate::search::{RecommendError, Recommendation};

/// Errors at the protocol boundary.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid game state: {0}")]
    State(#[from] StateError),

    #[error("unknown side '{0}': expected 'one' or 'two'")]
    UnknownSide(String),

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error(transparent)]
    Evaluate(#[from] EvalError),

    #[error(transparent)]
    Recommend(#[from] RecommendError),
}

/// Parses and validates a game state.
pub fn parse_state(json: &str) -> Result<GameState, ProtocolError> {
    let record: GameStateRecord = serde_json::from_str(json)?;
    Ok(GameState::try_from(record)?)
}

/// Same as [`parse_state`] for an already parsed JSON value.
pub fn state_from_value(value: serde_json::Value) -> Result<GameState, ProtocolError> {
    let record: GameStateRecord = serde_json::from_value(value)?;
    Ok(GameState::try_from(record)?)
}

pub fn format_state(state: &GameState) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(state)?)
}

/// Accepts `one`/`two`, case-insensitively, and `1`/`2`.
pub fn parse_side(s: &str) -> Result<Side, ProtocolError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "one" | "1" => Ok(Side::One),
        "two" | "2" => Ok(Side::Two),
        _ => Err(ProtocolError::UnknownSide(s.to_string())),
    }
}

pub fn parse_action(json: &str) -> Result<Action, ProtocolError> {
    Ok(serde_json::from_str(json)?)
}

pub fn format_evaluation(evaluation: &Evaluation) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(evaluation)?)
}

pub fn format_recommendation(rec: &Recommendation) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(rec)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Phase, UnitId};

    const STATE: &str = r#"{
        "turn": 2, "phase": "shooting", "active_side": "two",
        "board": {"width": 12, "height": 8},
        "sides": [
            {"units": [{"id": 1, "side": "one", "position": {"x": 1, "y": 2},
                        "health": 3, "max_health": 4, "points": 90}],
             "victory_points": 5},
            {"units": [{"id": 2, "side": "two", "position": {"x": 9, "y": 6},
                        "health": 4, "max_health": 4, "points": 110}],
             "command_points": 1}
        ],
        "objectives": [{"x": 6, "y": 4}]
    }"#;

    #[test]
    fn parse_valid_state() {
        let s = parse_state(STATE).unwrap();
        assert_eq!(s.turn(), 2);
        assert_eq!(s.phase(), Phase::Shooting);
        assert_eq!(s.active_side(), Side::Two);
        assert_eq!(s.unit(UnitId(1)).unwrap().health(), 3);
        assert_eq!(s.command_points(Side::Two), 1);
        assert_eq!(s.objectives().len(), 1);
    }

    #[test]
    fn state_roundtrips_through_json() {
        let s = parse_state(STATE).unwrap();
        let again = parse_state(&format_state(&s).unwrap()).unwrap();
        assert_eq!(s, again);
    }

    #[test]
    fn invalid_state_is_state_error() {
        let bad = STATE.replace(r#""x": 9"#, r#""x": 40"#);
        assert!(matches!(
            parse_state(&bad),
            Err(ProtocolError::State(StateError::UnitOffBoard { .. }))
        ));
    }

    #[test]
    fn health_violations_are_state_errors() {
        let over = STATE.replace(r#""health": 3"#, r#""health": 5"#);
        assert!(matches!(
            parse_state(&over),
            Err(ProtocolError::State(StateError::HealthOutOfRange {
                unit: UnitId(1),
                health: 5,
                max_health: 4,
            }))
        ));
        let zero = STATE.replace(r#""health": 4, "max_health": 4"#, r#""health": 0, "max_health": 0"#);
        let value: serde_json::Value = serde_json::from_str(&zero).unwrap();
        assert!(matches!(
            state_from_value(value),
            Err(ProtocolError::State(StateError::ZeroMaxHealth { unit: UnitId(2) }))
        ));
    }

    #[test]
    fn syntax_error_is_json_error() {
        assert!(matches!(parse_state("{\"turn\": "), Err(ProtocolError::Json(_))));
        let unknown_phase = STATE.replace("shooting", "morale");
        assert!(matches!(parse_state(&unknown_phase), Err(ProtocolError::Json(_))));
    }

    #[test]
    fn sides() {
        assert_eq!(parse_side("One").unwrap(), Side::One);
        assert_eq!(parse_side("2").unwrap(), Side::Two);
        assert!(matches!(parse_side("three"), Err(ProtocolError::UnknownSide(_))));
    }

    #[test]
    fn action_json() {
        let a = parse_action(r#"{"type": "move", "unit": 4, "to": {"x": 1, "y": 1}}"#).unwrap();
        assert_eq!(a.unit(), Some(UnitId(4)));
        assert!(parse_action(r#"{"type": "teleport"}"#).is_err());
    }
}
