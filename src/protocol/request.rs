//! Request parsing.
//!
//! A request is one JSON object naming a command, the side to score for
//! and the game state:
//!
//! ```json
//! {"command": "recommend", "side": "one", "state": { ... }}
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::board::{GameState, Side};

use super::codec::{parse_side, state_from_value, ProtocolError};

/// A parsed request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Score the state for the side.
    Evaluate { state: GameState, side: Side },
    /// Choose an action for the side.
    Recommend { state: GameState, side: Side },
}

#[derive(Deserialize)]
struct RawRequest {
    command: String,
    side: String,
    state: Value,
}

pub fn parse_request(line: &str) -> Result<Request, ProtocolError> {
    let raw: RawRequest = serde_json::from_str(line.trim())?;
    let side = parse_side(&raw.side)?;
    match raw.command.as_str() {
        "evaluate" => Ok(Request::Evaluate {
            state: state_from_value(raw.state)?,
            side,
        }),
        "recommend" => Ok(Request::Recommend {
            state: state_from_value(raw.state)?,
            side,
        }),
        other => Err(ProtocolError::UnknownCommand(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATE: &str = r#"{"turn": 1, "phase": "command", "active_side": "one",
        "board": {"width": 4, "height": 4}, "sides": [{}, {}]}"#;

    #[test]
    fn parses_both_commands() {
        let line = format!(r#"{{"command": "evaluate", "side": "two", "state": {STATE}}}"#);
        match parse_request(&line).unwrap() {
            Request::Evaluate { side, state } => {
                assert_eq!(side, Side::Two);
                assert_eq!(state.turn(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        let line = format!(r#"{{"command": "recommend", "side": "one", "state": {STATE}}}"#);
        assert!(matches!(parse_request(&line).unwrap(), Request::Recommend { .. }));
    }

    #[test]
    fn unknown_command_rejected() {
        let line = format!(r#"{{"command": "ponder", "side": "one", "state": {STATE}}}"#);
        assert!(matches!(
            parse_request(&line),
            Err(ProtocolError::UnknownCommand(c)) if c == "ponder"
        ));
    }

    #[test]
    fn missing_fields_rejected() {
        assert!(matches!(
            parse_request(r#"{"command": "evaluate"}"#),
            Err(ProtocolError::Json(_))
        ));
    }
}
