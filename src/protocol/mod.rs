//! JSON command protocol.
//!
//! Decodes game states, sides and requests from JSON text and encodes
//! evaluations and recommendations back to it. Malformed input is reported
//! as a [`ProtocolError`] that keeps the underlying error kind.

pub mod codec;
pub mod request;

pub use codec::{
    format_evaluation, format_recommendation, format_state, parse_action, parse_side,
    parse_state, state_from_value, ProtocolError,
};
pub use request::{parse_request, Request};
