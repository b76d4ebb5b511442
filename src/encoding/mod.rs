//! State encoding for opening-book keys and learned evaluators.
//!
//! Converts a `GameState` into a fixed-length vector of normalized features
//! plus per-side occupancy masks, and hashes that encoding into a 64-bit
//! position key. The layout is versioned in [`schema`].

pub mod hash;
pub mod schema;
pub mod vector;

pub use hash::{hash_encoded, ParseHashError, PositionHash};
pub use schema::{EncodingSchema, GLOBAL_DIM, SCHEMA_VERSION, UNIT_DIM};
pub use vector::{
    decode, encode, position_hash, DecodeError, DecodedState, DecodedUnit, EncodeError,
    EncodedState,
};
