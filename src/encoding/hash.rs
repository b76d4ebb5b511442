//! Position hashing.
//!
//! The hash is a function of the schema fingerprint and the encoded vector
//! and masks only, never of object identity, so semantically equal states
//! always collide. Mixing is a splitmix64 chain over the raw `f32` bit
//! patterns, two values per 64-bit word.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::vector::EncodedState;

pub(crate) const HASH_SEED: u64 = 0x7AC7_1CA5_0E1D_2B3Fu64;

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

#[inline]
pub(crate) fn mix(h: &mut u64, x: u64) {
    *h = splitmix64(*h ^ x);
}

/// Bit pattern of an encoded value with `-0.0` folded into `0.0`.
#[inline]
fn canonical_bits(v: f32) -> u32 {
    if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

/// 64-bit transposition key of an encoded position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionHash(pub u64);

impl fmt::Display for PositionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Error parsing a hash from its hex form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid position hash '{0}': expected 16 hex digits")]
pub struct ParseHashError(pub String);

impl FromStr for PositionHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 16 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseHashError(s.to_string()));
        }
        u64::from_str_radix(s, 16)
            .map(PositionHash)
            .map_err(|_| ParseHashError(s.to_string()))
    }
}

impl Serialize for PositionHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PositionHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Hashes an encoded state.
pub fn hash_encoded(encoded: &EncodedState) -> PositionHash {
    let mut h = HASH_SEED;
    mix(&mut h, encoded.schema().fingerprint());

    let values = encoded.values();
    mix(&mut h, values.len() as u64);
    for pair in values.chunks(2) {
        let lo = canonical_bits(pair[0]) as u64;
        let hi = pair.get(1).map_or(0, |v| canonical_bits(*v)) as u64;
        mix(&mut h, lo | (hi << 32));
    }

    for (side_idx, mask) in encoded.masks().iter().enumerate() {
        mix(&mut h, 0xA5A5_0000u64 | side_idx as u64);
        mix(&mut h, mask.len() as u64);
        for chunk in mask.chunks(64) {
            let mut word = 0u64;
            for (i, &bit) in chunk.iter().enumerate() {
                word |= (bit as u64) << i;
            }
            mix(&mut h, word);
        }
    }

    PositionHash(h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let h = PositionHash(0x00ab_cdef_0123_4567);
        let s = h.to_string();
        assert_eq!(s, "00abcdef01234567");
        assert_eq!(s.parse::<PositionHash>(), Ok(h));
    }

    #[test]
    fn bad_hex_rejected() {
        assert!("abc".parse::<PositionHash>().is_err());
        assert!("zzzzzzzzzzzzzzzz".parse::<PositionHash>().is_err());
        assert!("+000000000000001".parse::<PositionHash>().is_err());
    }

    #[test]
    fn serde_as_string() {
        let h = PositionHash(42);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, "\"000000000000002a\"");
        let back: PositionHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn negative_zero_is_canonical() {
        assert_eq!(canonical_bits(-0.0), canonical_bits(0.0));
        assert_ne!(canonical_bits(0.5), canonical_bits(0.25));
    }

    #[test]
    fn mix_is_order_sensitive() {
        let mut a = HASH_SEED;
        mix(&mut a, 1);
        mix(&mut a, 2);
        let mut b = HASH_SEED;
        mix(&mut b, 2);
        mix(&mut b, 1);
        assert_ne!(a, b);
    }
}
