//! Engine configuration.
//!
//! One serde document covers every tunable: the encoding schema, evaluator
//! weights, opening-book confidence and the recommender policy. Each section
//! defaults to the reference values, so `{}` is a valid configuration.
//! Validation runs once at load; components assume validated values.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoding::EncodingSchema;
use crate::eval::EvalWeights;
use crate::opening_book::BookConfig;
use crate::search::RecommendConfig;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("factor weights sum to {sum}, expected 1.0")]
    WeightSum { sum: f64 },

    #[error("weight for {factor} is {value}; weights must be finite and non-negative")]
    InvalidWeight { factor: &'static str, value: f64 },

    #[error("schema version {found} is not supported (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },

    #[error("schema limit {field} = {value} is out of range")]
    SchemaLimit { field: &'static str, value: u64 },

    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("unknown faction '{0}'")]
    UnknownFaction(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub schema: EncodingSchema,
    pub weights: EvalWeights,
    pub book: BookConfig,
    pub recommend: RecommendConfig,
}

impl EngineConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let cfg: EngineConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schema.validate()?;
        self.weights.validate()?;
        self.book.validate()?;
        self.recommend.validate()?;
        Ok(())
    }
}

/// Checks that `value` is finite and within `[min, max]`.
pub(crate) fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
