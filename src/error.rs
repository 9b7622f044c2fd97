//! Error types.
//!
//! Prediction and resolution never fail; these only cover building a
//! predictor from a configuration and reading traces.

use std::io;
use thiserror::Error;

/// Problems found while validating a predictor configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{what} size must be a power of two (got {size})")]
    NotPowerOfTwo { what: &'static str, size: usize },

    #[error("counter width must be in 1..=8 bits (got {0})")]
    CounterWidth(usize),

    #[error("tag width must be in 2..=16 bits (got {0})")]
    TagWidth(usize),

    #[error("at least one tagged component is required")]
    NoComponents,

    #[error("history lengths must be strictly increasing and non-zero (got {0:?})")]
    HistoryLengths(Vec<usize>),

    #[error("local history length must be in 1..=32 bits (got {0})")]
    LocalHistoryLength(usize),

    #[error("invalid parameter: {0}")]
    Invalid(String),
}

/// Top-level error type for fallible operations in this crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed trace '{name}': {len} bytes is not a multiple of the {record}-byte record size")]
    TraceLength { name: String, len: usize, record: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
