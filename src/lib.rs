//! Conditional branch prediction with tagged geometric-history tables.
//!
//! A [`TAGEPredictor`] is built from a [`TAGEConfig`] and driven through
//! the two-call [`BranchPredictor`] contract: `predict` for a branch, then
//! `resolve` once its direction is known.

pub mod branch;
pub mod error;
pub mod history;
pub mod predictor;
pub mod stats;
pub mod trace;

pub use branch::*;
pub use error::{ ConfigError, Error };
pub use history::*;
pub use predictor::*;
pub use trace::*;
