
pub mod table;
pub mod counter;
pub mod perceptron;
pub mod tage;

pub use table::*;
pub use counter::*;
pub use perceptron::*;
pub use tage::*;

use crate::branch::BranchKind;

/// The two-call contract between a conditional branch predictor and
/// whatever drives it.
///
/// Each call to [`BranchPredictor::predict`] is expected to be followed by
/// exactly one call to [`BranchPredictor::resolve`] for the same branch.
pub trait BranchPredictor {
    /// A short human-readable name for this predictor.
    fn name(&self) -> &'static str;

    /// Predict the direction of the conditional branch at `pc`.
    fn predict(&mut self, pc: usize) -> bool;

    /// Inform the predictor about the actual direction of the most
    /// recently predicted branch.
    fn resolve(&mut self, pc: usize, target: usize, taken: bool,
        kind: BranchKind);
}
