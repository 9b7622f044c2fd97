//! Implementations of a "Tagged GEometric history length" (TAGE) predictor.

pub mod component;
pub mod stat;
pub mod config;

pub use component::*;
pub use stat::*;
pub use config::*;

use log::{ info, trace, warn };
use rand::RngCore;
use rand::rngs::SmallRng;

use crate::branch::*;
use crate::history::*;
use crate::predictor::*;

/// Container for inputs passed to the components of a [`TAGEPredictor`].
#[derive(Clone, Copy, Debug)]
pub struct TAGEInputs<'a> {
    /// Program counter associated with a predicted branch
    pub pc: usize,

    /// Path history, if the predictor keeps one
    pub phr: Option<&'a HistoryRegister>,
}

/// Identifies a particular component in a [`TAGEPredictor`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TAGEProvider {
    /// The base component
    #[default]
    Base,

    /// A tagged component
    Tagged(usize),
}

/// Everything a [`TAGEPredictor`] needs to remember about its most recent
/// prediction in order to update itself when the branch resolves.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PredictionContext {
    /// Program counter of the predicted branch
    pub pc: usize,

    /// Index into each tagged component
    pub indices: Vec<usize>,

    /// Expected tag in each tagged component
    pub tags: Vec<u16>,

    /// Index into the base component
    pub base_idx: usize,

    /// The component providing the prediction
    pub provider: TAGEProvider,

    /// Predicted direction from the provider
    pub provider_outcome: Outcome,

    /// Alternate component used to provide a prediction
    pub alt_provider: TAGEProvider,

    /// Predicted direction from the alternate component
    pub alt_outcome: Outcome,

    /// Output from the perceptron overlay
    pub neural: Option<NeuralPrediction>,

    /// The final predicted direction
    pub outcome: Outcome,
}
impl PredictionContext {
    /// Returns 'true' if the perceptron overrode the provider.
    pub fn is_neural_override(&self) -> bool {
        self.neural.is_some() && self.outcome != self.provider_outcome
    }
}

/// The "TAgged GEometric history length" predictor, optionally with a
/// perceptron overlay.
///
/// See the following:
///  - "A case for (partially) TAgged GEometric history length branch prediction"
///  (Seznec, 2006).
///
/// The predictor remembers only its most recent prediction: each call to
/// [`TAGEPredictor::predict`] must be followed by exactly one call to
/// [`TAGEPredictor::resolve`] for the same branch before the next
/// prediction. Another prediction silently replaces an unresolved one, and
/// the address passed to `resolve` is never checked against it.
pub struct TAGEPredictor {
    /// The configuration used to create this object
    pub cfg: TAGEConfig,

    pub stat: TAGEStats,

    /// Base component
    pub base: TAGEBaseComponent,

    /// Tagged components, ordered by increasing history length
    pub comp: Vec<TAGEComponent>,

    /// Perceptron overlay
    pub neural: Option<NeuralOverlay>,

    /// Global history register
    pub ghr: HistoryRegister,

    /// Path history register
    pub phr: Option<HistoryRegister>,

    /// Generator used to pick allocation candidates and schedule resets
    pub(crate) rng: SmallRng,

    /// The most recent prediction
    pub(crate) ctx: PredictionContext,

    /// Whether `ctx` is still waiting to be resolved
    pub(crate) live: bool,
}

/// The public interface to a [`TAGEPredictor`].
impl TAGEPredictor {
    /// Return the kind of this predictor.
    pub fn kind(&self) -> PredictorKind {
        self.cfg.kind()
    }

    /// Return the number of tagged components.
    pub fn num_tagged_components(&self) -> usize {
        self.comp.len()
    }

    /// Return the unresolved prediction, if there is one.
    pub fn context(&self) -> Option<&PredictionContext> {
        if self.live { Some(&self.ctx) } else { None }
    }

    /// Make a prediction for the branch at `pc`.
    pub fn predict(&mut self, pc: usize) -> bool {
        let mut ctx = std::mem::take(&mut self.ctx);
        self.lookup(pc, &mut ctx);
        let outcome = ctx.outcome;
        self.ctx = ctx;
        self.live = true;
        outcome.into()
    }

    /// Given the resolved direction of the most recently predicted branch,
    /// update the state of the predictor.
    ///
    /// `target` and `kind` are not used by this predictor.
    pub fn resolve(&mut self,
        pc: usize,
        _target: usize,
        taken: bool,
        _kind: BranchKind,
    )
    {
        let outcome = Outcome::from(taken);
        let ctx = std::mem::take(&mut self.ctx);
        let live = std::mem::replace(&mut self.live, false);

        self.update_history(pc, outcome);

        if live {
            self.train(&ctx, outcome);
        } else {
            warn!("resolved branch {:#x} without a prediction", pc);
            self.stat.orphan_resolves += 1;
        }

        self.stat.clk += 1;
        self.ctx = ctx;
    }

    /// Shift an outcome into the global history (and the address into the
    /// path history), then update the folded history registers in each
    /// tagged component.
    pub fn update_history(&mut self, pc: usize, outcome: Outcome) {
        self.ghr.push(outcome);
        for comp in self.comp.iter_mut() {
            comp.update_history(&self.ghr);
        }
        if let (Some(phr), Some(path)) = (self.phr.as_mut(), &self.cfg.path) {
            phr.push_bits(pc >> path.align_bits, path.bits_per_branch);
        }
    }

    /// Reset the 'useful' counters in all tagged components.
    pub fn reset_useful_bits(&mut self) {
        for comp in self.comp.iter_mut() {
            comp.reset_useful_bits();
        }
    }
}

impl TAGEPredictor {
    /// Compute indices and tags for every component, select the provider and
    /// alternate, and produce a final prediction.
    fn lookup(&self, pc: usize, ctx: &mut PredictionContext) {
        let inputs = TAGEInputs { pc, phr: self.phr.as_ref() };

        ctx.pc = pc;
        ctx.indices.clear();
        ctx.tags.clear();
        for comp in self.comp.iter() {
            ctx.indices.push(comp.get_index(inputs));
            ctx.tags.push(comp.get_tag(inputs));
        }

        // The base component provides the default predicted outcome
        // for cases where we miss in all tagged components
        ctx.base_idx = self.base.get_index(inputs);
        let base_outcome = self.base.get_entry(ctx.base_idx).predict();
        ctx.provider = TAGEProvider::Base;
        ctx.provider_outcome = base_outcome;
        ctx.alt_provider = TAGEProvider::Base;
        ctx.alt_outcome = base_outcome;

        // Find the two longest-history components that yield a match
        let (provider, alt) = {
            let mut hits = (0..self.comp.len()).rev().filter(|&idx| {
                self.comp[idx].get_entry(ctx.indices[idx])
                    .tag_matches(ctx.tags[idx])
            });
            (hits.next(), hits.next())
        };
        if let Some(idx) = provider {
            ctx.provider = TAGEProvider::Tagged(idx);
            ctx.provider_outcome = self.comp[idx].get_entry(ctx.indices[idx])
                .predict();
        }
        if let Some(idx) = alt {
            ctx.alt_provider = TAGEProvider::Tagged(idx);
            ctx.alt_outcome = self.comp[idx].get_entry(ctx.indices[idx])
                .predict();
        }

        ctx.neural = self.neural.as_ref().map(|n| n.predict(pc));
        ctx.outcome = match (&ctx.neural, &self.cfg.neural) {
            (Some(vote), Some(cfg)) if vote.is_confident(cfg.threshold) => {
                vote.outcome()
            },
            _ => ctx.provider_outcome,
        };

        trace!("predict {:#x}: provider={:?} alt={:?} outcome={:?}",
            pc, ctx.provider, ctx.alt_provider, ctx.outcome
        );
    }

    /// Update the tables and the perceptron with the resolved outcome of
    /// the prediction described by `ctx`.
    fn train(&mut self, ctx: &PredictionContext, outcome: Outcome) {
        if let (Some(neural), Some(vote)) = (self.neural.as_mut(), &ctx.neural) {
            neural.train(vote, outcome);
            if ctx.is_neural_override() {
                self.stat.neural_overrides += 1;
                if ctx.outcome == outcome {
                    self.stat.neural_override_hits += 1;
                }
            }
        }

        // Update the entry in the component that provided the prediction.
        // The 'useful' counter only moves when the alternate prediction
        // disagreed with the provider.
        let provider_hit = ctx.provider_outcome == outcome;
        match ctx.provider {
            TAGEProvider::Base => {
                self.base.get_entry_mut(ctx.base_idx).update(outcome);
                if provider_hit {
                    self.stat.base_hits += 1;
                } else {
                    self.stat.base_miss += 1;
                }
            },
            TAGEProvider::Tagged(idx) => {
                let entry = self.comp[idx].get_entry_mut(ctx.indices[idx]);
                entry.ctr.update(outcome);
                if ctx.provider_outcome != ctx.alt_outcome {
                    if provider_hit {
                        entry.useful.increment();
                    } else {
                        entry.useful.decrement();
                    }
                }
                if provider_hit {
                    self.stat.comp_hits[idx] += 1;
                } else {
                    self.stat.comp_miss[idx] += 1;
                }
            },
        }

        // The generator is advanced exactly once for each resolved branch.
        let draw = self.rng.next_u64();

        if ctx.outcome != outcome {
            self.allocate(ctx, outcome, (draw >> 32) as usize);
        }

        // Periodically reset *all* of the 'useful' counters across all
        // tagged components.
        let reset_mask = (1u64 << self.cfg.useful_reset_log2) - 1;
        if draw & reset_mask == 0 {
            info!("resetting 'useful' counters after {} branches", self.stat.clk);
            self.stat.resets += 1;
            self.reset_useful_bits();
        }
    }

    /// Returns the components with history longer than the provider whose
    /// entry for this branch is eligible for replacement.
    fn alloc_candidates(&self, ctx: &PredictionContext) -> Vec<usize> {
        let start = Self::first_alloc_component(ctx.provider);
        (start..self.comp.len())
            .filter(|&idx| {
                self.comp[idx].get_entry(ctx.indices[idx]).is_replaceable()
            })
            .collect()
    }

    /// Only components with longer history than the provider are allowed
    /// to allocate.
    fn first_alloc_component(provider: TAGEProvider) -> usize {
        match provider {
            TAGEProvider::Base => 0,
            TAGEProvider::Tagged(idx) => idx + 1,
        }
    }

    /// Try to allocate a new entry for a mispredicted branch.
    ///
    /// When no entry is eligible, all of the candidate entries age by one
    /// step and we try once more. If that also fails, nothing is allocated.
    fn allocate(&mut self, ctx: &PredictionContext, outcome: Outcome,
        choice: usize) -> Option<usize>
    {
        let mut candidates = self.alloc_candidates(ctx);
        if candidates.is_empty() {
            let start = Self::first_alloc_component(ctx.provider);
            for idx in start..self.comp.len() {
                self.comp[idx].get_entry_mut(ctx.indices[idx]).useful.decrement();
            }
            candidates = self.alloc_candidates(ctx);
        }

        if candidates.is_empty() {
            self.stat.failed_alcs += 1;
            return None;
        }

        let idx = candidates[choice % candidates.len()];
        self.comp[idx].get_entry_mut(ctx.indices[idx])
            .allocate(ctx.tags[idx], outcome);
        self.stat.alcs += 1;
        trace!("allocated {:#x} in component {} (index {:#x}, tag {:#x})",
            ctx.pc, idx, ctx.indices[idx], ctx.tags[idx]
        );
        Some(idx)
    }
}

impl BranchPredictor for TAGEPredictor {
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn predict(&mut self, pc: usize) -> bool {
        TAGEPredictor::predict(self, pc)
    }

    fn resolve(&mut self, pc: usize, target: usize, taken: bool,
        kind: BranchKind)
    {
        TAGEPredictor::resolve(self, pc, target, taken, kind)
    }
}
