
use bitvec::prelude::*;
use serde::{ Deserialize, Serialize };

use crate::Outcome;
use crate::error::ConfigError;
use crate::predictor::counter::SignedSaturatingCounter;

/// Local history for a single bucket of branches. Only the low
/// [NeuralConfig::local_history_len] bits are meaningful.
pub type LocalHistory = BitArray<[u32; 1], Lsb0>;

/// Perceptron [with saturating integer weights].
///
/// See the following papers:
///
/// - "Neural Methods for Dynamic Branch Prediction" (Jiménez and Lin, 2002)
/// - "Fast Path-Based Neural Branch Prediction" (Jiménez, 2003)
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Perceptron {
    pub weights: Vec<SignedSaturatingCounter>,
    pub bias: SignedSaturatingCounter,
}
impl Perceptron {
    pub fn new(num_weights: usize) -> Self {
        Self {
            weights: vec![SignedSaturatingCounter::zero(); num_weights],
            bias: SignedSaturatingCounter::zero(),
        }
    }

    /// Reset the state.
    pub fn reset(&mut self) {
        self.bias = SignedSaturatingCounter::zero();
        self.weights.fill(SignedSaturatingCounter::zero());
    }

    /// Compute the output for some input history. A set bit contributes
    /// the weight, a clear bit contributes the negated weight.
    /// The predicted outcome is determined by the sign of the output.
    pub fn output(&self, input: &BitSlice<u32, Lsb0>) -> i32 {
        let dot: i32 = input.iter().by_vals().zip(self.weights.iter())
            .map(|(bit, w)| {
                let w = w.value() as i32;
                if bit { w } else { -w }
            })
            .sum();
        dot + self.bias.value() as i32
    }

    /// Adjust the weights toward some outcome.
    ///
    /// There's no training threshold: the neuron is trained on every outcome.
    pub fn train(&mut self, input: &BitSlice<u32, Lsb0>, outcome: Outcome,
        weight_bits: usize)
    {
        self.bias.add(outcome.signum(), weight_bits);

        // When a bit in the history matches the outcome, increment the
        // corresponding weight. Otherwise, decrement the corresponding weight.
        let taken: bool = outcome.into();
        for (bit, w) in input.iter().by_vals().zip(self.weights.iter_mut()) {
            let adj = if bit == taken { 1 } else { -1 };
            w.add(adj, weight_bits);
        }
    }
}

/// Configuration for a [`NeuralOverlay`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralConfig {
    /// Number of perceptrons
    pub num_neurons: usize,

    /// Number of weights in each perceptron
    pub num_weights: usize,

    /// Width of each weight [in bits]
    pub weight_bits: usize,

    /// Number of local history registers
    pub local_history_size: usize,

    /// Length of each local history register [in bits]
    pub local_history_len: usize,

    /// The neural vote overrides the tables only when the magnitude of the
    /// output is strictly greater than this
    pub threshold: i32,
}
impl Default for NeuralConfig {
    fn default() -> Self {
        Self {
            num_neurons: 1024,
            num_weights: 16,
            weight_bits: 7,
            local_history_size: 256,
            local_history_len: 13,
            threshold: 14,
        }
    }
}
impl NeuralConfig {
    /// The number of weights actually paired with a history bit.
    pub fn num_inputs(&self) -> usize {
        self.num_weights.min(self.local_history_len)
    }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        let neurons = self.num_neurons * (self.num_weights + 1) * self.weight_bits;
        let local = self.local_history_size * self.local_history_len;
        neurons + local
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_neurons == 0 || self.local_history_size == 0 {
            return Err(ConfigError::Invalid(
                "neural overlay needs at least one neuron and one local history".into()
            ));
        }
        if !(1..=8).contains(&self.weight_bits) {
            return Err(ConfigError::CounterWidth(self.weight_bits));
        }
        if !(1..=LocalHistory::ZERO.len()).contains(&self.local_history_len) {
            return Err(ConfigError::LocalHistoryLength(self.local_history_len));
        }
        if self.threshold < 0 {
            return Err(ConfigError::Invalid(
                format!("negative neural threshold {}", self.threshold)
            ));
        }
        Ok(())
    }

    /// Use this configuration to create a new [`NeuralOverlay`].
    pub fn build(self) -> Result<NeuralOverlay, ConfigError> {
        self.validate()?;
        Ok(NeuralOverlay {
            neurons: vec![Perceptron::new(self.num_weights); self.num_neurons],
            local: vec![LocalHistory::ZERO; self.local_history_size],
            cfg: self,
        })
    }
}

/// Output from [`NeuralOverlay::predict`], kept until the branch resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NeuralPrediction {
    /// Index of the perceptron used for this prediction
    pub neuron_idx: usize,

    /// Index of the local history register used for this prediction
    pub local_idx: usize,

    /// Snapshot of the local history at the time of prediction
    pub history: LocalHistory,

    /// Raw perceptron output
    pub output: i32,
}
impl NeuralPrediction {
    /// The direction voted for by the perceptron.
    pub fn outcome(&self) -> Outcome {
        Outcome::from(self.output >= 0)
    }

    /// Returns 'true' when the vote is strong enough to override.
    pub fn is_confident(&self, threshold: i32) -> bool {
        self.output.abs() > threshold
    }
}

/// A table of perceptrons trained on per-address local history.
#[derive(Clone, Debug)]
pub struct NeuralOverlay {
    pub cfg: NeuralConfig,
    neurons: Vec<Perceptron>,
    local: Vec<LocalHistory>,
}
impl NeuralOverlay {
    fn neuron_index(&self, pc: usize) -> usize {
        (pc ^ (pc >> 7)) % self.cfg.num_neurons
    }

    fn local_index(&self, pc: usize) -> usize {
        (pc ^ (pc >> 11)) % self.cfg.local_history_size
    }

    pub fn neuron(&self, idx: usize) -> &Perceptron {
        &self.neurons[idx]
    }

    pub fn local_history(&self, idx: usize) -> &LocalHistory {
        &self.local[idx]
    }

    /// Compute the neural vote for a branch.
    pub fn predict(&self, pc: usize) -> NeuralPrediction {
        let neuron_idx = self.neuron_index(pc);
        let local_idx = self.local_index(pc);
        let history = self.local[local_idx];
        let n = self.cfg.num_inputs();
        let output = self.neurons[neuron_idx].output(&history[..n]);
        NeuralPrediction { neuron_idx, local_idx, history, output }
    }

    /// Train the perceptron used by `prediction` and shift the outcome into
    /// the local history register.
    pub fn train(&mut self, prediction: &NeuralPrediction, outcome: Outcome) {
        let n = self.cfg.num_inputs();
        let bits = self.cfg.weight_bits;
        self.neurons[prediction.neuron_idx]
            .train(&prediction.history[..n], outcome, bits);

        let local = &mut self.local[prediction.local_idx];
        local.shift_end(1);
        local.set(0, outcome.into());
    }
}
