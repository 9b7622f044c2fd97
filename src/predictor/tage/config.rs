
use log::debug;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{ Deserialize, Serialize };

use crate::error::ConfigError;
use crate::history::*;
use crate::predictor::*;

/// Configuration for a [`TAGEBaseComponent`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TAGEBaseConfig {
    /// Parameters for the saturating counters
    pub ctr: SaturatingCounterConfig,

    /// Number of entries
    pub size: usize,
}
impl Default for TAGEBaseConfig {
    fn default() -> Self {
        Self {
            ctr: SaturatingCounterConfig::new(3),
            size: 1 << 12,
        }
    }
}
impl TAGEBaseConfig {
    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        self.ctr.storage_bits() * self.size
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.size.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                what: "base component", size: self.size
            });
        }
        validate_counter(self.ctr.bits)
    }

    /// Use this configuration to create a new [`TAGEBaseComponent`].
    pub fn build(self) -> TAGEBaseComponent {
        TAGEBaseComponent {
            data: vec![self.ctr.build(); self.size],
            cfg: self,
        }
    }
}

/// Configuration for a [`TAGEComponent`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TAGEComponentConfig {
    /// Number of entries
    pub size: usize,

    /// Number of global history bits used to index and tag this component
    pub history_len: usize,

    /// Number of tag bits
    pub tag_bits: usize,

    /// Number of bits in the 'useful' counter
    pub useful_bits: usize,

    /// Parameters for the saturating counters
    pub ctr: SaturatingCounterConfig,
}
impl Default for TAGEComponentConfig {
    fn default() -> Self {
        Self {
            size: 1 << 10,
            history_len: 8,
            tag_bits: 8,
            useful_bits: 2,
            ctr: SaturatingCounterConfig::new(3),
        }
    }
}
impl TAGEComponentConfig {
    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        let entry_size = self.ctr.storage_bits()
            + self.useful_bits
            + self.tag_bits;
        entry_size * self.size
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.size.is_power_of_two() || self.size < 2 {
            return Err(ConfigError::NotPowerOfTwo {
                what: "tagged component", size: self.size
            });
        }
        if !(2..=16).contains(&self.tag_bits) {
            return Err(ConfigError::TagWidth(self.tag_bits));
        }
        validate_counter(self.ctr.bits)?;
        validate_counter(self.useful_bits)
    }

    /// Use this configuration to create a new [`TAGEComponent`].
    pub fn build(self, use_path: bool) -> TAGEComponent {
        let csr = FoldedHistoryRegister::new(
            self.size.ilog2() as usize,
            self.history_len,
        );
        let tag_csr = [
            FoldedHistoryRegister::new(self.tag_bits, self.history_len),
            FoldedHistoryRegister::new(self.tag_bits - 1, self.history_len),
        ];
        let entry = TAGEEntry::new(self.ctr.build(), self.useful_bits);
        let data = vec![entry; self.size];

        TAGEComponent {
            cfg: self,
            data,
            csr,
            tag_csr,
            use_path,
        }
    }
}

/// Configuration for the path history register.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathHistoryConfig {
    /// Length of the register [in bits]
    pub len: usize,

    /// Number of program counter bits shifted in for each branch
    pub bits_per_branch: usize,

    /// Number of low program counter bits skipped (instruction alignment)
    pub align_bits: usize,
}
impl Default for PathHistoryConfig {
    fn default() -> Self {
        Self { len: 96, bits_per_branch: 6, align_bits: 2 }
    }
}

/// The closed set of predictor variants that can be built from a
/// [`TAGEConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictorKind {
    /// Tagged tables only
    Tage,

    /// Tagged tables with a perceptron overlay
    NeuralTage,
}
impl PredictorKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tage => "TAGE",
            Self::NeuralTage => "NeuralTAGE",
        }
    }

    /// Return the preset configuration for this kind of predictor.
    pub fn preset(&self) -> TAGEConfig {
        match self {
            Self::Tage => TAGEConfig::tage(),
            Self::NeuralTage => TAGEConfig::neural_tage(),
        }
    }
}

/// Configuration for a [`TAGEPredictor`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TAGEConfig {
    /// Base component configuration
    pub base: TAGEBaseConfig,

    /// Tagged component configurations, ordered from the shortest to the
    /// longest associated history length
    pub comp: Vec<TAGEComponentConfig>,

    /// Perceptron overlay. When present, a confident neural vote
    /// overrides the tagged components.
    pub neural: Option<NeuralConfig>,

    /// Path history mixed into the index of all but the shortest tagged
    /// component
    pub path: Option<PathHistoryConfig>,

    /// Seed for the generator used to pick allocation candidates and to
    /// schedule 'useful' counter resets
    pub seed: u64,

    /// All 'useful' counters are reset with probability `2^-n` after
    /// each resolved branch
    pub useful_reset_log2: u32,
}
impl Default for TAGEConfig {
    fn default() -> Self {
        Self::tage()
    }
}
impl TAGEConfig {
    /// Create a configuration with some base component and no tagged
    /// components. The user is expected to add tagged components with
    /// [TAGEConfig::add_component].
    pub fn new(base: TAGEBaseConfig) -> Self {
        Self {
            base,
            comp: Vec::new(),
            neural: None,
            path: None,
            seed: 0,
            useful_reset_log2: 26,
        }
    }

    /// Four tagged components with history lengths 4, 8, 16 and 32.
    pub fn tage() -> Self {
        let mut cfg = Self::new(TAGEBaseConfig::default());
        for history_len in [4, 8, 16, 32] {
            cfg.add_component(TAGEComponentConfig {
                history_len,
                ..TAGEComponentConfig::default()
            });
        }
        cfg
    }

    /// Four tagged components with geometric history lengths between 2
    /// and 250, path history, and a perceptron overlay.
    pub fn neural_tage() -> Self {
        let mut cfg = Self::new(TAGEBaseConfig::default());
        for history_len in Self::geometric(2, 250, 4) {
            cfg.add_component(TAGEComponentConfig {
                history_len,
                ..TAGEComponentConfig::default()
            });
        }
        cfg.neural = Some(NeuralConfig::default());
        cfg.path = Some(PathHistoryConfig::default());
        cfg
    }

    /// Compute `n` history lengths in a geometric series from `min` to
    /// `max`. Lengths are forced to be strictly increasing.
    pub fn geometric(min: usize, max: usize, n: usize) -> Vec<usize> {
        if n <= 1 {
            return vec![min; n];
        }
        let ratio = (max as f64 / min as f64).powf(1.0 / (n - 1) as f64);
        let mut res: Vec<usize> = Vec::with_capacity(n);
        for i in 0..n {
            let len = (min as f64 * ratio.powi(i as i32)).round() as usize;
            let len = match res.last() {
                Some(prev) if len <= *prev => prev + 1,
                _ => len,
            };
            res.push(len);
        }
        res
    }

    /// The kind of predictor described by this configuration.
    pub fn kind(&self) -> PredictorKind {
        if self.neural.is_some() {
            PredictorKind::NeuralTage
        } else {
            PredictorKind::Tage
        }
    }

    /// Add a tagged component to the predictor.
    ///
    /// The list of components is kept sorted by history length, so the
    /// component with the longest history length is always the last entry.
    pub fn add_component(&mut self, c: TAGEComponentConfig) {
        self.comp.push(c);
        self.comp.sort_by_key(|c| c.history_len);
    }

    /// Returns the history lengths of all tagged components.
    pub fn history_lengths(&self) -> Vec<usize> {
        self.comp.iter().map(|c| c.history_len).collect()
    }

    /// Length of the global history register needed by all components.
    pub fn ghr_len(&self) -> usize {
        self.comp.iter().map(|c| c.history_len).max().unwrap_or(0) + 1
    }

    pub fn total_entries(&self) -> usize {
        let c: usize = self.comp.iter().map(|c| c.size).sum();
        self.base.size + c
    }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        let c: usize = self.comp.iter().map(|c| c.storage_bits()).sum();
        let n = self.neural.as_ref().map_or(0, |n| n.storage_bits());
        let p = self.path.as_ref().map_or(0, |p| p.len);
        c + self.base.storage_bits() + n + p + self.ghr_len()
    }

    /// Check that this configuration describes a buildable predictor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base.validate()?;
        if self.comp.is_empty() {
            return Err(ConfigError::NoComponents);
        }
        for c in self.comp.iter() {
            c.validate()?;
        }
        let lens = self.history_lengths();
        let increasing = lens.windows(2).all(|w| w[0] < w[1]);
        if !increasing || lens[0] == 0 {
            return Err(ConfigError::HistoryLengths(lens));
        }
        if let Some(neural) = &self.neural {
            neural.validate()?;
        }
        if let Some(path) = &self.path {
            if path.len == 0 || path.bits_per_branch == 0
                || path.bits_per_branch > path.len
                || path.bits_per_branch > usize::BITS as usize
                || path.align_bits >= usize::BITS as usize
            {
                return Err(ConfigError::Invalid(format!(
                    "path history of {} bits cannot take {} bits per branch",
                    path.len, path.bits_per_branch
                )));
            }
        }
        if self.useful_reset_log2 == 0 || self.useful_reset_log2 > 63 {
            return Err(ConfigError::Invalid(format!(
                "useful reset period 2^{} is out of range",
                self.useful_reset_log2
            )));
        }
        Ok(())
    }

    /// Parse a configuration from JSON. Missing fields take their default
    /// values.
    pub fn from_json(s: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Use this configuration to create a new [`TAGEPredictor`].
    pub fn build(self) -> Result<TAGEPredictor, ConfigError> {
        self.validate()?;

        let kind = self.kind();
        let comp: Vec<TAGEComponent> = self.comp.iter().enumerate()
            .map(|(idx, c)| c.clone().build(self.path.is_some() && idx > 0))
            .collect();
        let base = self.base.clone().build();
        let neural = match self.neural.clone() {
            Some(n) => Some(n.build()?),
            None => None,
        };
        let ghr = HistoryRegister::new(self.ghr_len());
        let phr = self.path.as_ref().map(|p| HistoryRegister::new(p.len));
        let rng = SmallRng::seed_from_u64(self.seed);
        let stat = TAGEStats::new(comp.len());

        debug!("{} predictor: {} entries, {} storage bits, histories {:?}",
            kind.name(), self.total_entries(), self.storage_bits(),
            self.history_lengths()
        );

        Ok(TAGEPredictor {
            cfg: self,
            stat,
            base,
            comp,
            neural,
            ghr,
            phr,
            rng,
            ctx: PredictionContext::default(),
            live: false,
        })
    }
}

fn validate_counter(bits: usize) -> Result<(), ConfigError> {
    if (1..=8).contains(&bits) {
        Ok(())
    } else {
        Err(ConfigError::CounterWidth(bits))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn geometric_lengths() {
        assert_eq!(TAGEConfig::geometric(2, 250, 4), vec![2, 10, 50, 250]);
        assert_eq!(TAGEConfig::geometric(1, 2, 4), vec![1, 2, 3, 4]);
        assert_eq!(TAGEConfig::geometric(4, 4, 1), vec![4]);
    }

    #[test]
    fn components_sorted_by_history() {
        let mut cfg = TAGEConfig::new(TAGEBaseConfig::default());
        for history_len in [32, 4, 16] {
            cfg.add_component(TAGEComponentConfig {
                history_len, ..Default::default()
            });
        }
        assert_eq!(cfg.history_lengths(), vec![4, 16, 32]);
        assert_eq!(cfg.ghr_len(), 33);
    }

    #[test]
    fn presets_are_valid() {
        assert_eq!(TAGEConfig::tage().validate(), Ok(()));
        assert_eq!(TAGEConfig::neural_tage().validate(), Ok(()));
        assert_eq!(TAGEConfig::tage().kind(), PredictorKind::Tage);
        assert_eq!(TAGEConfig::neural_tage().kind(), PredictorKind::NeuralTage);
    }

    #[test]
    fn rejects_bad_configs() {
        let mut cfg = TAGEConfig::tage();
        cfg.base.size = 1000;
        assert!(matches!(cfg.validate(),
            Err(ConfigError::NotPowerOfTwo { size: 1000, .. })
        ));

        let cfg = TAGEConfig::new(TAGEBaseConfig::default());
        assert_eq!(cfg.validate(), Err(ConfigError::NoComponents));

        let mut cfg = TAGEConfig::tage();
        cfg.comp[1].history_len = 4;
        assert_eq!(cfg.validate(),
            Err(ConfigError::HistoryLengths(vec![4, 4, 16, 32]))
        );

        let mut cfg = TAGEConfig::tage();
        cfg.comp[0].tag_bits = 1;
        assert_eq!(cfg.validate(), Err(ConfigError::TagWidth(1)));
    }

    #[test]
    fn json_overrides_defaults() {
        let cfg = TAGEConfig::from_json(r#"{
            "seed": 7,
            "base": { "size": 16 },
            "comp": [
                { "size": 64, "history_len": 4 },
                { "size": 64, "history_len": 8, "tag_bits": 10 }
            ]
        }"#).unwrap();
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.base.size, 16);
        assert_eq!(cfg.base.ctr, SaturatingCounterConfig::new(3));
        assert_eq!(cfg.comp[1].tag_bits, 10);
        assert_eq!(cfg.comp[0].useful_bits, 2);
        assert_eq!(cfg.neural, None);
        assert!(cfg.build().is_ok());
    }

    #[test]
    fn storage_accounting() {
        let cfg = TAGEConfig::tage();
        assert_eq!(cfg.total_entries(), 4096 + 4 * 1024);
        // 3-bit base counters; 3 + 2 + 8 bits per tagged entry; 33 GHR bits
        assert_eq!(cfg.storage_bits(), 4096 * 3 + 4 * 1024 * 13 + 33);
    }
}
