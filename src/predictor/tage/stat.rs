
/// Container for [TAGEPredictor](crate::TAGEPredictor) runtime stats.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TAGEStats {
    /// Successful allocations
    pub alcs: usize,

    /// Failed allocations
    pub failed_alcs: usize,

    /// Correct predictions from the base component
    pub base_hits: usize,

    /// Misses in the base component
    pub base_miss: usize,

    /// Correct predictions from the tagged components
    pub comp_hits: Vec<usize>,

    /// Misses in the tagged components
    pub comp_miss: Vec<usize>,

    /// Number of times the perceptron overrode the tagged components
    pub neural_overrides: usize,

    /// Number of overrides which turned out to be correct
    pub neural_override_hits: usize,

    /// Number of global 'useful' counter resets
    pub resets: usize,

    /// Resolutions without a live prediction
    pub orphan_resolves: usize,

    /// Number of updates
    pub clk: usize,
}
impl TAGEStats {
    pub fn new(num_comp: usize) -> Self {
        Self {
            comp_hits: vec![0; num_comp],
            comp_miss: vec![0; num_comp],
            ..Default::default()
        }
    }

    /// Total number of correct predictions made by any table.
    pub fn table_hits(&self) -> usize {
        self.base_hits + self.comp_hits.iter().sum::<usize>()
    }

    /// Total number of incorrect predictions made by any table.
    pub fn table_miss(&self) -> usize {
        self.base_miss + self.comp_miss.iter().sum::<usize>()
    }
}
