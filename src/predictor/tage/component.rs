
use crate::Outcome;
use crate::history::*;
use crate::predictor::*;

/// A base component in the TAGE predictor.
#[derive(Clone, Debug)]
pub struct TAGEBaseComponent {
    pub cfg: TAGEBaseConfig,

    /// A table of saturating counters
    pub data: Vec<SaturatingCounter>,
}
impl TAGEBaseComponent {
    fn index_bits(&self) -> usize {
        self.cfg.size.ilog2() as usize
    }
}
impl PredictorTable for TAGEBaseComponent {
    type Input<'a> = TAGEInputs<'a>;
    type Index = usize;
    type Entry = SaturatingCounter;

    fn size(&self) -> usize { self.cfg.size }

    fn get_index(&self, input: TAGEInputs) -> usize {
        let pc = input.pc;
        (pc ^ (pc >> self.index_bits())) & self.index_mask()
    }

    fn get_entry(&self, idx: usize) -> &SaturatingCounter {
        let index = idx & self.index_mask();
        &self.data[index]
    }
    fn get_entry_mut(&mut self, idx: usize) -> &mut SaturatingCounter {
        let index = idx & self.index_mask();
        &mut self.data[index]
    }
}


/// An entry in some [TAGEComponent].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TAGEEntry {
    /// State machine tracking a branch outcome
    pub ctr: SaturatingCounter,

    /// The 'useful' counter, used to determine when the entry is
    /// eligible to be replaced
    pub useful: SaturatingCounter,

    /// Tag associated with this entry. An entry is only valid after it
    /// has been allocated and given a tag.
    pub tag: Option<u16>,
}
impl TAGEEntry {
    pub fn new(ctr: SaturatingCounter, useful_bits: usize) -> Self {
        let mut useful = SaturatingCounter::new(useful_bits);
        useful.set(0);
        Self { ctr, useful, tag: None }
    }

    /// Get the current predicted outcome.
    pub fn predict(&self) -> Outcome {
        self.ctr.predict()
    }

    pub fn is_valid(&self) -> bool {
        self.tag.is_some()
    }

    /// Returns true if the provided tag matches this entry.
    pub fn tag_matches(&self, tag: u16) -> bool {
        self.tag == Some(tag)
    }

    /// Returns true if this entry may be replaced.
    /// Entries that were never allocated are always eligible.
    pub fn is_replaceable(&self) -> bool {
        self.useful.value() == 0
    }

    /// Re-tag this entry for a new branch, leaving the counter in the
    /// weakest state for the observed outcome.
    pub fn allocate(&mut self, tag: u16, outcome: Outcome) {
        self.tag = Some(tag);
        self.ctr.set_weak(outcome);
        self.useful.set(0);
    }
}

/// A tagged component in the TAGE predictor.
#[derive(Clone, Debug)]
pub struct TAGEComponent {
    pub cfg: TAGEComponentConfig,

    /// Table of entries
    pub data: Vec<TAGEEntry>,

    /// Global history folded down to the number of index bits
    pub csr: FoldedHistoryRegister,

    /// Global history folded down to the number of tag bits, and to one
    /// bit less than that
    pub tag_csr: [FoldedHistoryRegister; 2],

    /// Whether path history is mixed into the index
    pub use_path: bool,
}
impl TAGEComponent {
    pub fn index_bits(&self) -> usize {
        self.cfg.size.ilog2() as usize
    }

    pub fn history_len(&self) -> usize {
        self.cfg.history_len
    }

    /// Given some reference to a [`HistoryRegister`] that was just shifted,
    /// update the state of the folded history registers.
    pub fn update_history(&mut self, ghr: &HistoryRegister) {
        self.csr.update(ghr);
        for csr in self.tag_csr.iter_mut() {
            csr.update(ghr);
        }
    }

    pub fn num_valid_entries(&self) -> usize {
        self.data.iter().filter(|e| e.is_valid()).count()
    }

    pub fn num_useful_entries(&self) -> usize {
        self.data.iter().filter(|e| !e.is_replaceable()).count()
    }

    /// Calculate what percentage of entries have been allocated.
    pub fn utilization(&self) -> f64 {
        self.num_valid_entries() as f64 / self.data.len() as f64 * 100.0
    }

    /// Reset the 'useful' counter for all entries in this component.
    pub fn reset_useful_bits(&mut self) {
        for entry in self.data.iter_mut() {
            entry.useful.set(0);
        }
    }
}

impl PredictorTable for TAGEComponent {
    type Input<'a> = TAGEInputs<'a>;
    type Index = usize;
    type Entry = TAGEEntry;

    fn size(&self) -> usize { self.cfg.size }

    fn get_index(&self, input: TAGEInputs) -> usize {
        let bits = self.index_bits();
        let pc_bits = input.pc ^ (input.pc >> bits);
        let ghist_bits = self.csr.output_usize();
        let phr_bits = match input.phr {
            Some(phr) if self.use_path && !phr.is_empty() => {
                phr.fold(0..=phr.len() - 1, bits)
            },
            _ => 0,
        };
        (pc_bits ^ ghist_bits ^ phr_bits) & self.index_mask()
    }

    fn get_entry(&self, idx: usize) -> &TAGEEntry {
        let index = idx & self.index_mask();
        &self.data[index]
    }
    fn get_entry_mut(&mut self, idx: usize) -> &mut TAGEEntry {
        let index = idx & self.index_mask();
        &mut self.data[index]
    }
}

impl TaggedPredictorTable for TAGEComponent {
    type Tag = u16;

    fn get_tag(&self, input: TAGEInputs) -> u16 {
        let pc_bits = (input.pc >> 2) ^ (input.pc >> (2 + self.cfg.tag_bits));
        let ghist0_bits = self.tag_csr[0].output_usize();
        let ghist1_bits = self.tag_csr[1].output_usize() << 1;
        let mask = (1 << self.cfg.tag_bits) - 1;
        ((pc_bits ^ ghist0_bits ^ ghist1_bits) & mask) as u16
    }
}
