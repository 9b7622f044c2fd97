//! Helpers for collecting statistics while evaluating a predictor.

use std::collections::BTreeMap;

use bitvec::prelude::*;
use itertools::Itertools;

use crate::branch::*;

/// Per-branch accuracy for a run of some predictor over a trace.
#[derive(Debug, Default)]
pub struct BranchStats {
    /// Per-branch statistics (indexed by program counter value)
    pub data: BTreeMap<usize, BranchData>,

    /// Number of correct predictions
    pub global_hits: usize,

    /// Number of predicted branches
    pub global_brns: usize,

    /// Mispredictions sampled over each window of 1000 branches
    pub mpkb_windows: Vec<usize>,

    mpkb_window: usize,
}
impl BranchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the prediction made for some branch.
    pub fn update(&mut self, record: &BranchRecord, predicted: Outcome) {
        let outcome = record.outcome();
        let hit = predicted == outcome;

        self.global_brns += 1;
        if hit {
            self.global_hits += 1;
        } else {
            self.mpkb_window += 1;
        }
        if self.global_brns % 1000 == 0 {
            self.mpkb_windows.push(self.mpkb_window);
            self.mpkb_window = 0;
        }

        let data = self.data.entry(record.pc).or_default();
        data.occ += 1;
        data.pat.push(outcome.into());
        if hit { data.hits += 1; }
    }

    /// Return the global hit rate.
    pub fn hit_rate(&self) -> f64 {
        if self.global_brns == 0 {
            return 0.0;
        }
        self.global_hits as f64 / self.global_brns as f64
    }

    /// Return the global miss count.
    pub fn global_miss(&self) -> usize { self.global_brns - self.global_hits }

    /// Average number of mispredictions per thousand branches.
    pub fn average_mpkb(&self) -> f64 {
        if self.mpkb_windows.is_empty() {
            return self.global_miss() as f64;
        }
        let total: usize = self.mpkb_windows.iter().sum();
        total as f64 / self.mpkb_windows.len() as f64
    }

    /// Returns a reference to data collected for a particular branch.
    pub fn get(&self, pc: usize) -> Option<&BranchData> {
        self.data.get(&pc)
    }

    /// Returns the number of unique observed branch instructions.
    pub fn num_unique_branches(&self) -> usize {
        self.data.len()
    }

    /// Returns up to `n` of the most frequent branches with a hit rate at or
    /// below `max_rate`, ignoring branches seen fewer than `min_occ` times.
    pub fn low_rate_branches(&self, n: usize, min_occ: usize, max_rate: f64)
        -> Vec<(usize, &BranchData)>
    {
        self.data.iter()
            .filter(|(_, s)| s.occ >= min_occ && s.hit_rate() <= max_rate)
            .sorted_by_key(|(_, s)| s.occ)
            .rev()
            .take(n)
            .map(|(pc, s)| (*pc, s))
            .collect()
    }
}

/// Container for per-branch statistics.
#[derive(Debug, Default)]
pub struct BranchData {
    /// Number of times this branch was encountered
    pub occ: usize,

    /// Number of correct predictions for this branch
    pub hits: usize,

    /// Record of all observed outcomes for this branch
    pub pat: BitVec,
}
impl BranchData {
    /// Return the hit rate for this branch.
    pub fn hit_rate(&self) -> f64 {
        self.hits as f64 / self.occ as f64
    }

    pub fn times_taken(&self) -> usize {
        self.pat.count_ones()
    }

    /// Format the first `n` observed outcomes.
    pub fn pattern(&self, n: usize) -> String {
        let n = n.min(self.pat.len());
        self.pat[..n].iter().by_vals()
            .map(|b| if b { 't' } else { 'n' })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(pc: usize, outcome: Outcome) -> BranchRecord {
        BranchRecord::new(pc, 0, BranchKind::DirectBranch, outcome)
    }

    #[test]
    fn counts_hits_and_windows() {
        let mut s = BranchStats::new();
        for i in 0..2000 {
            let r = record(0x10, Outcome::T);
            let p = if i % 100 == 0 { Outcome::N } else { Outcome::T };
            s.update(&r, p);
        }
        assert_eq!(s.global_brns, 2000);
        assert_eq!(s.global_miss(), 20);
        assert_eq!(s.mpkb_windows, vec![10, 10]);
        assert_eq!(s.average_mpkb(), 10.0);
        assert_eq!(s.get(0x10).map(|d| d.times_taken()), Some(2000));
    }

    #[test]
    fn low_rate_branches_sorted_by_frequency() {
        let mut s = BranchStats::new();
        for i in 0..30 {
            s.update(&record(0x10, Outcome::from(i % 2 == 0)), Outcome::T);
        }
        for _ in 0..50 {
            s.update(&record(0x20, Outcome::N), Outcome::T);
        }
        for _ in 0..50 {
            s.update(&record(0x30, Outcome::T), Outcome::T);
        }
        let low: Vec<usize> = s.low_rate_branches(8, 10, 0.55).iter()
            .map(|(pc, _)| *pc)
            .collect();
        assert_eq!(low, vec![0x20, 0x10]);
        assert_eq!(s.get(0x10).map(|d| d.pattern(4)), Some("tntn".to_string()));
    }
}
