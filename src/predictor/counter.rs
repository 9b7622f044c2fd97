//! Implementation of saturating counters.

use serde::{ Deserialize, Serialize };

use crate::Outcome;

/// Configuration for building a [`SaturatingCounter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaturatingCounterConfig {
    /// Width of the counter [in bits]
    pub bits: usize,

    /// Initial value. When [None], the counter starts in the weakest
    /// 'not-taken' state.
    #[serde(default)]
    pub init: Option<u8>,
}
impl SaturatingCounterConfig {
    pub fn new(bits: usize) -> Self {
        Self { bits, init: None }
    }

    pub fn storage_bits(&self) -> usize {
        self.bits
    }

    pub fn build(self) -> SaturatingCounter {
        let mut res = SaturatingCounter::new(self.bits);
        if let Some(init) = self.init {
            res.set(init);
        }
        res
    }
}

/// An n-bit unsigned saturating counter clamped to `[0, 2^n - 1]`.
///
/// The upper half of the range predicts 'taken'.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaturatingCounter {
    max: u8,
    ctr: u8,
}
impl SaturatingCounter {
    /// Create a counter in the weakest 'not-taken' state.
    pub fn new(bits: usize) -> Self {
        assert!((1..=8).contains(&bits));
        let max = ((1u16 << bits) - 1) as u8;
        Self { max, ctr: Self::weak_value(max, Outcome::N) }
    }

    fn weak_value(max: u8, outcome: Outcome) -> u8 {
        let mid = max / 2;
        match outcome {
            Outcome::T => mid + 1,
            Outcome::N => mid,
        }
    }

    pub fn value(&self) -> u8 { self.ctr }
    pub fn max(&self) -> u8 { self.max }

    /// Set the counter, clamping to the representable range.
    pub fn set(&mut self, val: u8) {
        self.ctr = val.min(self.max);
    }

    /// Add a signed amount to the counter.
    pub fn add(&mut self, delta: i32) {
        let next = (self.ctr as i32 + delta).clamp(0, self.max as i32);
        self.ctr = next as u8;
    }

    pub fn increment(&mut self) { self.add(1); }
    pub fn decrement(&mut self) { self.add(-1); }

    /// Returns 'true' when the counter is in the upper half of its range.
    pub fn as_bool(&self) -> bool {
        self.ctr > self.max / 2
    }

    /// Return the predicted direction.
    pub fn predict(&self) -> Outcome {
        Outcome::from(self.as_bool())
    }

    /// Move the counter toward the outcome.
    pub fn update(&mut self, outcome: Outcome) {
        self.add(outcome.signum());
    }

    /// Put the counter in the weakest state predicting `outcome`.
    pub fn set_weak(&mut self, outcome: Outcome) {
        self.ctr = Self::weak_value(self.max, outcome);
    }

    /// Returns 'true' if the counter is saturated in either direction.
    pub fn is_saturated(&self) -> bool {
        self.ctr == 0 || self.ctr == self.max
    }
}

/// An n-bit signed saturating counter clamped to `[-2^(n-1), 2^(n-1) - 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SignedSaturatingCounter {
    ctr: i8,
}
impl SignedSaturatingCounter {
    pub const fn zero() -> Self { Self { ctr: 0 } }

    pub fn value(&self) -> i8 { self.ctr }

    /// Add a signed amount, saturating at the limits of a `bits`-wide
    /// two's complement value.
    pub fn add(&mut self, delta: i32, bits: usize) {
        let (lo, hi) = Self::limits(bits);
        self.ctr = (self.ctr as i32 + delta).clamp(lo, hi) as i8;
    }

    /// Returns the inclusive range of a `bits`-wide counter.
    pub fn limits(bits: usize) -> (i32, i32) {
        assert!((1..=8).contains(&bits));
        let hi = (1i32 << (bits - 1)) - 1;
        let lo = -(1i32 << (bits - 1));
        (lo, hi)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(8)]
    fn counts_up_to_max_and_no_further(#[case] bits: usize) {
        let mut c = SaturatingCounter::new(bits);
        c.set(0);
        for _ in 0..bits.max(1 << bits) {
            c.increment();
        }
        let max = ((1u16 << bits) - 1) as u8;
        assert_eq!(c.value(), max);
        c.increment();
        assert_eq!(c.value(), max);
    }

    #[test]
    fn three_increments_saturate_a_2bit_counter() {
        let mut c = SaturatingCounter::new(2);
        c.set(0);
        c.increment();
        c.increment();
        c.increment();
        assert_eq!(c.value(), 3);
        c.increment();
        assert_eq!(c.value(), 3);
    }

    #[test]
    fn weak_states_straddle_the_midpoint() {
        let mut c = SaturatingCounter::new(3);
        assert_eq!(c.value(), 3);
        assert!(!c.as_bool());
        c.set_weak(Outcome::T);
        assert_eq!(c.value(), 4);
        assert!(c.as_bool());
        c.decrement();
        assert_eq!(c.predict(), Outcome::N);
    }

    #[test]
    fn config_init_is_clamped() {
        let cfg = SaturatingCounterConfig { bits: 2, init: Some(9) };
        assert_eq!(cfg.build().value(), 3);
    }

    #[test]
    fn signed_limits() {
        let mut c = SignedSaturatingCounter::zero();
        for _ in 0..100 { c.add(1, 7); }
        assert_eq!(c.value(), 63);
        for _ in 0..200 { c.add(-1, 7); }
        assert_eq!(c.value(), -64);
    }

    proptest! {
        #[test]
        fn unsigned_counter_stays_in_range(
            bits in 1usize..=8,
            steps in prop::collection::vec(prop_oneof![Just(1i32), Just(-1i32)], 0..600)
        ) {
            let mut c = SaturatingCounter::new(bits);
            let max = ((1u16 << bits) - 1) as u8;
            for s in steps {
                c.add(s);
                prop_assert!(c.value() <= max);
            }
        }

        #[test]
        fn signed_counter_stays_in_range(
            bits in 1usize..=8,
            steps in prop::collection::vec(prop_oneof![Just(1i32), Just(-1i32)], 0..600)
        ) {
            let mut c = SignedSaturatingCounter::zero();
            let (lo, hi) = SignedSaturatingCounter::limits(bits);
            for s in steps {
                c.add(s, bits);
                prop_assert!((lo..=hi).contains(&(c.value() as i32)));
            }
        }
    }
}
