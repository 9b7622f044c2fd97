//! Branch history registers.

use bitvec::prelude::*;
use std::ops::RangeInclusive;

use crate::branch::Outcome;

/// A shift register of recent branch history.
///
/// Index 0 always holds the most-recently inserted bit.
#[derive(Clone, Debug)]
pub struct HistoryRegister {
    data: BitVec<usize, Lsb0>,
    len: usize,
}

// NOTE: This *reverses* the all of the bits and presents them in a format
// where the leftmost bit is the most-significant (index n) and the rightmost
// bit is the least-significant (index 0).
impl std::fmt::Display for HistoryRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let x: String = self.data.as_bitslice().iter().by_vals()
            .map(|b| if b { '1' } else { '0' })
            .rev()
            .collect();
        write!(f, "{}", x)
    }
}

impl HistoryRegister {
    /// Create a register with the specified length in bits.
    /// All bits in the register are initialized to zero.
    pub fn new(len: usize) -> Self {
        Self {
            data: bitvec![usize, Lsb0; 0; len],
            len,
        }
    }

    pub fn len(&self) -> usize { self.len }
    pub fn is_empty(&self) -> bool { self.len == 0 }
    pub fn data(&self) -> &BitSlice { self.data.as_bitslice() }

    /// Clear all bits in the register.
    pub fn clear(&mut self) {
        self.data.fill(false);
    }
}

impl HistoryRegister {
    /// Shift the register by 'n' bits.
    /// The bottom 'n' bits become zero, and the top 'n' bits are discarded.
    pub fn shift_by(&mut self, n: usize) {
        self.data.shift_end(n);
    }

    /// Shift a single outcome into the register.
    pub fn push(&mut self, outcome: Outcome) {
        if self.len == 0 {
            return;
        }
        self.shift_by(1);
        self.data.set(0, outcome.into());
    }

    /// Shift the low 'n' bits of 'val' into the register.
    pub fn push_bits(&mut self, val: usize, n: usize) {
        let n = n.min(self.len);
        if n == 0 {
            return;
        }
        self.shift_by(n);
        self.data[..n].store::<usize>(val);
    }

    /// Return some slice of bits.
    pub fn read(&self, range: RangeInclusive<usize>) -> &BitSlice {
        &self.data[range]
    }

    /// Fold [with XOR] some slice of bits.
    ///
    /// This reads every bit in the range. Predictors keep a
    /// [FoldedHistoryRegister] instead, and this is the reference it must
    /// agree with.
    pub fn fold(&self, range: RangeInclusive<usize>, output_bits: usize)
        -> usize
    {
        assert!(output_bits > 0 && output_bits < usize::BITS as usize);
        let output_mask = (1 << output_bits) - 1;
        let slice = &self.data[range];
        let chunks = slice.chunks(output_bits);
        let res = chunks.fold(0, |res, x| res ^ x.load::<usize>());
        res & output_mask
    }
}

/// A circular shift register used to track folded history.
///
/// This folds the newest `history_len` bits of some global history into
/// `output_size` bits, but without the need to actually read all of the
/// history bits and fold them all together with XOR. The result is always
/// equal to [HistoryRegister::fold] over `0..=history_len-1`.
///
/// This strategy is supposed to mirror the hardware implementation described
/// in "BADGR: A Practical GHR Implementation for TAGE Branch Predictors"
/// (Schlais and Lipasti, 2016).
///
/// NOTE: This is only correct when the global history is shifted by exactly
/// one bit between calls to [FoldedHistoryRegister::update].
#[derive(Clone, Debug)]
pub struct FoldedHistoryRegister {
    data: BitVec,

    /// The size of the output [in bits].
    output_size: usize,

    /// The number of global history bits being folded.
    history_len: usize,
}
impl FoldedHistoryRegister {
    pub fn new(output_size: usize, history_len: usize) -> Self {
        assert!(output_size > 0 && output_size < usize::BITS as usize);
        assert!(history_len > 0);
        Self {
            data: bitvec![0; output_size],
            output_size,
            history_len,
        }
    }

    pub fn output_size(&self) -> usize { self.output_size }
    pub fn history_len(&self) -> usize { self.history_len }

    /// Return the folded history as a [BitSlice].
    pub fn output(&self) -> &BitSlice { self.data.as_bitslice() }

    /// Return the folded history as a [usize].
    pub fn output_usize(&self) -> usize { self.data.load::<usize>() }

    /// Using some [HistoryRegister] that was *just* shifted by one bit,
    /// update the folded history.
    ///
    /// The register must hold at least `history_len + 1` bits so that the
    /// bit leaving the folded window is still visible.
    pub fn update(&mut self, ghr: &HistoryRegister) {
        let ghist = ghr.data();
        let newest_bit = ghist[0];
        let outgoing_bit = ghist[self.history_len];

        // Every bit in the window moves up by one position, which is a
        // rotation of the folded value.
        self.data.rotate_right(1);

        let first_bit = self.data[0] ^ newest_bit;
        self.data.set(0, first_bit);

        // The bit that just left the window was folded into this position.
        let index = self.history_len % self.output_size;
        let last_bit = self.data[index] ^ outgoing_bit;
        self.data.set(index, last_bit);
    }

    /// Clear the folded history.
    pub fn clear(&mut self) {
        self.data.fill(false);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn push_places_newest_bit_at_index_zero() {
        let mut ghr = HistoryRegister::new(8);
        ghr.push(Outcome::T);
        ghr.push(Outcome::N);
        ghr.push(Outcome::T);
        assert_eq!(ghr.to_string(), "00000101");
    }

    #[test]
    fn push_bits_shifts_by_width() {
        let mut phr = HistoryRegister::new(8);
        phr.push_bits(0b11, 2);
        phr.push_bits(0b01, 2);
        assert_eq!(phr.read(0..=7).load::<usize>(), 0b1101);
    }

    #[test]
    fn fold_xors_chunks() {
        let mut ghr = HistoryRegister::new(9);
        for b in [true, false, true, true, false, false, true, true] {
            ghr.push(b.into());
        }
        // history (newest first): 1,1,0,0,1,1,0,1
        // chunks of 3: [1,1,0]=0b011, [0,1,1]=0b110, [0,1]=0b10
        assert_eq!(ghr.fold(0..=7, 3), 0b011 ^ 0b110 ^ 0b010);
    }

    proptest! {
        #[test]
        fn incremental_fold_matches_full_fold(
            (hist_len, width, bits) in (1usize..48).prop_flat_map(|h| {
                (Just(h), 1..=h + 12, prop::collection::vec(any::<bool>(), 0..160))
            })
        ) {
            let mut ghr = HistoryRegister::new(hist_len + 1);
            let mut csr = FoldedHistoryRegister::new(width, hist_len);
            for b in bits {
                ghr.push(b.into());
                csr.update(&ghr);
                prop_assert_eq!(
                    csr.output_usize(),
                    ghr.fold(0..=hist_len - 1, width)
                );
            }
        }
    }
}
