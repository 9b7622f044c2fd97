//! Types for representing branches and branch outcomes.

/// A branch outcome.
#[repr(u32)]
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Outcome {
    /// Not taken
    #[default]
    N = 0,
    /// Taken
    T = 1
}

impl Outcome {
    /// Parse a string of 't'/'n' characters into a list of outcomes.
    /// Any other character is ignored.
    pub fn vec_from_str(s: &str) -> Vec<Self> {
        s.chars().filter_map(|c| match c {
            't' | 'T' => Some(Self::T),
            'n' | 'N' => Some(Self::N),
            _ => None,
        }).collect()
    }

    /// Returns +1 for 'taken' and -1 for 'not-taken'.
    pub fn signum(self) -> i32 {
        match self {
            Self::T => 1,
            Self::N => -1,
        }
    }
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Self::T => "t",
            Self::N => "n",
        };
        write!(f, "{}", s)
    }
}

impl std::ops::Not for Outcome {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            Self::N => Self::T,
            Self::T => Self::N,
        }
    }
}

impl From<bool> for Outcome {
    fn from(x: bool) -> Self {
        match x {
            true => Self::T,
            false => Self::N
        }
    }
}
impl From<Outcome> for bool {
    fn from(x: Outcome) -> Self {
        match x {
            Outcome::T => true,
            Outcome::N => false,
        }
    }
}

/// Representing different kinds of branch/control-flow instructions.
///
/// Predictors in this crate only consult this to decide whether a record
/// should be predicted at all; the direction predictors accept it for
/// symmetry with target predictors.
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BranchKind {
    /// A direct conditional branch instruction.
    DirectBranch = BranchFlags::BRN_FLAG,

    /// A direct unconditional jump instruction.
    DirectJump   = BranchFlags::JMP_FLAG,

    /// An indirect unconditional jump instruction.
    IndirectJump = BranchFlags::JMP_FLAG | BranchFlags::IND_FLAG,

    /// A direct procedure call instruction.
    DirectCall   = BranchFlags::CALL_FLAG,

    /// An indirect procedure call instruction.
    IndirectCall = BranchFlags::CALL_FLAG | BranchFlags::IND_FLAG,

    /// A return instruction.
    Return       = BranchFlags::RET_FLAG | BranchFlags::IND_FLAG,
}
impl BranchKind {
    const DIRECT_BRANCH: u32 = BranchFlags::BRN_FLAG;
    const DIRECT_JUMP: u32 = BranchFlags::JMP_FLAG;
    const DIRECT_CALL: u32 = BranchFlags::CALL_FLAG;
    const INDIRECT_CALL: u32 = BranchFlags::CALL_FLAG | BranchFlags::IND_FLAG;
    const INDIRECT_JUMP: u32 = BranchFlags::JMP_FLAG | BranchFlags::IND_FLAG;
    const RETURN: u32 = BranchFlags::RET_FLAG | BranchFlags::IND_FLAG;

    /// Decode the kind bits from a set of raw flags.
    /// Returns [None] for combinations that don't name a kind of branch.
    pub fn from_bits(x: u32) -> Option<Self> {
        match x & BranchFlags::KIND_MASK {
            Self::DIRECT_BRANCH => Some(Self::DirectBranch),
            Self::DIRECT_JUMP   => Some(Self::DirectJump),
            Self::DIRECT_CALL   => Some(Self::DirectCall),
            Self::INDIRECT_JUMP => Some(Self::IndirectJump),
            Self::INDIRECT_CALL => Some(Self::IndirectCall),
            Self::RETURN        => Some(Self::Return),
            _ => None,
        }
    }

    /// Returns 'true' for conditional branches.
    pub fn is_conditional(&self) -> bool {
        matches!(self, Self::DirectBranch)
    }
}

/// Packed flags describing a [BranchRecord].
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct BranchFlags(pub u32);
impl BranchFlags {

    const BRN_FLAG: u32   = 1 << 0;
    const JMP_FLAG: u32   = 1 << 1;
    const CALL_FLAG: u32  = 1 << 2;
    const RET_FLAG: u32   = 1 << 3;
    const IND_FLAG: u32   = 1 << 4;
    const TAKEN_FLAG: u32 = 1 << 5;

    const KIND_MASK: u32  = 0b01_1111;

    pub fn new(kind: BranchKind, outcome: Outcome) -> Self {
        let kbits = kind as u32;
        let tbits = if bool::from(outcome) { Self::TAKEN_FLAG } else { 0 };
        Self(kbits | tbits)
    }

    pub fn is_brn(&self) -> bool { self.0 & Self::BRN_FLAG != 0 }
    pub fn is_taken(&self) -> bool { self.0 & Self::TAKEN_FLAG != 0 }

    pub fn kind(&self) -> Option<BranchKind> {
        BranchKind::from_bits(self.0)
    }
}


/// A record of branch execution.
///
/// The layout is fixed: records are read directly from binary trace files
/// (see [crate::trace::BinaryTrace]).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct BranchRecord {
    /// The program counter value for this branch
    pub pc: usize,

    /// The target address evaluated for this branch
    pub tgt: usize,

    pub flags: BranchFlags,
}
impl BranchRecord {
    pub fn new(pc: usize, tgt: usize, kind: BranchKind, outcome: Outcome)
        -> Self
    {
        Self { pc, tgt, flags: BranchFlags::new(kind, outcome) }
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::from(self.flags.is_taken())
    }
    pub fn kind(&self) -> Option<BranchKind> {
        self.flags.kind()
    }

    /// Returns 'true' if this is a conditional instruction.
    pub fn is_conditional(&self) -> bool {
        self.flags.is_brn()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flags_roundtrip_kind_and_outcome() {
        let r = BranchRecord::new(0x1000, 0x2000,
            BranchKind::IndirectCall, Outcome::T
        );
        assert_eq!(r.kind(), Some(BranchKind::IndirectCall));
        assert_eq!(r.outcome(), Outcome::T);
        assert!(!r.is_conditional());

        let r = BranchRecord::new(0x1000, 0x2000,
            BranchKind::DirectBranch, Outcome::N
        );
        assert_eq!(r.kind(), Some(BranchKind::DirectBranch));
        assert_eq!(r.outcome(), Outcome::N);
        assert!(r.is_conditional());
    }

    #[test]
    fn unknown_kind_bits() {
        assert_eq!(BranchKind::from_bits(0b0_0011), None);
    }

    #[test]
    fn outcome_from_str() {
        assert_eq!(Outcome::vec_from_str("tt n"),
            vec![Outcome::T, Outcome::T, Outcome::N]
        );
    }
}
