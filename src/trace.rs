//! Reading branch traces from binary files.

use std::fs;
use std::mem::size_of;
use std::path::Path;

use log::debug;

use crate::branch::*;
use crate::error::{ Error, Result };

const WORD: usize = size_of::<usize>();

/// A list of [`BranchRecord`]s loaded from a file.
///
/// Each record occupies `size_of::<BranchRecord>()` bytes in native byte
/// order: the program counter, the target address, then the 32-bit flags
/// followed by padding.
#[derive(Debug)]
pub struct BinaryTrace {
    pub name: String,
    records: Vec<BranchRecord>,
}
impl BinaryTrace {
    /// Size of a single record in a trace file [in bytes].
    pub const RECORD_SIZE: usize = size_of::<BranchRecord>();

    /// Load a trace from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path.file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let data = fs::read(path)?;
        let trace = Self::from_bytes(name, &data)?;
        debug!("loaded {} records from {}", trace.num_entries(), path.display());
        Ok(trace)
    }

    /// Parse a trace from raw bytes.
    pub fn from_bytes(name: impl Into<String>, data: &[u8]) -> Result<Self> {
        let name = name.into();
        if data.len() % Self::RECORD_SIZE != 0 {
            return Err(Error::TraceLength {
                name,
                len: data.len(),
                record: Self::RECORD_SIZE,
            });
        }
        let records = data.chunks_exact(Self::RECORD_SIZE)
            .map(|chunk| BranchRecord {
                pc: read_usize(&chunk[0..WORD]),
                tgt: read_usize(&chunk[WORD..2 * WORD]),
                flags: BranchFlags(read_u32(&chunk[2 * WORD..2 * WORD + 4])),
            })
            .collect();
        Ok(Self { name, records })
    }

    /// Create a trace from a list of records.
    pub fn from_records(name: impl Into<String>, records: Vec<BranchRecord>)
        -> Self
    {
        Self { name: name.into(), records }
    }

    /// Serialize the trace into the on-disk format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut res = Vec::with_capacity(self.records.len() * Self::RECORD_SIZE);
        for r in self.records.iter() {
            res.extend_from_slice(&r.pc.to_ne_bytes());
            res.extend_from_slice(&r.tgt.to_ne_bytes());
            res.extend_from_slice(&r.flags.0.to_ne_bytes());
            res.resize(res.len() + Self::RECORD_SIZE - (2 * WORD + 4), 0);
        }
        res
    }

    pub fn num_entries(&self) -> usize {
        self.records.len()
    }

    pub fn as_slice(&self) -> &[BranchRecord] {
        &self.records
    }
}

fn read_usize(b: &[u8]) -> usize {
    let mut buf = [0u8; WORD];
    buf.copy_from_slice(b);
    usize::from_ne_bytes(buf)
}

fn read_u32(b: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(b);
    u32::from_ne_bytes(buf)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bytes_roundtrip() {
        let records = vec![
            BranchRecord::new(0x1000, 0x1040, BranchKind::DirectBranch, Outcome::T),
            BranchRecord::new(0x1044, 0x2000, BranchKind::DirectCall, Outcome::T),
            BranchRecord::new(0x2010, 0x1048, BranchKind::Return, Outcome::T),
        ];
        let trace = BinaryTrace::from_records("t", records.clone());
        let bytes = trace.to_bytes();
        assert_eq!(bytes.len(), 3 * BinaryTrace::RECORD_SIZE);
        let parsed = BinaryTrace::from_bytes("t", &bytes).unwrap();
        assert_eq!(parsed.as_slice(), records.as_slice());
    }

    #[test]
    fn truncated_trace_is_rejected() {
        let bytes = vec![0u8; BinaryTrace::RECORD_SIZE + 3];
        let err = BinaryTrace::from_bytes("short", &bytes).unwrap_err();
        assert!(matches!(err, Error::TraceLength { len, .. } if len == bytes.len()));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = BinaryTrace::from_file("/nonexistent/ramus.trace").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
