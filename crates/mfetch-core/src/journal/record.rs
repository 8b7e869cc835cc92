//! On-disk journal record.

/// Size of one encoded record: flag byte + little-endian u64 chunk index.
pub const RECORD_LEN: usize = 9;

const FLAG_UNDONE: u8 = 0;
const FLAG_COMMITTED: u8 = 1;

/// One journal entry. `committed == false` undoes an earlier claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub committed: bool,
    pub chunk: u64,
}

impl Record {
    pub fn commit(chunk: u64) -> Self {
        Self {
            committed: true,
            chunk,
        }
    }

    pub fn undo(chunk: u64) -> Self {
        Self {
            committed: false,
            chunk,
        }
    }

    /// Encode into a single buffer so the append is one write call.
    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut buf = [0u8; RECORD_LEN];
        buf[0] = if self.committed {
            FLAG_COMMITTED
        } else {
            FLAG_UNDONE
        };
        buf[1..].copy_from_slice(&self.chunk.to_le_bytes());
        buf
    }

    /// Decode exactly [`RECORD_LEN`] bytes. Returns a description of the
    /// problem for malformed input.
    pub fn decode(raw: &[u8]) -> Result<Self, String> {
        if raw.len() != RECORD_LEN {
            return Err(format!("record is {} bytes, expected {}", raw.len(), RECORD_LEN));
        }
        let committed = match raw[0] {
            FLAG_COMMITTED => true,
            FLAG_UNDONE => false,
            other => return Err(format!("invalid flag byte {:#04x}", other)),
        };
        let mut index = [0u8; 8];
        index.copy_from_slice(&raw[1..]);
        Ok(Self {
            committed,
            chunk: u64::from_le_bytes(index),
        })
    }
}
