//! Cross-reference entries.

/// Where an object lives, as recorded in a cross-reference section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Unused object number; `next` links the free list.
    Free { next: u32, genno: u16 },
    /// Object stored directly in the file at byte `offset`.
    InUse { offset: usize, genno: u16 },
    /// Object `index` inside object stream `stream`.
    Compressed { stream: u32, index: u32 },
}

impl XrefEntry {
    /// Entry type code used in cross-reference streams.
    pub const fn type_code(&self) -> u8 {
        match self {
            Self::Free { .. } => 0,
            Self::InUse { .. } => 1,
            Self::Compressed { .. } => 2,
        }
    }

    /// Second and third fields of the stream encoding.
    pub const fn fields(&self) -> (u64, u64) {
        match *self {
            Self::Free { next, genno } => (next as u64, genno as u64),
            Self::InUse { offset, genno } => (offset as u64, genno as u64),
            Self::Compressed { stream, index } => (stream as u64, index as u64),
        }
    }

    pub const fn is_free(&self) -> bool {
        matches!(self, Self::Free { .. })
    }
}
