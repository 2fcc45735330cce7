use smallvec::SmallVec;

use crate::types::{PageId, Result, SombraError};

/// A byte-level page change produced by a mini-transaction.
///
/// These three shapes are the whole redo vocabulary. Each one fully
/// determines the bytes it covers, so re-applying a record whose effect is
/// already on the page leaves the page unchanged.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RedoRecord {
    /// Copy `data` to `offset`.
    Write {
        /// Target page.
        page: PageId,
        /// Byte offset inside the page.
        offset: u16,
        /// Bytes written.
        data: SmallVec<[u8; 8]>,
    },
    /// Fill `len` bytes at `offset` with `value`.
    Memset {
        /// Target page.
        page: PageId,
        /// Byte offset inside the page.
        offset: u16,
        /// Number of bytes filled.
        len: u16,
        /// Fill byte.
        value: u8,
    },
    /// Copy `len` bytes inside the page from `source` to `offset`.
    Memmove {
        /// Target page.
        page: PageId,
        /// Destination offset.
        offset: u16,
        /// Source offset.
        source: u16,
        /// Number of bytes copied.
        len: u16,
    },
}

impl RedoRecord {
    /// Page the record applies to.
    pub fn page(&self) -> PageId {
        match self {
            RedoRecord::Write { page, .. }
            | RedoRecord::Memset { page, .. }
            | RedoRecord::Memmove { page, .. } => *page,
        }
    }

    /// First byte changed by the record.
    pub fn offset(&self) -> u16 {
        match self {
            RedoRecord::Write { offset, .. }
            | RedoRecord::Memset { offset, .. }
            | RedoRecord::Memmove { offset, .. } => *offset,
        }
    }

    /// Number of page bytes covered by the record.
    pub fn len(&self) -> usize {
        match self {
            RedoRecord::Write { data, .. } => data.len(),
            RedoRecord::Memset { len, .. } | RedoRecord::Memmove { len, .. } => *len as usize,
        }
    }

    /// True if the record covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes of payload a log would have to carry for this record.
    ///
    /// A fill carries one byte and an in-page move carries only its source
    /// offset, which is why clearing and duplicating address fields is cheap.
    pub fn payload_len(&self) -> usize {
        match self {
            RedoRecord::Write { data, .. } => data.len(),
            RedoRecord::Memset { .. } => 1,
            RedoRecord::Memmove { .. } => 2,
        }
    }

    /// Applies the record to a page image.
    pub fn apply(&self, frame: &mut [u8]) -> Result<()> {
        let end = self.offset() as usize + self.len();
        if end > frame.len() {
            return Err(SombraError::Corruption("redo record beyond page end"));
        }
        match self {
            RedoRecord::Write { offset, data, .. } => {
                let start = *offset as usize;
                frame[start..end].copy_from_slice(data);
            }
            RedoRecord::Memset { offset, value, .. } => {
                frame[*offset as usize..end].fill(*value);
            }
            RedoRecord::Memmove {
                offset,
                source,
                len,
                ..
            } => {
                let src = *source as usize;
                let src_end = src + *len as usize;
                if src_end > frame.len() {
                    return Err(SombraError::Corruption("redo move source beyond page end"));
                }
                frame.copy_within(src..src_end, *offset as usize);
            }
        }
        Ok(())
    }
}
