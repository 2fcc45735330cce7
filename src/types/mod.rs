#![forbid(unsafe_code)]
//! Identifiers, page geometry and the error type shared by every layer.

use std::fmt;

/// Page number inside the volume.
///
/// `PageId::NULL` ("FIL_NULL") marks the absence of a page in any on-disk
/// address field.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct PageId(pub u32);

impl PageId {
    /// Sentinel page number meaning "no such page".
    pub const NULL: PageId = PageId(u32::MAX);

    /// Returns true for the sentinel page number.
    pub const fn is_null(self) -> bool {
        self.0 == u32::MAX
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("null")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Log sequence number assigned to a committed mini-transaction.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Lsn(pub u64);

/// Errors surfaced by the page cache, the mini-transaction and the list core.
#[derive(thiserror::Error, Debug)]
pub enum SombraError {
    /// Underlying storage I/O failed while fetching a page.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// The requested page does not exist.
    #[error("page {0} not found")]
    PageNotFound(PageId),
    /// The requested page has been freed and may not be dereferenced.
    #[error("page {0} possibly freed")]
    PageFreed(PageId),
    /// A persisted invariant does not hold.
    #[error("corruption: {0}")]
    Corruption(&'static str),
    /// The caller asked for something the API cannot provide.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
}

impl SombraError {
    /// True for errors produced while fetching a page from the cache.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            SombraError::Io(_) | SombraError::PageNotFound(_) | SombraError::PageFreed(_)
        )
    }

    /// True for detected on-page invariant violations.
    pub fn is_corruption(&self) -> bool {
        matches!(self, SombraError::Corruption(_))
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, SombraError>;

pub mod page {
    //! Page geometry shared by the page cache and page-format code.
    //!
    //! Bytes `[0, PAGE_DATA)` hold the page header and the last
    //! `PAGE_TRAILER_LEN` bytes hold the trailer; neither may carry list
    //! fields.

    /// First byte of the usable data area.
    pub const PAGE_DATA: usize = 38;
    /// Length of the page trailer.
    pub const PAGE_TRAILER_LEN: usize = 8;
    /// Smallest supported page size.
    pub const MIN_PAGE_SIZE: u32 = 4096;
    /// Largest supported page size. Offsets must fit in a `u16`.
    pub const MAX_PAGE_SIZE: u32 = 65536;
    /// Page size used when none is configured.
    pub const DEFAULT_PAGE_SIZE: u32 = 16384;

    /// One past the last byte of the usable data area.
    pub const fn data_end(page_size: u32) -> usize {
        page_size as usize - PAGE_TRAILER_LEN
    }

    /// Returns true if `page_size` is a power of two inside the supported range.
    pub const fn is_valid_page_size(page_size: u32) -> bool {
        page_size.is_power_of_two() && page_size >= MIN_PAGE_SIZE && page_size <= MAX_PAGE_SIZE
    }

    /// Returns true if `len` bytes starting at `offset` lie inside the data area.
    pub const fn in_data_area(page_size: u32, offset: usize, len: usize) -> bool {
        offset >= PAGE_DATA && offset + len <= data_end(page_size)
    }
}
