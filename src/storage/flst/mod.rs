#![forbid(unsafe_code)]
//! File-based doubly linked lists.
//!
//! A list lives entirely inside page bytes. The base node (length, first,
//! last) sits at a known offset of some page; every member carries a
//! prev/next pair of file addresses somewhere in its own page. Links are
//! `(page, offset)` values and are only ever followed by fetching the target
//! page through the mini-transaction.
//!
//! Persisted layout, all integers big-endian:
//!
//! ```text
//! address   [page: u32 (0xFFFFFFFF = null)][offset: u16]            6 bytes
//! base node [len: u32][first: address][last: address]              16 bytes
//! node      [prev: address][next: address]                         12 bytes
//! ```
//!
//! Every change goes through the logged primitives of [`Mtr`], and the
//! write shapes used here stay correct when the resulting redo records are
//! applied more than once.

mod addr;
mod base;
mod check;
mod mutate;
mod validate;


use std::fmt;

pub use addr::{read_addr, write_addr, zero_both};
pub use base::{get_first, get_last, get_len, get_next_addr, get_prev_addr, init};
pub use mutate::{add_first, add_last, add_to_empty, insert_after, insert_before, remove};
pub use validate::{validate, ListReport};

use crate::primitives::mtr::{Block, Mtr};
use crate::types::{page, PageId, Result, SombraError};

/// Offset of the page number inside an address.
pub const FIL_ADDR_PAGE: usize = 0;
/// Offset of the byte offset inside an address.
pub const FIL_ADDR_BYTE: usize = 4;
/// Size of a stored address.
pub const FIL_ADDR_SIZE: usize = 6;

/// Offset of the length inside a base node.
pub const FLST_LEN: usize = 0;
/// Offset of the first-node address inside a base node.
pub const FLST_FIRST: usize = 4;
/// Offset of the last-node address inside a base node.
pub const FLST_LAST: usize = FLST_FIRST + FIL_ADDR_SIZE;
/// Size of a base node.
pub const FLST_BASE_NODE_SIZE: usize = 4 + 2 * FIL_ADDR_SIZE;

/// Offset of the previous-node address inside a node.
pub const FLST_PREV: usize = 0;
/// Offset of the next-node address inside a node.
pub const FLST_NEXT: usize = FIL_ADDR_SIZE;
/// Size of a node's link fields.
pub const FLST_NODE_SIZE: usize = 2 * FIL_ADDR_SIZE;

/// A file address: a byte offset inside a page.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct FileAddr {
    /// Page number, [`PageId::NULL`] for "no node".
    pub page: PageId,
    /// Byte offset inside the page; meaningless when `page` is null.
    pub boffset: u16,
}

impl FileAddr {
    /// The null address as written by [`zero_both`].
    pub const NULL: FileAddr = FileAddr {
        page: PageId::NULL,
        boffset: 0,
    };

    /// Builds an address.
    pub const fn new(page: PageId, boffset: u16) -> Self {
        Self { page, boffset }
    }

    /// True if the address points nowhere.
    pub const fn is_null(&self) -> bool {
        self.page.is_null()
    }
}

impl fmt::Display for FileAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("null")
        } else {
            write!(f, "{}:{}", self.page, self.boffset)
        }
    }
}

/// A list base node inside a latched page.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ListBase {
    /// Page holding the base node.
    pub block: Block,
    /// Byte offset of the base node.
    pub offset: u16,
}

impl ListBase {
    /// Pairs a latched page with the offset of its base node.
    pub fn new(block: Block, offset: u16) -> Self {
        Self { block, offset }
    }

    /// Stored length.
    pub fn len(&self, mtr: &Mtr<'_>) -> u32 {
        get_len(self.bytes(mtr))
    }

    /// True if the stored length is zero.
    pub fn is_empty(&self, mtr: &Mtr<'_>) -> bool {
        self.len(mtr) == 0
    }

    /// Address of the first node.
    pub fn first(&self, mtr: &Mtr<'_>) -> FileAddr {
        get_first(self.bytes(mtr))
    }

    /// Address of the last node.
    pub fn last(&self, mtr: &Mtr<'_>) -> FileAddr {
        get_last(self.bytes(mtr))
    }

    pub(crate) fn field(&self, rel: usize) -> usize {
        self.offset as usize + rel
    }

    fn bytes<'m>(&self, mtr: &'m Mtr<'_>) -> &'m [u8] {
        &mtr.page(self.block)[self.offset as usize..]
    }
}

/// The link fields of a list member inside a latched page.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ListNode {
    /// Page holding the node.
    pub block: Block,
    /// Byte offset of the node's prev field.
    pub offset: u16,
}

impl ListNode {
    /// Pairs a latched page with the offset of a node's link fields.
    pub fn new(block: Block, offset: u16) -> Self {
        Self { block, offset }
    }

    /// Address of this node.
    pub fn addr(&self) -> FileAddr {
        FileAddr::new(self.block.id(), self.offset)
    }

    /// Address stored in the prev field.
    pub fn prev(&self, mtr: &Mtr<'_>) -> FileAddr {
        get_prev_addr(self.bytes(mtr))
    }

    /// Address stored in the next field.
    pub fn next(&self, mtr: &Mtr<'_>) -> FileAddr {
        get_next_addr(self.bytes(mtr))
    }

    pub(crate) fn field(&self, rel: usize) -> usize {
        self.offset as usize + rel
    }

    fn bytes<'m>(&self, mtr: &'m Mtr<'_>) -> &'m [u8] {
        &mtr.page(self.block)[self.offset as usize..]
    }
}

/// Rejects addresses read from disk whose node would not fit the data area.
pub(crate) fn check_node_addr(page_size: u32, addr: FileAddr) -> Result<()> {
    if page::in_data_area(page_size, addr.boffset as usize, FLST_NODE_SIZE) {
        Ok(())
    } else {
        Err(SombraError::Corruption("list node address outside page data area"))
    }
}
