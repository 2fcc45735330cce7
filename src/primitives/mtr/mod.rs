#![forbid(unsafe_code)]
//! Mini-transactions.
//!
//! A [`Mtr`] owns the latches on every page it touched (its memo) and the
//! redo records describing every byte it changed. Committing hands the
//! records to the page cache's log and only then releases the latches.
//!
//! Pages are addressed through capability tokens handed out by the memo:
//! [`Block`] proves an SX or X latch and is required by every write,
//! [`SharedBlock`] proves a shared latch and only allows reads.

mod redo;

pub use redo::RedoRecord;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::primitives::concurrency::{LatchMode, PageLatch, WriteLatch};
use crate::primitives::pager::PageCache;
use crate::types::{Lsn, PageId, Result, SombraError};

/// How a fixed-width write is logged.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteMode {
    /// Always write and log the full field.
    Normal,
    /// Skip both the write and the log record if the field already holds the value.
    MaybeNop,
}

/// A page latched SX or X by a mini-transaction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Block {
    id: PageId,
    slot: u16,
}

/// A page latched at least shared by a mini-transaction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SharedBlock {
    id: PageId,
    slot: u16,
}

/// Anything that names a page held in a mini-transaction memo.
pub trait Latched: Copy {
    /// Page held by the token.
    fn page_id(&self) -> PageId;
    /// Memo slot of the latch.
    fn slot(&self) -> usize;
}

impl Latched for Block {
    fn page_id(&self) -> PageId {
        self.id
    }

    fn slot(&self) -> usize {
        self.slot as usize
    }
}

impl Latched for SharedBlock {
    fn page_id(&self) -> PageId {
        self.id
    }

    fn slot(&self) -> usize {
        self.slot as usize
    }
}

impl Block {
    /// Page number of the latched page.
    pub fn id(&self) -> PageId {
        self.id
    }
}

impl SharedBlock {
    /// Page number of the latched page.
    pub fn id(&self) -> PageId {
        self.id
    }
}

impl From<Block> for SharedBlock {
    fn from(block: Block) -> Self {
        SharedBlock {
            id: block.id,
            slot: block.slot,
        }
    }
}

struct MemoSlot {
    id: PageId,
    mode: LatchMode,
    latch: PageLatch,
}

/// A mini-transaction: a latch memo plus the redo records of its changes.
pub struct Mtr<'p> {
    cache: &'p dyn PageCache,
    memo: SmallVec<[MemoSlot; 4]>,
    log: Vec<RedoRecord>,
    committed: bool,
}

impl<'p> Mtr<'p> {
    /// Starts an empty mini-transaction against `cache`.
    pub fn start(cache: &'p dyn PageCache) -> Self {
        Self {
            cache,
            memo: SmallVec::new(),
            log: Vec::new(),
            committed: false,
        }
    }

    /// The page cache this mini-transaction fetches from.
    pub fn cache(&self) -> &'p dyn PageCache {
        self.cache
    }

    /// Page size of the underlying cache.
    pub fn page_size(&self) -> u32 {
        self.cache.page_size()
    }

    /// Latches `id` for writing, reusing the memo entry if the page is already held.
    pub fn get_page(&mut self, id: PageId, latch: WriteLatch) -> Result<Block> {
        let mode = LatchMode::from(latch);
        if let Some(slot) = self.memo_slot(id) {
            let held = self.memo[slot].mode;
            if !held.is_writable() {
                return Err(SombraError::Invalid(
                    "page already latched shared by this mini-transaction",
                ));
            }
            if !held.satisfies(mode) {
                // SX to X: the frame lock is already exclusive.
                self.memo[slot].mode = mode;
            }
            return Ok(Block {
                id,
                slot: slot as u16,
            });
        }
        let slot = self.latch(id, mode)?;
        Ok(Block { id, slot })
    }

    /// Latches `id` shared, reusing any memo entry for the page.
    pub fn get_page_shared(&mut self, id: PageId) -> Result<SharedBlock> {
        if let Some(slot) = self.memo_slot(id) {
            return Ok(SharedBlock {
                id,
                slot: slot as u16,
            });
        }
        let slot = self.latch(id, LatchMode::Shared)?;
        Ok(SharedBlock { id, slot })
    }

    /// Returns a token for `id` if this mini-transaction already holds it.
    pub fn find(&self, id: PageId) -> Option<SharedBlock> {
        self.memo_slot(id).map(|slot| SharedBlock {
            id,
            slot: slot as u16,
        })
    }

    /// Bytes of a page held by this mini-transaction.
    pub fn page<L: Latched>(&self, block: L) -> &[u8] {
        let slot = &self.memo[block.slot()];
        debug_assert_eq!(slot.id, block.page_id(), "token from another mini-transaction");
        slot.latch.data()
    }

    /// True if `block` is held at least as strongly as `mode`.
    pub fn memo_contains_flagged<L: Latched>(&self, block: L, mode: LatchMode) -> bool {
        self.memo
            .get(block.slot())
            .is_some_and(|slot| slot.id == block.page_id() && slot.mode.satisfies(mode))
    }

    /// True if page `id` is held at least as strongly as `mode`.
    pub fn memo_contains_page(&self, id: PageId, mode: LatchMode) -> bool {
        self.memo
            .iter()
            .any(|slot| slot.id == id && slot.mode.satisfies(mode))
    }

    /// Number of pages latched.
    pub fn latched_pages(&self) -> usize {
        self.memo.len()
    }

    /// Redo records produced so far.
    pub fn records(&self) -> &[RedoRecord] {
        &self.log
    }

    /// Writes one byte.
    pub fn write_u8(&mut self, block: Block, offset: usize, value: u8, mode: WriteMode) -> bool {
        self.write_bytes(block, offset, &[value], mode)
    }

    /// Writes a big-endian u16.
    pub fn write_u16(&mut self, block: Block, offset: usize, value: u16, mode: WriteMode) -> bool {
        self.write_bytes(block, offset, &value.to_be_bytes(), mode)
    }

    /// Writes a big-endian u32.
    pub fn write_u32(&mut self, block: Block, offset: usize, value: u32, mode: WriteMode) -> bool {
        self.write_bytes(block, offset, &value.to_be_bytes(), mode)
    }

    /// Writes `src` at `offset` as one logged unit.
    pub fn memcpy(&mut self, block: Block, offset: usize, src: &[u8]) {
        self.write_bytes(block, offset, src, WriteMode::Normal);
    }

    /// Fills `len` bytes at `offset` with `value`.
    pub fn memset(&mut self, block: Block, offset: usize, len: usize, value: u8) {
        let frame = self.frame_mut(block);
        frame[offset..offset + len].fill(value);
        trace!(page = %block.id, offset, len, value, "mtr.memset");
        self.log.push(RedoRecord::Memset {
            page: block.id,
            offset: offset as u16,
            len: len as u16,
            value,
        });
    }

    /// Copies `len` bytes inside the page from `source` to `offset`.
    pub fn memmove(&mut self, block: Block, offset: usize, source: usize, len: usize) {
        let frame = self.frame_mut(block);
        frame.copy_within(source..source + len, offset);
        trace!(page = %block.id, offset, source, len, "mtr.memmove");
        self.log.push(RedoRecord::Memmove {
            page: block.id,
            offset: offset as u16,
            source: source as u16,
            len: len as u16,
        });
    }

    /// Hands the redo records to the cache, then releases every latch.
    pub fn commit(mut self) -> Lsn {
        self.finish()
    }

    fn finish(&mut self) -> Lsn {
        self.committed = true;
        let records = std::mem::take(&mut self.log);
        let count = records.len();
        let lsn = self.cache.append_redo(records);
        debug!(records = count, pages = self.memo.len(), lsn = lsn.0, "mtr.commit");
        self.memo.clear();
        lsn
    }

    fn write_bytes(&mut self, block: Block, offset: usize, src: &[u8], mode: WriteMode) -> bool {
        let frame = self.frame_mut(block);
        let dst = &mut frame[offset..offset + src.len()];
        if mode == WriteMode::MaybeNop && dst == src {
            return false;
        }
        dst.copy_from_slice(src);
        trace!(page = %block.id, offset, len = src.len(), "mtr.write");
        self.log.push(RedoRecord::Write {
            page: block.id,
            offset: offset as u16,
            data: SmallVec::from_slice(src),
        });
        true
    }

    fn frame_mut(&mut self, block: Block) -> &mut [u8] {
        let slot = &mut self.memo[block.slot as usize];
        debug_assert_eq!(slot.id, block.id, "token from another mini-transaction");
        slot.latch
            .data_mut()
            .expect("write token over a shared latch")
    }

    fn memo_slot(&self, id: PageId) -> Option<usize> {
        self.memo.iter().position(|slot| slot.id == id)
    }

    fn latch(&mut self, id: PageId, mode: LatchMode) -> Result<u16> {
        let buf = self.cache.frame(id)?;
        let latch = PageLatch::acquire(&buf, mode);
        let slot = self.memo.len();
        if slot > u16::MAX as usize {
            return Err(SombraError::Invalid("mini-transaction memo full"));
        }
        trace!(page = %id, %mode, slot, "mtr.latch");
        self.memo.push(MemoSlot { id, mode, latch });
        Ok(slot as u16)
    }
}

impl Drop for Mtr<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.finish();
        }
    }
}
