use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::frame::{Fault, Frame, FrameState};
use crate::primitives::concurrency::{FrameBuf, LatchMode, PageLatch};
use crate::primitives::mtr::RedoRecord;
use crate::types::{page, Lsn, PageId, Result, SombraError};

/// Configuration options for the buffer pool.
#[derive(Clone, Debug)]
pub struct PoolOptions {
    /// Size of each page in bytes.
    pub page_size: u32,
    /// Expected number of pages, used to presize the frame table.
    pub capacity_hint: usize,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            page_size: page::DEFAULT_PAGE_SIZE,
            capacity_hint: 64,
        }
    }
}

impl PoolOptions {
    /// Smallest supported pages; keeps tests cheap.
    pub fn small_pages() -> Self {
        Self {
            page_size: page::MIN_PAGE_SIZE,
            ..Self::default()
        }
    }

    /// Rejects unsupported page sizes.
    pub fn validate(&self) -> Result<()> {
        if !page::is_valid_page_size(self.page_size) {
            return Err(SombraError::Invalid(
                "page size must be a power of two between 4 KiB and 64 KiB",
            ));
        }
        Ok(())
    }
}

/// Page-cache collaborator consumed by mini-transactions.
pub trait PageCache: Send + Sync {
    /// Returns the page size in bytes.
    fn page_size(&self) -> u32;
    /// Returns the frame holding `id`, or the reason it cannot be fetched.
    ///
    /// The frame is not latched; the caller latches it.
    fn frame(&self, id: PageId) -> Result<FrameBuf>;
    /// Appends the redo records of one committed mini-transaction.
    fn append_redo(&self, records: Vec<RedoRecord>) -> Lsn;
}

/// Counters describing pool activity.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PoolStats {
    /// Pages currently cached, freed ones included.
    pub pages: usize,
    /// Successful fetches.
    pub fetches: u64,
    /// Fetches that returned an error.
    pub failed_fetches: u64,
    /// Redo records accepted from committed mini-transactions.
    pub redo_records: u64,
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pages={} fetches={} failed_fetches={} redo_records={}",
            self.pages, self.fetches, self.failed_fetches, self.redo_records
        )
    }
}

struct RedoLog {
    next_lsn: u64,
    records: Vec<(Lsn, RedoRecord)>,
}

/// In-memory page cache with a redo log sink.
///
/// Pages exist once created and stay cached until dropped with the pool.
/// Faults can be injected per page to exercise fetch failure paths.
pub struct BufferPool {
    options: PoolOptions,
    frames: Mutex<HashMap<PageId, Frame>>,
    redo: Mutex<RedoLog>,
    fetches: AtomicU64,
    failed_fetches: AtomicU64,
}

impl BufferPool {
    /// Creates an empty pool.
    pub fn new(options: PoolOptions) -> Result<Self> {
        options.validate()?;
        let frames = HashMap::with_capacity(options.capacity_hint);
        Ok(Self {
            options,
            frames: Mutex::new(frames),
            redo: Mutex::new(RedoLog {
                next_lsn: 1,
                records: Vec::new(),
            }),
            fetches: AtomicU64::new(0),
            failed_fetches: AtomicU64::new(0),
        })
    }

    /// Options the pool was created with.
    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    /// Adds a zero-filled page, or revives a freed one with zeroed bytes.
    pub fn create_page(&self, id: PageId) -> Result<()> {
        if id.is_null() {
            return Err(SombraError::Invalid("cannot create the null page"));
        }
        let mut frames = self.frames.lock();
        if frames
            .get(&id)
            .is_some_and(|frame| frame.state == FrameState::Live)
        {
            return Err(SombraError::Invalid("page already exists"));
        }
        // A freed frame may still be latched by a straggler; give the page a fresh buffer.
        frames.insert(id, Frame::new(self.options.page_size as usize));
        debug!(page = %id, "pool.create_page");
        Ok(())
    }

    /// Marks a page freed; later fetches fail with [`SombraError::PageFreed`].
    pub fn free_page(&self, id: PageId) -> Result<()> {
        let mut frames = self.frames.lock();
        let frame = frames.get_mut(&id).ok_or(SombraError::PageNotFound(id))?;
        frame.state = FrameState::Freed;
        debug!(page = %id, "pool.free_page");
        Ok(())
    }

    /// Makes every later fetch of `id` fail with `fault`.
    pub fn inject_fault(&self, id: PageId, fault: Fault) -> Result<()> {
        let mut frames = self.frames.lock();
        let frame = frames.get_mut(&id).ok_or(SombraError::PageNotFound(id))?;
        frame.fault = Some(fault);
        Ok(())
    }

    /// Removes an injected fault.
    pub fn clear_fault(&self, id: PageId) {
        if let Some(frame) = self.frames.lock().get_mut(&id) {
            frame.fault = None;
        }
    }

    /// Copies the current bytes of a page, waiting for writers to finish.
    pub fn page_image(&self, id: PageId) -> Result<Vec<u8>> {
        let buf = self.lookup(id)?;
        let latch = PageLatch::acquire(&buf, LatchMode::Shared);
        Ok(latch.data().to_vec())
    }

    /// Overwrites a page with a saved image, as if reloaded from disk.
    pub fn restore_image(&self, id: PageId, image: &[u8]) -> Result<()> {
        if image.len() != self.options.page_size as usize {
            return Err(SombraError::Invalid("page image has the wrong size"));
        }
        let buf = self.lookup(id)?;
        buf.write().copy_from_slice(image);
        Ok(())
    }

    /// Applies redo records to the cached pages, ignoring faults and freed state.
    pub fn apply_redo(&self, records: &[RedoRecord]) -> Result<()> {
        for record in records {
            let buf = self.lookup(record.page())?;
            let mut guard = buf.write();
            record.apply(&mut guard[..])?;
        }
        debug!(records = records.len(), "pool.apply_redo");
        Ok(())
    }

    /// Records committed so far, in commit order.
    pub fn redo_log(&self) -> Vec<RedoRecord> {
        self.redo
            .lock()
            .records
            .iter()
            .map(|(_, rec)| rec.clone())
            .collect()
    }

    /// Records committed after `lsn`, exclusive.
    pub fn redo_since(&self, lsn: Lsn) -> Vec<RedoRecord> {
        self.redo
            .lock()
            .records
            .iter()
            .filter(|(rec_lsn, _)| *rec_lsn > lsn)
            .map(|(_, rec)| rec.clone())
            .collect()
    }

    /// Records committed after `lsn`, grouped per mini-transaction.
    pub fn commits_since(&self, lsn: Lsn) -> Vec<(Lsn, Vec<RedoRecord>)> {
        let redo = self.redo.lock();
        let mut commits: Vec<(Lsn, Vec<RedoRecord>)> = Vec::new();
        for (rec_lsn, rec) in redo.records.iter().filter(|(rec_lsn, _)| *rec_lsn > lsn) {
            match commits.last_mut() {
                Some((last, group)) if *last == *rec_lsn => group.push(rec.clone()),
                _ => commits.push((*rec_lsn, vec![rec.clone()])),
            }
        }
        commits
    }

    /// LSN of the most recent commit, `Lsn(0)` before any.
    pub fn latest_lsn(&self) -> Lsn {
        Lsn(self.redo.lock().next_lsn - 1)
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            pages: self.frames.lock().len(),
            fetches: self.fetches.load(AtomicOrdering::Relaxed),
            failed_fetches: self.failed_fetches.load(AtomicOrdering::Relaxed),
            redo_records: self.redo.lock().records.len() as u64,
        }
    }

    fn lookup(&self, id: PageId) -> Result<FrameBuf> {
        self.frames
            .lock()
            .get(&id)
            .map(|frame| frame.buf.clone())
            .ok_or(SombraError::PageNotFound(id))
    }

    fn fetch(&self, id: PageId) -> Result<FrameBuf> {
        let frames = self.frames.lock();
        let frame = frames.get(&id).ok_or(SombraError::PageNotFound(id))?;
        match frame.fault {
            Some(Fault::Io) => {
                return Err(SombraError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    format!("injected read failure on page {id}"),
                )))
            }
            Some(Fault::Freed) => return Err(SombraError::PageFreed(id)),
            Some(Fault::Missing) => return Err(SombraError::PageNotFound(id)),
            None => {}
        }
        if frame.state == FrameState::Freed {
            return Err(SombraError::PageFreed(id));
        }
        Ok(frame.buf.clone())
    }
}

impl PageCache for BufferPool {
    fn page_size(&self) -> u32 {
        self.options.page_size
    }

    fn frame(&self, id: PageId) -> Result<FrameBuf> {
        match self.fetch(id) {
            Ok(buf) => {
                self.fetches.fetch_add(1, AtomicOrdering::Relaxed);
                Ok(buf)
            }
            Err(err) => {
                self.failed_fetches.fetch_add(1, AtomicOrdering::Relaxed);
                warn!(page = %id, error = %err, "pool.fetch_failed");
                Err(err)
            }
        }
    }

    fn append_redo(&self, records: Vec<RedoRecord>) -> Lsn {
        let mut log = self.redo.lock();
        if records.is_empty() {
            return Lsn(log.next_lsn - 1);
        }
        let lsn = Lsn(log.next_lsn);
        log.next_lsn += 1;
        log.records.extend(records.into_iter().map(|rec| (lsn, rec)));
        lsn
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("page_size", &self.options.page_size)
            .field("stats", &self.stats())
            .finish()
    }
}
