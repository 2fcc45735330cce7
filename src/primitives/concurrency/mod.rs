#![forbid(unsafe_code)]
//! Page latches.
//!
//! A latch is the reader/writer lock guarding one page frame. Guards are
//! owned (`arc_lock`) so a mini-transaction can keep them in its memo for as
//! long as it needs the page.

use std::fmt;
use std::sync::Arc;

use parking_lot::{
    lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard},
    RawRwLock, RwLock,
};

/// Shared handle to the bytes of one page frame.
pub type FrameBuf = Arc<RwLock<Box<[u8]>>>;

/// Latch modes understood by the mini-transaction memo.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LatchMode {
    /// Readers only.
    Shared,
    /// Excludes other writers but not readers of unrelated fields.
    SharedExclusive,
    /// Excludes everyone else.
    Exclusive,
}

impl LatchMode {
    /// Returns true if the page may be modified under this mode.
    pub const fn is_writable(self) -> bool {
        !matches!(self, LatchMode::Shared)
    }

    /// Returns true if holding `self` is at least as strong as `required`.
    pub const fn satisfies(self, required: LatchMode) -> bool {
        match self {
            LatchMode::Exclusive => true,
            LatchMode::SharedExclusive => !matches!(required, LatchMode::Exclusive),
            LatchMode::Shared => matches!(required, LatchMode::Shared),
        }
    }
}

impl fmt::Display for LatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LatchMode::Shared => "S",
            LatchMode::SharedExclusive => "SX",
            LatchMode::Exclusive => "X",
        })
    }
}

/// The writable subset of [`LatchMode`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteLatch {
    /// SX latch.
    SharedExclusive,
    /// X latch.
    Exclusive,
}

impl From<WriteLatch> for LatchMode {
    fn from(value: WriteLatch) -> Self {
        match value {
            WriteLatch::SharedExclusive => LatchMode::SharedExclusive,
            WriteLatch::Exclusive => LatchMode::Exclusive,
        }
    }
}

/// An acquired page latch.
///
/// SX and X both hold the write side of the frame lock; safe code cannot
/// hand out `&mut [u8]` while readers exist. The memo keeps the requested
/// mode next to the guard.
pub enum PageLatch {
    /// Read guard for [`LatchMode::Shared`].
    Read(ArcRwLockReadGuard<RawRwLock, Box<[u8]>>),
    /// Write guard for [`LatchMode::SharedExclusive`] and [`LatchMode::Exclusive`].
    Write(ArcRwLockWriteGuard<RawRwLock, Box<[u8]>>),
}

impl PageLatch {
    /// Blocks until the frame is latched in `mode`.
    pub fn acquire(buf: &FrameBuf, mode: LatchMode) -> Self {
        match mode {
            LatchMode::Shared => PageLatch::Read(buf.read_arc()),
            LatchMode::SharedExclusive | LatchMode::Exclusive => {
                PageLatch::Write(buf.write_arc())
            }
        }
    }

    /// Tries to latch the frame without blocking.
    pub fn try_acquire(buf: &FrameBuf, mode: LatchMode) -> Option<Self> {
        match mode {
            LatchMode::Shared => buf.try_read_arc().map(PageLatch::Read),
            LatchMode::SharedExclusive | LatchMode::Exclusive => {
                buf.try_write_arc().map(PageLatch::Write)
            }
        }
    }

    /// Page bytes.
    pub fn data(&self) -> &[u8] {
        match self {
            PageLatch::Read(guard) => &guard[..],
            PageLatch::Write(guard) => &guard[..],
        }
    }

    /// Mutable page bytes, `None` under a shared latch.
    pub fn data_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            PageLatch::Read(_) => None,
            PageLatch::Write(guard) => Some(&mut guard[..]),
        }
    }
}

impl fmt::Debug for PageLatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageLatch::Read(_) => f.write_str("PageLatch::Read"),
            PageLatch::Write(_) => f.write_str("PageLatch::Write"),
        }
    }
}
