use std::sync::Arc;

use parking_lot::RwLock;

use crate::primitives::concurrency::FrameBuf;

/// Lifecycle of a cached page.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameState {
    Live,
    Freed,
}

/// Injected fetch failure for a page.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Fault {
    /// Fetch fails with an I/O error.
    Io,
    /// Fetch reports the page as possibly freed.
    Freed,
    /// Fetch reports the page as missing.
    Missing,
}

pub struct Frame {
    pub buf: FrameBuf,
    pub state: FrameState,
    pub fault: Option<Fault>,
}

impl Frame {
    pub fn new(page_size: usize) -> Self {
        Self {
            buf: Arc::new(RwLock::new(vec![0u8; page_size].into_boxed_slice())),
            state: FrameState::Live,
            fault: None,
        }
    }
}
