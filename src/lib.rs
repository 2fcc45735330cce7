//! Crash-consistent doubly linked lists stored inside fixed-size pages.
//!
//! [`storage::flst`] holds the list core. It talks to pages only through
//! [`primitives::mtr::Mtr`], which latches pages fetched from a
//! [`primitives::pager::PageCache`] and records every byte it changes as a
//! replayable redo record.

#![warn(missing_docs)]

pub mod primitives;
pub mod storage;
pub mod types;
