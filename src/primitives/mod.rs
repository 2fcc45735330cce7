//! Low-level primitives the list core is built on.
//!
//! Includes big-endian field codecs, page latches, the page cache and
//! mini-transactions.

/// Big-endian field access for on-page data.
pub mod bytes;

/// Page latches.
///
/// Reader/writer locks over page frames and the latch modes the memo tracks.
pub mod concurrency;

/// Mini-transactions: latch memo plus redo records.
pub mod mtr;

/// Page cache collaborator.
///
/// Fetches frames by page number and collects committed redo records.
pub mod pager;
