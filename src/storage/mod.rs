//! On-page structures built from mini-transaction writes.

/// File-based doubly linked lists embedded in pages.
pub mod flst;
