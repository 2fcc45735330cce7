#![forbid(unsafe_code)]

mod frame;
mod pager;

pub use frame::Fault;
pub use pager::{BufferPool, PageCache, PoolOptions, PoolStats};
