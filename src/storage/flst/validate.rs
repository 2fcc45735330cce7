use serde::Serialize;
use tracing::{debug, warn};

use super::base::{get_first, get_last, get_len, get_next_addr, get_prev_addr};
use super::{check_node_addr, FileAddr};
use crate::primitives::concurrency::LatchMode;
use crate::primitives::mtr::{Latched, Mtr};
use crate::types::{Result, SombraError};

/// Outcome of a successful [`validate`] pass.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ListReport {
    /// Length stored in the base node.
    pub len: u32,
    /// Nodes visited walking `next` from `first`.
    pub forward_hops: u32,
    /// Nodes visited walking `prev` from `last`.
    pub backward_hops: u32,
    /// Pages latched by short-lived hop mini-transactions.
    pub pages_fetched: u32,
}

/// Walks the list at `offset` of `base` in both directions.
///
/// Each walk takes exactly `len` hops and must end at the null address.
/// The forward walk also checks that every node's prev field names the
/// node it was reached from. The caller keeps `base` latched (shared is
/// enough) for the whole check; pages it does not already hold are latched
/// shared one hop at a time and released before the next hop.
pub fn validate<L: Latched>(mtr: &Mtr<'_>, base: L, offset: u16) -> Result<ListReport> {
    debug_assert!(
        mtr.memo_contains_flagged(base, LatchMode::Shared),
        "list base must be latched while validating"
    );
    let base_bytes = &mtr.page(base)[offset as usize..];
    let len = get_len(base_bytes);
    let first = get_first(base_bytes);
    let last = get_last(base_bytes);
    let mut report = ListReport {
        len,
        ..ListReport::default()
    };

    if (len == 0) != first.is_null() || (len == 0) != last.is_null() {
        warn!(len, %first, %last, "flst.validate: base node inconsistent");
        return Err(SombraError::Corruption("list length disagrees with first/last"));
    }

    let mut prev = FileAddr::NULL;
    let mut addr = first;
    for _ in 0..len {
        if addr.is_null() {
            return Err(corrupt("forward walk reached null before length"));
        }
        let (node_prev, node_next) = read_node(mtr, addr, &mut report.pages_fetched)?;
        if node_prev != prev {
            warn!(node = %addr, stored = %node_prev, expected = %prev, "flst.validate: bad back link");
            return Err(SombraError::Corruption("list prev link does not match predecessor"));
        }
        prev = addr;
        addr = node_next;
        report.forward_hops += 1;
    }
    if !addr.is_null() {
        return Err(corrupt("forward walk longer than length"));
    }
    if prev != last {
        return Err(corrupt("forward walk does not end at last"));
    }

    addr = last;
    for _ in 0..len {
        if addr.is_null() {
            return Err(corrupt("backward walk reached null before length"));
        }
        let (node_prev, _) = read_node(mtr, addr, &mut report.pages_fetched)?;
        addr = node_prev;
        report.backward_hops += 1;
    }
    if !addr.is_null() {
        return Err(corrupt("backward walk longer than length"));
    }

    debug!(
        len,
        pages_fetched = report.pages_fetched,
        "flst.validate ok"
    );
    Ok(report)
}

fn corrupt(what: &'static str) -> SombraError {
    warn!(what, "flst.validate failed");
    SombraError::Corruption(what)
}

/// Reads a node's links, latching its page only for the duration of the read.
fn read_node(mtr: &Mtr<'_>, addr: FileAddr, fetched: &mut u32) -> Result<(FileAddr, FileAddr)> {
    check_node_addr(mtr.page_size(), addr)?;
    let at = addr.boffset as usize;
    if let Some(held) = mtr.find(addr.page) {
        let node = &mtr.page(held)[at..];
        return Ok((get_prev_addr(node), get_next_addr(node)));
    }
    let mut step = Mtr::start(mtr.cache());
    let block = step.get_page_shared(addr.page)?;
    let node = &step.page(block)[at..];
    let links = (get_prev_addr(node), get_next_addr(node));
    step.commit();
    *fetched += 1;
    Ok(links)
}
