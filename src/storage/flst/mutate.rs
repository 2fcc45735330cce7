use tracing::{debug, warn};

use super::addr::{write_addr, zero_both};
use super::{
    check, check_node_addr, FileAddr, ListBase, ListNode, FIL_ADDR_SIZE, FLST_FIRST, FLST_LAST,
    FLST_LEN, FLST_NEXT, FLST_PREV,
};
use crate::primitives::concurrency::WriteLatch;
use crate::primitives::mtr::{Mtr, WriteMode};
use crate::types::{Result, SombraError};

/// Makes `add` the only member of the empty list `base`.
///
/// Sets the length to one, points first and last at `add` and nulls its
/// links.
pub fn add_to_empty(mtr: &mut Mtr<'_>, base: ListBase, add: ListNode) {
    check::distinct((base.block, base.offset), (add.block, add.offset));
    check::writable(mtr, base.block);
    check::writable(mtr, add.block);
    check::empty(base.len(mtr));

    // Length is zero, so only its low byte changes.
    mtr.write_u8(base.block, base.field(FLST_LEN + 3), 1, WriteMode::Normal);
    write_addr(mtr, base.block, base.field(FLST_FIRST), add.addr());
    mtr.memmove(
        base.block,
        base.field(FLST_LAST),
        base.field(FLST_FIRST),
        FIL_ADDR_SIZE,
    );
    zero_both(mtr, add.block, add.field(FLST_PREV));
    debug!(base = %base.block.id(), node = %add.addr(), "flst.add_to_empty");
}

/// Inserts `add` directly after `cur`.
///
/// If the page of `cur`'s successor cannot be fetched, `add`, `cur` and the
/// length are still updated and the fetch error is returned; the successor
/// keeps pointing back at `cur`. A stored successor address outside the page
/// data area is corruption and nothing is written.
pub fn insert_after(mtr: &mut Mtr<'_>, base: ListBase, cur: ListNode, add: ListNode) -> Result<()> {
    check::distinct((base.block, base.offset), (cur.block, cur.offset));
    check::distinct((base.block, base.offset), (add.block, add.offset));
    check::distinct((cur.block, cur.offset), (add.block, add.offset));
    check::writable(mtr, base.block);
    check::writable(mtr, cur.block);
    check::writable(mtr, add.block);

    let next_addr = cur.next(mtr);
    let new_addr = add.addr();
    check_stored_link(mtr, next_addr)?;

    write_addr(mtr, add.block, add.field(FLST_PREV), cur.addr());
    write_addr(mtr, add.block, add.field(FLST_NEXT), next_addr);

    let mut result = Ok(());
    if next_addr.is_null() {
        write_addr(mtr, base.block, base.field(FLST_LAST), new_addr);
    } else if let Err(err) = relink(mtr, next_addr, FLST_PREV, new_addr) {
        warn!(neighbour = %next_addr, error = %err, "flst.insert_after: successor not updated");
        result = Err(err);
    }

    write_addr(mtr, cur.block, cur.field(FLST_NEXT), new_addr);
    let bumped = bump_len(mtr, base, 1);
    debug!(after = %cur.addr(), node = %new_addr, "flst.insert_after");
    result.and(bumped)
}

/// Inserts `add` directly before `cur`.
///
/// Mirror image of [`insert_after`], including its handling of a failed
/// neighbour fetch.
pub fn insert_before(
    mtr: &mut Mtr<'_>,
    base: ListBase,
    cur: ListNode,
    add: ListNode,
) -> Result<()> {
    check::distinct((base.block, base.offset), (cur.block, cur.offset));
    check::distinct((base.block, base.offset), (add.block, add.offset));
    check::distinct((cur.block, cur.offset), (add.block, add.offset));
    check::writable(mtr, base.block);
    check::writable(mtr, cur.block);
    check::writable(mtr, add.block);

    let prev_addr = cur.prev(mtr);
    let new_addr = add.addr();
    check_stored_link(mtr, prev_addr)?;

    write_addr(mtr, add.block, add.field(FLST_PREV), prev_addr);
    write_addr(mtr, add.block, add.field(FLST_NEXT), cur.addr());

    let mut result = Ok(());
    if prev_addr.is_null() {
        write_addr(mtr, base.block, base.field(FLST_FIRST), new_addr);
    } else if let Err(err) = relink(mtr, prev_addr, FLST_NEXT, new_addr) {
        warn!(neighbour = %prev_addr, error = %err, "flst.insert_before: predecessor not updated");
        result = Err(err);
    }

    write_addr(mtr, cur.block, cur.field(FLST_PREV), new_addr);
    let bumped = bump_len(mtr, base, 1);
    debug!(before = %cur.addr(), node = %new_addr, "flst.insert_before");
    result.and(bumped)
}

/// Appends `add` to `base`.
pub fn add_last(mtr: &mut Mtr<'_>, base: ListBase, add: ListNode) -> Result<()> {
    check::distinct((base.block, base.offset), (add.block, add.offset));
    check::writable(mtr, base.block);
    check::writable(mtr, add.block);

    if base.is_empty(mtr) {
        add_to_empty(mtr, base, add);
        return Ok(());
    }
    let last = base.last(mtr);
    let cur = node_at(mtr, last)?;
    insert_after(mtr, base, cur, add)
}

/// Prepends `add` to `base`.
pub fn add_first(mtr: &mut Mtr<'_>, base: ListBase, add: ListNode) -> Result<()> {
    check::distinct((base.block, base.offset), (add.block, add.offset));
    check::writable(mtr, base.block);
    check::writable(mtr, add.block);

    if base.is_empty(mtr) {
        add_to_empty(mtr, base, add);
        return Ok(());
    }
    let first = base.first(mtr);
    let cur = node_at(mtr, first)?;
    insert_before(mtr, base, cur, add)
}

/// Unlinks `cur` from `base`.
///
/// Both neighbours are updated independently: a failed fetch on one side
/// does not stop the other side or the length update, and the first error
/// is returned. The links stored in `cur` itself are left untouched.
/// Removing from a list whose stored length is zero, or a node whose stored
/// links point outside the page data area, is reported as corruption before
/// anything is written.
pub fn remove(mtr: &mut Mtr<'_>, base: ListBase, cur: ListNode) -> Result<()> {
    check::distinct((base.block, base.offset), (cur.block, cur.offset));
    check::writable(mtr, base.block);
    check::writable(mtr, cur.block);

    let len = base.len(mtr);
    if len == 0 {
        warn!(base = %base.block.id(), node = %cur.addr(), "flst.remove on empty list");
        return Err(SombraError::Corruption("list length underflow"));
    }

    let prev_addr = cur.prev(mtr);
    let next_addr = cur.next(mtr);
    check_stored_link(mtr, prev_addr)?;
    check_stored_link(mtr, next_addr)?;
    let mut first_err = None;

    if prev_addr.is_null() {
        write_addr(mtr, base.block, base.field(FLST_FIRST), next_addr);
    } else if let Err(err) = relink(mtr, prev_addr, FLST_NEXT, next_addr) {
        warn!(neighbour = %prev_addr, error = %err, "flst.remove: predecessor not updated");
        if first_err.is_none() {
            first_err = Some(err);
        }
    }

    if next_addr.is_null() {
        write_addr(mtr, base.block, base.field(FLST_LAST), prev_addr);
    } else if let Err(err) = relink(mtr, next_addr, FLST_PREV, prev_addr) {
        warn!(neighbour = %next_addr, error = %err, "flst.remove: successor not updated");
        if first_err.is_none() {
            first_err = Some(err);
        }
    }

    mtr.write_u32(base.block, base.field(FLST_LEN), len - 1, WriteMode::Normal);
    debug!(node = %cur.addr(), len = len - 1, "flst.remove");
    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Rejects a non-null link read from a node before any of it is copied.
fn check_stored_link(mtr: &Mtr<'_>, addr: FileAddr) -> Result<()> {
    if addr.is_null() {
        return Ok(());
    }
    check_node_addr(mtr.page_size(), addr).map_err(|err| {
        warn!(link = %addr, "flst: stored link outside page data area");
        err
    })
}

/// Latches the page of a list member found through a stored address.
fn node_at(mtr: &mut Mtr<'_>, addr: FileAddr) -> Result<ListNode> {
    check_node_addr(mtr.page_size(), addr)?;
    let block = mtr.get_page(addr.page, WriteLatch::SharedExclusive)?;
    Ok(ListNode::new(block, addr.boffset))
}

/// Points the `link` field of the node at `at` to `target`.
fn relink(mtr: &mut Mtr<'_>, at: FileAddr, link: usize, target: FileAddr) -> Result<()> {
    let node = node_at(mtr, at)?;
    write_addr(mtr, node.block, node.field(link), target);
    Ok(())
}

fn bump_len(mtr: &mut Mtr<'_>, base: ListBase, by: u32) -> Result<()> {
    let len = base
        .len(mtr)
        .checked_add(by)
        .ok_or(SombraError::Corruption("list length overflow"))?;
    mtr.write_u32(base.block, base.field(FLST_LEN), len, WriteMode::Normal);
    Ok(())
}
