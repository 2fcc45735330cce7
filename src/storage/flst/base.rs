use tracing::trace;

use super::addr::{read_addr, zero_both};
use super::{check, FileAddr, ListBase, FLST_FIRST, FLST_LAST, FLST_LEN, FLST_NEXT, FLST_PREV};
use crate::primitives::bytes::be;
use crate::primitives::mtr::{Mtr, WriteMode};

/// Resets a base node to the empty list.
pub fn init(mtr: &mut Mtr<'_>, base: ListBase) {
    check::writable(mtr, base.block);
    mtr.write_u32(base.block, base.field(FLST_LEN), 0, WriteMode::MaybeNop);
    zero_both(mtr, base.block, base.field(FLST_FIRST));
    trace!(page = %base.block.id(), offset = base.offset, "flst.init");
}

/// Length stored in the base node starting at `base[0]`.
pub fn get_len(base: &[u8]) -> u32 {
    be::get_u32(&base[FLST_LEN..])
}

/// First-node address of the base node starting at `base[0]`.
pub fn get_first(base: &[u8]) -> FileAddr {
    read_addr(&base[FLST_FIRST..])
}

/// Last-node address of the base node starting at `base[0]`.
pub fn get_last(base: &[u8]) -> FileAddr {
    read_addr(&base[FLST_LAST..])
}

/// Prev address of the node starting at `node[0]`.
pub fn get_prev_addr(node: &[u8]) -> FileAddr {
    read_addr(&node[FLST_PREV..])
}

/// Next address of the node starting at `node[0]`.
pub fn get_next_addr(node: &[u8]) -> FileAddr {
    read_addr(&node[FLST_NEXT..])
}
