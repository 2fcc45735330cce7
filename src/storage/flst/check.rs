//! Caller-contract assertions.
//!
//! Compiled only with debug assertions; release builds trust the caller.

#[cfg(debug_assertions)]
mod enabled {
    use crate::primitives::concurrency::LatchMode;
    use crate::primitives::mtr::{Block, Mtr};
    use crate::storage::flst::FileAddr;
    use crate::types::page;

    pub(crate) fn writable(mtr: &Mtr<'_>, block: Block) {
        assert!(
            mtr.memo_contains_flagged(block, LatchMode::SharedExclusive),
            "page {} is not latched SX or X by this mini-transaction",
            block.id()
        );
    }

    pub(crate) fn field_in_data_area(mtr: &Mtr<'_>, field: usize, len: usize) {
        assert!(
            page::in_data_area(mtr.page_size(), field, len),
            "field at {field} (+{len}) outside the page data area"
        );
    }

    pub(crate) fn target_in_data_area(addr: FileAddr) {
        assert!(
            addr.is_null() || addr.boffset as usize >= page::PAGE_DATA,
            "address {addr} points into the page header"
        );
    }

    pub(crate) fn distinct(a: (Block, u16), b: (Block, u16)) {
        assert!(a != b, "list fields overlap at {}:{}", (a.0).id(), a.1);
    }

    pub(crate) fn empty(len: u32) {
        assert_eq!(len, 0, "list expected to be empty");
    }
}

#[cfg(not(debug_assertions))]
mod enabled {
    use crate::primitives::mtr::{Block, Mtr};
    use crate::storage::flst::FileAddr;

    #[inline(always)]
    pub(crate) fn writable(_: &Mtr<'_>, _: Block) {}

    #[inline(always)]
    pub(crate) fn field_in_data_area(_: &Mtr<'_>, _: usize, _: usize) {}

    #[inline(always)]
    pub(crate) fn target_in_data_area(_: FileAddr) {}

    #[inline(always)]
    pub(crate) fn distinct(_: (Block, u16), _: (Block, u16)) {}

    #[inline(always)]
    pub(crate) fn empty(_: u32) {}
}

pub(crate) use enabled::*;
