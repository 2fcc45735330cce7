use super::{check, FileAddr, FIL_ADDR_BYTE, FIL_ADDR_PAGE, FIL_ADDR_SIZE};
use crate::primitives::bytes::be;
use crate::primitives::mtr::{Block, Mtr, WriteMode};
use crate::types::PageId;

/// Decodes the address stored at the start of `field`.
pub fn read_addr(field: &[u8]) -> FileAddr {
    FileAddr {
        page: PageId(be::get_u32(&field[FIL_ADDR_PAGE..])),
        boffset: be::get_u16(&field[FIL_ADDR_BYTE..]),
    }
}

/// Stores `addr` in the address field at byte `field` of `block`.
///
/// Only the part that differs from the stored value is written and logged:
/// the offset alone, the page number alone, or the whole field. Writing the
/// value already stored produces no record.
pub fn write_addr(mtr: &mut Mtr<'_>, block: Block, field: usize, addr: FileAddr) {
    check::writable(mtr, block);
    check::field_in_data_area(mtr, field, FIL_ADDR_SIZE);
    check::target_in_data_area(addr);

    let stored = read_addr(&mtr.page(block)[field..]);
    let same_page = stored.page == addr.page;
    let same_offset = stored.boffset == addr.boffset;
    if same_page {
        if !same_offset {
            mtr.write_u16(block, field + FIL_ADDR_BYTE, addr.boffset, WriteMode::Normal);
        }
        return;
    }
    if same_offset {
        mtr.write_u32(block, field + FIL_ADDR_PAGE, addr.page.0, WriteMode::Normal);
    } else {
        let mut buf = [0u8; FIL_ADDR_SIZE];
        be::put_u32(&mut buf[FIL_ADDR_PAGE..], addr.page.0);
        be::put_u16(&mut buf[FIL_ADDR_BYTE..], addr.boffset);
        mtr.memcpy(block, field, &buf);
    }
}

/// Sets the two consecutive address fields starting at `field` to null.
///
/// Logged as a conditional fill of the first page number, a no-op-capable
/// write of the first offset, and an in-page move of the first field over
/// the second. Each record reproduces the same bytes when re-applied.
pub fn zero_both(mtr: &mut Mtr<'_>, block: Block, field: usize) {
    check::writable(mtr, block);
    check::field_in_data_area(mtr, field, 2 * FIL_ADDR_SIZE);

    if !PageId(be::get_u32(&mtr.page(block)[field + FIL_ADDR_PAGE..])).is_null() {
        mtr.memset(block, field + FIL_ADDR_PAGE, 4, 0xff);
    }
    mtr.write_u16(block, field + FIL_ADDR_BYTE, 0, WriteMode::MaybeNop);
    mtr.memmove(block, field + FIL_ADDR_SIZE, field, FIL_ADDR_SIZE);
}
