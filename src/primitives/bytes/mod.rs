#![forbid(unsafe_code)]
//! Fixed-width big-endian field access for on-page data.

pub mod be {
    //! Big-endian readers and writers for page fields.
    //!
    //! Every multi-byte integer stored inside a page uses network byte order.

    use core::convert::TryInto;

    const U16_LEN: usize = core::mem::size_of::<u16>();
    const U32_LEN: usize = core::mem::size_of::<u32>();

    /// Decodes a u16 from the first two bytes of `src`.
    #[inline]
    pub fn get_u16(src: &[u8]) -> u16 {
        let head = src
            .get(..U16_LEN)
            .unwrap_or_else(|| panic!("u16 source shorter than 2 bytes (have {})", src.len()));
        u16::from_be_bytes(head.try_into().unwrap())
    }

    /// Decodes a u32 from the first four bytes of `src`.
    #[inline]
    pub fn get_u32(src: &[u8]) -> u32 {
        let head = src
            .get(..U32_LEN)
            .unwrap_or_else(|| panic!("u32 source shorter than 4 bytes (have {})", src.len()));
        u32::from_be_bytes(head.try_into().unwrap())
    }

    /// Encodes `v` into the first two bytes of `dst`.
    #[inline]
    pub fn put_u16(dst: &mut [u8], v: u16) {
        assert!(dst.len() >= U16_LEN, "destination too small");
        dst[..U16_LEN].copy_from_slice(&v.to_be_bytes());
    }

    /// Encodes `v` into the first four bytes of `dst`.
    #[inline]
    pub fn put_u32(dst: &mut [u8], v: u32) {
        assert!(dst.len() >= U32_LEN, "destination too small");
        dst[..U32_LEN].copy_from_slice(&v.to_be_bytes());
    }
}
