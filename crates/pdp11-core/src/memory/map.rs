//! Physical address map: RAM below, the 22-bit I/O page on top.

/// Mask of a 22-bit physical address.
pub const PHYSICAL_ADDRESS_MASK: u32 = 0o17777777;
/// First physical address of the I/O page.
pub const IO_PAGE_BASE: u32 = 0o17760000;
/// Last physical address of the I/O page.
pub const IO_PAGE_END: u32 = PHYSICAL_ADDRESS_MASK;
/// Physical address of the processor status word.
pub const PSW_ADDR: u32 = 0o17777776;
/// Largest RAM size that still leaves the I/O page unshadowed.
pub const MAX_RAM_BYTES: usize = IO_PAGE_BASE as usize;

/// Classification of a physical address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalRegion {
    /// Backed by RAM at the contained byte offset.
    Ram(usize),
    /// Inside the I/O page.
    IoPage,
    /// Neither RAM nor I/O page.
    NonExistent,
}

/// Decodes `physical` against a RAM of `ram_bytes` bytes.
#[must_use]
pub const fn decode_physical(physical: u32, ram_bytes: usize) -> PhysicalRegion {
    let physical = physical & PHYSICAL_ADDRESS_MASK;
    if physical >= IO_PAGE_BASE {
        PhysicalRegion::IoPage
    } else if (physical as usize) < ram_bytes {
        PhysicalRegion::Ram(physical as usize)
    } else {
        PhysicalRegion::NonExistent
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_physical, PhysicalRegion, IO_PAGE_BASE, PSW_ADDR};

    #[test]
    fn regions_split_at_ram_size_and_io_page() {
        assert_eq!(decode_physical(0, 0o1000), PhysicalRegion::Ram(0));
        assert_eq!(decode_physical(0o776, 0o1000), PhysicalRegion::Ram(0o776));
        assert_eq!(decode_physical(0o1000, 0o1000), PhysicalRegion::NonExistent);
        let below = decode_physical(IO_PAGE_BASE - 2, 0o1000);
        assert_eq!(below, PhysicalRegion::NonExistent);
        let base = decode_physical(IO_PAGE_BASE, 0o1000);
        assert_eq!(base, PhysicalRegion::IoPage);
        assert_eq!(decode_physical(PSW_ADDR, 0o1000), PhysicalRegion::IoPage);
    }
}
