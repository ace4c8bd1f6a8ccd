//! Build-time bring-up configuration.
//!
//! Mirrored by the linker script: `KERNEL_BASE` is where the image is placed,
//! and the page-map buffer in [`crate::boot`] is sized from
//! `ADDR_SPACE_SIZE` through the same [`page_map_len`] used here.

use kernel_paging::{page_map_len, HUGE_PAGE_SIZE};

/// Bytes of physical address space covered by the boot page map.
pub const ADDR_SPACE_SIZE: u64 = 64 << 30;

/// Physical load address of the kernel image.
pub const KERNEL_BASE: u64 = 2 << 20;

/// Upper bound on logical CPUs the static tables are sized for.
pub const CPUS_MAX: usize = 16;

/// Bytes per CPU of dedicated fault-handling (IST) stack.
pub const ISR_STACK_SIZE: usize = 16 * 1024;

/// Bytes of bootstrap-processor boot stack.
pub const BOOT_STACK_SIZE: usize = 64 * 1024;

/// Descriptor count of the static page-map buffer.
pub const PAGE_MAP_LEN: usize = page_map_len(ADDR_SPACE_SIZE);

const _: () = {
    assert!(ADDR_SPACE_SIZE % HUGE_PAGE_SIZE == 0);
    assert!(KERNEL_BASE % HUGE_PAGE_SIZE == 0);
    assert!(KERNEL_BASE < ADDR_SPACE_SIZE);
    // 32768 huge pages: 64 leaf tables, 1 intermediate, 1 root.
    assert!(PAGE_MAP_LEN == 66 * 512);
    assert!(ISR_STACK_SIZE % 16 == 0);
    assert!(BOOT_STACK_SIZE % 16 == 0);
};

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_addresses::PhysicalAddress;
    use kernel_paging::{build_page_map, MappedRegion, PageDesc, TABLE_DESCS};

    /// The boot entry stub fills the static page-map buffer with a fixed
    /// layout: root at descriptor 0, the intermediate table one stride in,
    /// leaf tables from stride two onwards with leaf slot = global page
    /// index. The hosted builder must produce the same layout for the boot
    /// configuration, or the two have drifted apart.
    #[test]
    fn boot_page_map_layout_is_front_to_back() {
        let kernel_size = 6 * 1024 * 1024;
        let region =
            MappedRegion::new(PhysicalAddress::new(KERNEL_BASE), kernel_size, ADDR_SPACE_SIZE)
                .unwrap();
        // Table links drop the low twelve address bits, so the buffer must be
        // page-aligned like the real static one in `crate::boot`.
        #[repr(align(4096))]
        struct AlignedBuffer([PageDesc; PAGE_MAP_LEN]);
        let mut buffer = Box::new(AlignedBuffer([PageDesc::absent(); PAGE_MAP_LEN]));
        let descs = &mut buffer.0;
        build_page_map(descs, ADDR_SPACE_SIZE, region);

        assert_eq!(
            descs[0].address(),
            PhysicalAddress::from_ptr(&raw const descs[TABLE_DESCS])
        );
        assert_eq!(
            descs[TABLE_DESCS].address(),
            PhysicalAddress::from_ptr(&raw const descs[2 * TABLE_DESCS])
        );

        let first_page = KERNEL_BASE / HUGE_PAGE_SIZE;
        let last_page = (KERNEL_BASE + kernel_size - 1) / HUGE_PAGE_SIZE;
        for page in first_page..=last_page {
            let leaf = descs[2 * TABLE_DESCS + usize::try_from(page).unwrap()];
            assert!(leaf.is_present());
            assert!(leaf.is_huge());
            assert_eq!(leaf.address().as_u64(), page * HUGE_PAGE_SIZE);
        }
        assert!(!descs[2 * TABLE_DESCS].is_present());
        let beyond = 2 * TABLE_DESCS + usize::try_from(last_page).unwrap() + 1;
        assert!(!descs[beyond].is_present());
    }
}
