use crate::PageDesc;
use kernel_addresses::{PageSize, PhysicalAddress, Size2M};

/// Size of the huge pages the boot map is built from.
pub const HUGE_PAGE_SIZE: u64 = Size2M::SIZE;

/// Descriptors per paging-structure table.
pub const TABLE_DESCS: usize = 512;

/// Rejected [`MappedRegion`] configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum RegionError {
    /// The region has zero size.
    #[error("mapped region is empty")]
    Empty,

    /// The region extends past the end of the early address space.
    #[error("mapped region exceeds the {addr_space_size} byte address space")]
    OutOfRange {
        /// The address-space size the region was validated against.
        addr_space_size: u64,
    },
}

/// The contiguous physical range that will be identity-mapped as present.
///
/// Validation happens once here; [`build_page_map`] then only sees page
/// indices it can trust.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MappedRegion {
    first_page: u64,
    last_page: u64,
}

impl MappedRegion {
    /// Validates a `base`/`size` pair against the early address space.
    ///
    /// The range is inclusive of every huge page it touches: a region that
    /// starts or ends mid-page maps the whole containing page.
    ///
    /// # Errors
    ///
    /// [`RegionError::Empty`] if `size` is zero, [`RegionError::OutOfRange`]
    /// if `base + size` overflows or exceeds `addr_space_size`.
    pub const fn new(
        base: PhysicalAddress,
        size: u64,
        addr_space_size: u64,
    ) -> Result<Self, RegionError> {
        if size == 0 {
            return Err(RegionError::Empty);
        }
        let Some(end) = base.checked_add(size) else {
            return Err(RegionError::OutOfRange { addr_space_size });
        };
        if end.as_u64() > addr_space_size {
            return Err(RegionError::OutOfRange { addr_space_size });
        }
        Ok(Self {
            first_page: base.as_u64() / HUGE_PAGE_SIZE,
            last_page: (end.as_u64() - 1) / HUGE_PAGE_SIZE,
        })
    }

    /// Global index of the first present page.
    #[must_use]
    pub const fn first_page(self) -> u64 {
        self.first_page
    }

    /// Global index of the last present page (inclusive).
    #[must_use]
    pub const fn last_page(self) -> u64 {
        self.last_page
    }
}

/// Number of descriptors a page-map buffer for `addr_space_size` bytes must
/// hold: one root table, the intermediate tables, and the leaf tables, each
/// [`TABLE_DESCS`] wide.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn page_map_len(addr_space_size: u64) -> usize {
    let total_pages = addr_space_size.div_ceil(HUGE_PAGE_SIZE);
    let leaf_tables = total_pages.div_ceil(TABLE_DESCS as u64);
    let mid_tables = leaf_tables.div_ceil(TABLE_DESCS as u64);
    ((1 + mid_tables + leaf_tables) * TABLE_DESCS as u64) as usize
}

/// Builds the three-level identity map into `descs`.
///
/// Tables are allocated front-to-back with a bump cursor: the root sits at
/// descriptor 0, and each root or intermediate entry links to the next free
/// 512-descriptor table in the buffer. Because the kernel runs
/// identity-mapped, the link stored in a descriptor is simply the in-memory
/// address of the linked table.
///
/// A leaf descriptor is present iff its global page index falls inside
/// `region`; construction stops once all `addr_space_size / HUGE_PAGE_SIZE`
/// pages have been walked. `descs` must hold at least
/// [`page_map_len`]`(addr_space_size)` descriptors and must stay at its final
/// address for as long as the map is live in CR3.
pub fn build_page_map(descs: &mut [PageDesc], addr_space_size: u64, region: MappedRegion) {
    let needed = page_map_len(addr_space_size);
    debug_assert!(descs.len() >= needed, "page-map buffer too small");

    descs[..needed].fill(PageDesc::absent());

    let total_pages = addr_space_size / HUGE_PAGE_SIZE;
    let mut next_table = TABLE_DESCS;
    let mut page = 0u64;
    let mut root_index = 0;

    'walk: loop {
        let mid = next_table;
        next_table += TABLE_DESCS;
        descs[root_index] = PageDesc::table_at(desc_address(descs, mid));

        for mid_index in mid..mid + TABLE_DESCS {
            let leaf = next_table;
            next_table += TABLE_DESCS;
            descs[mid_index] = PageDesc::table_at(desc_address(descs, leaf));

            for leaf_index in leaf..leaf + TABLE_DESCS {
                if page >= region.first_page && page <= region.last_page {
                    descs[leaf_index] =
                        PageDesc::leaf_at(PhysicalAddress::new(page * HUGE_PAGE_SIZE));
                }
                page += 1;
            }

            if page >= total_pages {
                break 'walk;
            }
        }

        root_index += 1;
    }
}

fn desc_address(descs: &[PageDesc], index: usize) -> PhysicalAddress {
    PhysicalAddress::from_ptr(&raw const descs[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: u64 = 1 << 30;
    const MIB: u64 = 1 << 20;

    /// Page-aligned descriptor buffer: table links drop the low twelve
    /// address bits, so a plain `Vec` allocation is not good enough. Leaked
    /// on purpose; the process ends with the test run.
    fn alloc_descs(len: usize) -> &'static mut [PageDesc] {
        let slice = Vec::leak(vec![PageDesc::absent(); len + 1024]);
        let offset = slice.as_ptr().align_offset(4096);
        &mut slice[offset..offset + len]
    }

    fn build(addr_space_size: u64, base: u64, size: u64) -> &'static mut [PageDesc] {
        let region =
            MappedRegion::new(PhysicalAddress::new(base), size, addr_space_size).unwrap();
        let descs = alloc_descs(page_map_len(addr_space_size));
        build_page_map(descs, addr_space_size, region);
        descs
    }

    #[test]
    fn one_gib_buffer_is_three_tables() {
        assert_eq!(page_map_len(GIB), 3 * TABLE_DESCS);
    }

    #[test]
    fn sixty_four_gib_buffer_has_sixty_four_leaf_tables() {
        // 32768 pages -> 64 leaf tables, one intermediate, one root.
        assert_eq!(page_map_len(64 * GIB), 66 * TABLE_DESCS);
    }

    #[test]
    fn maps_exactly_the_requested_pages() {
        // 1 GiB space, region at 2 MiB spanning 6 MiB: pages 1..=3.
        let descs = build(GIB, 2 * MIB, 6 * MIB);
        let leaves = &descs[2 * TABLE_DESCS..3 * TABLE_DESCS];

        assert!(!leaves[0].is_present());
        for page in 1..=3u64 {
            let leaf = leaves[usize::try_from(page).unwrap()];
            assert!(leaf.is_present());
            assert!(leaf.is_huge());
            assert_eq!(leaf.address().as_u64(), page * HUGE_PAGE_SIZE);
        }
        assert!(leaves[4..].iter().all(|leaf| !leaf.is_present()));
    }

    #[test]
    fn region_touching_a_page_maps_the_whole_page() {
        // Ends one byte into page 2, so page 2 is included.
        let descs = build(GIB, 2 * MIB, 2 * MIB + 1);
        let leaves = &descs[2 * TABLE_DESCS..3 * TABLE_DESCS];
        assert!(leaves[1].is_present());
        assert!(leaves[2].is_present());
        assert!(!leaves[3].is_present());
    }

    #[test]
    fn tables_link_front_to_back() {
        let descs = build(GIB, 0, 2 * MIB);
        let root = descs[0];
        let mid = descs[TABLE_DESCS];

        assert!(root.is_present());
        assert!(!root.is_huge());
        assert_eq!(
            root.address(),
            PhysicalAddress::from_ptr(&raw const descs[TABLE_DESCS])
        );
        assert_eq!(
            mid.address(),
            PhysicalAddress::from_ptr(&raw const descs[2 * TABLE_DESCS])
        );
        // Unused root and intermediate slots stay absent.
        assert!(descs[1..TABLE_DESCS].iter().all(|slot| !slot.is_present()));
        assert!(descs[TABLE_DESCS + 1..2 * TABLE_DESCS]
            .iter()
            .all(|slot| !slot.is_present()));
    }

    #[test]
    fn rebuild_into_the_same_buffer_is_identical() {
        let addr_space_size = 4 * GIB;
        let region =
            MappedRegion::new(PhysicalAddress::new(2 * MIB), 8 * MIB, addr_space_size).unwrap();
        let mut descs = vec![PageDesc::absent(); page_map_len(addr_space_size)];

        build_page_map(&mut descs, addr_space_size, region);
        let first = descs.clone();
        build_page_map(&mut descs, addr_space_size, region);
        assert_eq!(first, descs);
    }

    #[test]
    fn rejects_empty_region() {
        assert_eq!(
            MappedRegion::new(PhysicalAddress::new(2 * MIB), 0, GIB),
            Err(RegionError::Empty)
        );
    }

    #[test]
    fn rejects_region_past_the_address_space() {
        let result = MappedRegion::new(PhysicalAddress::new(GIB - MIB), 2 * MIB, GIB);
        assert_eq!(
            result,
            Err(RegionError::OutOfRange {
                addr_space_size: GIB
            })
        );
        // Overflowing base + size is out of range too, not a wrap-around.
        assert!(MappedRegion::new(PhysicalAddress::new(u64::MAX - 1), 4, GIB).is_err());
    }

    #[test]
    fn region_page_indices() {
        let region = MappedRegion::new(PhysicalAddress::new(2 * MIB), 6 * MIB, GIB).unwrap();
        assert_eq!(region.first_page(), 1);
        assert_eq!(region.last_page(), 3);
    }
}
