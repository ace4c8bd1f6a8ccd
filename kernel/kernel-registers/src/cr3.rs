use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;
use kernel_addresses::{PhysicalAddress, Size4K};

/// Architectural model of CR3 (non-PCID form).
///
/// Holds the physical address of the page-map root table. The hardware only
/// stores bits 12..52 of the address; the table must therefore be 4 KiB
/// aligned.
#[bitfield(u64)]
#[derive(Eq, PartialEq)]
pub struct Cr3 {
    /// Bits 0–2 — Ignored.
    #[bits(3, default = 0)]
    _ignored_0_2: u8,

    /// Bit 3 — PWT: Page-level Write-Through for root-table accesses.
    pub page_write_through: bool,

    /// Bit 4 — PCD: Page-level Cache Disable for root-table accesses.
    pub page_cache_disable: bool,

    /// Bits 5–11 — Ignored.
    #[bits(7, default = 0)]
    _ignored_5_11: u8,

    /// Bits 12–51 — Physical page number of the page-map root table.
    #[bits(40)]
    pub root_page_number: u64,

    /// Bits 52–63 — Reserved (must be 0).
    #[bits(12, default = 0)]
    _reserved: u16,
}

impl Cr3 {
    /// Builds a CR3 value pointing at the page-map root table at `root`.
    ///
    /// The address must be 4 KiB aligned; the low twelve bits are not
    /// representable in the register.
    #[must_use]
    pub fn from_page_map_root(root: PhysicalAddress) -> Self {
        debug_assert!(root.is_aligned::<Size4K>());
        Self::new().with_root_page_number(root.as_u64() >> 12)
    }

    /// The physical address of the page-map root table.
    #[must_use]
    pub const fn page_map_root(self) -> PhysicalAddress {
        PhysicalAddress::new(self.root_page_number() << 12)
    }
}

#[cfg(feature = "asm")]
impl LoadRegisterUnsafe for Cr3 {
    unsafe fn load_unsafe() -> Self {
        let cr3: u64;
        unsafe {
            core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr3)
    }
}

#[cfg(feature = "asm")]
impl StoreRegisterUnsafe for Cr3 {
    unsafe fn store_unsafe(self) {
        let cr3 = self.into_bits();
        unsafe {
            core::arch::asm!("mov cr3, {}", in(reg) cr3, options(nostack, preserves_flags));
        }
    }
}
