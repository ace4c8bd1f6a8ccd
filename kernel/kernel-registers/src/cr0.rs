use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;

/// Architectural model of CR0.
///
/// Only the architecturally defined bits are exposed; every reserved span is
/// a private field that read-modify-write cycles carry through unchanged.
#[bitfield(u64)]
#[derive(Eq, PartialEq)]
pub struct Cr0 {
    /// Bit 0 — PE: Protection Enable.
    ///
    /// Set by the loader long before this kernel runs; paging and long mode
    /// both require it.
    pub protection: bool,

    /// Bit 1 — MP: Monitor Coprocessor.
    pub monitor_coprocessor: bool,

    /// Bit 2 — EM: x87 Emulation. Must be clear for SSE.
    pub emulation: bool,

    /// Bit 3 — TS: Task Switched.
    pub task_switched: bool,

    /// Bit 4 — ET: Extension Type (effectively reserved-as-one on modern CPUs).
    pub extension_type: bool,

    /// Bit 5 — NE: Numeric Error reporting via #MF.
    pub numeric_error: bool,

    /// Bits 6–15 — Reserved (must be 0).
    #[bits(10, default = 0)]
    _reserved_6_15: u16,

    /// Bit 16 — WP: Write Protect for supervisor accesses.
    pub write_protect: bool,

    /// Bit 17 — Reserved (must be 0).
    #[bits(1, default = false)]
    _reserved_17: bool,

    /// Bit 18 — AM: Alignment Mask.
    pub alignment_mask: bool,

    /// Bits 19–28 — Reserved (must be 0).
    #[bits(10, default = 0)]
    _reserved_19_28: u16,

    /// Bit 29 — NW: Not Write-Through.
    pub not_write_through: bool,

    /// Bit 30 — CD: Cache Disable.
    pub cache_disable: bool,

    /// Bit 31 — PG: Paging.
    ///
    /// Setting PG while `EFER.LME` is set activates long mode. PG must be set
    /// strictly after CR4.PAE, CR3 and `EFER.LME` have been programmed.
    pub paging: bool,

    /// Bits 32–63 — Reserved (must be 0).
    #[bits(32, default = 0)]
    _reserved_32_63: u32,
}

#[cfg(feature = "asm")]
impl LoadRegisterUnsafe for Cr0 {
    unsafe fn load_unsafe() -> Self {
        let cr0: u64;
        unsafe {
            core::arch::asm!("mov {}, cr0", out(reg) cr0, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr0)
    }
}

#[cfg(feature = "asm")]
impl StoreRegisterUnsafe for Cr0 {
    unsafe fn store_unsafe(self) {
        let cr0 = self.into_bits();
        unsafe {
            core::arch::asm!("mov cr0, {}", in(reg) cr0, options(nostack, preserves_flags));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_is_bit_31() {
        assert_eq!(Cr0::new().with_paging(true).into_bits(), 1 << 31);
    }

    #[test]
    fn default_is_all_clear() {
        assert_eq!(Cr0::new().into_bits(), 0);
    }

    #[test]
    fn protection_is_bit_0() {
        assert_eq!(Cr0::new().with_protection(true).into_bits(), 1);
    }
}
