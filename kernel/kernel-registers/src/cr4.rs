use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;

/// Architectural model of CR4.
#[bitfield(u64)]
#[derive(Eq, PartialEq)]
pub struct Cr4 {
    /// Bit 0 — VME: Virtual-8086 Mode Extensions.
    pub virtual_mode_extensions: bool,

    /// Bit 1 — PVI: Protected-Mode Virtual Interrupts.
    pub protected_virtual_interrupts: bool,

    /// Bit 2 — TSD: Time Stamp Disable.
    pub timestamp_disable: bool,

    /// Bit 3 — DE: Debugging Extensions.
    pub debugging_extensions: bool,

    /// Bit 4 — PSE: Page Size Extension (32-bit 4 MiB pages; ignored in PAE).
    pub page_size_extension: bool,

    /// Bit 5 — PAE: Physical Address Extension.
    ///
    /// Mandatory for long mode; must be set before `EFER.LME` takes effect.
    pub physical_address_extension: bool,

    /// Bit 6 — MCE: Machine-Check Enable.
    pub machine_check: bool,

    /// Bit 7 — PGE: Page Global Enable.
    pub page_global: bool,

    /// Bit 8 — PCE: Performance-Monitoring Counter Enable.
    pub performance_counter: bool,

    /// Bit 9 — OSFXSR: FXSAVE/FXRSTOR and SSE support.
    pub osfxsr: bool,

    /// Bit 10 — OSXMMEXCPT: unmasked SIMD exceptions raise #XM.
    pub osxmmexcpt: bool,

    /// Bit 11 — UMIP: User-Mode Instruction Prevention.
    pub umip: bool,

    /// Bits 12–63 — Later feature bits and reserved spans this kernel never
    /// touches; preserved as read so read-modify-write cycles keep them intact.
    #[bits(52, default = 0)]
    _upper: u64,
}

#[cfg(feature = "asm")]
impl LoadRegisterUnsafe for Cr4 {
    unsafe fn load_unsafe() -> Self {
        let cr4: u64;
        unsafe {
            core::arch::asm!("mov {}, cr4", out(reg) cr4, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr4)
    }
}

#[cfg(feature = "asm")]
impl StoreRegisterUnsafe for Cr4 {
    unsafe fn store_unsafe(self) {
        let cr4 = self.into_bits();
        unsafe {
            core::arch::asm!("mov cr4, {}", in(reg) cr4, options(nostack, preserves_flags));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pae_is_bit_5() {
        assert_eq!(
            Cr4::new().with_physical_address_extension(true).into_bits(),
            1 << 5
        );
    }

    #[test]
    fn osfxsr_is_bit_9() {
        assert_eq!(Cr4::new().with_osfxsr(true).into_bits(), 1 << 9);
    }
}
