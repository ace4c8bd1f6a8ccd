use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;

/// MSR index of the Extended Feature Enable Register.
pub const IA32_EFER: u32 = 0xC000_0080;

/// Architectural model of the EFER MSR.
#[bitfield(u64)]
#[derive(Eq, PartialEq)]
pub struct Efer {
    /// Bit 0 — SCE: SYSCALL/SYSRET enable.
    pub system_call_extensions: bool,

    /// Bits 1–7 — Reserved (must be 0).
    #[bits(7, default = 0)]
    _reserved_1_7: u8,

    /// Bit 8 — LME: Long Mode Enable.
    ///
    /// Armed while paging is off; long mode only activates once CR0.PG is set
    /// with CR4.PAE already enabled.
    pub long_mode_enable: bool,

    /// Bit 9 — Reserved (must be 0).
    #[bits(1, default = false)]
    _reserved_9: bool,

    /// Bit 10 — LMA: Long Mode Active. Read-only; set by hardware.
    pub long_mode_active: bool,

    /// Bit 11 — NXE: No-Execute page protection enable.
    pub no_execute_enable: bool,

    /// Bits 12–63 — Reserved (must be 0).
    #[bits(52, default = 0)]
    _reserved_12_63: u64,
}

#[cfg(feature = "asm")]
impl LoadRegisterUnsafe for Efer {
    unsafe fn load_unsafe() -> Self {
        let (lo, hi): (u32, u32);
        unsafe {
            core::arch::asm!(
                "rdmsr",
                in("ecx") IA32_EFER,
                out("eax") lo,
                out("edx") hi,
                options(nomem, nostack, preserves_flags),
            );
        }
        Self::from_bits((u64::from(hi) << 32) | u64::from(lo))
    }
}

#[cfg(feature = "asm")]
impl StoreRegisterUnsafe for Efer {
    #[allow(clippy::cast_possible_truncation)]
    unsafe fn store_unsafe(self) {
        let value = self.into_bits();
        let lo = (value & 0xFFFF_FFFF) as u32;
        let hi = (value >> 32) as u32;
        unsafe {
            core::arch::asm!(
                "wrmsr",
                in("ecx") IA32_EFER,
                in("eax") lo,
                in("edx") hi,
                options(nostack, preserves_flags),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_mode_enable_is_bit_8() {
        assert_eq!(Efer::new().with_long_mode_enable(true).into_bits(), 1 << 8);
    }

    #[test]
    fn long_mode_active_is_bit_10() {
        assert_eq!(Efer::new().with_long_mode_active(true).into_bits(), 1 << 10);
    }
}
