use bitfield_struct::bitfield;
use kernel_addresses::VirtualAddress;

/// Segment type nibble of an available 64-bit task segment.
const TYPE_TSS_AVAILABLE: u8 = 0x9;

/// Low 8 bytes of a 16-byte task-segment descriptor.
#[bitfield(u64)]
#[derive(Eq, PartialEq)]
pub struct TssDescLow {
    /// Bits 0–15 — Limit bits 0..16.
    pub limit_low: u16,

    /// Bits 16–31 — Base bits 0..16.
    pub base_low: u16,

    /// Bits 32–39 — Base bits 16..24.
    pub base_mid: u8,

    /// Bits 40–43 — 0x9: available 64-bit TSS.
    #[bits(4)]
    pub seg_type: u8,

    /// Bit 44 — S: must be 0, system descriptor.
    pub non_system: bool,

    /// Bits 45–46 — Descriptor privilege level.
    #[bits(2)]
    pub dpl: u8,

    /// Bit 47 — P: present.
    pub present: bool,

    /// Bits 48–51 — Limit bits 16..20.
    #[bits(4)]
    pub limit_high: u8,

    /// Bits 52–54 — AVL plus two must-be-zero bits for system types.
    #[bits(3, default = 0)]
    _avl_zero: u8,

    /// Bit 55 — G: byte granularity when clear.
    pub granularity: bool,

    /// Bits 56–63 — Base bits 24..32.
    pub base_high: u8,
}

/// High 8 bytes: base bits 32..64, rest reserved.
#[bitfield(u64)]
#[derive(Eq, PartialEq)]
pub struct TssDescHigh {
    /// Bits 0–31 — Base bits 32..64.
    pub base_upper: u32,

    /// Bits 32–63 — Reserved (must be 0).
    #[bits(32, default = 0)]
    _reserved: u32,
}

/// The 16-byte task-segment descriptor occupying two GDT slots.
#[repr(C)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct TssDesc {
    pub low: TssDescLow,
    pub high: TssDescHigh,
}

const _: () = assert!(size_of::<TssDesc>() == 16);

impl TssDesc {
    /// A non-present placeholder, used until the CPU's task segment exists.
    #[inline]
    #[must_use]
    pub const fn absent() -> Self {
        Self {
            low: TssDescLow::new(),
            high: TssDescHigh::new(),
        }
    }

    /// Describes the available 64-bit task segment at `base` spanning
    /// `limit + 1` bytes.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn at(base: VirtualAddress, limit: u32) -> Self {
        let raw = base.as_u64();
        let low = TssDescLow::new()
            .with_limit_low((limit & 0xFFFF) as u16)
            .with_base_low((raw & 0xFFFF) as u16)
            .with_base_mid(((raw >> 16) & 0xFF) as u8)
            .with_seg_type(TYPE_TSS_AVAILABLE)
            .with_non_system(false)
            .with_dpl(0)
            .with_present(true)
            .with_limit_high(((limit >> 16) & 0xF) as u8)
            .with_granularity(false)
            .with_base_high(((raw >> 24) & 0xFF) as u8);
        let high = TssDescHigh::new().with_base_upper((raw >> 32) as u32);
        Self { low, high }
    }

    /// Reassembles the base address from its four fields.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn base(self) -> VirtualAddress {
        let raw = (self.low.base_low() as u64)
            | ((self.low.base_mid() as u64) << 16)
            | ((self.low.base_high() as u64) << 24)
            | ((self.high.base_upper() as u64) << 32);
        VirtualAddress::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_round_trips_across_the_four_fields() {
        let base = VirtualAddress::new(0xFFFF_8000_DEAD_BEEF);
        let desc = TssDesc::at(base, 103);
        assert!(desc.low.present());
        assert!(!desc.low.non_system());
        assert_eq!(desc.low.seg_type(), TYPE_TSS_AVAILABLE);
        assert_eq!(desc.base(), base);
    }

    #[test]
    fn limit_split() {
        let desc = TssDesc::at(VirtualAddress::zero(), 0x9_1234);
        assert_eq!(desc.low.limit_low(), 0x1234);
        assert_eq!(desc.low.limit_high(), 0x9);
    }

    #[test]
    fn absent_is_all_zero() {
        let desc = TssDesc::absent();
        assert_eq!(desc.low.into_bits(), 0);
        assert_eq!(desc.high.into_bits(), 0);
    }
}
