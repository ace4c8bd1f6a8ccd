use bitfield_struct::bitfield;

/// Classic 8-byte segment descriptor.
///
/// Long mode ignores base and limit for code/data segments, so the two
/// segments this core defines carry only their type, privilege and mode
/// bits, exactly what the far jump and the transient 32-bit data load need.
#[bitfield(u64)]
#[derive(Eq, PartialEq)]
pub struct SegmentDesc {
    /// Bits 0–15 — Limit bits 0..16.
    pub limit_low: u16,

    /// Bits 16–31 — Base bits 0..16.
    pub base_low: u16,

    /// Bits 32–39 — Base bits 16..24.
    pub base_mid: u8,

    /// Bits 40–43 — Segment type nibble.
    #[bits(4)]
    pub seg_type: u8,

    /// Bit 44 — S: code/data segment rather than a system descriptor.
    pub non_system: bool,

    /// Bits 45–46 — Descriptor privilege level.
    #[bits(2)]
    pub dpl: u8,

    /// Bit 47 — P: present.
    pub present: bool,

    /// Bits 48–51 — Limit bits 16..20.
    #[bits(4)]
    pub limit_high: u8,

    /// Bit 52 — AVL: free for software use.
    pub available: bool,

    /// Bit 53 — L: 64-bit code segment.
    pub long_mode: bool,

    /// Bit 54 — D/B: 32-bit default operand size. Mutually exclusive with L.
    pub default_size: bool,

    /// Bit 55 — G: limit granularity in 4 KiB units.
    pub granularity: bool,

    /// Bits 56–63 — Base bits 24..32.
    pub base_high: u8,
}

/// Code segment type nibble: execute/read.
const TYPE_CODE: u8 = 0xA;

/// Data segment type nibble: read/write.
const TYPE_DATA: u8 = 0x2;

impl SegmentDesc {
    /// The mandatory all-zero descriptor at GDT index 0.
    #[inline]
    #[must_use]
    pub const fn null() -> Self {
        Self::new()
    }

    /// Ring-0 64-bit code segment. The far jump into long mode latches the
    /// 64-bit execution mode from this descriptor's L bit.
    #[inline]
    #[must_use]
    pub const fn code64() -> Self {
        Self::new()
            .with_seg_type(TYPE_CODE)
            .with_non_system(true)
            .with_present(true)
            .with_long_mode(true)
    }

    /// Ring-0 32-bit data segment, used transiently around the mode switch.
    #[inline]
    #[must_use]
    pub const fn data32() -> Self {
        Self::new()
            .with_seg_type(TYPE_DATA)
            .with_non_system(true)
            .with_present(true)
            .with_default_size(true)
    }
}

const _: () = assert!(size_of::<SegmentDesc>() == 8);
