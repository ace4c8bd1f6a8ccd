use bitfield_struct::bitfield;
use kernel_addresses::PhysicalAddress;

/// Low 32-bit word of a page descriptor.
///
/// Carries all the control bits plus bits 12–31 of the referenced physical
/// address. Keeping the descriptor as two 32-bit words lets 32-bit bootstrap
/// code fill the tables without 64-bit arithmetic.
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct PageDescLow {
    /// Bit 0 — P: the descriptor references a table or page.
    pub present: bool,

    /// Bit 1 — R/W: writes are allowed through this descriptor.
    pub writable: bool,

    /// Bit 2 — U/S: user-mode accesses are allowed.
    pub user: bool,

    /// Bit 3 — PWT: write-through caching.
    pub write_through: bool,

    /// Bit 4 — PCD: caching disabled.
    pub cache_disable: bool,

    /// Bit 5 — A: set by hardware on access.
    pub accessed: bool,

    /// Bit 6 — D: set by hardware on write (leaf descriptors only).
    pub dirty: bool,

    /// Bit 7 — PS: this descriptor maps a huge page instead of referencing
    /// the next table level.
    pub huge: bool,

    /// Bit 8 — G: global translation (leaf descriptors only).
    pub global: bool,

    /// Bits 9–11 — Free for software use.
    #[bits(3, default = 0)]
    _available: u8,

    /// Bits 12–31 — Physical address bits 12..32.
    #[bits(20)]
    pub address_low: u32,
}

/// High 32-bit word of a page descriptor.
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct PageDescHigh {
    /// Bits 0–19 — Physical address bits 32..52.
    #[bits(20)]
    pub address_high: u32,

    /// Bits 20–30 — Reserved / software-available.
    #[bits(11, default = 0)]
    _available: u16,

    /// Bit 31 — XD: no-execute (bit 63 of the full descriptor).
    pub no_execute: bool,
}

/// One 64-bit page descriptor, valid at every level of the map.
///
/// A descriptor either references the next table level (`huge` clear), maps a
/// 2 MiB page directly (`huge` set), or is absent (all bits zero).
#[repr(C)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct PageDesc {
    low: PageDescLow,
    high: PageDescHigh,
}

const _: () = assert!(size_of::<PageDesc>() == 8, "page descriptor is 8 bytes");
const _: () = assert!(align_of::<PageDesc>() == 4, "descriptor words are 32-bit");

impl PageDesc {
    /// A non-present descriptor. All bits zero, including the address.
    #[inline]
    #[must_use]
    pub const fn absent() -> Self {
        Self {
            low: PageDescLow::new(),
            high: PageDescHigh::new(),
        }
    }

    /// A present, writable descriptor referencing the table at `address`.
    ///
    /// The address must be 4 KiB aligned; the low twelve bits have no storage
    /// in the descriptor.
    #[inline]
    #[must_use]
    pub const fn table_at(address: PhysicalAddress) -> Self {
        Self::at(address, false)
    }

    /// A present, writable huge-page descriptor mapping `address`.
    #[inline]
    #[must_use]
    pub const fn leaf_at(address: PhysicalAddress) -> Self {
        Self::at(address, true)
    }

    #[allow(clippy::cast_possible_truncation)]
    const fn at(address: PhysicalAddress, huge: bool) -> Self {
        let raw = address.as_u64();
        Self {
            low: PageDescLow::new()
                .with_present(true)
                .with_writable(true)
                .with_huge(huge)
                .with_address_low(((raw >> 12) & 0xF_FFFF) as u32),
            high: PageDescHigh::new().with_address_high(((raw >> 32) & 0xF_FFFF) as u32),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.low.present()
    }

    #[inline]
    #[must_use]
    pub const fn is_huge(self) -> bool {
        self.low.huge()
    }

    /// The physical address this descriptor references.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn address(self) -> PhysicalAddress {
        let low = (self.low.address_low() as u64) << 12;
        let high = (self.high.address_high() as u64) << 32;
        PhysicalAddress::new(high | low)
    }
}

impl core::fmt::Debug for PageDesc {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if !self.is_present() {
            return f.write_str("PageDesc(absent)");
        }
        f.debug_struct("PageDesc")
            .field("address", &self.address())
            .field("huge", &self.is_huge())
            .field("writable", &self.low.writable())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_is_all_zero() {
        let desc = PageDesc::absent();
        assert_eq!(desc.low.into_bits(), 0);
        assert_eq!(desc.high.into_bits(), 0);
        assert!(!desc.is_present());
    }

    #[test]
    fn leaf_round_trips_a_wide_address() {
        let addr = PhysicalAddress::new(0x0000_000F_FFE0_0000);
        let desc = PageDesc::leaf_at(addr);
        assert!(desc.is_present());
        assert!(desc.is_huge());
        assert_eq!(desc.address(), addr);
    }

    #[test]
    fn table_link_is_not_huge() {
        let desc = PageDesc::table_at(PhysicalAddress::new(0x1000));
        assert!(desc.is_present());
        assert!(!desc.is_huge());
        assert_eq!(desc.address().as_u64(), 0x1000);
    }

    #[test]
    fn huge_flag_is_bit_7() {
        let desc = PageDesc::leaf_at(PhysicalAddress::zero());
        assert_eq!(desc.low.into_bits() & (1 << 7), 1 << 7);
    }
}
