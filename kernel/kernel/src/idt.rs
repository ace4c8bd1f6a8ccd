//! # Interrupt Descriptor Table
//!
//! 256 gate descriptors, one per vector. This core populates exactly the
//! defined fault vectors (see [`crate::interrupts::vectors`]) with interrupt
//! gates that run on IST stack 1 in the kernel code segment; every other
//! vector stays absent until someone installs a handler through [`set_isr`].
//!
//! `get_isr`/`set_isr` are the only runtime-mutable surface this core hands
//! to later subsystems. A vector is either **absent** (all-zero gate) or
//! **installed**; clearing it again goes back to the all-zero gate, never to
//! a half-written one.

use crate::gdt::{TablePtr, KERNEL_CS};
use bitfield_struct::bitfield;
use core::arch::asm;
use kernel_addresses::VirtualAddress;

/// Gates in the table, one per vector.
pub const IDT_VECTORS: usize = 256;

/// IST index every fault gate uses. Slot 0 of the task segment.
pub const FAULT_IST: u8 = 1;

/// Gate type nibble of an interrupt gate (masks IF on entry).
const TYPE_INTERRUPT_GATE: u8 = 0xE;

/// Bytes 4–5 of a gate descriptor: IST index plus type/attribute byte.
#[bitfield(u16)]
#[derive(Eq, PartialEq)]
pub struct GateAttr {
    /// Bits 0–2 — IST index; 0 disables the stack switch.
    #[bits(3)]
    pub ist: u8,

    /// Bits 3–7 — Reserved (must be 0).
    #[bits(5, default = 0)]
    _zero: u8,

    /// Bits 8–11 — Gate type; 0xE interrupt gate, 0xF trap gate.
    #[bits(4)]
    pub gate_type: u8,

    /// Bit 12 — S: must be 0 for gates.
    #[bits(1, default = false)]
    _system: bool,

    /// Bits 13–14 — DPL required to reach this gate with `int n`.
    #[bits(2)]
    pub dpl: u8,

    /// Bit 15 — P: present.
    pub present: bool,
}

/// One 16-byte gate descriptor, with the 64-bit handler address split across
/// its three offset fields.
#[repr(C)]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct GateDesc {
    offset_low: u16,
    selector: u16,
    attr: GateAttr,
    offset_mid: u16,
    offset_high: u32,
    _reserved: u32,
}

const _: () = assert!(size_of::<GateDesc>() == 16);

impl GateDesc {
    /// The all-zero, non-present gate.
    #[inline]
    #[must_use]
    pub const fn absent() -> Self {
        Self {
            offset_low: 0,
            selector: 0,
            attr: GateAttr::new(),
            offset_mid: 0,
            offset_high: 0,
            _reserved: 0,
        }
    }

    /// A present interrupt gate to `handler` through `selector`, switching
    /// to IST stack `ist`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn interrupt_gate(handler: VirtualAddress, selector: u16, ist: u8) -> Self {
        let raw = handler.as_u64();
        Self {
            offset_low: (raw & 0xFFFF) as u16,
            selector,
            attr: GateAttr::new()
                .with_ist(ist)
                .with_gate_type(TYPE_INTERRUPT_GATE)
                .with_dpl(0)
                .with_present(true),
            offset_mid: ((raw >> 16) & 0xFFFF) as u16,
            offset_high: (raw >> 32) as u32,
            _reserved: 0,
        }
    }

    /// Reassembles the handler address from the three offset fields.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn handler(self) -> VirtualAddress {
        let raw = (self.offset_low as u64)
            | ((self.offset_mid as u64) << 16)
            | ((self.offset_high as u64) << 32);
        VirtualAddress::new(raw)
    }

    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.attr.present()
    }

    /// The attribute word, for inspection.
    #[inline]
    #[must_use]
    pub const fn attr(self) -> GateAttr {
        self.attr
    }

    /// The target code segment selector.
    #[inline]
    #[must_use]
    pub const fn selector(self) -> u16 {
        self.selector
    }
}

/// The 256-gate table. 16-byte aligned for the `lidt` conventions.
#[repr(C, align(16))]
pub struct Idt {
    gates: [GateDesc; IDT_VECTORS],
}

const _: () = assert!(align_of::<Idt>() == 16);

impl Idt {
    /// A table with every gate absent.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            gates: [GateDesc::absent(); IDT_VECTORS],
        }
    }

    /// Installs the default terminal handler for every defined fault vector.
    ///
    /// Reserved vectors and the external-interrupt range stay absent; later
    /// subsystems install those through [`Idt::set_isr`].
    pub fn build(&mut self) {
        for (vector, stub) in crate::interrupts::stubs::DEFAULT_STUBS {
            self.set_isr(vector, VirtualAddress::from_ptr(stub as *const u8));
        }
    }

    /// Writes vector `vector`'s gate.
    ///
    /// A non-zero `handler` installs a present ring-0 interrupt gate through
    /// [`KERNEL_CS`] on IST stack [`FAULT_IST`]. A zero `handler` clears the
    /// gate back to all-zero absent, leaving no stale address behind.
    pub const fn set_isr(&mut self, vector: u8, handler: VirtualAddress) {
        self.gates[vector as usize] = if handler.is_zero() {
            GateDesc::absent()
        } else {
            GateDesc::interrupt_gate(handler, KERNEL_CS, FAULT_IST)
        };
    }

    /// The handler address of vector `vector`; zero when the gate is absent.
    #[must_use]
    pub const fn get_isr(&self, vector: u8) -> VirtualAddress {
        self.gates[vector as usize].handler()
    }

    /// The full gate, for inspection.
    #[must_use]
    pub const fn gate(&self, vector: u8) -> GateDesc {
        self.gates[vector as usize]
    }
}

impl Default for Idt {
    fn default() -> Self {
        Self::new()
    }
}

/// The system-wide IDT, shared by all CPUs.
static mut IDT: Idt = Idt::new();

/// Mutable access to the shared table.
///
/// # Safety
///
/// Writes must be serialized against interrupt delivery and against `get`
/// accesses on other CPUs; this core provides no such serialization. During
/// bring-up only the bootstrap processor may call this.
pub unsafe fn idt_mut() -> &'static mut Idt {
    unsafe { &mut *(&raw mut IDT) }
}

/// Reads vector `vector`'s handler address from the shared table.
///
/// # Safety
///
/// Must be externally serialized against concurrent [`set_isr`] calls.
#[must_use]
pub unsafe fn get_isr(vector: u8) -> VirtualAddress {
    unsafe { (*(&raw const IDT)).get_isr(vector) }
}

/// Writes vector `vector`'s gate in the shared table; see [`Idt::set_isr`].
///
/// # Safety
///
/// Must be externally serialized against interrupt delivery and against
/// readers on other CPUs.
pub unsafe fn set_isr(vector: u8, handler: VirtualAddress) {
    unsafe { idt_mut().set_isr(vector, handler) }
}

/// Loads the shared table into IDTR.
///
/// # Safety
///
/// Must run at ring 0, after the bootstrap processor finished building the
/// table.
#[allow(clippy::cast_possible_truncation)]
pub unsafe fn load_idt() {
    let ptr = TablePtr {
        limit: (size_of::<Idt>() - 1) as u16,
        base: VirtualAddress::from_ptr(&raw const IDT).as_u64(),
    };
    unsafe {
        asm!("lidt [{}]", in(reg) &raw const ptr, options(nostack, preserves_flags, readonly));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_round_trips_for_every_vector() {
        let mut idt = Idt::new();
        for vector in 0..=255u8 {
            let handler = VirtualAddress::new(0x1122_3344_5566_7788 ^ u64::from(vector));
            idt.set_isr(vector, handler);
            assert_eq!(idt.get_isr(vector), handler);
            let gate = idt.gate(vector);
            assert!(gate.is_present());
            assert_eq!(gate.selector(), KERNEL_CS);
            assert_eq!(gate.attr().ist(), FAULT_IST);
            assert_eq!(gate.attr().gate_type(), TYPE_INTERRUPT_GATE);
        }
    }

    #[test]
    fn offset_fields_split_correctly() {
        let gate = GateDesc::interrupt_gate(
            VirtualAddress::new(0x1122_3344_5566_7788),
            KERNEL_CS,
            FAULT_IST,
        );
        assert_eq!(gate.offset_low, 0x7788);
        assert_eq!(gate.offset_mid, 0x5566);
        assert_eq!(gate.offset_high, 0x1122_3344);
    }

    #[test]
    fn clearing_leaves_an_all_zero_gate() {
        let mut idt = Idt::new();
        idt.set_isr(13, VirtualAddress::new(0xDEAD_BEEF));
        idt.set_isr(13, VirtualAddress::zero());
        assert_eq!(idt.gate(13), GateDesc::absent());
        assert!(idt.get_isr(13).is_zero());
    }

    #[test]
    fn new_table_is_fully_absent() {
        let idt = Idt::new();
        for vector in 0..=255u8 {
            assert!(!idt.gate(vector).is_present());
            assert!(idt.get_isr(vector).is_zero());
        }
    }

    #[test]
    fn present_bit_is_attr_bit_15() {
        let attr = GateAttr::new().with_present(true);
        assert_eq!(attr.into_bits(), 1 << 15);
    }
}
