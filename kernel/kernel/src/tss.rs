//! 64-bit task segments.
//!
//! Long mode does no hardware task switching, but every CPU still needs a
//! task segment: it is where the processor finds the Interrupt Stack Table
//! when an IDT gate asks for a stack switch. This core populates exactly one
//! IST slot per CPU with the top of that CPU's dedicated fault stack, so
//! fault handlers always run on a known-good stack no matter how wrecked the
//! interrupted one is.

use kernel_addresses::VirtualAddress;

/// Number of Interrupt Stack Table slots in a task segment.
pub const IST_SLOTS: usize = 7;

/// The 104-byte x86-64 task segment, exactly as hardware reads it.
///
/// One per CPU, owned exclusively by that CPU. Written once at table-build
/// time, read by hardware on every fault delivery through an IST gate.
#[repr(C, packed)]
pub struct TaskSegment {
    _reserved0: u32,
    /// Privilege-change stacks (RSP0..RSP2); unused, this core never leaves
    /// ring 0.
    #[allow(dead_code)]
    rsp: [VirtualAddress; 3],
    _reserved1: u64,
    /// IST slot `n` backs IDT gates that request IST index `n + 1`.
    ist: [VirtualAddress; IST_SLOTS],
    _reserved2: u64,
    _reserved3: u16,
    /// Offset of the I/O permission bitmap. Placing it at the end of the
    /// segment means "no bitmap".
    #[allow(dead_code)]
    iopb_offset: u16,
}

const _: () = assert!(size_of::<TaskSegment>() == 104, "task segment is 104 bytes");

impl TaskSegment {
    /// An all-zero task segment with the I/O bitmap disabled.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new() -> Self {
        Self {
            _reserved0: 0,
            rsp: [VirtualAddress::zero(); 3],
            _reserved1: 0,
            ist: [VirtualAddress::zero(); IST_SLOTS],
            _reserved2: 0,
            _reserved3: 0,
            iopb_offset: size_of::<Self>() as u16,
        }
    }

    /// Points IST slot 0 (IDT gates say "IST 1") at `stack_top`.
    ///
    /// `stack_top` is the address one past the end of the stack area; the
    /// stack grows downward from there.
    pub const fn set_ist0(&mut self, stack_top: VirtualAddress) {
        self.ist[0] = stack_top;
    }

    /// The fault-stack top installed by [`set_ist0`](Self::set_ist0).
    #[must_use]
    pub const fn ist0(&self) -> VirtualAddress {
        self.ist[0]
    }
}

impl Default for TaskSegment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::offset_of;

    #[test]
    fn ist_slots_start_at_offset_36() {
        assert_eq!(offset_of!(TaskSegment, ist), 36);
    }

    #[test]
    fn iopb_disabled_by_default() {
        let tss = TaskSegment::new();
        let iopb = tss.iopb_offset;
        assert_eq!(iopb, 104);
    }

    #[test]
    fn ist0_round_trip() {
        let mut tss = TaskSegment::new();
        tss.set_ist0(VirtualAddress::new(0xFFFF_8000_0001_0000));
        assert_eq!(tss.ist0().as_u64(), 0xFFFF_8000_0001_0000);
    }
}
