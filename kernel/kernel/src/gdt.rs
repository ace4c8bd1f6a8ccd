//! # Global Descriptor Table
//!
//! Layout, fixed for the lifetime of the system:
//!
//! Index | Selector | Meaning
//! ------|----------|--------
//! 0     | 0x00     | Null
//! 1     | 0x08     | 64-bit ring-0 code ([`KERNEL_CS`])
//! 2     | 0x10     | 32-bit ring-0 data ([`BOOT_DS`])
//! 3+    | 0x18 + cpu·16 | One 16-byte task-segment descriptor per CPU
//!
//! The first three slots exist from the very first `lgdt` in 32-bit mode and
//! are all the mode transition needs ([`Gdt::boot_limit`]). The task-segment
//! descriptors are filled in later by the interrupt subsystem, after which
//! every CPU reloads with the full [`Gdt::limit`] and points its task
//! register at [`tss_selector`]`(cpu)`.

pub mod descriptors;
pub mod tss_desc;

use crate::config::CPUS_MAX;
use core::arch::asm;
use kernel_addresses::VirtualAddress;
use self::descriptors::SegmentDesc;
use self::tss_desc::TssDesc;

/// Selector of the 64-bit kernel code segment.
pub const KERNEL_CS: u16 = 0x08;

/// Selector of the transient 32-bit data segment.
pub const BOOT_DS: u16 = 0x10;

/// Selector of `cpu`'s task-segment descriptor.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn tss_selector(cpu: usize) -> u16 {
    (3 * size_of::<SegmentDesc>() + cpu * size_of::<TssDesc>()) as u16
}

const _: () = {
    assert!(KERNEL_CS == 0x08);
    assert!(BOOT_DS == 0x10);
    assert!(tss_selector(0) == 0x18);
    assert!(tss_selector(1) == 0x28);
};

/// The descriptor table itself.
#[repr(C)]
pub struct Gdt {
    null: SegmentDesc,
    code64: SegmentDesc,
    data32: SegmentDesc,
    tss: [TssDesc; CPUS_MAX],
}

const _: () = assert!(size_of::<Gdt>() == 3 * 8 + CPUS_MAX * 16);

impl Gdt {
    /// The boot-time table: code and data present, every task-segment slot
    /// still absent.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            null: SegmentDesc::null(),
            code64: SegmentDesc::code64(),
            data32: SegmentDesc::data32(),
            tss: [TssDesc::absent(); CPUS_MAX],
        }
    }

    /// Installs `cpu`'s task-segment descriptor.
    pub const fn set_tss_desc(&mut self, cpu: usize, desc: TssDesc) {
        self.tss[cpu] = desc;
    }

    /// `cpu`'s task-segment descriptor as currently installed.
    #[must_use]
    pub const fn tss_desc(&self, cpu: usize) -> TssDesc {
        self.tss[cpu]
    }

    /// `lgdt` limit covering only the three boot-time slots.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn boot_limit() -> u16 {
        (3 * size_of::<SegmentDesc>() - 1) as u16
    }

    /// `lgdt` limit covering the boot slots plus `cpu_count` task-segment
    /// descriptors.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn limit(cpu_count: usize) -> u16 {
        (3 * size_of::<SegmentDesc>() + cpu_count * size_of::<TssDesc>() - 1) as u16
    }
}

impl Default for Gdt {
    fn default() -> Self {
        Self::new()
    }
}

/// Operand of `lgdt`/`lidt`: 16-bit limit plus 64-bit base.
#[repr(C, packed)]
pub struct TablePtr {
    pub limit: u16,
    pub base: u64,
}

/// The system-wide descriptor table. Written by the bootstrap processor
/// (boot slots at build time, task-segment slots during interrupt init),
/// read-only for everyone afterwards. The boot entry stub loads it by
/// symbol for the very first `lgdt`.
pub(crate) static mut GDT: Gdt = Gdt::new();

/// Mutable access to the shared table.
///
/// # Safety
///
/// Only the bootstrap processor may call this, and only before application
/// processors load the table. There is no interior synchronization.
pub unsafe fn gdt_mut() -> &'static mut Gdt {
    unsafe { &mut *(&raw mut GDT) }
}

/// Loads the shared table into GDTR with the given `limit`.
///
/// # Safety
///
/// Must run at ring 0. The slots inside `limit` must describe valid
/// segments; the currently loaded selectors must remain valid under the new
/// table.
pub unsafe fn load_gdt(limit: u16) {
    let ptr = TablePtr {
        limit,
        base: VirtualAddress::from_ptr(&raw const GDT).as_u64(),
    };
    unsafe {
        asm!("lgdt [{}]", in(reg) &raw const ptr, options(nostack, preserves_flags, readonly));
    }
}

/// Loads the task register with `selector`.
///
/// # Safety
///
/// `selector` must reference a present, available task-segment descriptor
/// inside the currently loaded GDT limit. Each selector may be loaded only
/// once; `ltr` marks the descriptor busy.
pub unsafe fn load_task_register(selector: u16) {
    unsafe {
        asm!("ltr {0:x}", in(reg) selector, options(nostack, preserves_flags));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_limit_covers_three_slots() {
        assert_eq!(Gdt::boot_limit(), 23);
    }

    #[test]
    fn full_limit_grows_by_sixteen_per_cpu() {
        assert_eq!(Gdt::limit(1), 3 * 8 + 16 - 1);
        assert_eq!(Gdt::limit(4), 3 * 8 + 4 * 16 - 1);
    }

    #[test]
    fn tss_selectors_step_by_sixteen() {
        for cpu in 0..CPUS_MAX {
            assert_eq!(tss_selector(cpu), u16::try_from(0x18 + 16 * cpu).unwrap());
        }
    }

    #[test]
    fn new_table_has_boot_segments_only() {
        let gdt = Gdt::new();
        assert_eq!(gdt.null, SegmentDesc::null());
        assert_eq!(gdt.code64, SegmentDesc::code64());
        assert_eq!(gdt.data32, SegmentDesc::data32());
        for cpu in 0..CPUS_MAX {
            assert!(!gdt.tss_desc(cpu).low.present());
        }
    }
}
