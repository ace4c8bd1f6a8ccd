//! # Interrupt Dispatch Framework and Per-CPU Bring-Up
//!
//! The bootstrap processor builds the shared tables exactly once: per-CPU
//! fault stacks and task segments from the boot allocator, task-segment
//! descriptors into the GDT, default gates into the IDT. Every CPU —
//! bootstrap included — then loads the full GDT and IDT pointers and its own
//! task register.
//!
//! Faults reaching a default gate end in [`fault_entry`]: the stub-captured
//! [`InterruptFrame`] is rendered through the logging facade and the CPU
//! halts. This core makes failures observable, not survivable.
//!
//! Ordering obligation (not enforced here): application processors must not
//! run [`init_interrupts`] until the bootstrap processor's call has returned
//! and its writes are visible to them.

pub mod frame;
pub(crate) mod stubs;
pub mod vectors;

pub use frame::{write_fault_report, FaultReport, InterruptFrame};
pub use vectors::{has_error_code, is_reserved, mnemonic, FaultVector, FAULT_VECTORS};

use crate::boot_alloc::BootAlloc;
use crate::config::ISR_STACK_SIZE;
use crate::cpu::{halt, CpuTopology};
use crate::gdt::{self, tss_desc::TssDesc, Gdt};
use crate::idt;
use crate::tss::TaskSegment;
use core::ptr::NonNull;
use kernel_addresses::VirtualAddress;

/// Boot-time table construction failure. Always fatal; the caller logs and
/// halts.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum BringUpError {
    /// The allocator could not provide the per-CPU fault stacks.
    #[error("failed to allocate interrupt stacks")]
    StackAlloc,

    /// The allocator could not provide the task-segment array.
    #[error("failed to allocate task segments")]
    TaskSegmentAlloc,
}

/// The per-CPU allocations behind the extended GDT: one fault stack and one
/// task segment per CPU, each owned exclusively by its CPU once installed.
#[derive(Debug)]
pub struct CpuTables {
    stacks: NonNull<u8>,
    task_segments: NonNull<TaskSegment>,
    cpu_count: usize,
}

impl CpuTables {
    /// Obtains the fault-stack blob and the task-segment array from `alloc`.
    ///
    /// The memory is never freed; it backs hardware state for the lifetime
    /// of the system.
    ///
    /// # Errors
    ///
    /// The matching [`BringUpError`] variant when `alloc` is exhausted.
    pub fn allocate<A: BootAlloc>(alloc: &mut A, cpu_count: usize) -> Result<Self, BringUpError> {
        let stacks = alloc
            .allocate(cpu_count * ISR_STACK_SIZE, 16)
            .ok_or(BringUpError::StackAlloc)?;
        let task_segments = alloc
            .allocate(cpu_count * size_of::<TaskSegment>(), 8)
            .ok_or(BringUpError::TaskSegmentAlloc)?
            .cast::<TaskSegment>();
        Ok(Self {
            stacks,
            task_segments,
            cpu_count,
        })
    }

    /// Number of CPUs these tables were sized for.
    #[must_use]
    pub const fn cpu_count(&self) -> usize {
        self.cpu_count
    }

    /// The initial stack pointer of `cpu`'s fault stack: one past the end of
    /// its slot, since stacks grow downward.
    #[must_use]
    pub fn isr_stack_top(&self, cpu: usize) -> VirtualAddress {
        debug_assert!(cpu < self.cpu_count);
        VirtualAddress::from_nonnull(self.stacks) + ((cpu + 1) * ISR_STACK_SIZE) as u64
    }

    /// Zeroes every task segment, points each IST slot 0 at its CPU's fault
    /// stack, and emits the task-segment descriptors into `gdt`.
    ///
    /// # Safety
    ///
    /// The allocations behind `self` must be live and unaliased. Must not
    /// run after any CPU has loaded its task register from `gdt`.
    #[allow(clippy::cast_possible_truncation)]
    pub unsafe fn install(&mut self, gdt: &mut Gdt) {
        for cpu in 0..self.cpu_count {
            let tss = unsafe { &mut *self.task_segments.as_ptr().add(cpu) };
            *tss = TaskSegment::new();
            tss.set_ist0(self.isr_stack_top(cpu));

            let base = VirtualAddress::from_ptr(core::ptr::from_ref(tss));
            gdt.set_tss_desc(cpu, TssDesc::at(base, (size_of::<TaskSegment>() - 1) as u32));
        }
    }
}

/// Shared entry behind every default fault gate. Renders the report through
/// the logging facade and halts the CPU, unconditionally.
pub(crate) extern "C" fn fault_entry(frame: &InterruptFrame, vector: u32) -> ! {
    #[allow(clippy::cast_possible_truncation)]
    let vector = vector as u8;
    log::error!("{}", FaultReport::new(vector, frame));
    halt()
}

/// The per-CPU bring-up protocol.
///
/// The bootstrap processor builds the shared tables (fatal on allocation
/// failure: log, halt); every CPU then loads the full GDT and IDT and its
/// own task register. Idempotent per CPU except for the shared build step.
///
/// # Safety
///
/// Must run at ring 0 after the mode transition. The caller must guarantee
/// that the bootstrap processor's call completes, with its writes visible,
/// before any application processor enters; nothing in here enforces that
/// ordering.
pub unsafe fn init_interrupts<A, T>(alloc: &mut A, topology: &T)
where
    A: BootAlloc,
    T: CpuTopology,
{
    debug_assert!(
        unsafe { crate::cpu::long_mode_active() },
        "bring-up runs after the long-mode switch"
    );

    let cpu = topology.current_cpu();
    if cpu == topology.bsp_cpu() {
        match CpuTables::allocate(alloc, topology.cpu_count()) {
            Ok(mut tables) => unsafe { tables.install(gdt::gdt_mut()) },
            Err(err) => {
                log::error!("interrupt bring-up failed: {err}");
                halt();
            }
        }
        unsafe { idt::idt_mut() }.build();
    }

    unsafe { load_gdt_idt_tr(topology.cpu_count(), cpu) };
    log::debug!("interrupts ready (CPU: {cpu})");
}

/// Loads the full-limit GDT, the IDT, and `cpu`'s task register.
unsafe fn load_gdt_idt_tr(cpu_count: usize, cpu: usize) {
    unsafe {
        gdt::load_gdt(Gdt::limit(cpu_count));
        idt::load_idt();
        gdt::load_task_register(gdt::tss_selector(cpu));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idt::Idt;

    /// Bump allocator over an owned buffer, with an optional failure switch.
    struct TestAlloc {
        buf: Vec<u8>,
        next: usize,
        allow: usize,
    }

    impl TestAlloc {
        fn new(capacity: usize) -> Self {
            Self {
                buf: vec![0; capacity],
                next: 0,
                allow: usize::MAX,
            }
        }

        fn failing_after(capacity: usize, allow: usize) -> Self {
            Self {
                allow,
                ..Self::new(capacity)
            }
        }
    }

    impl BootAlloc for TestAlloc {
        fn allocate(&mut self, size: usize, align: usize) -> Option<NonNull<u8>> {
            if self.allow == 0 {
                return None;
            }
            self.allow -= 1;
            let start = self.next.next_multiple_of(align);
            if start + size > self.buf.len() {
                return None;
            }
            self.next = start + size;
            NonNull::new(unsafe { self.buf.as_mut_ptr().add(start) })
        }
    }

    const CPUS: usize = 4;

    fn tables(alloc: &mut TestAlloc) -> CpuTables {
        CpuTables::allocate(alloc, CPUS).unwrap()
    }

    #[test]
    fn ist0_is_one_past_the_end_of_each_stack() {
        let mut alloc = TestAlloc::new(CPUS * ISR_STACK_SIZE + CPUS * 128);
        let mut tables = tables(&mut alloc);
        let mut gdt = Gdt::new();
        unsafe { tables.install(&mut gdt) };

        let base = VirtualAddress::from_nonnull(tables.stacks).as_u64();
        for cpu in 0..CPUS {
            let tss = unsafe { &*tables.task_segments.as_ptr().add(cpu) };
            let expected = base + ((cpu as u64) + 1) * ISR_STACK_SIZE as u64;
            assert_eq!(tss.ist0().as_u64(), expected);
        }
    }

    #[test]
    fn stack_slots_are_disjoint() {
        let mut alloc = TestAlloc::new(CPUS * ISR_STACK_SIZE + CPUS * 128);
        let tables = tables(&mut alloc);
        for cpu in 1..CPUS {
            let prev_top = tables.isr_stack_top(cpu - 1).as_u64();
            let top = tables.isr_stack_top(cpu).as_u64();
            // Slot `cpu` starts exactly where slot `cpu - 1` ends.
            assert_eq!(top - prev_top, ISR_STACK_SIZE as u64);
        }
    }

    #[test]
    fn install_emits_present_descriptors_at_the_right_bases() {
        let mut alloc = TestAlloc::new(CPUS * ISR_STACK_SIZE + CPUS * 128);
        let mut tables = tables(&mut alloc);
        let mut gdt = Gdt::new();
        unsafe { tables.install(&mut gdt) };

        for cpu in 0..CPUS {
            let desc = gdt.tss_desc(cpu);
            assert!(desc.low.present());
            assert_eq!(desc.low.limit_low(), 103);
            let expected = VirtualAddress::from_ptr(unsafe {
                tables.task_segments.as_ptr().add(cpu).cast_const()
            });
            assert_eq!(desc.base(), expected);
        }
    }

    #[test]
    fn allocation_failures_are_reported_in_order() {
        let mut none = TestAlloc::failing_after(1 << 20, 0);
        assert_eq!(
            CpuTables::allocate(&mut none, CPUS).unwrap_err(),
            BringUpError::StackAlloc
        );

        let mut one = TestAlloc::failing_after(1 << 20, 1);
        assert_eq!(
            CpuTables::allocate(&mut one, CPUS).unwrap_err(),
            BringUpError::TaskSegmentAlloc
        );
    }

    #[test]
    fn built_idt_covers_exactly_the_defined_vectors() {
        let mut idt = Idt::new();
        idt.build();
        for vector in 0..=255u8 {
            let gate = idt.gate(vector);
            if is_reserved(vector) {
                assert!(!gate.is_present(), "vector {vector} should be absent");
                assert!(idt.get_isr(vector).is_zero());
            } else {
                assert!(gate.is_present(), "vector {vector} should be present");
                assert!(!idt.get_isr(vector).is_zero());
                assert_eq!(gate.attr().ist(), crate::idt::FAULT_IST);
            }
        }
    }
}
