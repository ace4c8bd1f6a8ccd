//! CPU topology oracle, mode sanity checks and the terminal halt.

use kernel_registers::efer::Efer;
use kernel_registers::LoadRegisterUnsafe;

/// Answers the three topology questions the bring-up protocol asks.
///
/// Implemented outside this core (ACPI/MP-table parsing, or a fixed answer on
/// single-CPU rigs). Pure queries; the protocol calls them repeatedly and
/// expects stable answers for the lifetime of the boot.
pub trait CpuTopology {
    /// Index of the CPU executing the call, in `0..cpu_count()`.
    fn current_cpu(&self) -> usize;

    /// Number of logical CPUs that will take part in bring-up.
    fn cpu_count(&self) -> usize;

    /// Index of the bootstrap processor.
    fn bsp_cpu(&self) -> usize;
}

/// Whether the calling CPU runs in long mode (`EFER.LMA`, set by hardware
/// when paging activates with long mode armed).
///
/// # Safety
///
/// Reads a privileged MSR; must run at ring 0.
#[must_use]
pub unsafe fn long_mode_active() -> bool {
    unsafe { Efer::load_unsafe() }.long_mode_active()
}

/// Stops the calling CPU permanently.
///
/// Every fatal path in this core ends here. The loop around `hlt` matters:
/// a non-maskable interrupt wakes the CPU out of the halt state, and the only
/// sane follow-up is to halt again.
pub fn halt() -> ! {
    loop {
        unsafe {
            core::arch::asm!("hlt", options(nomem, nostack, preserves_flags));
        }
    }
}
