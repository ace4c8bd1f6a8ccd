//! Stack-frame capture and the terminal fault report.

use super::vectors::{has_error_code, mnemonic};
use core::fmt;

/// The register snapshot a fault entry stub hands to the handler.
///
/// Layout is dictated by the stub: the push sequence saves `r15` down to
/// `rax`, so `rax` sits at the lowest address, followed by the error code
/// (hardware-pushed or the stub's dummy zero) and the hardware interrupt
/// frame. Read-only for handlers; never persisted.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct InterruptFrame {
    pub rax: u64,
    pub rbx: u64,
    pub rcx: u64,
    pub rdx: u64,
    pub rsi: u64,
    pub rdi: u64,
    pub r8: u64,
    pub r9: u64,
    pub r10: u64,
    pub r11: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    /// Meaningful only for error-code-bearing vectors.
    pub error_code: u64,
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

const _: () = assert!(size_of::<InterruptFrame>() == 20 * 8);

/// Writes the terminal fault report: mnemonic, error code where the vector
/// carries one, then the full register dump.
///
/// # Errors
///
/// Propagates the sink's [`fmt::Error`].
pub fn write_fault_report<W: fmt::Write>(
    out: &mut W,
    vector: u8,
    frame: &InterruptFrame,
) -> fmt::Result {
    writeln!(out)?;
    write!(out, "fault: #{}", mnemonic(vector).unwrap_or("??"))?;
    if has_error_code(vector) {
        write!(out, " (error_code: {:X})", frame.error_code)?;
    }
    writeln!(out)?;
    writeln!(out, "rax: {:X}", frame.rax)?;
    writeln!(out, "rbx: {:X}", frame.rbx)?;
    writeln!(out, "rcx: {:X}", frame.rcx)?;
    writeln!(out, "rdx: {:X}", frame.rdx)?;
    writeln!(out, "rsi: {:X}", frame.rsi)?;
    writeln!(out, "rdi: {:X}", frame.rdi)?;
    writeln!(out, "r8: {:X}", frame.r8)?;
    writeln!(out, "r9: {:X}", frame.r9)?;
    writeln!(out, "r10: {:X}", frame.r10)?;
    writeln!(out, "r11: {:X}", frame.r11)?;
    writeln!(out, "r12: {:X}", frame.r12)?;
    writeln!(out, "r13: {:X}", frame.r13)?;
    writeln!(out, "r14: {:X}", frame.r14)?;
    writeln!(out, "r15: {:X}", frame.r15)?;
    writeln!(out, "rip: {:X}", frame.rip)?;
    writeln!(out, "rsp: {:X}", frame.rsp)?;
    writeln!(out, "cs: {:X}", frame.cs)?;
    writeln!(out, "ss: {:X}", frame.ss)?;
    writeln!(out, "rflags: {:X}", frame.rflags)
}

/// [`fmt::Display`] adapter over [`write_fault_report`], so the report can go
/// straight through the logging facade.
pub struct FaultReport<'a> {
    vector: u8,
    frame: &'a InterruptFrame,
}

impl<'a> FaultReport<'a> {
    #[must_use]
    pub const fn new(vector: u8, frame: &'a InterruptFrame) -> Self {
        Self { vector, frame }
    }
}

impl fmt::Display for FaultReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fault_report(f, self.vector, self.frame)
    }
}
