//! Macro-generated fault entry stubs.
//!
//! One naked function per defined vector. Hardware pushes the interrupt
//! frame (and, for some vectors, an error code); the stub makes the stack
//! match [`super::InterruptFrame`] and calls the shared entry with the frame
//! pointer and its own vector number. Vectors without a hardware error code
//! push a dummy zero first so both stub shapes produce the same frame.
//!
//! Stack math: the hardware frame plus an error code leaves `rsp` 16-byte
//! aligned; 14 register pushes keep it that way, and the `call` then gives
//! the entry the alignment the System V ABI expects.

use super::fault_entry;

/// Shape of a fault entry stub, as stored in the IDT.
pub type Isr = extern "C" fn();

macro_rules! fault_stub {
    ($name:ident, $vector:expr, error_code) => {
        #[unsafe(naked)]
        extern "C" fn $name() {
            core::arch::naked_asm!(
                // error code already pushed by hardware
                "push r15",
                "push r14",
                "push r13",
                "push r12",
                "push r11",
                "push r10",
                "push r9",
                "push r8",
                "push rdi",
                "push rsi",
                "push rdx",
                "push rcx",
                "push rbx",
                "push rax",
                "mov rdi, rsp",
                "mov esi, {vector}",
                "call {entry}",
                "1: hlt",
                "jmp 1b",
                vector = const $vector,
                entry = sym fault_entry,
            );
        }
    };
    ($name:ident, $vector:expr, no_error_code) => {
        #[unsafe(naked)]
        extern "C" fn $name() {
            core::arch::naked_asm!(
                // dummy error code keeps the frame layout uniform
                "push 0",
                "push r15",
                "push r14",
                "push r13",
                "push r12",
                "push r11",
                "push r10",
                "push r9",
                "push r8",
                "push rdi",
                "push rsi",
                "push rdx",
                "push rcx",
                "push rbx",
                "push rax",
                "mov rdi, rsp",
                "mov esi, {vector}",
                "call {entry}",
                "1: hlt",
                "jmp 1b",
                vector = const $vector,
                entry = sym fault_entry,
            );
        }
    };
}

fault_stub!(isr_de, 0, no_error_code);
fault_stub!(isr_nmi, 2, no_error_code);
fault_stub!(isr_bp, 3, no_error_code);
fault_stub!(isr_of, 4, no_error_code);
fault_stub!(isr_br, 5, no_error_code);
fault_stub!(isr_ud, 6, no_error_code);
fault_stub!(isr_nm, 7, no_error_code);
fault_stub!(isr_df, 8, error_code);
fault_stub!(isr_ts, 10, error_code);
fault_stub!(isr_np, 11, error_code);
fault_stub!(isr_ss, 12, error_code);
fault_stub!(isr_gp, 13, error_code);
fault_stub!(isr_pf, 14, error_code);
fault_stub!(isr_mf, 16, no_error_code);
fault_stub!(isr_ac, 17, error_code);
fault_stub!(isr_mc, 18, no_error_code);
fault_stub!(isr_xm, 19, no_error_code);

/// Vector → stub mapping consumed by [`crate::idt::Idt::build`]. Rows match
/// [`super::vectors::FAULT_VECTORS`].
pub(crate) const DEFAULT_STUBS: [(u8, Isr); 17] = [
    (0, isr_de),
    (2, isr_nmi),
    (3, isr_bp),
    (4, isr_of),
    (5, isr_br),
    (6, isr_ud),
    (7, isr_nm),
    (8, isr_df),
    (10, isr_ts),
    (11, isr_np),
    (12, isr_ss),
    (13, isr_gp),
    (14, isr_pf),
    (16, isr_mf),
    (17, isr_ac),
    (18, isr_mc),
    (19, isr_xm),
];
