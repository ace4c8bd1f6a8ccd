//! # Protected-Mode Entry and the Long-Mode Switch
//!
//! The multiboot loader drops the bootstrap processor here in 32-bit
//! protected mode, paging off, `EBX` holding the multiboot info pointer.
//! Everything up to the far transfer executes while the CPU still decodes
//! 32-bit instructions, so the whole pre-switch phase — boot stack, saving
//! `EBX`, masking the legacy PICs, enabling SSE, filling the boot page map,
//! and the register program — lives in one `.code32` [`global_asm!`] block.
//! Compiled Rust only runs from the 64-bit `kstart` entry onwards.
//!
//! The page-map fill writes the exact layout `kernel_paging` models (root at
//! descriptor 0, one intermediate table, leaf tables front to back, leaf slot
//! = global page index), and the register program is the sequence the
//! `kernel_registers` types describe. Both crates are the hosted-testable
//! model of what this block does; the layout contract is pinned by the tests
//! in [`crate::config`].
//!
//! The register program is strictly ordered, by architecture, not by choice:
//! PAE before long-mode enable, the page-map root loaded before paging,
//! long-mode enable before paging. Any reordering resets the machine with
//! nothing to observe. The final far "jump" (push selector, push target,
//! `retf`) is mandatory — the CPU latches the 64-bit execution mode of the
//! code segment only on a segment-changing transfer.
//!
//! Nothing in this module returns. The 64-bit side continues at the external
//! `kstart` symbol.

use crate::config::{ADDR_SPACE_SIZE, BOOT_STACK_SIZE, KERNEL_BASE, PAGE_MAP_LEN};
use crate::gdt::{Gdt, KERNEL_CS};
use core::arch::global_asm;
use kernel_paging::{PageDesc, HUGE_PAGE_SIZE, TABLE_DESCS};
use kernel_registers::efer::IA32_EFER;

unsafe extern "C" {
    /// Linker-script symbol whose *address* is the kernel image size in
    /// bytes.
    static __kernel_size: u8;

    /// 64-bit entry point, target of the mode-switch far transfer.
    fn kstart() -> !;
}

/// Multiboot info pointer, saved by the entry stub before `EBX` is
/// clobbered.
static mut MULTIBOOT_INFO: u32 = 0;

/// 16-byte aligned stack storage. Only the entry stub touches it.
#[repr(align(16))]
#[allow(dead_code)]
struct Aligned<const N: usize>([u8; N]);

/// Bootstrap-processor boot stack. Application processors never run this
/// module.
static mut BOOT_STACK: Aligned<BOOT_STACK_SIZE> = Aligned([0; BOOT_STACK_SIZE]);

/// Page-aligned arena for the boot page map. All-zero, so it lands in
/// `.bss` and every descriptor starts out absent; the entry stub fills it.
#[repr(align(4096))]
#[allow(dead_code)]
struct PageMapBuffer([PageDesc; PAGE_MAP_LEN]);

/// CR3 points here for the lifetime of the system.
static mut PAGE_MAP: PageMapBuffer = PageMapBuffer([PageDesc::absent(); PAGE_MAP_LEN]);

/// Bytes per 512-descriptor paging-structure table.
const TABLE_BYTES: usize = TABLE_DESCS * 8;

// Multiboot v1 header (magic, flags, checksum); flag bit 1 requests the
// memory map from the loader.
global_asm!(
    r"
    .section .mbh
    .long   0x1BADB002
    .long   0x00000002
    .long   -(0x1BADB002 + 0x00000002)
    "
);

global_asm!(
    r"
    .text
    .code32
    .global _bstart32
_bstart32:
    mov     esp, offset {stack}
    add     esp, {stack_size}
    mov     [{multiboot_info}], ebx

    // Mask every line of both legacy PICs; nothing may interrupt bring-up.
    mov     al, 0xFF
    out     0xA1, al
    out     0x21, al

    // Enable SSE before any compiled code runs.
    mov     eax, cr4
    or      eax, {osfxsr}
    mov     cr4, eax

    // Boot page map, step 1: root descriptor links the intermediate table
    // one table-stride into the buffer. High descriptor words stay zero;
    // the buffer is in .bss and every table address fits in 32 bits.
    mov     edi, offset {page_map}
    lea     eax, [edi + {table_bytes}]
    or      eax, 3
    mov     [edi], eax

    // Step 2: intermediate descriptors link the leaf tables front to back.
    xor     ecx, ecx
2:  mov     eax, ecx
    shl     eax, {table_shift}
    lea     eax, [eax + edi + {two_tables}]
    or      eax, 3
    mov     [edi + {table_bytes} + ecx*8], eax
    inc     ecx
    cmp     ecx, {leaf_tables}
    jb      2b

    // Step 3: identity-map the kernel image. Leaf slot = global page index;
    // low word is (page << 21) | present | writable | huge, high word the
    // address bits above 32. The last page comes from the linker-provided
    // image size.
    mov     edx, offset {kernel_size}
    lea     edx, [edx + {kernel_base} - 1]
    shr     edx, {page_shift}
    mov     ecx, {first_page}
3:  mov     eax, ecx
    shl     eax, {page_shift}
    or      eax, 0x83
    mov     [edi + {two_tables} + ecx*8], eax
    mov     eax, ecx
    shr     eax, {high_shift}
    mov     [edi + {two_tables} + ecx*8 + 4], eax
    inc     ecx
    cmp     ecx, edx
    jbe     3b

    // PAE first; long mode refuses to activate without it.
    mov     eax, cr4
    or      eax, {pae}
    mov     cr4, eax

    // Page-map root second, while paging is still off.
    mov     eax, edi
    mov     cr3, eax

    // Arm long mode third.
    mov     ecx, {ia32_efer}
    rdmsr
    or      eax, {lme}
    wrmsr

    // Paging last; this instruction activates long mode.
    mov     eax, cr0
    or      eax, {pg}
    mov     cr0, eax

    lgdt    [.Lboot_gdt_ptr]

    // Far transfer into the 64-bit code segment: push the selector and the
    // target, then retf pops both and latches the new CS.
    push    {kernel_cs}
    lea     eax, [{kstart}]
    push    eax
    retf

4:  hlt
    jmp     4b

    .p2align 3
.Lboot_gdt_ptr:
    .word   {boot_gdt_limit}
    .quad   {gdt}
    .code64
    ",
    stack = sym BOOT_STACK,
    stack_size = const BOOT_STACK_SIZE,
    multiboot_info = sym MULTIBOOT_INFO,
    osfxsr = const 1u32 << 9,
    page_map = sym PAGE_MAP,
    table_bytes = const TABLE_BYTES,
    two_tables = const 2 * TABLE_BYTES,
    table_shift = const 12,
    leaf_tables = const ADDR_SPACE_SIZE / HUGE_PAGE_SIZE / TABLE_DESCS as u64,
    kernel_size = sym __kernel_size,
    kernel_base = const KERNEL_BASE,
    page_shift = const 21,
    high_shift = const 32 - 21,
    first_page = const KERNEL_BASE / HUGE_PAGE_SIZE,
    pae = const 1u32 << 5,
    ia32_efer = const IA32_EFER,
    lme = const 1u32 << 8,
    pg = const 1u32 << 31,
    kernel_cs = const KERNEL_CS,
    boot_gdt_limit = const Gdt::boot_limit(),
    gdt = sym crate::gdt::GDT,
    kstart = sym kstart,
);

/// The multiboot info pointer the loader handed over.
#[must_use]
pub fn multiboot_info() -> u32 {
    unsafe { *(&raw const MULTIBOOT_INFO) }
}
