//! Boot-time allocator seam.

use core::ptr::NonNull;

/// The allocation interface the descriptor-table builder consumes.
///
/// Per-CPU interrupt stacks and task segments are carved out of whatever
/// early allocator the surrounding kernel runs. The memory must be
/// physically addressable (the tables are handed to hardware) and must stay
/// allocated forever; nothing in this core frees.
///
/// Returning `None` is fatal to boot; the caller logs and halts.
pub trait BootAlloc {
    /// Allocates `size` bytes with at least `align` alignment.
    fn allocate(&mut self, size: usize, align: usize) -> Option<NonNull<u8>>;
}
