//! # Typed x86-64 Control Registers
//!
//! Bitfield models of the registers the long-mode transition programs:
//! [`Cr0`](cr0::Cr0), [`Cr3`](cr3::Cr3), [`Cr4`](cr4::Cr4) and the
//! [`Efer`](efer::Efer) MSR. Reserved spans are private fields: freshly
//! constructed values leave them zero, and a load-modify-store cycle passes
//! them through untouched, so the kernel cannot corrupt bits it does not
//! understand.
//!
//! The inline-asm load/store implementations live behind the `asm` feature;
//! with it disabled the crate is a pure data-model library.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod cr0;
pub mod cr3;
pub mod cr4;
pub mod efer;

/// Read a privileged register.
pub trait LoadRegisterUnsafe {
    /// # Safety
    /// The access is privileged; the caller must run in Ring 0.
    unsafe fn load_unsafe() -> Self;
}

/// Write a privileged register.
pub trait StoreRegisterUnsafe {
    /// # Safety
    /// The access is privileged and may change the execution environment
    /// (paging mode, operating mode). The caller must run in Ring 0 and must
    /// uphold any register-specific ordering requirement.
    unsafe fn store_unsafe(self);
}
