//! # Early SMP Bring-Up Core
//!
//! Everything a freshly reset x86-64 machine needs between the 32-bit loader
//! handing over control and ordinary 64-bit kernel code running with working
//! fault reporting on every CPU:
//!
//! - [`boot`] — the 32-bit entry code and the one-shot protected→long mode
//!   transition on the bootstrap processor; the identity page map from
//!   `kernel_paging` and the typed control registers from
//!   `kernel_registers` are its hosted-testable model.
//! - [`gdt`] / [`tss`] — the global descriptor table (boot-time code+data,
//!   later one task-state segment per CPU) and the task segments carrying the
//!   per-CPU fault stacks.
//! - [`idt`] / [`interrupts`] — the 256-gate interrupt descriptor table, the
//!   per-vector entry stubs, and the terminal default fault handler.
//! - [`cpu`] / [`boot_alloc`] — the narrow collaborator traits this core
//!   consumes: a CPU topology oracle and a boot-time allocator.
//!
//! The bring-up contract lives in [`interrupts::init_interrupts`]: the
//! bootstrap processor builds the shared tables exactly once, then every CPU
//! (bootstrap included) loads the table pointers and its own task register.
//! Callers must sequence application processors behind the bootstrap build;
//! no lock in here does it for them.
//!
//! All table and descriptor layouts are bit-modeled; the builders never touch
//! raw words. Everything except the [`boot`] module is hosted-testable.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod boot_alloc;
pub mod config;
pub mod cpu;
pub mod gdt;
pub mod idt;
pub mod interrupts;
pub mod tss;

// References loader-provided link-time symbols, so it only exists in real
// kernel builds.
#[cfg(not(any(test, doctest)))]
pub mod boot;
