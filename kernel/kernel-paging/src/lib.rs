//! # Boot Page Map
//!
//! Builds the identity-mapped page tables the CPU needs the instant paging is
//! switched on. The map is three levels deep and uses 2 MiB huge pages
//! exclusively, so a single flat, page-aligned buffer of descriptors covers
//! the whole early address space:
//!
//! - table 0 is the root,
//! - intermediate tables link the root to the leaves,
//! - leaf descriptors identity-map one 2 MiB page each.
//!
//! Tables are carved out of the buffer with a bump cursor, 512 descriptors at
//! a time. Only the pages inside the requested [`MappedRegion`] are marked
//! present; everything else stays an all-zero descriptor, so a stray access
//! outside the mapped window faults immediately.
//!
//! Sizing is static: [`page_map_len`] is a `const fn`, so the caller can
//! reserve the buffer at compile time:
//!
//! ```rust
//! use kernel_paging::{page_map_len, PageDesc};
//!
//! const LEN: usize = page_map_len(1 << 30);
//! static mut PAGE_MAP: [PageDesc; LEN] = [PageDesc::absent(); LEN];
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod page_desc;
mod page_map;

pub use page_desc::{PageDesc, PageDescHigh, PageDescLow};
pub use page_map::{
    build_page_map, page_map_len, MappedRegion, RegionError, HUGE_PAGE_SIZE, TABLE_DESCS,
};
