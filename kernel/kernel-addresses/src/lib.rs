//! # Physical and Virtual Address Types
//!
//! Strongly typed, zero-cost wrappers around raw `u64` addresses, so that
//! paging and descriptor-table code cannot accidentally mix the two address
//! kinds. During early bring-up the kernel runs identity-mapped, which makes
//! such mix-ups silent on hardware and all the more worth catching in types.
//!
//! ## Page sizes
//!
//! Two marker types implement [`PageSize`]:
//!
//! - [`Size4K`] — 4 KiB, the granularity of paging-structure tables.
//! - [`Size2M`] — 2 MiB, the huge-page granularity used by the boot page map.
//!
//! ## Typical usage
//!
//! ```rust
//! # use kernel_addresses::*;
//! let pa = PhysicalAddress::new(0x0060_0042);
//! assert_eq!(pa.align_down::<Size2M>().as_u64(), 0x0040_0000);
//! assert!(pa.align_down::<Size2M>().is_aligned::<Size2M>());
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

use core::fmt;
use core::ops::{Add, AddAssign};
use core::ptr::NonNull;

/// Sealed trait pattern to restrict [`PageSize`] impls to our markers.
mod sealed {
    pub trait Sealed {}
}

/// Marker trait for supported page sizes.
pub trait PageSize: sealed::Sealed + Copy + Eq {
    /// Page size in bytes (power of two).
    const SIZE: u64;
    /// log2(SIZE), i.e. the number of low bits used for the in-page offset.
    const SHIFT: u32;
}

/// 4 KiB page (4096 bytes).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Size4K;
impl sealed::Sealed for Size4K {}
impl PageSize for Size4K {
    const SIZE: u64 = 4096;
    const SHIFT: u32 = 12;
}

/// 2 MiB huge page (`2_097_152` bytes).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Size2M;
impl sealed::Sealed for Size2M {}
impl PageSize for Size2M {
    const SIZE: u64 = 2 * 1024 * 1024;
    const SHIFT: u32 = 21;
}

macro_rules! address_type {
    ($(#[$doc:meta])* $name:ident, $abbrev:literal) => {
        $(#[$doc])*
        #[repr(transparent)]
        #[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(u64);

        impl $name {
            #[inline]
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            #[inline]
            #[must_use]
            pub const fn zero() -> Self {
                Self(0)
            }

            #[inline]
            #[must_use]
            pub const fn from_nonnull<T>(ptr: NonNull<T>) -> Self {
                Self::from_ptr(ptr.as_ptr())
            }

            /// Capture a pointer's address value.
            #[inline]
            #[must_use]
            pub const fn from_ptr<T>(ptr: *const T) -> Self {
                const _: () = assert!(
                    size_of::<*const ()>() == size_of::<u64>(),
                    "pointer size mismatch"
                );

                // using a union to const-time convert a pointer to an u64
                union Ptr<T> {
                    ptr: *const T,
                    raw: u64,
                }

                let ptr = Ptr { ptr };
                Self::new(unsafe { ptr.raw })
            }

            #[inline]
            #[must_use]
            pub const fn as_u64(self) -> u64 {
                self.0
            }

            #[inline]
            #[must_use]
            pub const fn is_zero(self) -> bool {
                self.0 == 0
            }

            /// Align down to the page boundary of size `S`.
            #[inline]
            #[must_use]
            pub const fn align_down<S: PageSize>(self) -> Self {
                Self(self.0 & !(S::SIZE - 1))
            }

            /// Whether the low `S::SHIFT` bits are all zero.
            #[inline]
            #[must_use]
            pub const fn is_aligned<S: PageSize>(self) -> bool {
                self.0 & (S::SIZE - 1) == 0
            }

            /// Checked addition, `None` on overflow.
            #[inline]
            #[must_use]
            pub const fn checked_add(self, rhs: u64) -> Option<Self> {
                match self.0.checked_add(rhs) {
                    Some(v) => Some(Self(v)),
                    None => None,
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($abbrev, "(0x{:016X})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{:016X}", self.0)
            }
        }

        impl Add<u64> for $name {
            type Output = Self;
            #[inline]
            fn add(self, rhs: u64) -> Self::Output {
                Self(self.0 + rhs)
            }
        }

        impl AddAssign<u64> for $name {
            #[inline]
            fn add_assign(&mut self, rhs: u64) {
                self.0 += rhs;
            }
        }

        impl From<u64> for $name {
            #[inline]
            fn from(v: u64) -> Self {
                Self::new(v)
            }
        }

        impl From<$name> for u64 {
            #[inline]
            fn from(a: $name) -> Self {
                a.as_u64()
            }
        }
    };
}

address_type!(
    /// Physical memory address (host RAM / MMIO).
    ///
    /// Page-table entries and CR3 store physical bases; this type carries that
    /// intent. No canonicality or range validation is performed.
    PhysicalAddress,
    "PA"
);

address_type!(
    /// Virtual memory address.
    ///
    /// Descriptor-table bases, handler entry points and stack tops are virtual
    /// addresses. During identity-mapped bring-up the numeric value coincides
    /// with the physical one; the types still keep the roles apart.
    VirtualAddress,
    "VA"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_down_2m() {
        let a = PhysicalAddress::new(0x0060_0042);
        assert_eq!(a.align_down::<Size2M>().as_u64(), 0x0040_0000);
        assert!(a.align_down::<Size2M>().is_aligned::<Size2M>());
        assert!(!a.is_aligned::<Size4K>());
    }

    #[test]
    fn from_ptr_round_trip() {
        let value = 42u64;
        let ptr = &raw const value;
        let va = VirtualAddress::from_ptr(ptr);
        assert_eq!(va.as_u64(), ptr as u64);
        assert!(!va.is_zero());
    }

    #[test]
    fn checked_add_overflow() {
        let a = VirtualAddress::new(u64::MAX - 1);
        assert_eq!(a.checked_add(1), Some(VirtualAddress::new(u64::MAX)));
        assert_eq!(a.checked_add(2), None);
    }

    #[test]
    fn display_format() {
        let a = PhysicalAddress::new(0x1234);
        assert_eq!(format!("{a}"), "0x0000000000001234");
    }
}
