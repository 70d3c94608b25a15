//! User Virtual Address Type
//!
//! A type-safe wrapper for addresses supplied by user code. Raw argument
//! words become `VirtAddr` before anything else looks at them, so the
//! kernel never mixes user addresses with plain integers.
//!
//! # Security Properties
//! - User addresses are never dereferenced directly
//! - Page arithmetic never overflows silently

use core::fmt;

use crate::config::regions::PHYS_BASE;

/// Page size (4 KiB)
pub const PAGE_SIZE: usize = 4096;
/// Page size mask
pub const PAGE_MASK: usize = PAGE_SIZE - 1;
/// Bits to shift for page number
pub const PAGE_SHIFT: usize = 12;

/// A virtual memory address in some process's address space.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct VirtAddr(usize);

impl VirtAddr {
    /// Create a new virtual address.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Check for the null address.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Check if this is a user address (strictly below `PHYS_BASE`).
    #[inline]
    pub const fn is_user(self) -> bool {
        self.0 < PHYS_BASE
    }

    /// Check if the address is page-aligned.
    #[inline]
    pub const fn is_aligned(self) -> bool {
        self.0 & PAGE_MASK == 0
    }

    /// Align the address down to the nearest page boundary.
    #[inline]
    pub const fn align_down(self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }

    /// Get the page offset (lowest 12 bits).
    #[inline]
    pub const fn page_offset(self) -> usize {
        self.0 & PAGE_MASK
    }

    /// Get the virtual page number.
    #[inline]
    pub const fn page_number(self) -> usize {
        self.0 >> PAGE_SHIFT
    }

    /// Create from a virtual page number.
    #[inline]
    pub const fn from_page_number(vpn: usize) -> Self {
        Self(vpn << PAGE_SHIFT)
    }

    /// Add an offset, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(self, offset: usize) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#010x})", self.0)
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<u32> for VirtAddr {
    fn from(word: u32) -> Self {
        Self(word as usize)
    }
}

/// Iterate over the page-aligned base of every page touched by
/// `[start, start + len)`. Empty when `len == 0`.
///
/// Returns `None` if the range wraps around the address space.
pub fn pages_spanned(start: VirtAddr, len: usize) -> Option<impl Iterator<Item = VirtAddr>> {
    let first = start.page_number();
    let last = if len == 0 {
        first
    } else {
        start.checked_add(len - 1)?.page_number() + 1
    };
    Some((first..last).map(VirtAddr::from_page_number))
}
