//! User Page Table Model
//!
//! The syscall layer consumes virtual memory through the [`AddressSpace`]
//! trait: a page lookup that yields the backing frame of a virtual page,
//! or nothing if the page is unmapped. [`PageTable`] is the concrete
//! single-level implementation used to build user processes.
//!
//! # Security Properties
//! - User pages must carry the `USER` flag to be visible to the validator
//! - Kernel addresses cannot be mapped into a user page table
//! - Frames are zeroed when mapped

use alloc::boxed::Box;
use alloc::collections::BTreeMap;

use bitflags::bitflags;

use super::address::{VirtAddr, PAGE_SIZE};

/// Backing storage of one mapped page.
pub type Frame = [u8; PAGE_SIZE];

bitflags! {
    /// Page table entry flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PteFlags: u32 {
        /// Entry maps a frame.
        const PRESENT = 1 << 0;
        /// Page may be written.
        const WRITABLE = 1 << 1;
        /// Page is accessible from user mode.
        const USER = 1 << 2;

        /// Read-only user page (code, rodata).
        const USER_RO = Self::PRESENT.bits() | Self::USER.bits();
        /// Read/write user page (data, heap, stack).
        const USER_RW = Self::USER_RO.bits() | Self::WRITABLE.bits();
    }
}

/// Error type for page mapping operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingError {
    /// The virtual address is already mapped.
    AlreadyMapped,
    /// The virtual address is not mapped.
    NotMapped,
    /// The address is not properly aligned.
    MisalignedAddress,
    /// Attempted to map kernel address with user flags.
    InvalidPermissions,
}

impl core::fmt::Display for MappingError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AlreadyMapped => write!(f, "virtual address already mapped"),
            Self::NotMapped => write!(f, "virtual address not mapped"),
            Self::MisalignedAddress => write!(f, "address not properly aligned"),
            Self::InvalidPermissions => write!(f, "invalid permission combination"),
        }
    }
}

/// Virtual memory collaborator: page lookup in one process's address space.
///
/// `read_bytes`/`write_bytes` are raw kernel accessors. They only require
/// the pages to be present; user-permission policy is the validator's job
/// and must be applied before calling them on behalf of user code.
pub trait AddressSpace: Send {
    /// Look up the page containing `va`.
    fn lookup(&self, va: VirtAddr) -> Option<(PteFlags, &Frame)>;

    /// Look up the page containing `va` for writing.
    fn lookup_mut(&mut self, va: VirtAddr) -> Option<&mut Frame>;

    /// Copy `buf.len()` bytes starting at `va` out of this address space.
    fn read_bytes(&self, va: VirtAddr, buf: &mut [u8]) -> Result<(), MappingError> {
        let mut done = 0;
        while done < buf.len() {
            let addr = va.checked_add(done).ok_or(MappingError::NotMapped)?;
            let offset = addr.page_offset();
            let chunk = (PAGE_SIZE - offset).min(buf.len() - done);
            let (_, frame) = self.lookup(addr).ok_or(MappingError::NotMapped)?;
            buf[done..done + chunk].copy_from_slice(&frame[offset..offset + chunk]);
            done += chunk;
        }
        Ok(())
    }

    /// Copy `data` into this address space starting at `va`.
    fn write_bytes(&mut self, va: VirtAddr, data: &[u8]) -> Result<(), MappingError> {
        let mut done = 0;
        while done < data.len() {
            let addr = va.checked_add(done).ok_or(MappingError::NotMapped)?;
            let offset = addr.page_offset();
            let chunk = (PAGE_SIZE - offset).min(data.len() - done);
            let frame = self.lookup_mut(addr).ok_or(MappingError::NotMapped)?;
            frame[offset..offset + chunk].copy_from_slice(&data[done..done + chunk]);
            done += chunk;
        }
        Ok(())
    }
}

/// A single page table entry: flags plus the owned frame.
struct PageTableEntry {
    flags: PteFlags,
    frame: Box<Frame>,
}

/// A user page table keyed by virtual page number.
#[derive(Default)]
pub struct PageTable {
    entries: BTreeMap<usize, PageTableEntry>,
}

impl PageTable {
    /// Create an empty page table (nothing mapped).
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a zeroed frame at the page-aligned address `va`.
    pub fn map(&mut self, va: VirtAddr, flags: PteFlags) -> Result<(), MappingError> {
        if !va.is_aligned() {
            return Err(MappingError::MisalignedAddress);
        }
        if flags.contains(PteFlags::USER) && !va.is_user() {
            return Err(MappingError::InvalidPermissions);
        }
        if self.entries.contains_key(&va.page_number()) {
            return Err(MappingError::AlreadyMapped);
        }

        self.entries.insert(
            va.page_number(),
            PageTableEntry {
                flags: flags | PteFlags::PRESENT,
                frame: Box::new([0; PAGE_SIZE]),
            },
        );
        Ok(())
    }

    /// Map every page touched by `[start, start + len)`.
    pub fn map_range(&mut self, start: VirtAddr, len: usize, flags: PteFlags) -> Result<(), MappingError> {
        let pages = super::address::pages_spanned(start, len).ok_or(MappingError::InvalidPermissions)?;
        for page in pages {
            self.map(page, flags)?;
        }
        Ok(())
    }

    /// Remove the mapping of the page containing `va`.
    pub fn unmap(&mut self, va: VirtAddr) -> Result<(), MappingError> {
        self.entries
            .remove(&va.page_number())
            .map(|_| ())
            .ok_or(MappingError::NotMapped)
    }

    /// Get the flags of the page containing `va`.
    pub fn flags(&self, va: VirtAddr) -> Option<PteFlags> {
        self.entries.get(&va.page_number()).map(|e| e.flags)
    }

    /// Number of mapped pages.
    pub fn mapped_pages(&self) -> usize {
        self.entries.len()
    }
}

impl AddressSpace for PageTable {
    fn lookup(&self, va: VirtAddr) -> Option<(PteFlags, &Frame)> {
        self.entries
            .get(&va.page_number())
            .map(|e| (e.flags, &*e.frame))
    }

    fn lookup_mut(&mut self, va: VirtAddr) -> Option<&mut Frame> {
        self.entries.get_mut(&va.page_number()).map(|e| &mut *e.frame)
    }
}

impl core::fmt::Debug for PageTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PageTable({} pages)", self.entries.len())
    }
}
