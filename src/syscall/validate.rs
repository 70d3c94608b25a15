//! System Call Input Validation
//!
//! Every address supplied by user code passes through here before the
//! kernel touches the memory behind it.
//!
//! # Security Principles
//! - Validate ALL inputs before use
//! - Fail-secure: any failure is a [`Fault`], and a fault kills the caller
//! - Prevent common vulnerabilities:
//!   - Null pointer dereference (explicit checks)
//!   - Kernel memory disclosure (user/kernel split check)
//!   - Buffers running into unmapped memory (every page is checked)
//!   - TOCTOU races (copy to kernel space)

use alloc::vec;
use alloc::vec::Vec;

use log::trace;

use crate::config::abi::WORD_SIZE;
use crate::mm::address::pages_spanned;
use crate::mm::paging::Frame;
use crate::mm::{AddressSpace, PteFlags, VirtAddr, PAGE_SIZE};

/// A fatal validation failure. The calling process is terminated with
/// status -1 and the system call never completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Address is null.
    NullPointer,
    /// Address is at or above the user/kernel split.
    KernelAddress,
    /// Page is not mapped for user access.
    Unmapped,
    /// Kernel would write into a read-only page.
    ReadOnly,
    /// Address range wraps around.
    Overflow,
    /// Call number is not part of the ABI.
    UnknownSyscall(u32),
}

impl core::fmt::Display for Fault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NullPointer => write!(f, "null pointer"),
            Self::KernelAddress => write!(f, "kernel address"),
            Self::Unmapped => write!(f, "unmapped user page"),
            Self::ReadOnly => write!(f, "read-only user page"),
            Self::Overflow => write!(f, "address range overflow"),
            Self::UnknownSyscall(nr) => write!(f, "unknown syscall {}", nr),
        }
    }
}

/// Resolve the user page containing `addr`.
fn user_page(space: &dyn AddressSpace, addr: VirtAddr) -> Result<(PteFlags, &Frame), Fault> {
    let fault = if addr.is_null() {
        Fault::NullPointer
    } else if !addr.is_user() {
        Fault::KernelAddress
    } else {
        match space.lookup(addr) {
            Some((flags, frame)) if flags.contains(PteFlags::PRESENT | PteFlags::USER) => {
                return Ok((flags, frame));
            }
            _ => Fault::Unmapped,
        }
    };
    trace!("[VALIDATE] rejected {}: {}", addr, fault);
    Err(fault)
}

/// Check that `addr` is non-null, below the split and mapped.
pub fn validate(space: &dyn AddressSpace, addr: VirtAddr) -> Result<(), Fault> {
    user_page(space, addr).map(|_| ())
}

/// A validated user-space buffer the kernel reads from.
///
/// Only constructed after every page it spans has been checked.
#[derive(Debug)]
pub struct UserBuffer {
    addr: VirtAddr,
    len: usize,
}

impl UserBuffer {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy the buffer into kernel memory.
    pub fn copy_in(&self, space: &dyn AddressSpace) -> Result<Vec<u8>, Fault> {
        let mut data = vec![0; self.len];
        space
            .read_bytes(self.addr, &mut data)
            .map_err(|_| Fault::Unmapped)?;
        Ok(data)
    }
}

/// A validated user-space buffer the kernel writes into.
#[derive(Debug)]
pub struct UserBufferMut {
    addr: VirtAddr,
    len: usize,
}

impl UserBufferMut {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy `data` from kernel memory into the buffer.
    ///
    /// `data` is truncated to the buffer's validated length.
    pub fn copy_out(&self, space: &mut dyn AddressSpace, data: &[u8]) -> Result<(), Fault> {
        let n = data.len().min(self.len);
        space
            .write_bytes(self.addr, &data[..n])
            .map_err(|_| Fault::Unmapped)
    }
}

/// Validate every page touched by `[addr, addr + len)` for reading.
///
/// The start address is checked even for an empty buffer; only the walk
/// over further pages is skipped.
pub fn validate_buffer(space: &dyn AddressSpace, addr: VirtAddr, len: usize) -> Result<UserBuffer, Fault> {
    let pages = pages_spanned(addr, len).ok_or(Fault::Overflow)?;
    user_page(space, addr)?;
    for page in pages.skip(1) {
        user_page(space, page)?;
    }
    Ok(UserBuffer { addr, len })
}

/// Validate every page touched by `[addr, addr + len)` for writing.
///
/// An empty buffer only needs a mapped start address.
pub fn validate_buffer_mut(
    space: &dyn AddressSpace,
    addr: VirtAddr,
    len: usize,
) -> Result<UserBufferMut, Fault> {
    let pages = pages_spanned(addr, len).ok_or(Fault::Overflow)?;
    let (flags, _) = user_page(space, addr)?;
    if len > 0 && !flags.contains(PteFlags::WRITABLE) {
        return Err(Fault::ReadOnly);
    }
    for page in pages.skip(1) {
        let (flags, _) = user_page(space, page)?;
        if !flags.contains(PteFlags::WRITABLE) {
            return Err(Fault::ReadOnly);
        }
    }
    Ok(UserBufferMut { addr, len })
}

/// Walk a NUL-terminated user string, validating each page before reading
/// from it, and return a kernel copy without the terminator.
pub fn validate_string(space: &dyn AddressSpace, addr: VirtAddr) -> Result<Vec<u8>, Fault> {
    let mut out = Vec::new();
    let mut cursor = addr;
    loop {
        let (_, frame) = user_page(space, cursor)?;
        let offset = cursor.page_offset();
        let rest = &frame[offset..];
        match rest.iter().position(|&b| b == 0) {
            Some(n) => {
                out.extend_from_slice(&rest[..n]);
                return Ok(out);
            }
            None => {
                out.extend_from_slice(rest);
                cursor = cursor
                    .checked_add(PAGE_SIZE - offset)
                    .ok_or(Fault::Overflow)?;
            }
        }
    }
}

/// Read one little-endian stack word after validating all of its bytes.
pub fn read_word(space: &dyn AddressSpace, addr: VirtAddr) -> Result<u32, Fault> {
    let buf = validate_buffer(space, addr, WORD_SIZE)?;
    let bytes = buf.copy_in(space)?;
    let mut word = [0u8; WORD_SIZE];
    word.copy_from_slice(&bytes);
    Ok(u32::from_le_bytes(word))
}
