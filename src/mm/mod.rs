//! Memory management for the syscall boundary
//!
//! Provides:
//! - Typed user virtual addresses
//! - The address-space collaborator the validator queries
//! - A page table model for building user processes
//!
//! # Security Principles
//! - User memory is only reached through an `AddressSpace`
//! - No raw pointer into user memory ever exists in the kernel

pub mod address;
pub mod paging;

pub use address::{VirtAddr, PAGE_SIZE};
pub use paging::{AddressSpace, MappingError, PageTable, PteFlags};
