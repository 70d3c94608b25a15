//! userprog - System-Call Boundary for a Teaching Kernel
//!
//! Everything between a user program's trap instruction and the kernel's
//! filesystem and scheduler.
//!
//! # Components
//! - User-pointer validation against the caller's page table
//! - Per-process file descriptor tables
//! - The exec/wait/exit rendezvous between parents and children
//! - A dispatcher for the thirteen system calls
//! - A global lock serializing every filesystem call
//!
//! # Security Features
//! - No user address is dereferenced before it is checked page by page
//! - A bad pointer kills the offending process, never the kernel
//! - Resources are released on every termination path
//!
//! # Integration
//! The embedding kernel supplies an address space per process and
//! implementations of [`fs::FileSystem`], [`drivers::Console`],
//! [`drivers::Power`] and [`process::Spawner`]. Its trap vector calls
//! [`trap::handle_syscall`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod config;
pub mod drivers;
pub mod fs;
pub mod mm;
pub mod process;
pub mod syscall;
pub mod trap;

#[cfg(test)]
mod testing;

#[doc(hidden)]
pub use alloc::format as __format;

pub use syscall::{Fault, Kernel};
pub use trap::{handle_syscall, Disposition, TrapFrame};
