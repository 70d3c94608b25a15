//! Compile-time kernel configuration
//!
//! The user/kernel split, descriptor numbering and the syscall ABI shape
//! are fixed at build time, just like the memory map.

/// Virtual memory layout of a user process.
pub mod regions {
    /// First kernel virtual address. Every user address is strictly below it.
    pub const PHYS_BASE: usize = 0xC000_0000;

    /// Top of the initial user stack (grows down from here).
    pub const USER_STACK_TOP: usize = PHYS_BASE;
}

/// Descriptor numbering.
pub mod fds {
    /// Console input. Never present in a resource table.
    pub const STDIN: i32 = 0;
    /// Console output. Never present in a resource table.
    pub const STDOUT: i32 = 1;
    /// First descriptor handed out by `open`.
    pub const FIRST_USER_FD: i32 = 2;
    /// Maximum number of simultaneously open files per process.
    pub const MAX_OPEN_FILES: usize = 128;
}

/// Syscall ABI.
pub mod abi {
    /// Size of one stack word (call number or argument).
    pub const WORD_SIZE: usize = 4;
    /// Largest argument count of any call.
    pub const MAX_SYSCALL_ARGS: usize = 3;
    /// Sentinel returned by value-returning calls on failure.
    pub const ERROR: i32 = -1;
}

/// Longest file name accepted by the in-memory filesystem.
pub const NAME_MAX: usize = 14;

/// Largest file the in-memory filesystem will hold (8 MiB). `create` past
/// it fails and writes stop short at it.
pub const MAX_FILE_SIZE: usize = 8 * 1024 * 1024;
