//! System Call Interface
//!
//! The kernel's boundary against user programs.
//!
//! # Security Model
//! - Whitelist approach: only the calls in [`numbers`] are accepted
//! - All pointer parameters are validated before use
//! - A bad pointer is fatal for the caller; ordinary failures return -1
//! - Invalid inputs never panic the kernel
//!
//! # Current Syscalls
//! - 0: halt()
//! - 1: exit(status)
//! - 2: exec(cmdline) -> pid
//! - 3: wait(pid) -> status
//! - 4: create(name, size) -> bool
//! - 5: remove(name) -> bool
//! - 6: open(name) -> fd
//! - 7: filesize(fd) -> size
//! - 8: read(fd, buf, len) -> bytes
//! - 9: write(fd, buf, len) -> bytes
//! - 10: seek(fd, pos)
//! - 11: tell(fd) -> pos
//! - 12: close(fd)

mod fs;
mod handler;
mod process;
pub mod validate;

use alloc::sync::Arc;

pub use handler::{numbers, Outcome};
pub use validate::{Fault, UserBuffer, UserBufferMut};

use crate::drivers::{Console, Power};
use crate::fs::{FileSystem, FsLock};
use crate::process::Spawner;

/// The syscall layer together with the collaborators it drives.
pub struct Kernel<F: FileSystem> {
    fs: Arc<FsLock<F>>,
    console: Arc<dyn Console>,
    spawner: Arc<dyn Spawner>,
    power: Arc<dyn Power>,
}

impl<F: FileSystem> Kernel<F> {
    pub fn new(
        fs: Arc<FsLock<F>>,
        console: Arc<dyn Console>,
        spawner: Arc<dyn Spawner>,
        power: Arc<dyn Power>,
    ) -> Self {
        Self {
            fs,
            console,
            spawner,
            power,
        }
    }

    pub fn console(&self) -> &dyn Console {
        &*self.console
    }
}
