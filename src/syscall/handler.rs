//! System Call Handler
//!
//! Decodes the call number and argument words from the user stack and
//! routes to the individual syscall bodies.
//!
//! # Security Considerations
//! - The stack pointer, the call number and every argument word are
//!   validated before they are read
//! - Unknown syscall numbers are a fault, not an error return
//! - Pointer arguments are validated a second time, as strings or buffers,
//!   and copied into kernel memory before use

use log::debug;

use super::validate::{self, Fault};
use super::Kernel;
use crate::config::abi::{MAX_SYSCALL_ARGS, WORD_SIZE};
use crate::fs::FileSystem;
use crate::mm::VirtAddr;
use crate::process::{Fd, Pid, Process};

/// System call numbers
pub mod numbers {
    pub const SYS_HALT: u32 = 0;
    pub const SYS_EXIT: u32 = 1;
    pub const SYS_EXEC: u32 = 2;
    pub const SYS_WAIT: u32 = 3;
    pub const SYS_CREATE: u32 = 4;
    pub const SYS_REMOVE: u32 = 5;
    pub const SYS_OPEN: u32 = 6;
    pub const SYS_FILESIZE: u32 = 7;
    pub const SYS_READ: u32 = 8;
    pub const SYS_WRITE: u32 = 9;
    pub const SYS_SEEK: u32 = 10;
    pub const SYS_TELL: u32 = 11;
    pub const SYS_CLOSE: u32 = 12;
}

use numbers::*;

/// What a dispatched call asks of the trap path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Store this in the return-value slot.
    Value(i32),
    /// Leave the return-value slot untouched.
    Void,
    /// Terminate the caller with this status.
    Exit(i32),
    /// Power the machine off.
    Halt,
}

/// Name and argument count of a call, or `None` if it is not in the ABI.
fn signature(nr: u32) -> Option<(&'static str, usize)> {
    let sig = match nr {
        SYS_HALT => ("halt", 0),
        SYS_EXIT => ("exit", 1),
        SYS_EXEC => ("exec", 1),
        SYS_WAIT => ("wait", 1),
        SYS_CREATE => ("create", 2),
        SYS_REMOVE => ("remove", 1),
        SYS_OPEN => ("open", 1),
        SYS_FILESIZE => ("filesize", 1),
        SYS_READ => ("read", 3),
        SYS_WRITE => ("write", 3),
        SYS_SEEK => ("seek", 2),
        SYS_TELL => ("tell", 1),
        SYS_CLOSE => ("close", 1),
        _ => return None,
    };
    Some(sig)
}

impl<F: FileSystem> Kernel<F> {
    /// Dispatch the system call whose frame starts at user address `esp`.
    ///
    /// # Returns
    /// The outcome for the trap path, or the fault that must kill the caller.
    pub fn dispatch(&self, proc: &mut Process<F::File>, esp: VirtAddr) -> Result<Outcome, Fault> {
        let space = proc.address_space();

        let nr = validate::read_word(space, esp)?;
        let (name, argc) = signature(nr).ok_or(Fault::UnknownSyscall(nr))?;

        let mut args = [0u32; MAX_SYSCALL_ARGS];
        for (i, slot) in args.iter_mut().take(argc).enumerate() {
            let at = esp
                .checked_add(WORD_SIZE * (i + 1))
                .ok_or(Fault::Overflow)?;
            *slot = validate::read_word(space, at)?;
        }
        debug!("[SYSCALL] pid {}: {}{:?}", proc.pid(), name, &args[..argc]);

        let [a0, a1, a2] = args;
        let outcome = match nr {
            SYS_HALT => Outcome::Halt,
            SYS_EXIT => Outcome::Exit(a0 as i32),
            SYS_EXEC => {
                let cmdline = validate::validate_string(space, a0.into())?;
                Outcome::Value(self.sys_exec(proc, &cmdline))
            }
            SYS_WAIT => Outcome::Value(self.sys_wait(proc, Pid::new(a0 as i32))),
            SYS_CREATE => {
                let name = validate::validate_string(space, a0.into())?;
                Outcome::Value(self.sys_create(&name, a1) as i32)
            }
            SYS_REMOVE => {
                let name = validate::validate_string(space, a0.into())?;
                Outcome::Value(self.sys_remove(&name) as i32)
            }
            SYS_OPEN => {
                let name = validate::validate_string(space, a0.into())?;
                Outcome::Value(self.sys_open(proc, &name))
            }
            SYS_FILESIZE => Outcome::Value(self.sys_filesize(proc, Fd::new(a0 as i32))),
            SYS_READ => {
                let buf = validate::validate_buffer_mut(space, a1.into(), a2 as usize)?;
                Outcome::Value(self.sys_read(proc, Fd::new(a0 as i32), &buf)?)
            }
            SYS_WRITE => {
                let data = validate::validate_buffer(space, a1.into(), a2 as usize)?.copy_in(space)?;
                Outcome::Value(self.sys_write(proc, Fd::new(a0 as i32), &data))
            }
            SYS_SEEK => {
                self.sys_seek(proc, Fd::new(a0 as i32), a1);
                Outcome::Void
            }
            SYS_TELL => Outcome::Value(self.sys_tell(proc, Fd::new(a0 as i32))),
            SYS_CLOSE => {
                self.sys_close(proc, Fd::new(a0 as i32));
                Outcome::Void
            }
            _ => return Err(Fault::UnknownSyscall(nr)),
        };
        Ok(outcome)
    }
}
