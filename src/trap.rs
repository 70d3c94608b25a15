//! System call trap entry
//!
//! The interrupt plumbing saves the user context into a [`TrapFrame`] and
//! calls [`handle_syscall`]. The caller's thread learns from the returned
//! [`Disposition`] whether to resume user mode or to finish.
//!
//! # Security Considerations
//! - A fault raised anywhere during argument handling terminates the
//!   process with status -1; the syscall body never completes
//! - An exited process never runs another syscall

use log::warn;

use crate::fs::FileSystem;
use crate::mm::VirtAddr;
use crate::process::{Process, RunState};
use crate::syscall::{Kernel, Outcome};

/// The part of the saved user context the syscall path touches.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrapFrame {
    /// User stack pointer at the trap; the call frame starts here.
    pub esp: u32,
    /// Return-value register.
    pub eax: u32,
}

impl TrapFrame {
    pub const fn new(esp: u32) -> Self {
        Self { esp, eax: 0 }
    }
}

/// What the calling thread must do after the trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Return to user mode.
    Resume,
    /// The process has terminated with this status; destroy the thread.
    Exited(i32),
    /// The machine has been powered off.
    Halted,
}

/// Handle a system call trap from user mode.
pub fn handle_syscall<F: FileSystem>(
    kernel: &Kernel<F>,
    proc: &mut Process<F::File>,
    frame: &mut TrapFrame,
) -> Disposition {
    if let RunState::Exited(status) = proc.state() {
        return Disposition::Exited(status);
    }

    match kernel.dispatch(proc, VirtAddr::from(frame.esp)) {
        Ok(Outcome::Value(value)) => {
            frame.eax = value as u32;
            Disposition::Resume
        }
        Ok(Outcome::Void) => Disposition::Resume,
        Ok(Outcome::Exit(status)) => Disposition::Exited(kernel.terminate(proc, status)),
        Ok(Outcome::Halt) => {
            kernel.sys_halt();
            Disposition::Halted
        }
        Err(fault) => {
            warn!(
                "[SYSCALL] pid {} ({}): {}, terminating",
                proc.pid(),
                proc.name(),
                fault
            );
            Disposition::Exited(kernel.terminate(proc, -1))
        }
    }
}
