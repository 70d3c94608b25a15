//! Process syscalls and the termination path
//!
//! `exec` and `wait` are the parent's half of the child-record rendezvous,
//! `exit` is the child's half. A status report from a child whose parent
//! already released the record goes nowhere.

use log::{debug, info};

use super::Kernel;
use crate::config::abi::ERROR;
use crate::cprintln;
use crate::fs::FileSystem;
use crate::process::{PendingChild, Pid, Process};

impl<F: FileSystem> Kernel<F> {
    pub(crate) fn sys_halt(&self) {
        info!("[SYSCALL] halt: powering off");
        self.power.power_off();
    }

    pub(super) fn sys_exec(&self, proc: &mut Process<F::File>, cmdline: &[u8]) -> i32 {
        let Ok(cmdline) = core::str::from_utf8(cmdline) else {
            return ERROR;
        };

        let (pending, link) = PendingChild::new();
        let Some(pid) = self.spawner.spawn(cmdline, link) else {
            debug!("[PROCESS] pid {}: exec {:?}: spawn failed", proc.pid(), cmdline);
            return ERROR;
        };
        proc.children_mut().insert(pending.into_record(pid));

        let loaded = proc
            .children()
            .get(pid)
            .is_some_and(|record| record.wait_loaded());
        if !loaded {
            debug!("[PROCESS] pid {}: exec {:?}: load failed", proc.pid(), cmdline);
            proc.children_mut().remove(pid);
            return ERROR;
        }
        pid.as_raw()
    }

    pub(super) fn sys_wait(&self, proc: &mut Process<F::File>, pid: Pid) -> i32 {
        let Some(record) = proc.children().get(pid) else {
            return ERROR;
        };
        let status = record.wait_exit();
        proc.children_mut().remove(pid);
        debug!("[PROCESS] pid {}: reaped {} with status {}", proc.pid(), pid, status);
        status
    }

    /// Terminate `proc` with `status`.
    ///
    /// Prints the exit line, releases the process's files and child records,
    /// then reports the status to the parent if the parent still holds the
    /// record. Negative statuses are reported as -1. Returns the reported
    /// status. Calling this on an exited process does nothing.
    pub fn terminate(&self, proc: &mut Process<F::File>, status: i32) -> i32 {
        if let crate::process::RunState::Exited(prior) = proc.state() {
            return prior;
        }
        let status = if status < 0 { ERROR } else { status };

        cprintln!(self.console(), "{}: exit({})", proc.name(), status);
        info!("[PROCESS] pid {} ({}) exited with status {}", proc.pid(), proc.name(), status);

        self.release_process(proc);
        if let Some(parent) = proc.parent() {
            parent.report_exit(status);
        }
        proc.mark_exited(status);
        status
    }

    /// Process-termination hook: close every open file and release every
    /// child record, reaped or not.
    ///
    /// Children released here keep running; their exit reports become
    /// no-ops.
    pub fn release_process(&self, proc: &mut Process<F::File>) {
        let closed = {
            let mut fs = self.fs.lock();
            proc.files_mut().close_all(|file| fs.close(file))
        };
        let released = proc.children_mut().release_all();
        debug!(
            "[PROCESS] pid {}: closed {} files, released {} child records",
            proc.pid(),
            closed,
            released
        );
    }
}
