//! File syscalls
//!
//! Every call into the filesystem happens with the global lock held, and
//! only for the span of that call. User memory is copied in before the
//! lock is taken and copied out after it is released. Console descriptors
//! bypass both the resource table and the lock.

use alloc::vec;

use log::debug;

use super::validate::{Fault, UserBufferMut};
use super::Kernel;
use crate::config::abi::ERROR;
use crate::fs::FileSystem;
use crate::process::{Fd, Process};

/// Borrow a user-supplied name as UTF-8, or fail the call.
fn file_name(raw: &[u8]) -> Option<&str> {
    core::str::from_utf8(raw).ok()
}

impl<F: FileSystem> Kernel<F> {
    pub(super) fn sys_create(&self, name: &[u8], initial_size: u32) -> bool {
        let Some(name) = file_name(name) else {
            return false;
        };
        self.fs.with(|fs| fs.create(name, initial_size))
    }

    pub(super) fn sys_remove(&self, name: &[u8]) -> bool {
        let Some(name) = file_name(name) else {
            return false;
        };
        self.fs.with(|fs| fs.remove(name))
    }

    pub(super) fn sys_open(&self, proc: &mut Process<F::File>, name: &[u8]) -> i32 {
        let Some(name) = file_name(name) else {
            return ERROR;
        };
        let mut fs = self.fs.lock();
        let Some(file) = fs.open(name) else {
            return ERROR;
        };
        match proc.files_mut().insert(file) {
            Ok(fd) => fd.as_raw(),
            Err((e, file)) => {
                debug!("[FS] pid {}: open {:?}: {}", proc.pid(), name, e);
                fs.close(file);
                ERROR
            }
        }
    }

    pub(super) fn sys_filesize(&self, proc: &mut Process<F::File>, fd: Fd) -> i32 {
        match proc.files().lookup(fd) {
            Ok(file) => self.fs.with(|fs| fs.length(file)) as i32,
            Err(_) => ERROR,
        }
    }

    pub(super) fn sys_read(
        &self,
        proc: &mut Process<F::File>,
        fd: Fd,
        buf: &UserBufferMut,
    ) -> Result<i32, Fault> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut data = vec![0u8; buf.len()];
        let n = if fd == Fd::STDIN {
            for byte in data.iter_mut() {
                *byte = self.console.get_byte();
            }
            data.len()
        } else {
            let Ok(file) = proc.files_mut().lookup_mut(fd) else {
                return Ok(ERROR);
            };
            self.fs.with(|fs| fs.read(file, &mut data))
        };

        buf.copy_out(proc.address_space_mut(), &data[..n])?;
        Ok(n as i32)
    }

    pub(super) fn sys_write(&self, proc: &mut Process<F::File>, fd: Fd, data: &[u8]) -> i32 {
        if data.is_empty() {
            return 0;
        }
        if fd == Fd::STDOUT {
            self.console.put_bytes(data);
            return data.len() as i32;
        }
        match proc.files_mut().lookup_mut(fd) {
            Ok(file) => self.fs.with(|fs| fs.write(file, data)) as i32,
            Err(_) => ERROR,
        }
    }

    pub(super) fn sys_seek(&self, proc: &mut Process<F::File>, fd: Fd, pos: u32) {
        if let Ok(file) = proc.files_mut().lookup_mut(fd) {
            self.fs.with(|fs| fs.seek(file, pos));
        }
    }

    pub(super) fn sys_tell(&self, proc: &mut Process<F::File>, fd: Fd) -> i32 {
        match proc.files().lookup(fd) {
            Ok(file) => self.fs.with(|fs| fs.tell(file)) as i32,
            Err(_) => ERROR,
        }
    }

    pub(super) fn sys_close(&self, proc: &mut Process<F::File>, fd: Fd) {
        let mut fs = self.fs.lock();
        proc.files_mut().close(fd, |file| fs.close(file));
    }
}
