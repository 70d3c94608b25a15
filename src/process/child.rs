//! Child-Process Registry & Exit Protocol
//!
//! The parent owns one [`ChildRecord`] per spawned child. The child only
//! holds a [`ParentLink`], a weak back-reference to the shared state of
//! that record. Once the parent releases the record (reaping it, discarding
//! a failed `exec`, or terminating) the link goes inert and every report
//! through it is a silent no-op.
//!
//! ```text
//! Pending ──► Loaded ──► Terminated(status) ──► (reaped by wait)
//!    │
//!    └──────► LoadFailed ──────────────────────► (discarded by exec)
//!
//! any state ───────────────────────────────────► (released at parent exit)
//! ```

use alloc::collections::BTreeMap;
use alloc::sync::{Arc, Weak};

use log::debug;
use spin::Mutex;

use super::signal::Signal;
use super::Pid;
use crate::config::abi::ERROR;

/// Load and termination status of a child, as seen by its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStatus {
    /// Program image still loading.
    Pending,
    /// Image loaded, child runnable.
    Loaded,
    /// Image failed to load.
    LoadFailed,
    /// Child exited with this status.
    Terminated(i32),
}

/// State shared between a record and its child's link.
#[derive(Debug)]
struct ChildState {
    status: Mutex<ChildStatus>,
    /// Raised once by the child when loading finishes either way.
    loaded: Signal,
    /// Raised once by the child when it terminates.
    exited: Signal,
}

impl ChildState {
    fn new() -> Self {
        Self {
            status: Mutex::new(ChildStatus::Pending),
            loaded: Signal::new(),
            exited: Signal::new(),
        }
    }
}

/// The child's back-reference to its record in the parent's registry.
#[derive(Debug)]
pub struct ParentLink {
    state: Weak<ChildState>,
}

impl ParentLink {
    /// Report the load outcome. Only the first report counts.
    ///
    /// Returns whether the report reached a live record.
    pub fn report_load(&self, loaded: bool) -> bool {
        let Some(state) = self.state.upgrade() else {
            return false;
        };
        let mut status = state.status.lock();
        if *status != ChildStatus::Pending {
            return false;
        }
        *status = if loaded {
            ChildStatus::Loaded
        } else {
            ChildStatus::LoadFailed
        };
        drop(status);
        state.loaded.raise();
        true
    }

    /// Record the exit status. Only reachable from `Loaded`, only once.
    ///
    /// Returns whether the report reached a live record.
    pub fn report_exit(&self, exit_status: i32) -> bool {
        let Some(state) = self.state.upgrade() else {
            debug!("[PROCESS] parent gone, exit status {} dropped", exit_status);
            return false;
        };
        let mut status = state.status.lock();
        if *status != ChildStatus::Loaded {
            return false;
        }
        *status = ChildStatus::Terminated(exit_status);
        drop(status);
        state.exited.raise();
        true
    }

    /// Whether the parent still holds the record.
    pub fn is_attached(&self) -> bool {
        self.state.strong_count() > 0
    }
}

impl Drop for ParentLink {
    /// A child that vanishes without reporting still unblocks its parent.
    fn drop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut status = state.status.lock();
        match *status {
            ChildStatus::Pending => {
                *status = ChildStatus::LoadFailed;
                drop(status);
                state.loaded.raise();
            }
            ChildStatus::Loaded => {
                *status = ChildStatus::Terminated(ERROR);
                drop(status);
                state.exited.raise();
            }
            _ => {}
        }
    }
}

/// A record created before the child's pid is known.
#[derive(Debug)]
pub struct PendingChild {
    state: Arc<ChildState>,
}

impl PendingChild {
    /// Create a pending record and the link to hand to the new child.
    pub fn new() -> (Self, ParentLink) {
        let state = Arc::new(ChildState::new());
        let link = ParentLink {
            state: Arc::downgrade(&state),
        };
        (Self { state }, link)
    }

    /// Bind the record to the pid the spawner assigned.
    pub fn into_record(self, pid: Pid) -> ChildRecord {
        ChildRecord {
            pid,
            state: self.state,
        }
    }
}

/// Parent-owned bookkeeping for one spawned child.
#[derive(Debug)]
pub struct ChildRecord {
    pid: Pid,
    state: Arc<ChildState>,
}

impl ChildRecord {
    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn status(&self) -> ChildStatus {
        *self.state.status.lock()
    }

    /// Block until the child has finished loading. Returns whether it
    /// loaded successfully.
    pub fn wait_loaded(&self) -> bool {
        if self.status() == ChildStatus::Pending {
            self.state.loaded.wait();
        }
        match self.status() {
            ChildStatus::Loaded | ChildStatus::Terminated(_) => true,
            _ => false,
        }
    }

    /// Block until the child terminates and return its exit status.
    ///
    /// A child that never loaded has no status to deliver: `ERROR`.
    pub fn wait_exit(&self) -> i32 {
        loop {
            match self.status() {
                ChildStatus::Terminated(status) => return status,
                ChildStatus::LoadFailed => return ERROR,
                ChildStatus::Pending => self.state.loaded.wait(),
                ChildStatus::Loaded => self.state.exited.wait(),
            }
        }
    }
}

/// All live child records of one process, keyed by pid.
#[derive(Debug, Default)]
pub struct ChildRegistry {
    children: BTreeMap<Pid, ChildRecord>,
}

impl ChildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: ChildRecord) {
        self.children.insert(record.pid, record);
    }

    pub fn get(&self, pid: Pid) -> Option<&ChildRecord> {
        self.children.get(&pid)
    }

    /// Remove and release one record.
    pub fn remove(&mut self, pid: Pid) -> Option<ChildRecord> {
        self.children.remove(&pid)
    }

    /// Release every record, reaped or not. Returns how many were dropped.
    pub fn release_all(&mut self) -> usize {
        let n = self.children.len();
        self.children.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn spawn_record(pid: i32) -> (ChildRecord, ParentLink) {
        let (pending, link) = PendingChild::new();
        (pending.into_record(Pid::new(pid)), link)
    }

    #[test]
    fn test_load_then_exit() {
        let (record, link) = spawn_record(3);
        assert_eq!(record.status(), ChildStatus::Pending);
        assert!(link.report_load(true));
        assert!(!link.report_load(false));
        assert!(record.wait_loaded());

        assert!(link.report_exit(7));
        assert!(!link.report_exit(8));
        assert_eq!(record.wait_exit(), 7);
    }

    #[test]
    fn test_exit_requires_successful_load() {
        let (record, link) = spawn_record(3);
        link.report_load(false);
        assert!(!record.wait_loaded());
        assert!(!link.report_exit(0));
        assert_eq!(record.wait_exit(), ERROR);
    }

    #[test]
    fn test_released_record_makes_link_inert() {
        let (record, link) = spawn_record(4);
        link.report_load(true);
        drop(record);
        assert!(!link.is_attached());
        assert!(!link.report_exit(1));
    }

    #[test]
    fn test_dropped_link_unblocks_parent() {
        let (record, link) = spawn_record(5);
        drop(link);
        assert!(!record.wait_loaded());

        let (record, link) = spawn_record(6);
        link.report_load(true);
        drop(link);
        assert_eq!(record.wait_exit(), ERROR);
    }

    #[test]
    fn test_wait_blocks_until_child_exits() {
        let (record, link) = spawn_record(8);
        let child = thread::spawn(move || {
            link.report_load(true);
            link.report_exit(42);
        });
        assert!(record.wait_loaded());
        assert_eq!(record.wait_exit(), 42);
        child.join().unwrap();
    }

    #[test]
    fn test_registry_release_all() {
        let mut reg = ChildRegistry::new();
        let (a, link_a) = spawn_record(10);
        let (b, _link_b) = spawn_record(11);
        reg.insert(a);
        reg.insert(b);
        assert!(reg.get(Pid::new(10)).is_some());
        assert!(reg.get(Pid::new(12)).is_none());

        assert_eq!(reg.release_all(), 2);
        assert!(reg.is_empty());
        link_a.report_load(true);
        assert!(!link_a.report_exit(0));
    }
}
