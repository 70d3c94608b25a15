//! Process state seen by the syscall layer
//!
//! A [`Process`] owns its address space, its resource table and the records
//! of the children it spawned, plus an optional link to its own record in
//! its parent's registry.
//!
//! # Design
//! - Resource table and child registry are private to the owning thread,
//!   so they need no lock
//! - Only the child record's shared state crosses threads

pub mod child;
pub mod fd_table;
pub mod signal;

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use core::fmt;

pub use child::{ChildRecord, ChildRegistry, ChildStatus, ParentLink, PendingChild};
pub use fd_table::{CloseTarget, Fd, FdTable, FdTableError};
pub use signal::Signal;

use crate::mm::AddressSpace;

/// A process identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct Pid(i32);

impl Pid {
    #[inline]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-creation collaborator.
pub trait Spawner: Send + Sync {
    /// Start a new process for `cmdline` asynchronously.
    ///
    /// The new process must report its load outcome through `parent` once
    /// its image is loaded (or failed to load). Returns `None` if no process
    /// could be created at all.
    fn spawn(&self, cmdline: &str, parent: ParentLink) -> Option<Pid>;
}

/// Lifecycle of the process itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Exited(i32),
}

/// The per-process record, generic over the open-file handle type.
pub struct Process<H> {
    pid: Pid,
    name: String,
    space: Box<dyn AddressSpace>,
    files: FdTable<H>,
    children: ChildRegistry,
    parent: Option<ParentLink>,
    state: RunState,
}

impl<H> Process<H> {
    /// Create a process. Its name is the first word of `cmdline`.
    pub fn new(
        pid: Pid,
        cmdline: &str,
        space: Box<dyn AddressSpace>,
        parent: Option<ParentLink>,
    ) -> Self {
        Self {
            pid,
            name: program_name(cmdline).to_string(),
            space,
            files: FdTable::new(),
            children: ChildRegistry::new(),
            parent,
            state: RunState::Running,
        }
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address_space(&self) -> &dyn AddressSpace {
        &*self.space
    }

    pub fn address_space_mut(&mut self) -> &mut dyn AddressSpace {
        &mut *self.space
    }

    pub fn files(&self) -> &FdTable<H> {
        &self.files
    }

    pub fn files_mut(&mut self) -> &mut FdTable<H> {
        &mut self.files
    }

    pub fn children(&self) -> &ChildRegistry {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut ChildRegistry {
        &mut self.children
    }

    /// Link to this process's record in its parent's registry.
    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn has_exited(&self) -> bool {
        matches!(self.state, RunState::Exited(_))
    }

    pub(crate) fn mark_exited(&mut self, status: i32) {
        self.state = RunState::Exited(status);
    }
}

impl<H> fmt::Debug for Process<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("open_files", &self.files.len())
            .field("children", &self.children.len())
            .field("state", &self.state)
            .finish()
    }
}

/// First whitespace-separated word of a command line.
pub fn program_name(cmdline: &str) -> &str {
    cmdline.split_whitespace().next().unwrap_or("")
}
