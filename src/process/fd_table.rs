//! Per-Process Resource Table
//!
//! Maps small process-local descriptors to open-file handles.
//!
//! # Design
//! - Descriptors start at `FIRST_USER_FD` and only ever increase
//! - A closed descriptor is never handed out again by the same table
//! - 0 and 1 are the console and never appear here
//! - `close` and `close_all` share one traversal, selected by [`CloseTarget`]

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::config::fds::{FIRST_USER_FD, MAX_OPEN_FILES, STDIN, STDOUT};

/// A file descriptor.
///
/// This is a newtype to prevent using arbitrary integers as table keys.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct Fd(i32);

impl Fd {
    /// Reserved descriptor for console input.
    pub const STDIN: Self = Self(STDIN);

    /// Reserved descriptor for console output.
    pub const STDOUT: Self = Self(STDOUT);

    /// First descriptor handed out by `open`.
    pub const FIRST_USER: Self = Self(FIRST_USER_FD);

    #[inline]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

/// Error type for resource table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdTableError {
    /// The table is full or descriptors ran out.
    Exhausted,
    /// No open file under this descriptor.
    NotFound,
}

impl core::fmt::Display for FdTableError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Exhausted => write!(f, "no descriptor available"),
            Self::NotFound => write!(f, "bad file descriptor"),
        }
    }
}

/// Which entries a close traversal removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseTarget {
    One(Fd),
    All,
}

impl CloseTarget {
    fn matches(self, fd: Fd) -> bool {
        match self {
            Self::One(target) => target == fd,
            Self::All => true,
        }
    }
}

/// Resource table of one process, generic over the open-file handle.
#[derive(Debug)]
pub struct FdTable<H> {
    entries: BTreeMap<Fd, H>,
    next: i32,
}

impl<H> FdTable<H> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next: Fd::FIRST_USER.as_raw(),
        }
    }

    /// Wrap `handle` under the next descriptor.
    ///
    /// On exhaustion the handle is given back so the caller can release it.
    pub fn insert(&mut self, handle: H) -> Result<Fd, (FdTableError, H)> {
        if self.entries.len() >= MAX_OPEN_FILES {
            return Err((FdTableError::Exhausted, handle));
        }
        let Some(after) = self.next.checked_add(1) else {
            return Err((FdTableError::Exhausted, handle));
        };
        let fd = Fd(self.next);
        self.next = after;
        self.entries.insert(fd, handle);
        Ok(fd)
    }

    /// Look up the handle behind `fd`.
    #[inline]
    pub fn lookup(&self, fd: Fd) -> Result<&H, FdTableError> {
        self.entries.get(&fd).ok_or(FdTableError::NotFound)
    }

    /// Look up the handle behind `fd` for I/O.
    #[inline]
    pub fn lookup_mut(&mut self, fd: Fd) -> Result<&mut H, FdTableError> {
        self.entries.get_mut(&fd).ok_or(FdTableError::NotFound)
    }

    /// Remove every entry selected by `target`, passing each handle to
    /// `release`. Returns how many entries were removed.
    pub fn close_matching(&mut self, target: CloseTarget, mut release: impl FnMut(H)) -> usize {
        let victims: Vec<Fd> = self
            .entries
            .keys()
            .copied()
            .filter(|fd| target.matches(*fd))
            .collect();
        for fd in &victims {
            if let Some(handle) = self.entries.remove(fd) {
                release(handle);
            }
        }
        victims.len()
    }

    /// Close exactly one descriptor. Returns whether it was open.
    pub fn close(&mut self, fd: Fd, release: impl FnMut(H)) -> bool {
        self.close_matching(CloseTarget::One(fd), release) == 1
    }

    /// Close every descriptor. Used when the process terminates.
    pub fn close_all(&mut self, release: impl FnMut(H)) -> usize {
        self.close_matching(CloseTarget::All, release)
    }

    /// Number of open descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<H> Default for FdTable<H> {
    fn default() -> Self {
        Self::new()
    }
}
