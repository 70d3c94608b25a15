//! Filesystem collaborator and its global serialization
//!
//! The filesystem behind `create`/`remove`/`open` is not internally
//! thread-safe. Every call into it goes through one [`FsLock`] shared by
//! all processes; the trait's methods take `&mut self`, so holding the lock
//! guard is the only way to reach them.
//!
//! Open-file operations are methods on the filesystem that take the handle,
//! which keeps handle I/O under the same lock.

pub mod ramfs;

use spin::{Mutex, MutexGuard};

pub use ramfs::RamFs;

/// Filesystem collaborator.
pub trait FileSystem: Send {
    /// Open-file handle. Owned by exactly one descriptor-table entry.
    type File: Send;

    /// Create a file of `initial_size` zero bytes. Fails if it exists.
    fn create(&mut self, name: &str, initial_size: u32) -> bool;

    /// Remove a file by name. Open handles stay usable.
    fn remove(&mut self, name: &str) -> bool;

    /// Open a file by name, positioned at offset 0.
    fn open(&mut self, name: &str) -> Option<Self::File>;

    /// Current size of the file in bytes.
    fn length(&mut self, file: &Self::File) -> u32;

    /// Read at the handle's position, advancing it. Returns bytes read.
    fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> usize;

    /// Write at the handle's position, advancing it. Returns bytes written.
    fn write(&mut self, file: &mut Self::File, data: &[u8]) -> usize;

    /// Move the handle's position.
    fn seek(&mut self, file: &mut Self::File, pos: u32);

    /// The handle's position.
    fn tell(&mut self, file: &Self::File) -> u32;

    /// Release a handle.
    fn close(&mut self, file: Self::File);
}

/// The single mutual-exclusion domain around the filesystem.
///
/// Shared between processes as `Arc<FsLock<F>>`.
pub struct FsLock<F> {
    inner: Mutex<F>,
}

impl<F: FileSystem> FsLock<F> {
    pub const fn new(fs: F) -> Self {
        Self {
            inner: Mutex::new(fs),
        }
    }

    /// Acquire the lock. Released when the guard drops.
    pub fn lock(&self) -> MutexGuard<'_, F> {
        self.inner.lock()
    }

    /// Run `f` with the lock held, releasing it on every exit path.
    pub fn with<R>(&self, f: impl FnOnce(&mut F) -> R) -> R {
        let mut fs = self.inner.lock();
        f(&mut fs)
    }

    /// Whether some thread currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

impl<F> core::fmt::Debug for FsLock<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "FsLock(locked={})", self.inner.is_locked())
    }
}
