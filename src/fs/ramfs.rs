//! In-memory filesystem
//!
//! A flat namespace of growable files, each capped at `MAX_FILE_SIZE`.
//! Removal only unlinks the name: an inode lives on while any handle still
//! refers to it.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use super::FileSystem;
use crate::config::{MAX_FILE_SIZE, NAME_MAX};

type InodeId = u64;

#[derive(Debug, Default)]
struct Inode {
    data: Vec<u8>,
    open_count: usize,
    unlinked: bool,
}

/// Open handle into a [`RamFs`].
#[derive(Debug)]
pub struct RamFile {
    inode: InodeId,
    pos: u32,
}

#[derive(Debug, Default)]
pub struct RamFs {
    names: BTreeMap<String, InodeId>,
    inodes: BTreeMap<InodeId, Inode>,
    next_inode: InodeId,
}

impl RamFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` is currently linked.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Total number of live handles across all files.
    pub fn open_handles(&self) -> usize {
        self.inodes.values().map(|i| i.open_count).sum()
    }

    fn valid_name(name: &str) -> bool {
        !name.is_empty() && name.len() <= NAME_MAX
    }

    fn release_if_orphaned(&mut self, id: InodeId) {
        if let Some(inode) = self.inodes.get(&id) {
            if inode.unlinked && inode.open_count == 0 {
                self.inodes.remove(&id);
            }
        }
    }
}

impl FileSystem for RamFs {
    type File = RamFile;

    fn create(&mut self, name: &str, initial_size: u32) -> bool {
        if !Self::valid_name(name) || self.names.contains_key(name) {
            return false;
        }
        if initial_size as usize > MAX_FILE_SIZE {
            return false;
        }
        let id = self.next_inode;
        self.next_inode += 1;
        self.inodes.insert(
            id,
            Inode {
                data: alloc::vec![0; initial_size as usize],
                ..Inode::default()
            },
        );
        self.names.insert(name.to_string(), id);
        true
    }

    fn remove(&mut self, name: &str) -> bool {
        let Some(id) = self.names.remove(name) else {
            return false;
        };
        if let Some(inode) = self.inodes.get_mut(&id) {
            inode.unlinked = true;
        }
        self.release_if_orphaned(id);
        true
    }

    fn open(&mut self, name: &str) -> Option<RamFile> {
        let id = *self.names.get(name)?;
        let inode = self.inodes.get_mut(&id)?;
        inode.open_count += 1;
        Some(RamFile { inode: id, pos: 0 })
    }

    fn length(&mut self, file: &RamFile) -> u32 {
        self.inodes
            .get(&file.inode)
            .map_or(0, |i| i.data.len() as u32)
    }

    fn read(&mut self, file: &mut RamFile, buf: &mut [u8]) -> usize {
        let Some(inode) = self.inodes.get(&file.inode) else {
            return 0;
        };
        let start = (file.pos as usize).min(inode.data.len());
        let n = buf.len().min(inode.data.len() - start);
        buf[..n].copy_from_slice(&inode.data[start..start + n]);
        file.pos = file.pos.saturating_add(n as u32);
        n
    }

    fn write(&mut self, file: &mut RamFile, data: &[u8]) -> usize {
        let Some(inode) = self.inodes.get_mut(&file.inode) else {
            return 0;
        };
        let start = file.pos as usize;
        if start >= MAX_FILE_SIZE {
            return 0;
        }
        let n = data.len().min(MAX_FILE_SIZE - start);
        let end = start + n;
        if inode.data.len() < end {
            inode.data.resize(end, 0);
        }
        inode.data[start..end].copy_from_slice(&data[..n]);
        file.pos = file.pos.saturating_add(n as u32);
        n
    }

    fn seek(&mut self, file: &mut RamFile, pos: u32) {
        file.pos = pos;
    }

    fn tell(&mut self, file: &RamFile) -> u32 {
        file.pos
    }

    fn close(&mut self, file: RamFile) {
        if let Some(inode) = self.inodes.get_mut(&file.inode) {
            inode.open_count = inode.open_count.saturating_sub(1);
        }
        self.release_if_orphaned(file.inode);
    }
}
