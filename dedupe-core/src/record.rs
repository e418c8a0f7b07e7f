//! The inode-centric data model the rest of the pipeline operates on.

use std::path::PathBuf;

/// A 32-byte SHA-256 digest.
pub type Digest = [u8; 32];

/// Identifies an inode uniquely within a single run: the device it lives on
/// plus its inode number. Two paths with the same `DeviceIno` are the same
/// file on disk, however many directory entries point at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceIno {
    pub dev: u64,
    pub ino: u64,
}

/// A modification time at nanosecond resolution, kept as the raw
/// `(seconds, nanoseconds)` pair reported by `stat` rather than routed
/// through `SystemTime` so the relinker's ordering matches the filesystem's
/// own precision exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Mtime {
    pub secs: i64,
    pub nanos: i64,
}

/// Everything the pipeline knows about one inode: its stat metadata, every
/// path discovered that refers to it, and (once hashed) its content digest.
///
/// Created on first sighting during the walk, mutated only by appending
/// paths (more hard links found) and by filling in `digest` once hashed.
/// Dropped at the end of the run — there is no cross-run persistence beyond
/// the optional xattr cache on the files themselves.
#[derive(Debug)]
pub struct InodeRecord {
    pub id: DeviceIno,
    pub size: u64,
    pub mtime: Mtime,
    /// Discovered paths, in the order the walker found them. Never empty:
    /// a record only exists because some path produced it.
    pub paths: Vec<PathBuf>,
    pub digest: Option<Digest>,
}

impl InodeRecord {
    pub fn new(id: DeviceIno, size: u64, mtime: Mtime, first_path: PathBuf) -> Self {
        Self {
            id,
            size,
            mtime,
            paths: vec![first_path],
            digest: None,
        }
    }

    /// The path the hasher and relinker should prefer: the first one
    /// discovered, per the "try each path in insertion order" contract.
    pub fn primary_path(&self) -> &std::path::Path {
        self.paths[0].as_path()
    }

    /// Sort key used to pick the keeper of a duplicate group: oldest mtime
    /// first, inode number as a deterministic tiebreak.
    pub fn keeper_key(&self) -> (Mtime, u64) {
        (self.mtime, self.id.ino)
    }
}
