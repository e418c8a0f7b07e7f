//! Error types for the dedupe-core crate.
//!
//! Per-path and per-inode failures inside a stage never abort the run (see
//! `report::Diagnostic`); the typed errors here are for the handful of
//! genuinely fatal conditions plus the internal error values a stage stores
//! alongside a diagnostic so the CLI can render something more specific
//! than a string.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::record::DeviceIno;

/// Errors that abort the walk of a single directory (but not the whole run).
#[derive(Error, Debug)]
pub enum WalkError {
    #[error("failed to open directory {path}: {source}")]
    OpenDir {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },

    #[error("failed to read directory entry in {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },

    #[error("failed to stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },

    #[error("{path} is on a different filesystem than the walk root; not descending")]
    CrossDevice { path: PathBuf },
}

/// Errors that prevent an inode from being hashed.
#[derive(Error, Debug)]
pub enum HashError {
    #[error("no path of inode {id:?} could be opened for reading: {last_error}")]
    NoOpenablePath {
        id: DeviceIno,
        last_error: io::Error,
    },

    #[error("failed to memory-map {path}: {source}")]
    Mmap {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path} is shorter than its recorded size ({actual} < {expected} bytes); file shrank since it was walked")]
    ShorterThanRecorded {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },
}

/// Errors that prevent a single destination path from being relinked. These
/// never abort the enclosing digest group; they are reported and the next
/// path is attempted.
#[derive(Error, Debug)]
pub enum RelinkError {
    #[error("could not create a temporary hard link next to {dest} from any keeper path: {last_error}")]
    TempLinkFailed {
        dest: PathBuf,
        last_error: io::Error,
    },

    #[error("failed to rename temporary link {temp} over {dest}: {source}")]
    RenameFailed {
        temp: PathBuf,
        dest: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The handful of conditions that abort the whole run.
#[derive(Error, Debug)]
pub enum DedupeError {
    #[error("failed to stat root directory {path}: {source}")]
    RootStat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path} is not a directory")]
    RootNotADirectory { path: PathBuf },

    #[error("invalid exclusion pattern {pattern:?}: {source}")]
    InvalidExclude {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}
