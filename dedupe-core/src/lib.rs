//! Content-addressed hard-link deduplication engine.
//!
//! Walks one or more directory trees, coalesces directory entries by inode,
//! buckets inodes by size, hashes the inodes that share a size with at least
//! one other inode, groups by digest, and replaces every non-keeper path in a
//! digest group with a hard link to the keeper via a crash-safe
//! link-then-rename protocol. See [`run`] for the orchestrating entry point.

pub mod bucket;
pub mod error;
pub mod group;
pub mod hash;
pub mod options;
pub mod record;
pub mod relink;
pub mod report;
mod run;
pub mod walk;

pub use error::DedupeError;
pub use options::Options;
pub use relink::{AlwaysConfirm, Confirm, StdinConfirm};
pub use report::{Diagnostic, RelinkedGroup, Report, Stage};
pub use run::{run, run_with_progress};
