//! The configuration surface the library exposes to callers.

use std::path::PathBuf;

use glob::Pattern;

/// Options for one deduplication run. Built by the CLI from parsed flags,
/// or directly by library consumers.
#[derive(Debug, Clone)]
pub struct Options {
    /// Root directories to walk. The first root's device is the reference
    /// device for the whole run.
    pub roots: Vec<PathBuf>,
    /// Exclusion glob patterns, matched path-aware (`/` never matches a
    /// wildcard) against each directory entry's name.
    pub excludes: Vec<Pattern>,
    /// Skip all filesystem mutations; still populate the report.
    pub dry_run: bool,
    /// Prompt per duplicate group before relinking it.
    pub interactive: bool,
    /// Consult and maintain the `user.dedupe.hash*` xattr cache.
    pub use_xattrs: bool,
    /// Emit progress and duplicate-group detail via `tracing`.
    pub verbose: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from(".")],
            excludes: Vec::new(),
            dry_run: false,
            interactive: false,
            use_xattrs: false,
            verbose: false,
        }
    }
}

impl Options {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            ..Self::default()
        }
    }
}
