//! Top-level pipeline orchestration: wires the walker, bucketizer, hasher,
//! digest grouper and relinker together in a fixed, strictly sequential
//! order.

use tracing::{info, instrument};

use crate::bucket::build_hash_worklist;
use crate::error::DedupeError;
use crate::group::group_by_digest;
use crate::hash::hash_inode;
use crate::options::Options;
use crate::relink::{relink_all, AlwaysConfirm, Confirm, StdinConfirm};
use crate::report::Report;

/// Run one full deduplication pass over `options.roots`.
///
/// Returns the completed [`Report`] on success; the only failures that abort
/// the whole run are the ones in [`DedupeError`] (a bad first root). All
/// other failures are per-file or per-path and are folded into the returned
/// report's diagnostics.
pub fn run(options: &Options) -> Result<Report, DedupeError> {
    run_with_progress(options, None)
}

/// Same as [`run`], but invokes `on_hash_progress` (if given) with each
/// candidate's size once it has been hashed (successfully or not), in
/// worklist order. This is the hook a CLI's progress bar advances by; the
/// library itself never renders anything.
#[instrument(level = "info", skip_all, fields(roots = options.roots.len(), dry_run = options.dry_run, interactive = options.interactive, use_xattrs = options.use_xattrs))]
pub fn run_with_progress(
    options: &Options,
    mut on_hash_progress: Option<&mut dyn FnMut(u64)>,
) -> Result<Report, DedupeError> {
    let mut report = Report::new();

    let mut inodes = crate::walk::walk(options, &mut report)?;
    info!(inodes = inodes.len(), "walk complete");

    let worklist = build_hash_worklist(&inodes);
    report.bytes_hashed = worklist.total_bytes;
    info!(candidates = worklist.candidates.len(), total_bytes = worklist.total_bytes, "hash worklist built");

    for id in &worklist.candidates {
        if let Some(record) = inodes.get_mut(id) {
            hash_inode(record, options.use_xattrs, &mut report);
            if let Some(callback) = on_hash_progress.as_deref_mut() {
                callback(record.size);
            }
        }
    }

    let groups = group_by_digest(&inodes);
    info!(groups = groups.len(), "digest grouping complete");

    let mut confirm: Box<dyn Confirm> = if options.interactive {
        Box::new(StdinConfirm)
    } else {
        Box::new(AlwaysConfirm)
    };

    relink_all(
        &groups,
        &mut inodes,
        options.dry_run,
        options.interactive,
        confirm.as_mut(),
        &mut report,
    );

    Ok(report)
}
