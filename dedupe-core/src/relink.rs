//! Keeper selection and the crash-safe link-then-rename replacement
//! protocol.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use tracing::{instrument, warn};

use crate::error::RelinkError;
use crate::group::DigestGroup;
use crate::record::{DeviceIno, InodeRecord};
use crate::report::{Report, RelinkedGroup, Stage};

/// Injected confirmation mechanism for `--interactive` mode, kept as a
/// trait so the prompt-reading loop can be swapped out in tests instead of
/// driving real stdin.
pub trait Confirm {
    /// Ask whether to relink this group. Called once per group, only when
    /// interactive mode is enabled.
    fn confirm(&mut self, keeper: &InodeRecord, duplicates: &[&InodeRecord]) -> bool;
}

/// Always confirms; used when `--interactive` is off.
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&mut self, _keeper: &InodeRecord, _duplicates: &[&InodeRecord]) -> bool {
        true
    }
}

/// Prompts on stdin/stdout, accepting only `y`/`yes`/`n`/`no` (case
/// sensitive, line-oriented), re-prompting on anything else.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, keeper: &InodeRecord, duplicates: &[&InodeRecord]) -> bool {
        println!("Keeper: {}", keeper.primary_path().display());
        for dup in duplicates {
            for path in &dup.paths {
                println!("  duplicate: {}", path.display());
            }
        }
        loop {
            print!("Relink this group? [y/n] ");
            let _ = io::stdout().flush();
            let mut line = String::new();
            if io::stdin().read_line(&mut line).unwrap_or(0) == 0 {
                return false;
            }
            match line.trim() {
                "y" | "yes" => return true,
                "n" | "no" => return false,
                _ => continue,
            }
        }
    }
}

/// Relink every digest group, mutating `inodes` in place (destroyed paths
/// are dropped from the non-keeper records; the keeper record is
/// untouched). Returns nothing — results accumulate in `report`.
#[instrument(level = "info", skip_all, fields(groups = groups.len(), dry_run, interactive))]
pub fn relink_all(
    groups: &[DigestGroup],
    inodes: &mut HashMap<DeviceIno, InodeRecord>,
    dry_run: bool,
    interactive: bool,
    confirm: &mut dyn Confirm,
    report: &mut Report,
) {
    for group in groups {
        report.duplicate_groups += 1;

        let mut members: Vec<DeviceIno> = group.members.clone();
        members.sort_by_key(|id| inodes[id].keeper_key());
        let keeper_id = members[0];
        let duplicate_ids: Vec<DeviceIno> = members[1..].to_vec();

        if interactive {
            let keeper = &inodes[&keeper_id];
            let duplicates: Vec<&InodeRecord> = duplicate_ids.iter().map(|id| &inodes[id]).collect();
            let approved = confirm.confirm(keeper, &duplicates);
            if !approved {
                continue;
            }
        }

        let keeper_paths = inodes[&keeper_id].paths.clone();
        let keeper_size = inodes[&keeper_id].size;

        let mut replaced_paths = Vec::new();
        for dup_id in &duplicate_ids {
            let dup_paths = inodes[dup_id].paths.clone();
            for dest in dup_paths {
                if dry_run {
                    replaced_paths.push(dest.clone());
                    report.record_relink(keeper_size);
                    continue;
                }
                match relink_one(&keeper_paths, &dest) {
                    Ok(()) => {
                        replaced_paths.push(dest.clone());
                        report.record_relink(keeper_size);
                    }
                    Err(err) => {
                        warn!(path = %dest.display(), error = %err, "relink failed");
                        report.push_diagnostic(Stage::Relink, dest, err.to_string());
                    }
                }
            }
        }

        if !replaced_paths.is_empty() {
            report.groups.push(RelinkedGroup {
                keeper_path: keeper_paths[0].clone(),
                replaced_paths,
                file_size: keeper_size,
            });
        }

        if !dry_run {
            // The duplicate inodes' paths now resolve to the keeper's inode;
            // drop them from the model so later stages don't see stale state.
            for dup_id in &duplicate_ids {
                inodes.remove(dup_id);
            }
        }
    }
}

/// Replace `dest` with a hard link to one of `keeper_paths`, via a
/// temporary link in `dest`'s directory followed by an atomic rename
/// ("why link-then-rename" rather than unlink-then-link).
fn relink_one(keeper_paths: &[PathBuf], dest: &Path) -> Result<(), RelinkError> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));

    let temp = create_temp_link(parent, dest, keeper_paths)?;

    fs::rename(&temp, dest).map_err(|source| {
        let _ = fs::remove_file(&temp);
        RelinkError::RenameFailed {
            temp: temp.clone(),
            dest: dest.to_path_buf(),
            source,
        }
    })
}

/// Create a uniquely-named temporary hard link to one of `keeper_paths` in
/// `parent`. Retries with a fresh random suffix on an `AlreadyExists`
/// collision; tries the next keeper path if linking from the current one
/// fails for any other reason.
fn create_temp_link(parent: &Path, dest: &Path, keeper_paths: &[PathBuf]) -> Result<PathBuf, RelinkError> {
    let mut last_error = None;

    for keeper_path in keeper_paths {
        for _attempt in 0..8 {
            let temp = parent.join(format!(".tmp{:08x}~", rand::random::<u32>()));
            match fs::hard_link(keeper_path, &temp) {
                Ok(()) => return Ok(temp),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => {
                    last_error = Some(err);
                    break;
                }
            }
        }
    }

    Err(RelinkError::TempLinkFailed {
        dest: dest.to_path_buf(),
        last_error: last_error
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "no keeper path could be linked from")),
    })
}
