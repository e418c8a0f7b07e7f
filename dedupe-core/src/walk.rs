//! Recursive directory walker.
//!
//! Descent uses a directory-relative open + readdir pattern: every child is
//! resolved against its parent's already-open directory file descriptor via
//! `openat`/`fstatat` rather than by re-resolving a path from the root. This
//! avoids the TOCTOU race a path-based walk would have if a path component
//! changed underneath it mid-walk, and lets us check `st_dev` on the fd we
//! are about to descend into rather than on a path that could have been
//! swapped for a different directory in between the check and the open.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use glob::MatchOptions;
use nix::dir::Dir;
use nix::fcntl::OFlag;
use nix::sys::stat::{fstat, fstatat, AtFlags, Mode};
use tracing::{debug, instrument, warn};

use crate::error::{DedupeError, WalkError};
use crate::options::Options;
use crate::record::{DeviceIno, InodeRecord, Mtime};
use crate::report::{Report, Stage};

const GLOB_OPTS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Walk every root in `options.roots`, returning one `InodeRecord` per
/// distinct inode discovered (the inode coalescer is folded into the walk
/// itself: records are looked up and appended to in place as paths arrive).
#[instrument(level = "info", skip_all, fields(roots = options.roots.len()))]
pub fn walk(options: &Options, report: &mut Report) -> Result<HashMap<DeviceIno, InodeRecord>, DedupeError> {
    let mut inodes: HashMap<DeviceIno, InodeRecord> = HashMap::new();

    let first_root = options.roots.first().expect("Options::roots is never empty");
    let root_meta = std::fs::metadata(first_root).map_err(|source| DedupeError::RootStat {
        path: first_root.clone(),
        source,
    })?;
    if !root_meta.is_dir() {
        return Err(DedupeError::RootNotADirectory {
            path: first_root.clone(),
        });
    }
    let root_device = root_meta.dev();

    for root in &options.roots {
        walk_root(root, root_device, options, &mut inodes, report);
    }

    Ok(inodes)
}

fn walk_root(
    root: &Path,
    root_device: u64,
    options: &Options,
    inodes: &mut HashMap<DeviceIno, InodeRecord>,
    report: &mut Report,
) {
    let dir = match Dir::open(root, OFlag::O_RDONLY | OFlag::O_DIRECTORY | OFlag::O_NOFOLLOW, Mode::empty()) {
        Ok(dir) => dir,
        Err(errno) => {
            let err = WalkError::OpenDir { path: root.to_path_buf(), source: errno };
            report.push_diagnostic(Stage::Walk, root.to_path_buf(), err.to_string());
            return;
        }
    };

    match fstat(dir.as_fd()) {
        Ok(stat) if stat.st_dev == root_device => {}
        Ok(_) => {
            let err = WalkError::CrossDevice { path: root.to_path_buf() };
            report.push_diagnostic(Stage::Walk, root.to_path_buf(), err.to_string());
            return;
        }
        Err(errno) => {
            let err = WalkError::Stat { path: root.to_path_buf(), source: errno };
            report.push_diagnostic(Stage::Walk, root.to_path_buf(), err.to_string());
            return;
        }
    }

    walk_dir(dir, root.to_path_buf(), root_device, options, inodes, report);
}

/// Recurse into an already-open, already-device-checked directory.
fn walk_dir(
    dir: Dir,
    dir_path: PathBuf,
    root_device: u64,
    options: &Options,
    inodes: &mut HashMap<DeviceIno, InodeRecord>,
    report: &mut Report,
) {
    let dir_fd: RawFd = dir.as_raw_fd();

    for entry_result in dir {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(errno) => {
                let err = WalkError::ReadDir { path: dir_path.clone(), source: errno };
                report.push_diagnostic(Stage::Walk, dir_path.clone(), err.to_string());
                continue;
            }
        };

        let name_cstr = entry.file_name();
        let name_bytes = name_cstr.to_bytes();
        if name_bytes == b"." || name_bytes == b".." {
            continue;
        }
        // Filenames on Linux are arbitrary bytes, not necessarily UTF-8;
        // build the path straight from the dirent bytes rather than through
        // a lossy string conversion, or a non-UTF-8 name would end up
        // stored (and later looked up) under a corrupted path.
        let name = OsStr::from_bytes(name_bytes);

        if is_excluded(&dir_path, name, &options.excludes) {
            debug!(path = %dir_path.join(name).display(), "excluded by pattern");
            continue;
        }

        let child_path = dir_path.join(name);

        // SAFETY: `dir_fd` stays valid for the lifetime of this loop body —
        // the `Dir` it came from is only dropped once the surrounding `for`
        // loop (which owns it) finishes iterating.
        let parent_fd = unsafe { BorrowedFd::borrow_raw(dir_fd) };

        let file_type = entry.file_type();
        let is_dir = file_type.map(|t| t == nix::dir::Type::Directory);
        let is_dir = match is_dir {
            Some(known) => known,
            None => match fstatat(parent_fd, name_cstr, AtFlags::AT_SYMLINK_NOFOLLOW) {
                Ok(stat) => stat.st_mode & libc::S_IFMT == libc::S_IFDIR,
                Err(errno) => {
                    let err = WalkError::Stat { path: child_path.clone(), source: errno };
                    report.push_diagnostic(Stage::Walk, child_path.clone(), err.to_string());
                    continue;
                }
            },
        };

        if is_dir {
            let subdir = match Dir::openat(parent_fd, name_cstr, OFlag::O_RDONLY | OFlag::O_DIRECTORY | OFlag::O_NOFOLLOW, Mode::empty()) {
                Ok(subdir) => subdir,
                Err(errno) => {
                    let err = WalkError::OpenDir { path: child_path.clone(), source: errno };
                    report.push_diagnostic(Stage::Walk, child_path.clone(), err.to_string());
                    continue;
                }
            };
            match fstat(subdir.as_fd()) {
                Ok(stat) if stat.st_dev == root_device => {
                    walk_dir(subdir, child_path, root_device, options, inodes, report);
                }
                Ok(_) => {
                    let err = WalkError::CrossDevice { path: child_path.clone() };
                    warn!(path = %child_path.display(), "{}", err);
                    report.push_diagnostic(Stage::Walk, child_path, err.to_string());
                }
                Err(errno) => {
                    let err = WalkError::Stat { path: child_path.clone(), source: errno };
                    report.push_diagnostic(Stage::Walk, child_path.clone(), err.to_string());
                }
            }
            continue;
        }

        let is_regular_file = file_type
            .map(|t| t == nix::dir::Type::File)
            .unwrap_or(false)
            || file_type.is_none();
        if !is_regular_file {
            continue;
        }

        match fstatat(parent_fd, name_cstr, AtFlags::AT_SYMLINK_NOFOLLOW) {
            Ok(stat) => {
                if stat.st_mode & libc::S_IFMT != libc::S_IFREG {
                    continue;
                }
                record_file(inodes, report, child_path, &stat);
            }
            Err(errno) => {
                let err = WalkError::Stat { path: child_path.clone(), source: errno };
                report.push_diagnostic(Stage::Walk, child_path, err.to_string());
            }
        }
    }
}

fn record_file(
    inodes: &mut HashMap<DeviceIno, InodeRecord>,
    report: &mut Report,
    path: PathBuf,
    stat: &nix::sys::stat::FileStat,
) {
    let id = DeviceIno {
        dev: stat.st_dev,
        ino: stat.st_ino,
    };
    let mtime = Mtime {
        secs: stat.st_mtime,
        nanos: stat.st_mtime_nsec,
    };

    report.files_seen += 1;
    match inodes.get_mut(&id) {
        Some(record) => record.paths.push(path),
        None => {
            report.inodes_seen += 1;
            inodes.insert(id, InodeRecord::new(id, stat.st_size as u64, mtime, path));
        }
    }
}

/// An entry is excluded if its name, or its path relative to the walk root,
/// matches any exclusion pattern. `/` in a pattern only ever matches a
/// literal `/` in the candidate — wildcards never cross a path separator.
///
/// Exclusion patterns are supplied as UTF-8 strings on the command line, so
/// matching necessarily goes through a lossy conversion of the candidate
/// name; that conversion is only ever used for pattern matching here, never
/// for the path that gets stored in an `InodeRecord`.
fn is_excluded(dir_path: &Path, name: &OsStr, excludes: &[glob::Pattern]) -> bool {
    if excludes.is_empty() {
        return false;
    }
    let name_lossy = name.to_string_lossy();
    let full = dir_path.join(name);
    excludes.iter().any(|pattern| {
        pattern.matches_with(&name_lossy, GLOB_OPTS) || pattern.matches_path_with(&full, GLOB_OPTS)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn excludes_by_bare_name() {
        let patterns = vec![glob::Pattern::new("b").unwrap()];
        assert!(is_excluded(Path::new("t"), OsStr::new("b"), &patterns));
        assert!(!is_excluded(Path::new("t"), OsStr::new("a"), &patterns));
    }

    #[test]
    fn glob_does_not_cross_separator() {
        let patterns = vec![glob::Pattern::new("*.tmp").unwrap()];
        assert!(is_excluded(Path::new("a/b"), OsStr::new("x.tmp"), &patterns));
    }

    #[test]
    fn non_utf8_name_is_stored_without_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let raw_name = OsStr::from_bytes(b"not-\xffutf8");
        let path = dir.path().join(raw_name);
        fs::write(&path, b"payload").unwrap();

        let mut report = Report::new();
        let options = Options::new(vec![dir.path().to_path_buf()]);
        let inodes = walk(&options, &mut report).unwrap();

        assert_eq!(inodes.len(), 1);
        let record = inodes.values().next().unwrap();
        assert_eq!(record.paths[0], path);
        assert!(record.paths[0].exists());
    }

    #[test]
    fn walk_discovers_regular_files_and_coalesces_hardlinks() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, b"hello").unwrap();
        fs::hard_link(&a, &b).unwrap();

        let mut report = Report::new();
        let options = Options::new(vec![dir.path().to_path_buf()]);
        let inodes = walk(&options, &mut report).unwrap();

        assert_eq!(inodes.len(), 1);
        assert_eq!(report.files_seen, 2);
        assert_eq!(report.inodes_seen, 1);
        let record = inodes.values().next().unwrap();
        assert_eq!(record.paths.len(), 2);
    }
}
