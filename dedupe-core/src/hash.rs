//! Content hashing and the optional extended-attribute digest cache.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use sha2::{Digest as _, Sha256};
use tracing::{debug, instrument, trace};
use xattr::FileExt;

use crate::error::HashError;
use crate::record::{Digest, InodeRecord, Mtime};
use crate::report::{Report, Stage};

/// SHA-256 feeds the mapping in chunks this large purely to bound the size
/// of any one `Hasher::update` call on very large files; the digest is
/// bit-identical to a single-shot hash of the whole file. Per-file progress
/// is reported at inode granularity by `run_with_progress`, not per chunk.
const CHUNK_SIZE: usize = 32 * 1024 * 1024;

const XATTR_HASH: &str = "user.dedupe.hash";
const XATTR_HASH_MTIME: &str = "user.dedupe.hash_mtime";

/// Hash one candidate inode in place, trying each of its known paths until
/// one opens. Leaves `record.digest` unset (and logs a diagnostic) if none
/// of its paths could be opened.
#[instrument(level = "debug", skip_all, fields(size = record.size, paths = record.paths.len()))]
pub fn hash_inode(record: &mut InodeRecord, use_xattrs: bool, report: &mut Report) {
    let mut last_open_error = None;

    for path in record.paths.clone() {
        let file = match open_for_hashing(&path) {
            Ok(file) => file,
            Err(err) => {
                last_open_error = Some(err);
                continue;
            }
        };

        if use_xattrs {
            if let Some(digest) = read_cached_digest(&file, &path, record.mtime) {
                trace!(path = %path.display(), "xattr cache hit");
                record.digest = Some(digest);
                return;
            }
        }

        match compute_digest(&file, &path, record.size) {
            Ok(digest) => {
                record.digest = Some(digest);
                if use_xattrs {
                    write_cached_digest(&file, &path, digest, record.mtime);
                }
                return;
            }
            Err(err) => {
                report.push_diagnostic(Stage::Hash, path.clone(), err.to_string());
            }
        }
    }

    let err = HashError::NoOpenablePath {
        id: record.id,
        last_error: last_open_error
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "every path failed to hash")),
    };
    report.push_diagnostic(Stage::Hash, record.primary_path().to_path_buf(), err.to_string());
}

fn open_for_hashing(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NOFOLLOW)
        .open(path)
}

fn compute_digest(file: &File, path: &Path, size: u64) -> Result<Digest, HashError> {
    if size == 0 {
        return Ok(Sha256::digest([]).into());
    }

    // SAFETY: the file is opened read-only for the duration of this call and
    // not otherwise touched by this process; concurrent external mutation of
    // the mapped file is a pre-existing risk of any mmap-based hasher and is
    // accepted per the single-filesystem, single-writer assumptions of this tool.
    let mmap = unsafe { memmap2::Mmap::map(file) }.map_err(|source| HashError::Mmap {
        path: path.to_path_buf(),
        source,
    })?;

    // Hash exactly `size` bytes — the length recorded by the walk's stat —
    // not however much the mapping happens to cover now. A file that grew
    // since it was walked must not have its extra tail folded into the
    // digest; a file that shrank can't honor the contract at all.
    let size = size as usize;
    let region = mmap.get(..size).ok_or_else(|| HashError::ShorterThanRecorded {
        path: path.to_path_buf(),
        expected: size as u64,
        actual: mmap.len() as u64,
    })?;

    let mut hasher = Sha256::new();
    for chunk in region.chunks(CHUNK_SIZE) {
        hasher.update(chunk);
    }
    Ok(hasher.finalize().into())
}

fn encode_mtime(mtime: Mtime) -> [u8; 16] {
    let mut buf = [0u8; 16];
    buf[0..8].copy_from_slice(&mtime.secs.to_be_bytes());
    buf[8..16].copy_from_slice(&mtime.nanos.to_be_bytes());
    buf
}

fn decode_mtime(bytes: &[u8]) -> Option<Mtime> {
    if bytes.len() != 16 {
        return None;
    }
    let secs = i64::from_be_bytes(bytes[0..8].try_into().ok()?);
    let nanos = i64::from_be_bytes(bytes[8..16].try_into().ok()?);
    Some(Mtime { secs, nanos })
}

/// Read the digest cache, honoring the mtime-match requirement and the
/// "digest present, mtime companion absent" migration exception.
fn read_cached_digest(file: &File, path: &Path, current_mtime: Mtime) -> Option<Digest> {
    let raw_digest = match file.get_xattr(XATTR_HASH) {
        Ok(Some(bytes)) if bytes.len() == 32 => bytes,
        Ok(_) => return None,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "xattr read failed, ignoring cache");
            return None;
        }
    };

    match file.get_xattr(XATTR_HASH_MTIME) {
        Ok(Some(bytes)) => match decode_mtime(&bytes) {
            Some(stored) if stored == current_mtime => {}
            _ => return None,
        },
        Ok(None) => {
            // No mtime companion: accept unconditionally (migration path).
        }
        Err(err) => {
            debug!(path = %path.display(), error = %err, "xattr mtime read failed, ignoring cache");
            return None;
        }
    }

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&raw_digest);
    Some(digest)
}

/// Write both cache attributes. Failures are advisory only: logged,
/// never surfaced as a diagnostic or reflected in the run's exit status.
fn write_cached_digest(file: &File, path: &Path, digest: Digest, mtime: Mtime) {
    if let Err(err) = file.set_xattr(XATTR_HASH, &digest) {
        debug!(path = %path.display(), error = %err, "failed to write xattr digest cache");
        return;
    }
    if let Err(err) = file.set_xattr(XATTR_HASH_MTIME, &encode_mtime(mtime)) {
        debug!(path = %path.display(), error = %err, "failed to write xattr mtime cache");
    }
}
