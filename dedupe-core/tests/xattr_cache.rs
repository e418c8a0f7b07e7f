//! The xattr digest cache produces identical results to an uncached run,
//! and a second `--use-xattrs` run reuses the cache instead of rehashing.
//!
//! Extended attributes aren't supported on every CI filesystem (notably
//! overlayfs and some tmpfs configurations), so these tests skip themselves
//! rather than fail when the first xattr write comes back unsupported.

use std::fs;

use dedupe_core::{run, Options};
use tempfile::TempDir;

fn xattrs_supported(dir: &std::path::Path) -> bool {
    let probe = dir.join(".xattr-probe");
    fs::write(&probe, b"probe").unwrap();
    let supported = xattr::set(&probe, "user.dedupe.probe", b"1").is_ok();
    let _ = fs::remove_file(&probe);
    supported
}

#[test]
fn xattr_cache_produces_same_digest_as_uncached() {
    let dir_cached = TempDir::new().unwrap();
    if !xattrs_supported(dir_cached.path()) {
        eprintln!("skipping: xattrs unsupported on this filesystem");
        return;
    }
    let dir_plain = TempDir::new().unwrap();

    for dir in [dir_cached.path(), dir_plain.path()] {
        fs::write(dir.join("a"), b"cache me please").unwrap();
        fs::write(dir.join("b"), b"cache me please").unwrap();
    }

    let mut cached_options = Options::new(vec![dir_cached.path().to_path_buf()]);
    cached_options.use_xattrs = true;
    let cached_report = run(&cached_options).unwrap();

    let plain_options = Options::new(vec![dir_plain.path().to_path_buf()]);
    let plain_report = run(&plain_options).unwrap();

    assert_eq!(cached_report.relinked_count, plain_report.relinked_count);
    assert_eq!(cached_report.relinked_size, plain_report.relinked_size);
}

#[test]
fn second_xattr_run_reuses_cache_and_is_idempotent() {
    let dir = TempDir::new().unwrap();
    if !xattrs_supported(dir.path()) {
        eprintln!("skipping: xattrs unsupported on this filesystem");
        return;
    }
    fs::write(dir.path().join("a"), b"cache me twice").unwrap();
    fs::write(dir.path().join("b"), b"cache me twice").unwrap();

    let mut options = Options::new(vec![dir.path().to_path_buf()]);
    options.use_xattrs = true;

    let first = run(&options).unwrap();
    assert_eq!(first.relinked_count, 1);

    let second = run(&options).unwrap();
    assert_eq!(second.relinked_count, 0);
}
