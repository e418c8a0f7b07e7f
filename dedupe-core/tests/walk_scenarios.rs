//! Walker-level invariants: paths are preserved and inode count never
//! rises, and nested-directory discovery works across multiple roots.

use std::fs;
use std::os::unix::fs::MetadataExt;

use dedupe_core::{run, Options};
use tempfile::TempDir;

#[test]
fn nested_directories_are_discovered_and_merged() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("sub/b");
    let c = dir.path().join("sub/deeper/c");
    fs::write(&a, b"payload").unwrap();
    fs::write(&b, b"payload").unwrap();
    fs::write(&c, b"payload").unwrap();

    let options = Options::new(vec![dir.path().to_path_buf()]);
    let report = run(&options).unwrap();

    assert_eq!(report.relinked_count, 2);
    assert!(a.exists() && b.exists() && c.exists());
    assert_eq!(fs::metadata(&a).unwrap().ino(), fs::metadata(&b).unwrap().ino());
    assert_eq!(fs::metadata(&a).unwrap().ino(), fs::metadata(&c).unwrap().ino());
}

/// After a run, every path that existed still exists, and no file ends up
/// spread across more inodes than it started with.
#[test]
fn paths_are_preserved_and_inode_count_never_increases() {
    let dir = TempDir::new().unwrap();
    let paths: Vec<_> = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|name| dir.path().join(name))
        .collect();
    for (i, path) in paths.iter().enumerate() {
        let contents = if i < 3 { b"dup".to_vec() } else { format!("unique-{i}").into_bytes() };
        fs::write(path, contents).unwrap();
    }

    let inode_count_before: std::collections::HashSet<u64> =
        paths.iter().map(|p| fs::metadata(p).unwrap().ino()).collect();

    let options = Options::new(vec![dir.path().to_path_buf()]);
    run(&options).unwrap();

    for path in &paths {
        assert!(path.exists(), "{path:?} should still exist after the run");
    }
    let inode_count_after: std::collections::HashSet<u64> =
        paths.iter().map(|p| fs::metadata(p).unwrap().ino()).collect();
    assert!(inode_count_after.len() <= inode_count_before.len());
}

/// Multiple root directories are all walked, and duplicates across roots
/// are merged just like duplicates within one root.
#[test]
fn multiple_roots_are_all_walked() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let x = dir_a.path().join("x");
    let y = dir_b.path().join("y");
    fs::write(&x, b"shared across roots").unwrap();
    fs::write(&y, b"shared across roots").unwrap();

    let options = Options::new(vec![dir_a.path().to_path_buf(), dir_b.path().to_path_buf()]);
    let report = run(&options).unwrap();

    assert_eq!(report.relinked_count, 1);
}
