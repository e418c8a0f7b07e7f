//! Size bucketing and hash-candidate selection.

use std::collections::HashMap;

use tracing::instrument;

use crate::record::{DeviceIno, InodeRecord};

/// The ordered set of inodes that need hashing, plus the total byte volume
/// they represent (used for progress reporting).
pub struct HashWorklist {
    pub candidates: Vec<DeviceIno>,
    pub total_bytes: u64,
}

/// Bucket every inode by size, drop singleton buckets (they cannot have a
/// duplicate), and flatten the rest into a worklist ordered by ascending
/// size. Ties in size retain the arbitrary order the size map produced.
#[instrument(level = "debug", skip_all, fields(inodes = inodes.len()))]
pub fn build_hash_worklist(inodes: &HashMap<DeviceIno, InodeRecord>) -> HashWorklist {
    let mut by_size: HashMap<u64, Vec<DeviceIno>> = HashMap::new();
    for record in inodes.values() {
        by_size.entry(record.size).or_default().push(record.id);
    }

    let mut candidates: Vec<DeviceIno> = Vec::new();
    let mut total_bytes: u64 = 0;
    for (size, ids) in by_size {
        if ids.len() < 2 {
            continue;
        }
        total_bytes += size * ids.len() as u64;
        candidates.extend(ids);
    }

    candidates.sort_by_key(|id| inodes[id].size);

    HashWorklist { candidates, total_bytes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Mtime;
    use std::path::PathBuf;

    fn record(dev: u64, ino: u64, size: u64) -> InodeRecord {
        InodeRecord::new(
            DeviceIno { dev, ino },
            size,
            Mtime::default(),
            PathBuf::from(format!("/f{ino}")),
        )
    }

    #[test]
    fn drops_singleton_size_buckets() {
        let mut inodes = HashMap::new();
        let a = record(1, 1, 10);
        let b = record(1, 2, 20);
        inodes.insert(a.id, a);
        inodes.insert(b.id, b);

        let worklist = build_hash_worklist(&inodes);
        assert!(worklist.candidates.is_empty());
        assert_eq!(worklist.total_bytes, 0);
    }

    #[test]
    fn keeps_and_sorts_non_singleton_buckets_ascending() {
        let mut inodes = HashMap::new();
        for (ino, size) in [(1, 100), (2, 100), (3, 5), (4, 5), (5, 999)] {
            let r = record(1, ino, size);
            inodes.insert(r.id, r);
        }

        let worklist = build_hash_worklist(&inodes);
        assert_eq!(worklist.candidates.len(), 4);
        assert_eq!(worklist.total_bytes, 5 * 2 + 100 * 2);
        let sizes: Vec<u64> = worklist.candidates.iter().map(|id| inodes[id].size).collect();
        assert!(sizes.windows(2).all(|w| w[0] <= w[1]));
    }
}
