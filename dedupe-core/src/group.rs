//! Digest grouping.

use std::collections::HashMap;

use tracing::instrument;

use crate::record::{DeviceIno, Digest, InodeRecord};

/// One group of inodes sharing a digest, i.e. a confirmed duplicate set.
pub struct DigestGroup {
    pub digest: Digest,
    pub members: Vec<DeviceIno>,
}

/// Group hashed inodes by digest, drop singleton groups, and return the
/// groups ordered ascending by digest bytes for deterministic run-to-run
/// output across runs.
#[instrument(level = "debug", skip_all, fields(candidates = inodes.len()))]
pub fn group_by_digest(inodes: &HashMap<DeviceIno, InodeRecord>) -> Vec<DigestGroup> {
    let mut by_digest: HashMap<Digest, Vec<DeviceIno>> = HashMap::new();
    for record in inodes.values() {
        let Some(digest) = record.digest else { continue };
        by_digest.entry(digest).or_default().push(record.id);
    }

    let mut groups: Vec<DigestGroup> = by_digest
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(digest, members)| DigestGroup { digest, members })
        .collect();

    groups.sort_by(|a, b| a.digest.cmp(&b.digest));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Mtime;
    use std::path::PathBuf;

    fn record(ino: u64, digest: Option<Digest>) -> InodeRecord {
        let mut r = InodeRecord::new(
            DeviceIno { dev: 1, ino },
            1,
            Mtime::default(),
            PathBuf::from(format!("/f{ino}")),
        );
        r.digest = digest;
        r
    }

    #[test]
    fn drops_singleton_and_unhashed_groups() {
        let mut inodes = HashMap::new();
        let a = record(1, Some([1u8; 32]));
        let b = record(2, None);
        inodes.insert(a.id, a);
        inodes.insert(b.id, b);

        assert!(group_by_digest(&inodes).is_empty());
    }

    #[test]
    fn groups_are_sorted_ascending_by_digest() {
        let mut inodes = HashMap::new();
        for (ino, byte) in [(1, 2u8), (2, 2), (3, 1), (4, 1)] {
            let r = record(ino, Some([byte; 32]));
            inodes.insert(r.id, r);
        }

        let groups = group_by_digest(&inodes);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].digest, [1u8; 32]);
        assert_eq!(groups[1].digest, [2u8; 32]);
        assert_eq!(groups[0].members.len(), 2);
    }
}
