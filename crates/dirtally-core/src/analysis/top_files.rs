/// Top-K largest files collection.
///
/// Walkers append every file record to one shared candidate list under a
/// single lock while the scan runs. Directory I/O dominates, so the lock is
/// not a bottleneck. Ranking happens once in [`TopFiles::finalize`], after
/// the scan has completed.
use crate::model::FileRecord;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;

/// A single entry in the "largest files" results.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargestFile {
    /// Full path (reconstructed from the parent chain).
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
}

/// Shared, append-only list of top-K candidates.
#[derive(Debug, Default)]
pub struct TopFiles {
    candidates: Mutex<Vec<Arc<FileRecord>>>,
}

impl TopFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a candidate.
    pub fn record(&self, file: Arc<FileRecord>) {
        self.candidates.lock().push(file);
    }

    /// Register every file found in one directory with a single lock.
    pub fn record_all(&self, files: &[Arc<FileRecord>]) {
        if files.is_empty() {
            return;
        }
        self.candidates.lock().extend(files.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.candidates.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.lock().is_empty()
    }

    /// The `k` largest candidates, descending by size.
    ///
    /// Returns every candidate when there are fewer than `k`. Equal sizes
    /// are ordered by full path so the result does not depend on which
    /// walker happened to record first.
    ///
    /// With links followed, a file inside a directory reachable by two
    /// routes is reported under whichever route was walked first, so its
    /// path may differ between runs even though its size does not.
    pub fn finalize(&self, k: usize) -> Vec<LargestFile> {
        if k == 0 {
            return Vec::new();
        }
        let mut ranked: Vec<Arc<FileRecord>> = self.candidates.lock().clone();

        if ranked.len() > k {
            // O(n) average to bring the top k to the front, then sort only those.
            ranked.select_nth_unstable_by(k - 1, |a, b| rank(a, b));
            ranked.truncate(k);
        }
        ranked.sort_unstable_by(|a, b| rank(a, b));

        ranked
            .iter()
            .map(|file| LargestFile {
                path: file.path(),
                size: file.size(),
            })
            .collect()
    }
}

/// Larger first; ties by name, then by full path (only built on a full tie).
fn rank(a: &FileRecord, b: &FileRecord) -> Ordering {
    b.size()
        .cmp(&a.size())
        .then_with(|| a.name().cmp(b.name()))
        .then_with(|| a.path().cmp(&b.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FolderNode;
    use std::path::Path;
    use std::thread;

    fn collector_with(sizes: &[(&str, u64)]) -> (Arc<FolderNode>, TopFiles) {
        let root = FolderNode::new_root(Path::new("/r"));
        let top = TopFiles::new();
        for (name, size) in sizes {
            top.record(FileRecord::new(*name, *size, &root));
        }
        (root, top)
    }

    #[test]
    fn returns_k_largest_descending() {
        let (_root, top) =
            collector_with(&[("a", 10), ("b", 500), ("c", 30), ("d", 200), ("e", 1)]);
        let result = top.finalize(3);
        let sizes: Vec<u64> = result.iter().map(|f| f.size).collect();
        assert_eq!(sizes, vec![500, 200, 30]);
        assert_eq!(result[0].path, PathBuf::from("/r/b"));
    }

    #[test]
    fn fewer_candidates_than_k_returns_all() {
        let (_root, top) = collector_with(&[("a", 10), ("b", 20)]);
        let result = top.finalize(10);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].size, 20);
    }

    #[test]
    fn empty_and_zero_k() {
        let (_root, top) = collector_with(&[]);
        assert!(top.finalize(5).is_empty());
        let (_root, top) = collector_with(&[("a", 1)]);
        assert!(top.finalize(0).is_empty());
    }

    #[test]
    fn ties_are_deterministic() {
        let (_root, top) = collector_with(&[("z", 7), ("m", 7), ("a", 7), ("big", 9)]);
        let names: Vec<PathBuf> = top.finalize(3).into_iter().map(|f| f.path).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("/r/big"),
                PathBuf::from("/r/a"),
                PathBuf::from("/r/m")
            ]
        );
    }

    #[test]
    fn concurrent_recording_keeps_every_candidate() {
        let root = FolderNode::new_root(Path::new("/r"));
        let top = Arc::new(TopFiles::new());
        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let top = Arc::clone(&top);
                let root = Arc::clone(&root);
                thread::spawn(move || {
                    for i in 0..100u64 {
                        top.record(FileRecord::new(format!("f{t}-{i}"), t * 100 + i, &root));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(top.len(), 800);
        let result = top.finalize(5);
        let sizes: Vec<u64> = result.iter().map(|f| f.size).collect();
        assert_eq!(sizes, vec![799, 798, 797, 796, 795]);
    }
}
