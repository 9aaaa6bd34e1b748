//! Final scan report, assembled once the traversal has completed.

use crate::analysis::LargestFile;
use crate::config::Propagation;
use crate::model::Totals;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Totals of the root folder plus the largest files found.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub root: PathBuf,
    /// Totals for everything below the root (the root itself is not a
    /// counted folder).
    pub totals: Totals,
    /// Largest files, descending by size. At most `top_k` entries.
    pub largest: Vec<LargestFile>,
    /// Directories whose contents are missing because listing failed.
    pub skipped_dirs: u64,
    pub skipped_paths: Vec<PathBuf>,
    /// `true` when at least one directory was skipped, so totals are a
    /// lower bound rather than exact.
    pub partial: bool,
    pub workers: usize,
    pub propagation: Propagation,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ScanReport {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_carries_totals_and_largest_files() {
        let report = ScanReport {
            root: PathBuf::from("/root"),
            totals: Totals::new(1, 3, 350),
            largest: vec![LargestFile {
                path: PathBuf::from("/root/sub/b.txt"),
                size: 200,
            }],
            skipped_dirs: 0,
            skipped_paths: Vec::new(),
            partial: false,
            workers: 4,
            propagation: Propagation::Reduce,
            started_at: Utc::now(),
            duration_ms: 12,
        };
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["totals"]["size"], 350);
        assert_eq!(value["totals"]["folders"], 1);
        assert_eq!(value["largest"][0]["path"], "/root/sub/b.txt");
        assert_eq!(value["partial"], false);

        let back: ScanReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
