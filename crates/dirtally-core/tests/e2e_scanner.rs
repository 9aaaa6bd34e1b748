/// End-to-end scanner tests against real temporary directories.
///
/// These exercise the whole stack (`FsLister`, the worker pool, the
/// completion tracker, both propagation strategies, and top-file ranking)
/// with no mocking.
use dirtally_core::model::{FolderNode, Totals};
use dirtally_core::{scan, Propagation, QueueBound, ScanConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Create a reproducible directory tree:
///
/// ```text
/// root/
///   alpha/
///     a.txt   (100 bytes)
///     b.rs    (200 bytes)
///     inner/
///       deep.dat (50 bytes)
///   beta/
///     c.png   (300 bytes)
///   gamma/    (empty)
///   d.zip     (400 bytes)
/// ```
///
/// Totals: 4 folders, 5 files, 1 050 bytes.
fn build_test_tree(root: &Path) {
    fs::create_dir_all(root.join("alpha/inner")).unwrap();
    fs::create_dir_all(root.join("beta")).unwrap();
    fs::create_dir_all(root.join("gamma")).unwrap();

    write_bytes(&root.join("alpha/a.txt"), 100);
    write_bytes(&root.join("alpha/b.rs"), 200);
    write_bytes(&root.join("alpha/inner/deep.dat"), 50);
    write_bytes(&root.join("beta/c.png"), 300);
    write_bytes(&root.join("d.zip"), 400);
}

fn write_bytes(path: &Path, n: usize) {
    fs::write(path, vec![0u8; n]).unwrap();
}

fn config(workers: usize, propagation: Propagation) -> ScanConfig {
    ScanConfig::default()
        .with_workers(workers)
        .with_propagation(propagation)
}

fn check_consistency(folder: &Arc<FolderNode>) {
    let own: u64 = folder.files().iter().map(|f| f.size()).sum();
    let nested: u64 = folder.children().iter().map(|c| c.totals().size).sum();
    assert_eq!(folder.totals().size, own + nested, "at {}", folder.path().display());
    for child in folder.children() {
        check_consistency(child);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn scan_counts_every_file_and_folder() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    build_test_tree(tmp.path());

    for propagation in [Propagation::AncestorChain, Propagation::Reduce] {
        let scan = scan(tmp.path(), &config(4, propagation)).expect("scan");
        assert_eq!(scan.totals(), Totals::new(4, 5, 1_050));
        check_consistency(scan.root());

        let alpha = scan.root().find("alpha").expect("alpha");
        assert_eq!(alpha.totals(), Totals::new(1, 3, 350));
    }
}

#[test]
fn largest_files_have_full_paths() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());

    let scan = scan(tmp.path(), &ScanConfig::default().with_top_k(3)).unwrap();
    let largest = &scan.report().largest;
    assert_eq!(largest.len(), 3);
    assert_eq!(largest[0].path, tmp.path().join("d.zip"));
    assert_eq!(largest[0].size, 400);
    assert_eq!(largest[1].path, tmp.path().join("beta").join("c.png"));
    assert_eq!(largest[2].path, tmp.path().join("alpha").join("b.rs"));
}

#[test]
fn top_k_larger_than_file_count_returns_all() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());

    let scan = scan(tmp.path(), &ScanConfig::default().with_top_k(50)).unwrap();
    let sizes: Vec<u64> = scan.report().largest.iter().map(|f| f.size).collect();
    assert_eq!(sizes, vec![400, 300, 200, 100, 50]);
}

#[test]
fn scan_empty_directory() {
    let tmp = TempDir::new().unwrap();

    let scan = scan(tmp.path(), &ScanConfig::default()).unwrap();
    assert!(scan.totals().is_zero());
    assert!(scan.report().largest.is_empty());
    assert!(!scan.report().partial);
}

#[test]
fn worker_count_does_not_change_results() {
    let tmp = TempDir::new().unwrap();
    for d in 0..12 {
        let dir = tmp.path().join(format!("dir{d}")).join("nested");
        fs::create_dir_all(&dir).unwrap();
        for f in 0..d {
            write_bytes(&dir.join(format!("f{f}")), d * 7 + f);
        }
    }

    let sequential = scan(
        tmp.path(),
        &ScanConfig::default()
            .with_workers(1)
            .with_queue(QueueBound::Bounded(1)),
    )
    .unwrap();
    let wide = scan(
        tmp.path(),
        &ScanConfig::default()
            .with_workers(32)
            .with_queue(QueueBound::Unbounded),
    )
    .unwrap();

    assert_eq!(sequential.totals(), wide.totals());
    assert_eq!(sequential.totals().folders, 24);
    assert_eq!(sequential.report().largest, wide.report().largest);
}

#[test]
fn nonexistent_root_is_a_partial_empty_result() {
    let tmp = TempDir::new().unwrap();
    let missing: PathBuf = tmp.path().join("does-not-exist");

    let scan = scan(&missing, &ScanConfig::default()).unwrap();
    assert!(scan.totals().is_zero());
    assert!(scan.report().partial);
    assert_eq!(scan.report().skipped_paths, vec![missing]);
}

#[cfg(unix)]
#[test]
fn symlinks_are_not_followed_by_default() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());
    std::os::unix::fs::symlink(tmp.path().join("alpha"), tmp.path().join("alpha-link")).unwrap();

    let scan = scan(tmp.path(), &ScanConfig::default()).unwrap();
    // The link is one extra zero-size file.
    assert_eq!(scan.totals(), Totals::new(4, 6, 1_050));
}

#[cfg(unix)]
#[test]
fn followed_symlink_loop_terminates() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());
    std::os::unix::fs::symlink(tmp.path(), tmp.path().join("alpha/inner/loop")).unwrap();

    for propagation in [Propagation::AncestorChain, Propagation::Reduce] {
        let config = config(4, propagation).with_follow_links(true);
        let scan = scan(tmp.path(), &config).unwrap();
        // `loop` counts as a folder but its target was already walked.
        assert_eq!(scan.totals(), Totals::new(5, 5, 1_050));
        assert!(!scan.report().partial);
    }
}

#[cfg(unix)]
#[test]
fn unreadable_subdirectory_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());
    let locked = tmp.path().join("locked");
    fs::create_dir(&locked).unwrap();
    write_bytes(&locked.join("hidden.bin"), 5_000);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores directory permissions; nothing to observe in that case.
    let readable_anyway = fs::read_dir(&locked).is_ok();

    let scan = scan(tmp.path(), &ScanConfig::default()).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    if readable_anyway {
        assert_eq!(scan.totals(), Totals::new(5, 6, 6_050));
    } else {
        assert_eq!(scan.totals(), Totals::new(5, 5, 1_050));
        assert!(scan.report().partial);
        assert_eq!(scan.report().skipped_paths, vec![locked]);
    }
}
