/// Scanner module: orchestrates one concurrent scan.
///
/// The root folder is created here, its walk is scheduled on a fresh
/// [`TaskPool`], and the calling thread blocks on the
/// [`CompletionTracker`] until every directory job (including jobs spawned
/// by other jobs) has finished. Only then are the top files ranked and the
/// report assembled.
mod walker;

use crate::analysis::TopFiles;
use crate::config::{Propagation, ScanConfig};
use crate::error::ScanError;
use crate::lister::{DirLister, FsLister};
use crate::model::{FolderNode, Totals};
use crate::pool::{PoolHandle, TaskPool};
use crate::report::ScanReport;
use crate::tracker::CompletionTracker;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Everything a walker job needs, passed explicitly into every job.
pub(crate) struct ScanContext {
    pub pool: PoolHandle,
    pub tracker: Arc<CompletionTracker>,
    pub top: TopFiles,
    pub lister: Arc<dyn DirLister>,
    pub propagation: Propagation,
    pub follow_links: bool,
    /// Canonical paths of directories already walked (follow-links mode only).
    visited: Mutex<HashSet<PathBuf>>,
    skipped: Mutex<Vec<PathBuf>>,
}

impl ScanContext {
    /// `true` the first time a directory's canonical location is seen.
    /// A path that cannot be resolved is let through; listing it will
    /// decide whether it is readable.
    ///
    /// When a directory is reachable both directly and through a link,
    /// whichever walker arrives first fills it in. Totals are the same
    /// either way; the paths under it (and in the top-files list) carry
    /// the route that won.
    pub fn first_visit(&self, path: &Path) -> bool {
        match self.lister.resolve(path) {
            Ok(target) => self.visited.lock().insert(target.canonical),
            Err(_) => true,
        }
    }

    pub fn record_skip(&self, path: &Path) {
        self.skipped.lock().push(path.to_path_buf());
    }
}

/// A finished scan: the folder tree plus the report built from it.
#[derive(Debug)]
pub struct Scan {
    root: Arc<FolderNode>,
    report: ScanReport,
}

impl Scan {
    /// Root of the scanned tree. Totals on every node are final.
    pub fn root(&self) -> &Arc<FolderNode> {
        &self.root
    }

    pub fn report(&self) -> &ScanReport {
        &self.report
    }

    pub fn totals(&self) -> Totals {
        self.report.totals
    }

    pub fn into_report(self) -> ScanReport {
        self.report
    }
}

/// Scan `root` on the real filesystem.
pub fn scan(root: impl AsRef<Path>, config: &ScanConfig) -> Result<Scan, ScanError> {
    scan_with(root, config, Arc::new(FsLister))
}

/// Scan `root` using `lister` for every directory listing.
pub fn scan_with(
    root: impl AsRef<Path>,
    config: &ScanConfig,
    lister: Arc<dyn DirLister>,
) -> Result<Scan, ScanError> {
    config.validate()?;
    let root_path = root.as_ref().to_path_buf();
    let started_at = Utc::now();
    let start = Instant::now();

    info!(
        root = %root_path.display(),
        workers = config.workers,
        propagation = ?config.propagation,
        "Starting scan"
    );

    let mut pool = TaskPool::new(config.workers, config.queue)?;
    let ctx = Arc::new(ScanContext {
        pool: pool.handle(),
        tracker: Arc::new(CompletionTracker::new()),
        top: TopFiles::new(),
        lister,
        propagation: config.propagation,
        follow_links: config.follow_links,
        visited: Mutex::new(HashSet::new()),
        skipped: Mutex::new(Vec::new()),
    });

    let root_node = FolderNode::new_root(&root_path);
    walker::schedule(&ctx, Arc::clone(&root_node), root_path.clone());
    ctx.tracker.wait();
    pool.stop()?;

    debug!(
        queued = pool.stats().queued(),
        inline = pool.stats().inline(),
        candidates = ctx.top.len(),
        "Traversal complete, ranking files"
    );

    if root_node.is_unreadable() {
        warn!(root = %root_path.display(), "Scan root could not be listed");
    }

    let largest = ctx.top.finalize(config.top_k);
    let mut skipped_paths = std::mem::take(&mut *ctx.skipped.lock());
    skipped_paths.sort();

    let totals = root_node.totals();
    let duration = start.elapsed();
    let report = ScanReport {
        root: root_path,
        totals,
        largest,
        skipped_dirs: skipped_paths.len() as u64,
        partial: !skipped_paths.is_empty(),
        skipped_paths,
        workers: config.workers,
        propagation: config.propagation,
        started_at,
        duration_ms: elapsed_millis(duration),
    };

    info!(
        size = totals.size,
        files = totals.files,
        folders = totals.folders,
        skipped = report.skipped_dirs,
        "Scan complete in {duration:?}"
    );

    Ok(Scan {
        root: root_node,
        report,
    })
}

/// Milliseconds as `u64`, saturating instead of truncating.
fn elapsed_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
