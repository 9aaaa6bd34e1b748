/// Fan-out tree walker.
///
/// One call to [`walk_folder`] lists one directory, schedules one pool job
/// per subdirectory, records files, and then folds the directory's local
/// delta into the tree. Two fold strategies exist (see [`Propagation`]):
///
/// - **AncestorChain**: the delta is merged into the folder and then into
///   every ancestor, one lock at a time.
/// - **Reduce**: each folder waits for its own listing and every child to
///   finish (`pending` reaches zero), then merges its complete subtree total
///   into its parent once. The parent may complete in turn, and so on.
///
/// Both strategies are commutative, so the final totals do not depend on
/// scheduling order.
use super::ScanContext;
use crate::config::Propagation;
use crate::lister::{EntryKind, ListedEntry};
use crate::model::{FileRecord, FolderNode, Totals};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tracing::{debug, trace};

/// What the walker does with one listed entry.
enum Visit {
    Descend,
    Record(u64),
}

/// Count the walk of `node` with the tracker, then hand it to the pool.
///
/// The count goes up before the job is submitted; a job that runs (or is
/// dropped) before this function returns can therefore never let the
/// tracker reach zero early.
pub(crate) fn schedule(ctx: &Arc<ScanContext>, node: Arc<FolderNode>, path: PathBuf) {
    let token = ctx.tracker.token();
    let job_ctx = Arc::clone(ctx);
    ctx.pool.execute(move || {
        let _token = token;
        walk_folder(&job_ctx, &node, &path);
    });
}

/// Retires the folder's own unit of work however `walk_folder` exits:
/// normal return, early return on a listing failure, or a panic.
struct FolderCompletion<'a> {
    ctx: &'a ScanContext,
    node: &'a Arc<FolderNode>,
    path: &'a Path,
}

impl Drop for FolderCompletion<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            // Whatever this walker had not merged yet is lost.
            self.node.mark_unreadable();
            self.ctx.record_skip(self.path);
        }
        if self.ctx.propagation == Propagation::Reduce {
            settle(self.node);
        }
    }
}

/// Walk one directory. Listing failures leave the folder empty and mark it
/// unreadable; they never propagate.
pub(crate) fn walk_folder(ctx: &Arc<ScanContext>, node: &Arc<FolderNode>, path: &Path) {
    let _completion = FolderCompletion { ctx, node, path };

    if ctx.follow_links && !ctx.first_visit(path) {
        debug!(path = %path.display(), "Directory already visited through another route, skipping");
        return;
    }

    let entries = match ctx.lister.list(path) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "Skipping unreadable directory");
            node.mark_unreadable();
            ctx.record_skip(path);
            return;
        }
    };

    let mut delta = Totals::ZERO;
    let mut children = Vec::new();
    let mut files = Vec::with_capacity(entries.len());

    for entry in &entries {
        match visit(ctx, path, entry) {
            Visit::Descend => {
                let child = FolderNode::new_child(entry.name.clone(), node);
                children.push(Arc::clone(&child));
                delta.folders += 1;
                // The parent must owe this child before the child can finish.
                if ctx.propagation == Propagation::Reduce {
                    node.add_pending(1);
                }
                schedule(ctx, child, path.join(entry.name.as_str()));
            }
            Visit::Record(size) => {
                files.push(FileRecord::new(entry.name.clone(), size, node));
                delta.files += 1;
                delta.size += size;
            }
        }
    }

    ctx.top.record_all(&files);
    node.attach(children, files);

    node.merge(delta);
    if ctx.propagation == Propagation::AncestorChain && !delta.is_zero() {
        for ancestor in node.ancestors() {
            ancestor.merge(delta);
        }
    }

    trace!(
        path = %path.display(),
        folders = delta.folders,
        files = delta.files,
        size = delta.size,
        "Directory walked"
    );
}

/// Decide whether an entry is descended into or recorded as a file.
///
/// Links are recorded as zero-size files unless links are followed, in
/// which case a link to a directory is descended into (the visited set in
/// [`walk_folder`] stops cycles) and a link to a file takes the target's size.
fn visit(ctx: &ScanContext, dir: &Path, entry: &ListedEntry) -> Visit {
    match entry.kind {
        EntryKind::Directory => Visit::Descend,
        EntryKind::File | EntryKind::Other => Visit::Record(entry.size.unwrap_or(0)),
        EntryKind::Symlink if !ctx.follow_links => Visit::Record(0),
        EntryKind::Symlink => match ctx.lister.resolve(&dir.join(entry.name.as_str())) {
            Ok(target) if target.is_dir => Visit::Descend,
            Ok(target) => Visit::Record(target.size.unwrap_or(0)),
            // Dangling link.
            Err(_) => Visit::Record(0),
        },
    }
}

/// Retire one unit of `node`'s subtree and, for every subtree that this
/// completes, hand its total to the parent.
fn settle(node: &Arc<FolderNode>) {
    let mut current = Arc::clone(node);
    while current.finish_one() {
        let Some(parent) = current.parent() else {
            break;
        };
        parent.merge(current.totals());
        current = parent;
    }
}
