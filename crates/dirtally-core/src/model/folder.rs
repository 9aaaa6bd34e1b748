/// Folder and file records that make up the scanned tree.
///
/// A folder owns its children and files through `Arc`s and points back to
/// its parent through a `Weak`, so the whole tree is owned from the root
/// and dropping the root frees everything. Child and file lists are written
/// exactly once, by the walker that lists the folder; afterwards the only
/// mutation is the counter merge under the folder's own lock.
use super::totals::Totals;
use compact_str::CompactString;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

/// A directory in the scanned tree.
#[derive(Debug)]
pub struct FolderNode {
    /// Entry name, or the full scan path for the root.
    name: CompactString,
    parent: Weak<FolderNode>,
    children: OnceLock<Vec<Arc<FolderNode>>>,
    files: OnceLock<Vec<Arc<FileRecord>>>,
    /// Subtree totals. All three fields change in one critical section.
    totals: Mutex<Totals>,
    /// Units still owed before this subtree is complete: one for the
    /// folder's own listing plus one per scheduled child.
    pending: AtomicUsize,
    /// Set when the folder could not be listed.
    unreadable: AtomicBool,
}

impl FolderNode {
    fn with_parent(name: CompactString, parent: Weak<FolderNode>) -> Self {
        Self {
            name,
            parent,
            children: OnceLock::new(),
            files: OnceLock::new(),
            totals: Mutex::new(Totals::ZERO),
            pending: AtomicUsize::new(1),
            unreadable: AtomicBool::new(false),
        }
    }

    /// Create the root of a scan. `path` is kept verbatim as the root name
    /// so that [`FolderNode::path`] yields real filesystem paths.
    pub fn new_root(path: &Path) -> Arc<Self> {
        let name = CompactString::new(path.to_string_lossy());
        Arc::new(Self::with_parent(name, Weak::new()))
    }

    /// Create a subdirectory node linked back to `parent`.
    ///
    /// The caller is responsible for storing the returned `Arc` in the
    /// parent's child list (see [`FolderNode::attach`]).
    pub fn new_child(name: impl Into<CompactString>, parent: &Arc<FolderNode>) -> Arc<Self> {
        Arc::new(Self::with_parent(name.into(), Arc::downgrade(parent)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<Arc<FolderNode>> {
        self.parent.upgrade()
    }

    pub fn is_root(&self) -> bool {
        self.parent.upgrade().is_none()
    }

    /// Parent, grandparent, and so on up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = Arc<FolderNode>> {
        std::iter::successors(self.parent(), |node| node.parent())
    }

    /// Child folders, in listing order. Empty until the folder is walked.
    pub fn children(&self) -> &[Arc<FolderNode>] {
        self.children.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Files directly inside this folder, in listing order.
    pub fn files(&self) -> &[Arc<FileRecord>] {
        self.files.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Store the results of listing this folder. Only the first call wins.
    pub(crate) fn attach(&self, children: Vec<Arc<FolderNode>>, files: Vec<Arc<FileRecord>>) {
        let first = self.children.set(children).is_ok() & self.files.set(files).is_ok();
        debug_assert!(first, "folder {} attached twice", self.name);
    }

    /// Snapshot of the subtree totals.
    pub fn totals(&self) -> Totals {
        *self.totals.lock()
    }

    /// Add `delta` to this folder's counters in a single critical section.
    pub fn merge(&self, delta: Totals) {
        let mut totals = self.totals.lock();
        *totals += delta;
    }

    /// `true` if listing this folder failed and its contents are missing
    /// from every total above it.
    pub fn is_unreadable(&self) -> bool {
        self.unreadable.load(Ordering::Acquire)
    }

    pub(crate) fn mark_unreadable(&self) {
        self.unreadable.store(true, Ordering::Release);
    }

    /// Register `n` more units that must finish before this subtree is complete.
    pub(crate) fn add_pending(&self, n: usize) {
        self.pending.fetch_add(n, Ordering::AcqRel);
    }

    /// Retire one unit. Returns `true` exactly once, for the unit that
    /// completes the subtree.
    pub(crate) fn finish_one(&self) -> bool {
        self.pending.fetch_sub(1, Ordering::AcqRel) == 1
    }

    /// Full path of this folder, rebuilt from the parent chain.
    pub fn path(&self) -> PathBuf {
        let mut segments: Vec<CompactString> = self.ancestors().map(|a| a.name.clone()).collect();
        segments.reverse();
        let mut path: PathBuf = segments.iter().map(|s| s.as_str()).collect();
        path.push(self.name.as_str());
        path
    }

    /// Look up a descendant folder by a path relative to this one.
    pub fn find(&self, relative: impl AsRef<Path>) -> Option<Arc<FolderNode>> {
        let mut components = relative.as_ref().iter();
        let first = components.next()?;
        let mut current = self
            .children()
            .iter()
            .find(|c| c.name.as_str() == first.to_string_lossy())?
            .clone();
        for part in components {
            let next = current
                .children()
                .iter()
                .find(|c| c.name.as_str() == part.to_string_lossy())?
                .clone();
            current = next;
        }
        Some(current)
    }

    /// Visit this folder and every descendant folder, depth first.
    pub fn for_each_folder(self: &Arc<Self>, f: &mut impl FnMut(&Arc<FolderNode>)) {
        f(self);
        for child in self.children() {
            child.for_each_folder(f);
        }
    }
}

/// A regular file (or a non-followed link / special file) in the tree.
#[derive(Debug)]
pub struct FileRecord {
    name: CompactString,
    size: u64,
    parent: Weak<FolderNode>,
}

impl FileRecord {
    pub fn new(name: impl Into<CompactString>, size: u64, parent: &Arc<FolderNode>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            size,
            parent: Arc::downgrade(parent),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn parent(&self) -> Option<Arc<FolderNode>> {
        self.parent.upgrade()
    }

    /// Full path, or just the name if the tree has already been dropped.
    pub fn path(&self) -> PathBuf {
        match self.parent() {
            Some(folder) => folder.path().join(self.name.as_str()),
            None => PathBuf::from(self.name.as_str()),
        }
    }
}
