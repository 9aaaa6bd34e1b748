//! Directory listing, the one place the scanner touches the filesystem.
//!
//! The walker only ever sees [`ListedEntry`] values, so the traversal can
//! run against the real filesystem ([`FsLister`]) or a fixed in-memory tree
//! ([`MemoryLister`]) with injected failures.

use compact_str::CompactString;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Classification of a listed entry. Links are reported as links, never
/// as their target; whether to follow them is the walker's decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    /// Fifo, socket, device, or anything else that is not a plain file.
    Other,
}

/// One child of a listed directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListedEntry {
    pub name: CompactString,
    pub kind: EntryKind,
    /// Byte size, or `None` when the metadata could not be read.
    pub size: Option<u64>,
}

impl ListedEntry {
    pub fn new(name: impl Into<CompactString>, kind: EntryKind, size: Option<u64>) -> Self {
        Self {
            name: name.into(),
            kind,
            size,
        }
    }
}

/// Where a path ends up after resolving every link along it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkTarget {
    pub canonical: PathBuf,
    pub is_dir: bool,
    /// Size of the final target when it is a file.
    pub size: Option<u64>,
}

/// Source of directory listings.
pub trait DirLister: Send + Sync {
    /// List the direct children of `path`.
    fn list(&self, path: &Path) -> io::Result<Vec<ListedEntry>>;

    /// Resolve `path` through any links to its canonical location.
    /// Only consulted when links are followed.
    fn resolve(&self, path: &Path) -> io::Result<LinkTarget>;
}

/// Lists the real filesystem with `read_dir` and `symlink_metadata`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsLister;

impl DirLister for FsLister {
    fn list(&self, path: &Path) -> io::Result<Vec<ListedEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            // An entry that vanishes mid-listing is simply not there.
            let Ok(entry) = entry else { continue };
            let name = CompactString::new(entry.file_name().to_string_lossy());
            let listed = match entry.file_type() {
                Ok(ft) if ft.is_dir() => ListedEntry::new(name, EntryKind::Directory, None),
                Ok(ft) if ft.is_symlink() => ListedEntry::new(name, EntryKind::Symlink, None),
                Ok(ft) => {
                    let kind = if ft.is_file() {
                        EntryKind::File
                    } else {
                        EntryKind::Other
                    };
                    // Stat outside any lock; failures become "size unknown".
                    let size = fs::symlink_metadata(entry.path()).ok().map(|m| m.len());
                    ListedEntry::new(name, kind, size)
                }
                Err(_) => ListedEntry::new(name, EntryKind::Other, None),
            };
            entries.push(listed);
        }
        Ok(entries)
    }

    fn resolve(&self, path: &Path) -> io::Result<LinkTarget> {
        let canonical = fs::canonicalize(path)?;
        let meta = fs::metadata(&canonical)?;
        Ok(LinkTarget {
            canonical,
            is_dir: meta.is_dir(),
            size: (!meta.is_dir()).then(|| meta.len()),
        })
    }
}

#[derive(Clone, Debug)]
enum MemNode {
    Dir,
    File(Option<u64>),
    Link(PathBuf),
}

/// An in-memory directory tree.
///
/// Paths are absolute-style (`/root/sub/file`) and parents are created on
/// demand. Listing order is sorted by name so runs are reproducible.
///
/// ```
/// use dirtally_core::lister::MemoryLister;
///
/// let tree = MemoryLister::new()
///     .file("/root/a.txt", 100)
///     .file("/root/sub/b.txt", 200)
///     .deny("/root/private");
/// ```
#[derive(Debug, Default)]
pub struct MemoryLister {
    nodes: RwLock<HashMap<PathBuf, MemNode>>,
    denied: RwLock<HashSet<PathBuf>>,
}

impl MemoryLister {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, path: &Path, node: MemNode) {
        let mut nodes = self.nodes.write();
        let mut parent = path.parent();
        while let Some(dir) = parent {
            if dir.as_os_str().is_empty() {
                break;
            }
            nodes.entry(dir.to_path_buf()).or_insert(MemNode::Dir);
            parent = dir.parent();
        }
        nodes.insert(path.to_path_buf(), node);
    }

    /// Add a directory (and any missing parents).
    pub fn dir(self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), MemNode::Dir);
        self
    }

    /// Add a file of `size` bytes.
    pub fn file(self, path: impl AsRef<Path>, size: u64) -> Self {
        self.insert(path.as_ref(), MemNode::File(Some(size)));
        self
    }

    /// Add a file whose size cannot be read.
    pub fn file_without_size(self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), MemNode::File(None));
        self
    }

    /// Add a symbolic link pointing at `target` (absolute).
    pub fn link(self, path: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), MemNode::Link(target.as_ref().to_path_buf()));
        self
    }

    /// Make listing `path` fail with `PermissionDenied`.
    pub fn deny(self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), MemNode::Dir);
        self.denied.write().insert(path.as_ref().to_path_buf());
        self
    }

    /// Follow links through every component of `path`.
    fn canonical(&self, path: &Path) -> io::Result<PathBuf> {
        let nodes = self.nodes.read();
        let mut resolved = PathBuf::new();
        let mut hops = 0;
        for component in path.components() {
            resolved.push(component);
            while let Some(MemNode::Link(target)) = nodes.get(&resolved) {
                hops += 1;
                if hops > 40 {
                    return Err(io::Error::other("too many levels of symbolic links"));
                }
                resolved = target.clone();
            }
        }
        if nodes.contains_key(&resolved) {
            Ok(resolved)
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, "no such entry"))
        }
    }
}

impl DirLister for MemoryLister {
    fn list(&self, path: &Path) -> io::Result<Vec<ListedEntry>> {
        if self.denied.read().contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "permission denied",
            ));
        }
        // Listing through a link lists the target, as `read_dir` does.
        let dir = self.canonical(path)?;
        let nodes = self.nodes.read();
        match nodes.get(&dir) {
            Some(MemNode::Dir) => {}
            _ => return Err(io::Error::new(io::ErrorKind::NotFound, "not a directory")),
        }
        let mut entries: Vec<ListedEntry> = nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(dir.as_path()))
            .filter_map(|(p, node)| {
                let name = p.file_name()?.to_string_lossy();
                Some(match node {
                    MemNode::Dir => ListedEntry::new(&*name, EntryKind::Directory, None),
                    MemNode::File(size) => ListedEntry::new(&*name, EntryKind::File, *size),
                    MemNode::Link(_) => ListedEntry::new(&*name, EntryKind::Symlink, None),
                })
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn resolve(&self, path: &Path) -> io::Result<LinkTarget> {
        let canonical = self.canonical(path)?;
        let nodes = self.nodes.read();
        let (is_dir, size) = match nodes.get(&canonical) {
            Some(MemNode::Dir) => (true, None),
            Some(MemNode::File(size)) => (false, *size),
            _ => (false, None),
        };
        Ok(LinkTarget {
            canonical,
            is_dir,
            size,
        })
    }
}
