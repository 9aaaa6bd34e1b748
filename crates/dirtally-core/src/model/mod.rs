/// Data model for the scanned directory tree.
///
/// Folders own their children and files; every node keeps a weak
/// back-reference to its parent so paths can be rebuilt and totals can be
/// pushed up the ancestor chain.
pub mod folder;
pub mod size;
pub mod totals;

pub use folder::{FileRecord, FolderNode};
pub use totals::Totals;
