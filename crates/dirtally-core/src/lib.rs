/// dirtally core: concurrent traversal, aggregation, and data model.
///
/// This crate contains all scanning logic with zero CLI dependencies.
/// The binary in the workspace root only parses arguments and prints.
///
/// # Modules
///
/// - [`model`]: Folder/file records with parent back-references and subtree totals.
/// - [`lister`]: The directory-listing seam (real filesystem and in-memory).
/// - [`pool`]: Fixed-size worker pool with a bounded job queue.
/// - [`tracker`]: Outstanding-work counter the scan waits on.
/// - [`scanner`]: Fan-out tree walker and ancestor aggregation.
/// - [`analysis`]: Top-K largest file collection.
/// - [`report`]: Final, serialisable scan report.
pub mod analysis;
pub mod config;
pub mod error;
pub mod lister;
pub mod model;
pub mod pool;
pub mod report;
pub mod scanner;
pub mod tracker;

pub use config::{Propagation, QueueBound, ScanConfig};
pub use error::{ConfigError, PoolError, ScanError};
pub use report::ScanReport;
pub use scanner::{scan, scan_with, Scan};
