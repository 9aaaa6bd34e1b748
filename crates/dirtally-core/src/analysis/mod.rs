/// Analysis modules: results computed from the finished traversal.
pub mod top_files;

pub use top_files::{LargestFile, TopFiles};
