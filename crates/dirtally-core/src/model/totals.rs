/// Subtree counters carried by every folder node.
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Folder count, file count, and byte size of a subtree.
///
/// The root folder itself is not counted in `folders`; a tree holding a
/// single empty subdirectory has `folders == 1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Totals {
    pub folders: u64,
    pub files: u64,
    pub size: u64,
}

impl Totals {
    pub const ZERO: Totals = Totals {
        folders: 0,
        files: 0,
        size: 0,
    };

    pub fn new(folders: u64, files: u64, size: u64) -> Self {
        Self {
            folders,
            files,
            size,
        }
    }

    /// `true` when no folder, file, or byte was counted.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl AddAssign for Totals {
    fn add_assign(&mut self, rhs: Self) {
        self.folders += rhs.folders;
        self.files += rhs.files;
        self.size += rhs.size;
    }
}

impl Add for Totals {
    type Output = Totals;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl Sum for Totals {
    fn sum<I: Iterator<Item = Totals>>(iter: I) -> Self {
        iter.fold(Totals::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_fieldwise() {
        let a = Totals::new(1, 2, 300);
        let b = Totals::new(0, 5, 50);
        assert_eq!(a + b, Totals::new(1, 7, 350));
    }

    #[test]
    fn sum_of_nothing_is_zero() {
        let total: Totals = std::iter::empty().sum();
        assert!(total.is_zero());
    }
}
