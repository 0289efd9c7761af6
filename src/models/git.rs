use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitRecord {
    /// First 7 characters of the commit hash.
    pub hash: String,
    pub message: String,
    pub date: String,
}

/// Commits in one local repository during the window. Never empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitActivity {
    pub project_name: String,
    pub project_path: String,
    pub commits: Vec<CommitRecord>,
    pub files_changed: u64,
    pub insertions: u64,
    pub deletions: u64,
}

/// Totals parsed from `--shortstat` output.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffStat {
    pub files_changed: u64,
    pub insertions: u64,
    pub deletions: u64,
}

impl std::ops::AddAssign for DiffStat {
    fn add_assign(&mut self, other: Self) {
        self.files_changed += other.files_changed;
        self.insertions += other.insertions;
        self.deletions += other.deletions;
    }
}
