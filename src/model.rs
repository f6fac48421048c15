// src/model.rs

use chrono::{DateTime, Utc};
use std::fmt;

/// Content-addressed identifier of one immutable commit snapshot
pub type CommitId = String;

/// Outcome of verifying a commit signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStatus {
    Good,
    Bad,
    /// Anything else the tool reports (unknown key, verification error, ...)
    Other(String),
}

impl SignatureStatus {
    /// Interprets a raw log field. An empty field means the commit is unsigned.
    pub fn from_field(field: &str) -> Option<Self> {
        match field.trim() {
            "" => None,
            "good" => Some(SignatureStatus::Good),
            "bad" => Some(SignatureStatus::Bad),
            other => Some(SignatureStatus::Other(other.to_string())),
        }
    }
}

/// One commit as reported by `jj log`
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub commit_id: CommitId,
    /// Stable across rewrites, unlike `commit_id`
    pub change_id: String,
    /// First line of the description
    pub description: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    pub is_working_copy: bool,
    /// Local names and `name@remote` names, in the order the tool printed them
    pub bookmarks: Vec<String>,
    pub tags: Vec<String>,
    pub signature: Option<SignatureStatus>,
    /// Index 0 is the first parent
    pub parent_ids: Vec<CommitId>,
    /// The commit has no file changes
    pub is_empty: bool,
}

impl Commit {
    pub fn short_change_id(&self) -> &str {
        prefix(&self.change_id, 8)
    }

    pub fn short_commit_id(&self) -> &str {
        prefix(&self.commit_id, 12)
    }

    pub fn display_description(&self) -> &str {
        if self.description.is_empty() {
            "(no description)"
        } else {
            &self.description
        }
    }

    pub fn author_display(&self) -> &str {
        if self.author_name.is_empty() {
            &self.author_email
        } else {
            &self.author_name
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_ids.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parent_ids.len() > 1
    }

    /// Empty, unbookmarked, untagged and not the working copy: safe to abandon.
    pub fn is_orphaned(&self) -> bool {
        self.bookmarks.is_empty() && self.tags.is_empty() && self.is_empty && !self.is_working_copy
    }

    pub fn local_bookmarks(&self) -> impl Iterator<Item = &str> {
        self.bookmarks.iter().map(String::as_str).filter(|b| !b.contains('@'))
    }

    pub fn remote_bookmarks(&self) -> impl Iterator<Item = &str> {
        self.bookmarks.iter().map(String::as_str).filter(|b| b.contains('@'))
    }

    /// True when `name` is a local bookmark with at least one remote counterpart
    /// on this commit.
    pub fn is_bookmark_synced(&self, name: &str) -> bool {
        if !self.local_bookmarks().any(|b| b == name) {
            return false;
        }
        self.remote_bookmarks()
            .any(|remote| remote.split_once('@').is_some_and(|(local, _)| local == name))
    }

    /// Remote bookmarks whose local name is absent from this commit.
    pub fn remote_only_bookmarks(&self) -> Vec<&str> {
        self.remote_bookmarks()
            .filter(|remote| {
                let local = remote.split_once('@').map_or(*remote, |(local, _)| local);
                !self.local_bookmarks().any(|b| b == local)
            })
            .collect()
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    pub fn has_valid_signature(&self) -> bool {
        self.signature == Some(SignatureStatus::Good)
    }
}

fn prefix(s: &str, len: usize) -> &str {
    match s.char_indices().nth(len) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileChangeStatus {
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
}

impl FileChangeStatus {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'M' => Some(FileChangeStatus::Modified),
            'A' => Some(FileChangeStatus::Added),
            'D' => Some(FileChangeStatus::Deleted),
            'R' => Some(FileChangeStatus::Renamed),
            'C' => Some(FileChangeStatus::Copied),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            FileChangeStatus::Modified => 'M',
            FileChangeStatus::Added => 'A',
            FileChangeStatus::Deleted => 'D',
            FileChangeStatus::Renamed => 'R',
            FileChangeStatus::Copied => 'C',
        }
    }
}

impl fmt::Display for FileChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileChangeStatus::Modified => "Modified",
            FileChangeStatus::Added => "Added",
            FileChangeStatus::Deleted => "Deleted",
            FileChangeStatus::Renamed => "Renamed",
            FileChangeStatus::Copied => "Copied",
        };
        f.write_str(label)
    }
}

/// A path touched by a commit or by the working copy
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileChange {
    pub path: String,
    pub status: FileChangeStatus,
}

impl FileChange {
    pub fn new(path: impl Into<String>, status: FileChangeStatus) -> Self {
        Self { path: path.into(), status }
    }

    /// `<code>:<path>`, distinct per status for the same path
    pub fn id(&self) -> String {
        format!("{}:{}", self.status.code(), self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineType {
    Context,
    Addition,
    Deletion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub line_type: DiffLineType,
    /// Text with the leading marker stripped
    pub content: String,
    /// Absent for additions
    pub old_line_number: Option<usize>,
    /// Absent for deletions
    pub new_line_number: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    /// Raw `@@ -a,b +c,d @@` line
    pub header: String,
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub additions: usize,
    pub deletions: usize,
}

impl DiffStats {
    pub fn total(&self) -> usize {
        self.additions + self.deletions
    }
}

/// All hunks for one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    pub hunks: Vec<DiffHunk>,
    pub stats: DiffStats,
}

impl FileDiff {
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphNodeType {
    Normal,
    Merge,
    WorkingCopy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphLineType {
    /// Pass-through of a column not involved in this row
    Vertical,
    /// `from_column` folds into this row's node at `to_column`
    MergeFrom,
    /// This row's node at `from_column` opens `to_column` for a later parent
    BranchTo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphLine {
    pub from_column: usize,
    pub to_column: usize,
    pub line_type: GraphLineType,
}

impl GraphLine {
    pub fn vertical(column: usize) -> Self {
        Self { from_column: column, to_column: column, line_type: GraphLineType::Vertical }
    }
}

/// Layout of a single commit row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRow {
    pub commit_id: CommitId,
    pub column: usize,
    pub lines: Vec<GraphLine>,
    pub node_type: GraphNodeType,
    /// A row above pointed at this commit
    pub has_children: bool,
    pub has_parents: bool,
}

/// Rows aligned 1:1 with the commit display order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphLayout {
    pub rows: Vec<GraphRow>,
    pub max_column: usize,
}

impl GraphLayout {
    /// Number of columns needed to draw the graph
    pub fn width(&self) -> usize {
        self.max_column + 1
    }

    pub fn row(&self, commit_id: &str) -> Option<&GraphRow> {
        self.rows.iter().find(|r| r.commit_id == commit_id)
    }
}
