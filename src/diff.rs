// src/diff.rs

use crate::model::*;
use rayon::prelude::*;
use regex::Regex;
use std::sync::LazyLock;

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("hunk header regex")
});

const FILE_HEADER_PREFIXES: &[&str] = &[
    "diff --git",
    "index ",
    "--- ",
    "+++ ",
    "new file mode",
    "deleted file mode",
    "old mode",
    "new mode",
    "similarity index",
    "rename from",
    "rename to",
    "copy from",
    "copy to",
    "Binary files",
];

/// Hunk being accumulated, with the lines each side still expects.
struct OpenHunk {
    hunk: DiffHunk,
    old_line: usize,
    new_line: usize,
    old_remaining: usize,
    new_remaining: usize,
}

impl OpenHunk {
    fn open(header: &str) -> Option<Self> {
        let caps = HUNK_HEADER.captures(header)?;
        let number = |idx: usize, default: usize| {
            caps.get(idx)
                .and_then(|m| m.as_str().parse::<usize>().ok())
                .unwrap_or(default)
        };
        let (old_start, old_count) = (number(1, 0), number(2, 1));
        let (new_start, new_count) = (number(3, 0), number(4, 1));

        Some(Self {
            hunk: DiffHunk {
                header: header.to_string(),
                old_start,
                old_count,
                new_start,
                new_count,
                lines: Vec::new(),
            },
            old_line: old_start,
            new_line: new_start,
            old_remaining: old_count,
            new_remaining: new_count,
        })
    }

    fn exhausted(&self) -> bool {
        self.old_remaining == 0 && self.new_remaining == 0
    }

    fn push(&mut self, line_type: DiffLineType, content: &str) {
        let (old, new) = match line_type {
            DiffLineType::Addition => (None, Some(self.new_line)),
            DiffLineType::Deletion => (Some(self.old_line), None),
            DiffLineType::Context => (Some(self.old_line), Some(self.new_line)),
        };
        if old.is_some() {
            self.old_line += 1;
            self.old_remaining = self.old_remaining.saturating_sub(1);
        }
        if new.is_some() {
            self.new_line += 1;
            self.new_remaining = self.new_remaining.saturating_sub(1);
        }
        self.hunk.lines.push(DiffLine {
            line_type,
            content: content.to_string(),
            old_line_number: old,
            new_line_number: new,
        });
    }
}

/// Parses the unified diff of a single file.
///
/// Git-style file headers are skipped. A diff with headers but no hunks is a
/// valid result with no hunks and zero stats.
pub fn parse_file_diff(output: &str, path: &str) -> FileDiff {
    let mut hunks = Vec::new();
    let mut stats = DiffStats::default();
    let mut current: Option<OpenHunk> = None;

    for line in output.lines() {
        if line.starts_with("@@") {
            flush(current.take(), &mut hunks);
            current = OpenHunk::open(line);
            continue;
        }

        let Some(open) = current.as_mut() else {
            continue;
        };

        // Once both sides are satisfied, header lines belong to the next file.
        if open.exhausted() {
            if line.starts_with("diff --git") {
                flush(current.take(), &mut hunks);
                continue;
            }
            if line.is_empty() || FILE_HEADER_PREFIXES.iter().any(|p| line.starts_with(p)) {
                continue;
            }
        }

        if let Some(content) = line.strip_prefix('+') {
            open.push(DiffLineType::Addition, content);
            stats.additions += 1;
        } else if let Some(content) = line.strip_prefix('-') {
            open.push(DiffLineType::Deletion, content);
            stats.deletions += 1;
        } else if let Some(content) = line.strip_prefix(' ') {
            open.push(DiffLineType::Context, content);
        } else if line.is_empty() {
            open.push(DiffLineType::Context, "");
        }
        // Anything else, e.g. "\ No newline at end of file", carries no line.
    }
    flush(current.take(), &mut hunks);

    FileDiff {
        path: path.to_string(),
        hunks,
        stats,
    }
}

fn flush(open: Option<OpenHunk>, hunks: &mut Vec<DiffHunk>) {
    if let Some(open) = open {
        if !open.hunk.lines.is_empty() {
            hunks.push(open.hunk);
        }
    }
}

/// Splits a multi-file `--git` diff at each `diff --git` line and parses the
/// files in parallel, keeping their order.
pub fn parse_git_diff(output: &str) -> Vec<FileDiff> {
    split_files(output)
        .into_par_iter()
        .map(|chunk| {
            let path = chunk_path(chunk).unwrap_or_default();
            parse_file_diff(chunk, &path)
        })
        .collect()
}

fn split_files(output: &str) -> Vec<&str> {
    let mut starts: Vec<usize> = Vec::new();
    let mut offset = 0;
    for line in output.split_inclusive('\n') {
        if line.starts_with("diff --git ") {
            starts.push(offset);
        }
        offset += line.len();
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(output.len());
            &output[start..end]
        })
        .collect()
}

/// Path of a single-file chunk: the new side, or the old side for deletions.
fn chunk_path(chunk: &str) -> Option<String> {
    let mut old_path = None;
    for line in chunk.lines() {
        if line.starts_with("@@") {
            break;
        }
        if let Some(path) = line.strip_prefix("+++ b/") {
            return Some(path.to_string());
        }
        if let Some(path) = line.strip_prefix("--- a/") {
            old_path = Some(path.to_string());
        }
    }
    old_path.or_else(|| {
        let header = chunk.lines().next()?.strip_prefix("diff --git a/")?;
        header.split_once(" b/").map(|(_, new)| new.to_string())
    })
}
