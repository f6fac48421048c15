// src/log.rs

use crate::model::*;
use chrono::{DateTime, Utc};
use tracing::debug;

pub const RECORD_SEPARATOR: char = '\u{1e}';
pub const FIELD_SEPARATOR: char = '\u{0}';

/// Records with fewer fields than this are dropped.
pub const MIN_FIELDS: usize = 8;

const SECTION_HEADER: &str = "Working copy changes:";

/// Parses `jj log` output produced with [`crate::runner::LOG_TEMPLATE`].
///
/// Fields 0..=7 are required: commit id, change id, description, author,
/// timestamp, working-copy flag, bookmarks, tags. Field 8 (signature status),
/// field 9 (parent ids) and field 10 (empty flag) may be missing, so output
/// from an older template still parses. Order is preserved.
pub fn parse_log(output: &str) -> Vec<Commit> {
    let mut commits = Vec::new();

    for record in output.split(RECORD_SEPARATOR) {
        let record = record.trim_matches(|c: char| c.is_whitespace());
        if record.is_empty() {
            continue;
        }

        let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
        if fields.len() < MIN_FIELDS {
            debug!(fields = fields.len(), "Dropping malformed log record");
            continue;
        }

        let optional = |idx: usize| fields.get(idx).map_or("", |f| f.trim());
        let (author_name, author_email) = parse_author(fields[3].trim());

        commits.push(Commit {
            commit_id: fields[0].trim().to_string(),
            change_id: fields[1].trim().to_string(),
            description: fields[2].to_string(),
            author_name,
            author_email,
            timestamp: parse_timestamp(fields[4]),
            is_working_copy: fields[5].trim() == "true",
            bookmarks: split_names(fields[6]),
            tags: split_names(fields[7]),
            signature: SignatureStatus::from_field(optional(8)),
            parent_ids: split_names(optional(9)),
            is_empty: optional(10) == "true",
        });
    }

    commits
}

/// Unparseable timestamps fall back to now so the record still shows up.
fn parse_timestamp(field: &str) -> DateTime<Utc> {
    let field = field.trim();
    match DateTime::parse_from_rfc3339(field) {
        Ok(ts) => ts.with_timezone(&Utc),
        Err(e) => {
            debug!(timestamp = field, error = %e, "Unparseable timestamp, using current time");
            Utc::now()
        }
    }
}

/// Accepts `Name <email>`, a bare email, or a bare name.
fn parse_author(field: &str) -> (String, String) {
    if let Some((name, rest)) = field.split_once('<') {
        if let Some(email) = rest.strip_suffix('>') {
            return (name.trim().to_string(), email.trim().to_string());
        }
    }
    if field.contains('@') {
        (String::new(), field.to_string())
    } else {
        (field.to_string(), String::new())
    }
}

fn split_names(field: &str) -> Vec<String> {
    field
        .trim()
        .split(' ')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parses the working-copy section of `jj status`.
///
/// The section starts at `Working copy changes:` and ends at the first blank
/// line; anything else in the output is ignored.
pub fn parse_status(output: &str) -> Vec<FileChange> {
    let mut changes = Vec::new();
    let mut in_section = false;

    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with(SECTION_HEADER) {
            in_section = true;
            continue;
        }
        if !in_section {
            continue;
        }
        if trimmed.is_empty() {
            break;
        }
        if let Some(change) = parse_change_line(trimmed) {
            changes.push(change);
        }
    }

    changes
}

/// Parses `jj diff --summary` output, one `<status> <path>` per line.
pub fn parse_summary(output: &str) -> Vec<FileChange> {
    output
        .lines()
        .filter_map(|line| parse_change_line(line.trim()))
        .collect()
}

fn parse_change_line(line: &str) -> Option<FileChange> {
    let mut chars = line.chars();
    let status = FileChangeStatus::from_code(chars.next()?)?;
    let path = chars.as_str().strip_prefix(' ')?;
    if path.is_empty() {
        return None;
    }
    Some(FileChange::new(path, status))
}
