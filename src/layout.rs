// src/layout.rs

use crate::model::*;
use std::collections::BTreeMap;

/// Column index -> commit id that column expects to meet next.
///
/// Ordered so that every walk over the columns is by ascending index.
pub type ActiveColumns = BTreeMap<usize, CommitId>;

/// Lays out commits given newest-first, one row per commit.
pub fn calculate(commits: &[Commit]) -> GraphLayout {
    let mut active = ActiveColumns::new();
    let mut max_column = 0;

    let rows = commits
        .iter()
        .map(|commit| {
            let row = layout_row(&mut active, commit);
            max_column = max_column.max(row.column);
            for line in &row.lines {
                max_column = max_column.max(line.to_column);
            }
            row
        })
        .collect();

    GraphLayout { rows, max_column }
}

/// Advances the column state past one commit and returns its row.
pub fn layout_row(active: &mut ActiveColumns, commit: &Commit) -> GraphRow {
    let expecting: Vec<usize> = active
        .iter()
        .filter(|(_, expected)| **expected == commit.commit_id)
        .map(|(&col, _)| col)
        .collect();

    let column = match expecting.first() {
        Some(&col) => col,
        None => find_free_column(active, 0),
    };

    let mut lines: Vec<GraphLine> = active
        .iter()
        .filter(|(_, expected)| **expected != commit.commit_id)
        .map(|(&col, _)| GraphLine::vertical(col))
        .collect();

    // Convention: a merging column is the `from` side, this node the `to` side.
    for &col in expecting.iter().filter(|&&col| col != column) {
        lines.push(GraphLine {
            from_column: col,
            to_column: column,
            line_type: GraphLineType::MergeFrom,
        });
        active.remove(&col);
    }

    active.remove(&column);

    for (i, parent) in commit.parent_ids.iter().enumerate() {
        if i == 0 {
            active.insert(column, parent.clone());
            continue;
        }
        let branch = find_free_column(active, column + 1);
        active.insert(branch, parent.clone());
        lines.push(GraphLine {
            from_column: column,
            to_column: branch,
            line_type: GraphLineType::BranchTo,
        });
    }

    let node_type = if commit.is_working_copy {
        GraphNodeType::WorkingCopy
    } else if commit.is_merge() {
        GraphNodeType::Merge
    } else {
        GraphNodeType::Normal
    };

    GraphRow {
        commit_id: commit.commit_id.clone(),
        column,
        lines,
        node_type,
        has_children: !expecting.is_empty(),
        has_parents: !commit.parent_ids.is_empty(),
    }
}

/// `preferred` if it is free, else the lowest free column.
pub fn find_free_column(active: &ActiveColumns, preferred: usize) -> usize {
    if !active.contains_key(&preferred) {
        return preferred;
    }
    (0..).find(|col| !active.contains_key(col)).unwrap_or(active.len())
}
