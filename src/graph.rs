// src/graph.rs

use crate::model::*;
use std::collections::{HashMap, VecDeque};

/// One immutable snapshot of the commit set, in display order.
#[derive(Debug, Clone, Default)]
pub struct CommitGraph {
    commits: Vec<Commit>,
    index: HashMap<CommitId, usize>,
}

impl CommitGraph {
    pub fn new(commits: Vec<Commit>) -> Self {
        let mut index = HashMap::with_capacity(commits.len());
        for (i, commit) in commits.iter().enumerate() {
            index.entry(commit.commit_id.clone()).or_insert(i);
        }
        Self { commits, index }
    }

    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn get(&self, commit_id: &str) -> Option<&Commit> {
        self.index.get(commit_id).map(|&i| &self.commits[i])
    }

    pub fn contains(&self, commit_id: &str) -> bool {
        self.index.contains_key(commit_id)
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn working_copy(&self) -> Option<&Commit> {
        self.commits.iter().find(|c| c.is_working_copy)
    }

    pub fn roots(&self) -> impl Iterator<Item = &Commit> {
        self.commits.iter().filter(|c| c.is_root())
    }

    pub fn merges(&self) -> impl Iterator<Item = &Commit> {
        self.commits.iter().filter(|c| c.is_merge())
    }

    pub fn orphans(&self) -> impl Iterator<Item = &Commit> {
        self.commits.iter().filter(|c| c.is_orphaned())
    }

    /// Commits in this snapshot listing `commit_id` as a parent
    pub fn children_of<'a>(&'a self, commit_id: &'a str) -> impl Iterator<Item = &'a Commit> + 'a {
        self.commits
            .iter()
            .filter(move |c| c.parent_ids.iter().any(|p| p == commit_id))
    }

    /// A new graph whose commits are ordered children-first.
    pub fn topologically_sorted(&self) -> Self {
        Self::new(topological_sort(self.commits.clone()))
    }
}

/// Orders commits so that every commit precedes its parents.
///
/// Ties are broken newest-first by timestamp. Parents outside the input are
/// ignored. Ready parents go to the front of the queue so one lineage stays
/// contiguous. Commits unreachable from a head (only possible with a cycle)
/// are left out.
pub fn topological_sort(commits: Vec<Commit>) -> Vec<Commit> {
    if commits.len() <= 1 {
        return commits;
    }

    let mut index: HashMap<&str, usize> = HashMap::with_capacity(commits.len());
    for (i, commit) in commits.iter().enumerate() {
        index.entry(commit.commit_id.as_str()).or_insert(i);
    }

    let mut child_count = vec![0usize; commits.len()];
    for commit in &commits {
        for parent in &commit.parent_ids {
            if let Some(&p) = index.get(parent.as_str()) {
                child_count[p] += 1;
            }
        }
    }

    let newest_first = |a: &usize, b: &usize| commits[*b].timestamp.cmp(&commits[*a].timestamp);

    let mut heads: Vec<usize> = (0..commits.len()).filter(|&i| child_count[i] == 0).collect();
    heads.sort_by(newest_first);
    let mut queue: VecDeque<usize> = heads.into();

    let mut emitted = vec![false; commits.len()];
    let mut order = Vec::with_capacity(commits.len());

    while let Some(current) = queue.pop_front() {
        if emitted[current] {
            continue;
        }
        emitted[current] = true;
        order.push(current);

        let mut ready = Vec::new();
        for parent in &commits[current].parent_ids {
            let Some(&p) = index.get(parent.as_str()) else {
                continue;
            };
            if emitted[p] {
                continue;
            }
            child_count[p] = child_count[p].saturating_sub(1);
            if child_count[p] == 0 {
                ready.push(p);
            }
        }

        ready.sort_by(newest_first);
        for &p in ready.iter().rev() {
            queue.push_front(p);
        }
    }

    let mut slots: Vec<Option<Commit>> = commits.into_iter().map(Some).collect();
    order.into_iter().filter_map(|i| slots[i].take()).collect()
}
