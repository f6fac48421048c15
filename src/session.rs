// src/session.rs

use crate::error::Result;
use crate::graph::CommitGraph;
use crate::layout;
use crate::model::*;
use crate::runner::{CommandRunner, Jj};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Knobs for what a refresh fetches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum number of commits to load
    pub log_limit: usize,
    pub revset: String,
    /// Reorder commits children-first instead of trusting the tool's order
    pub topo_sort: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            log_limit: 50,
            revset: "::".to_string(),
            topo_sort: false,
        }
    }
}

/// Everything one refresh produced. Replaced wholesale, never edited.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub graph: CommitGraph,
    pub layout: GraphLayout,
    pub working_copy_changes: Vec<FileChange>,
    /// Commit id of the selected commit
    pub selected: Option<CommitId>,
    pub selected_changes: Vec<FileChange>,
}

impl Snapshot {
    pub fn selected_commit(&self) -> Option<&Commit> {
        self.selected.as_deref().and_then(|id| self.graph.get(id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// Another refresh was already running
    Skipped,
}

/// Clears the in-flight flag however the refresh ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the refresh cycle for one repository.
pub struct RepositorySession<R> {
    jj: Jj<R>,
    config: SessionConfig,
    snapshot: RwLock<Arc<Snapshot>>,
    refreshing: AtomicBool,
    /// Serialises refresh and selection changes
    mutation: Mutex<()>,
    last_error: Mutex<Option<String>>,
}

impl<R: CommandRunner> RepositorySession<R> {
    pub fn new(jj: Jj<R>, config: SessionConfig) -> Self {
        Self {
            jj,
            config,
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            refreshing: AtomicBool::new(false),
            mutation: Mutex::new(()),
            last_error: Mutex::new(None),
        }
    }

    pub fn jj(&self) -> &Jj<R> {
        &self.jj
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The latest complete snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    fn publish(&self, snapshot: Snapshot) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
    }

    /// Reloads log and status and recomputes the layout.
    ///
    /// A call made while another refresh runs is dropped. On error the
    /// previous snapshot stays in place.
    pub fn refresh(&self) -> Result<RefreshOutcome> {
        let Some(_in_flight) = InFlight::acquire(&self.refreshing) else {
            debug!("Skipping refresh, one is already in progress");
            return Ok(RefreshOutcome::Skipped);
        };
        let _guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);

        info!(revset = %self.config.revset, limit = self.config.log_limit, "Starting refresh");
        let previous = self.snapshot();

        let next = self.load(&previous).inspect_err(|e| {
            warn!(error = %e, "Refresh failed, keeping previous snapshot");
            self.set_last_error(Some(e.to_string()));
        })?;

        info!(
            commits = next.graph.len(),
            changes = next.working_copy_changes.len(),
            "Refresh applied"
        );
        self.publish(next);
        self.set_last_error(None);
        Ok(RefreshOutcome::Applied)
    }

    /// Why the most recent refresh failed, cleared by the next one that succeeds.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_last_error(&self, error: Option<String>) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }

    fn load(&self, previous: &Snapshot) -> Result<Snapshot> {
        let (commits, status) = rayon::join(
            || self.jj.fetch_log(&self.config.revset, self.config.log_limit),
            || self.jj.fetch_status(),
        );

        let mut graph = CommitGraph::new(commits?);
        if self.config.topo_sort {
            graph = graph.topologically_sorted();
        }
        let working_copy_changes = status?;
        let layout = layout::calculate(graph.commits());

        let selected = pick_selection(previous, &graph);
        let selected_changes = match selected.as_deref().and_then(|id| graph.get(id)) {
            Some(commit) => self.jj.fetch_changes(&commit.change_id)?,
            None => Vec::new(),
        };

        Ok(Snapshot {
            graph,
            layout,
            working_copy_changes,
            selected,
            selected_changes,
        })
    }

    /// Selects a commit by id, or clears the selection with `None`.
    pub fn select_commit(&self, commit_id: Option<&str>) -> Result<()> {
        let _guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot();

        let commit = commit_id.and_then(|id| current.graph.get(id));
        let selected_changes = match commit {
            Some(commit) => self.jj.fetch_changes(&commit.change_id)?,
            None => Vec::new(),
        };
        if commit.is_none() && commit_id.is_some() {
            debug!(?commit_id, "Selected commit is not in the snapshot");
        }

        let next = Snapshot {
            selected: commit.map(|c| c.commit_id.clone()),
            selected_changes,
            ..(*current).clone()
        };
        self.publish(next);
        Ok(())
    }

    pub fn file_diff(&self, revision: &str, path: &str) -> Result<FileDiff> {
        self.jj.fetch_file_diff(revision, path)
    }

    pub fn revision_diffs(&self, revision: &str) -> Result<Vec<FileDiff>> {
        self.jj.fetch_revision_diffs(revision)
    }
}

/// Keeps the current selection unless nothing is selected, the working copy
/// moved, or the selected commit disappeared; then the working copy (or the
/// newest commit) is selected.
fn pick_selection(previous: &Snapshot, graph: &CommitGraph) -> Option<CommitId> {
    let working_copy = graph.working_copy().or_else(|| graph.commits().first());
    let previous_working_copy = previous
        .graph
        .working_copy()
        .or_else(|| previous.graph.commits().first())
        .map(|c| c.commit_id.as_str());

    let working_copy_changed = working_copy.map(|c| c.commit_id.as_str()) != previous_working_copy;
    let still_exists = previous.selected.as_deref().is_some_and(|id| graph.contains(id));

    if previous.selected.is_none() || working_copy_changed || !still_exists {
        if let Some(commit) = working_copy {
            info!(change = commit.short_change_id(), "Auto-selected working copy");
        }
        working_copy.map(|c| c.commit_id.clone())
    } else {
        previous.selected.clone()
    }
}
