use jj_graph::error::{JjError, Result};
use jj_graph::model::{FileChange, FileChangeStatus, GraphNodeType};
use jj_graph::runner::{CommandOutput, CommandRunner, Jj};
use jj_graph::session::{RefreshOutcome, RepositorySession, SessionConfig};
use std::sync::mpsc;
use std::sync::Mutex;
use std::time::Duration;

/// Answers each jj subcommand with whatever the test last scripted.
#[derive(Default)]
struct Scripted {
    log: Mutex<String>,
    status: Mutex<String>,
    summary: Mutex<String>,
    failure: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
}

impl Scripted {
    fn set_log(&self, records: &[Record]) {
        *self.log.lock().unwrap() = records.iter().map(Record::encode).collect();
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for Scripted {
    fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(args.join(" "));
        if let Some(stderr) = self.failure.lock().unwrap().clone() {
            return Ok(CommandOutput { stdout: String::new(), stderr, exit_code: 1 });
        }
        let stdout = match args.first().copied() {
            Some("log") => self.log.lock().unwrap().clone(),
            Some("status") => self.status.lock().unwrap().clone(),
            Some("diff") => self.summary.lock().unwrap().clone(),
            _ => String::new(),
        };
        Ok(CommandOutput { stdout, stderr: String::new(), exit_code: 0 })
    }
}

struct Record {
    id: &'static str,
    parents: &'static str,
    working_copy: bool,
    minute: u32,
}

impl Record {
    fn new(id: &'static str, parents: &'static str, minute: u32) -> Self {
        Self { id, parents, working_copy: false, minute }
    }

    fn working_copy(mut self) -> Self {
        self.working_copy = true;
        self
    }

    fn encode(&self) -> String {
        let fields = [
            self.id.to_string(),
            format!("change-{}", self.id),
            format!("describe {}", self.id),
            "Test <test@example.com>".to_string(),
            format!("2024-06-01T08:{:02}:00Z", self.minute),
            self.working_copy.to_string(),
            String::new(),
            String::new(),
            String::new(),
            self.parents.to_string(),
            "false".to_string(),
        ];
        format!("{}\u{1e}", fields.join("\0"))
    }
}

fn session(config: SessionConfig) -> RepositorySession<Scripted> {
    RepositorySession::new(Jj::new(Scripted::default()), config)
}

fn runner(session: &RepositorySession<Scripted>) -> &Scripted {
    session.jj().runner()
}

#[test]
fn test_refresh_builds_snapshot() {
    let session = session(SessionConfig::default());
    runner(&session).set_log(&[
        Record::new("wc", "m", 4).working_copy(),
        Record::new("m", "a b", 3),
        Record::new("b", "root", 2),
        Record::new("a", "root", 1),
        Record::new("root", "", 0),
    ]);
    *runner(&session).status.lock().unwrap() = "Working copy changes:\nM a.txt\n\nParent commit: xyz\n".into();
    *runner(&session).summary.lock().unwrap() = "A new.rs\n".into();

    assert_eq!(session.refresh().unwrap(), RefreshOutcome::Applied);
    let snapshot = session.snapshot();

    assert_eq!(snapshot.graph.len(), 5);
    assert_eq!(snapshot.layout.rows.len(), 5);
    for (row, commit) in snapshot.layout.rows.iter().zip(snapshot.graph.commits()) {
        assert_eq!(row.commit_id, commit.commit_id);
    }
    assert_eq!(snapshot.layout.rows[0].node_type, GraphNodeType::WorkingCopy);
    assert_eq!(snapshot.layout.rows[1].node_type, GraphNodeType::Merge);
    assert_eq!(snapshot.layout.max_column, 1);

    assert_eq!(snapshot.working_copy_changes, vec![FileChange::new("a.txt", FileChangeStatus::Modified)]);
    assert_eq!(snapshot.selected.as_deref(), Some("wc"));
    assert_eq!(snapshot.selected_commit().map(|c| c.change_id.as_str()), Some("change-wc"));
    assert_eq!(snapshot.selected_changes, vec![FileChange::new("new.rs", FileChangeStatus::Added)]);
    assert!(runner(&session).calls().contains(&"diff -r change-wc --summary".to_string()));
}

#[test]
fn test_failed_refresh_keeps_previous_snapshot() {
    let session = session(SessionConfig::default());
    runner(&session).set_log(&[Record::new("a", "", 0).working_copy()]);
    session.refresh().unwrap();

    *runner(&session).failure.lock().unwrap() = Some("Error: There is no jj repo in \".\"".into());
    assert!(matches!(session.refresh(), Err(JjError::NotARepository)));
    assert_eq!(session.snapshot().graph.len(), 1);
    assert!(!session.is_refreshing());

    *runner(&session).failure.lock().unwrap() = Some("Error: boom".into());
    assert!(matches!(session.refresh(), Err(JjError::CommandFailed(msg)) if msg == "Error: boom"));

    *runner(&session).failure.lock().unwrap() = None;
    runner(&session).set_log(&[Record::new("b", "a", 1).working_copy(), Record::new("a", "", 0)]);
    assert_eq!(session.refresh().unwrap(), RefreshOutcome::Applied);
    assert_eq!(session.snapshot().graph.len(), 2);
}

#[test]
fn test_last_error_reports_stale_graph() {
    let session = session(SessionConfig::default());
    runner(&session).set_log(&[Record::new("a", "", 0).working_copy()]);
    session.refresh().unwrap();
    assert_eq!(session.last_error(), None);

    *runner(&session).failure.lock().unwrap() = Some("Error: There is no jj repo in \".\"".into());
    assert!(session.refresh().is_err());
    assert_eq!(session.last_error().as_deref(), Some("not a jj repository"));

    *runner(&session).failure.lock().unwrap() = Some("Error: boom".into());
    assert!(session.refresh().is_err());
    assert_eq!(session.last_error().as_deref(), Some("jj command failed: Error: boom"));

    *runner(&session).failure.lock().unwrap() = None;
    assert_eq!(session.refresh().unwrap(), RefreshOutcome::Applied);
    assert_eq!(session.last_error(), None);
}

#[test]
fn test_selection_follows_working_copy() {
    let session = session(SessionConfig::default());
    runner(&session).set_log(&[Record::new("wc", "a", 1).working_copy(), Record::new("a", "", 0)]);
    session.refresh().unwrap();

    session.select_commit(Some("a")).unwrap();
    assert_eq!(session.snapshot().selected.as_deref(), Some("a"));

    // Same working copy: the manual selection survives
    session.refresh().unwrap();
    assert_eq!(session.snapshot().selected.as_deref(), Some("a"));

    // New working copy: auto-selected
    runner(&session).set_log(&[
        Record::new("wc2", "wc", 2).working_copy(),
        Record::new("wc", "a", 1),
        Record::new("a", "", 0),
    ]);
    session.refresh().unwrap();
    assert_eq!(session.snapshot().selected.as_deref(), Some("wc2"));
}

#[test]
fn test_vanished_selection_falls_back() {
    let session = session(SessionConfig::default());
    runner(&session).set_log(&[
        Record::new("wc", "b", 2).working_copy(),
        Record::new("b", "a", 1),
        Record::new("a", "", 0),
    ]);
    session.refresh().unwrap();
    session.select_commit(Some("b")).unwrap();

    runner(&session).set_log(&[Record::new("wc", "a", 2).working_copy(), Record::new("a", "", 0)]);
    session.refresh().unwrap();
    assert_eq!(session.snapshot().selected.as_deref(), Some("wc"));
}

#[test]
fn test_clear_selection() {
    let session = session(SessionConfig::default());
    runner(&session).set_log(&[Record::new("a", "", 0).working_copy()]);
    *runner(&session).summary.lock().unwrap() = "M x\n".into();
    session.refresh().unwrap();
    assert_eq!(session.snapshot().selected_changes.len(), 1);

    session.select_commit(None).unwrap();
    let snapshot = session.snapshot();
    assert!(snapshot.selected.is_none());
    assert!(snapshot.selected_changes.is_empty());
    assert_eq!(snapshot.graph.len(), 1);

    session.select_commit(Some("missing")).unwrap();
    assert!(session.snapshot().selected.is_none());
}

#[test]
fn test_topological_sort_option() {
    let config = SessionConfig { topo_sort: true, ..SessionConfig::default() };
    let session = session(config);
    runner(&session).set_log(&[
        Record::new("root", "", 0),
        Record::new("child", "root", 1),
        Record::new("wc", "child", 2).working_copy(),
    ]);
    session.refresh().unwrap();

    let snapshot = session.snapshot();
    let order: Vec<&str> = snapshot.graph.commits().iter().map(|c| c.commit_id.as_str()).collect();
    assert_eq!(order, vec!["wc", "child", "root"]);
    assert!(snapshot.layout.rows.iter().all(|r| r.column == 0));
}

#[test]
fn test_log_arguments_follow_config() {
    let config = SessionConfig { log_limit: 7, revset: "trunk()..".into(), topo_sort: false };
    let session = session(config);
    session.refresh().unwrap();
    let calls = runner(&session).calls();
    assert!(calls.iter().any(|c| c.starts_with("log -r trunk().. --no-graph -n 7 -T ")));
    assert!(calls.iter().any(|c| c == "status"));
}

/// Holds `log` until the test lets it go.
struct Blocking {
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl CommandRunner for Blocking {
    fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        if args.first() == Some(&"log") {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv_timeout(Duration::from_secs(10)).unwrap();
        }
        Ok(CommandOutput::default())
    }
}

#[test]
fn test_concurrent_refresh_is_dropped() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let session = RepositorySession::new(
        Jj::new(Blocking {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        }),
        SessionConfig::default(),
    );

    std::thread::scope(|scope| {
        let first = scope.spawn(|| session.refresh());
        entered_rx.recv_timeout(Duration::from_secs(10)).unwrap();

        assert!(session.is_refreshing());
        assert_eq!(session.refresh().unwrap(), RefreshOutcome::Skipped);

        release_tx.send(()).unwrap();
        assert_eq!(first.join().unwrap().unwrap(), RefreshOutcome::Applied);
    });

    assert!(!session.is_refreshing());
}
