// src/runner.rs

use crate::diff;
use crate::error::{JjError, Result};
use crate::log;
use crate::model::*;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// stderr of a failed command contains this when the path holds no repository
pub const NOT_A_REPOSITORY_MARKER: &str = "no jj repo";

/// Log template matching [`crate::log::parse_log`]: fields separated by NUL,
/// records terminated by 0x1E.
pub const LOG_TEMPLATE: &str = concat!(
    r#"commit_id ++ "\x00" ++ change_id ++ "\x00" ++ "#,
    r#"description.first_line() ++ "\x00" ++ "#,
    r#"author.name() ++ " <" ++ author.email() ++ ">" ++ "\x00" ++ "#,
    r#"committer.timestamp().utc().format("%Y-%m-%dT%H:%M:%SZ") ++ "\x00" ++ "#,
    r#"if(current_working_copy, "true", "false") ++ "\x00" ++ "#,
    r#"local_bookmarks ++ " " ++ remote_bookmarks ++ "\x00" ++ "#,
    r#"tags ++ "\x00" ++ "#,
    r#"if(signature, signature.status(), "") ++ "\x00" ++ "#,
    r#"parents.map(|c| c.commit_id()).join(" ") ++ "\x00" ++ "#,
    r#"if(empty, "true", "false") ++ "\x1e""#,
);

/// What a finished command left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Runs one `jj` invocation to completion.
pub trait CommandRunner: Send + Sync {
    fn run(&self, args: &[&str]) -> Result<CommandOutput>;
}

/// Spawns the real `jj` binary against one repository.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    repo: PathBuf,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>, repo: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            repo: repo.into(),
        }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        if !self.repo.is_dir() {
            return Err(JjError::NotARepository);
        }
        debug!(program = %self.program.display(), ?args, "Running jj");
        let output = Command::new(&self.program)
            .arg("-R")
            .arg(&self.repo)
            .args(args)
            .output()
            .map_err(|source| JjError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

/// Typed queries over a [`CommandRunner`].
#[derive(Debug, Clone)]
pub struct Jj<R> {
    runner: R,
}

impl<R: CommandRunner> Jj<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// stdout of a successful run; failures become typed errors.
    fn run_checked(&self, args: &[&str]) -> Result<String> {
        let output = self.runner.run(args)?;
        if output.exit_code != 0 {
            if output.stderr.contains(NOT_A_REPOSITORY_MARKER) {
                return Err(JjError::NotARepository);
            }
            return Err(JjError::CommandFailed(output.stderr.trim().to_string()));
        }
        Ok(output.stdout)
    }

    /// Commits of `revset`, newest first, at most `limit` of them.
    pub fn fetch_log(&self, revset: &str, limit: usize) -> Result<Vec<Commit>> {
        let limit = limit.to_string();
        let output = self.run_checked(&[
            "log", "-r", revset, "--no-graph", "-n", &limit, "-T", LOG_TEMPLATE,
        ])?;
        Ok(log::parse_log(&output))
    }

    pub fn fetch_status(&self) -> Result<Vec<FileChange>> {
        let output = self.run_checked(&["status"])?;
        Ok(log::parse_status(&output))
    }

    /// Files touched by `revision`.
    pub fn fetch_changes(&self, revision: &str) -> Result<Vec<FileChange>> {
        let output = self.run_checked(&["diff", "-r", revision, "--summary"])?;
        Ok(log::parse_summary(&output))
    }

    pub fn fetch_file_diff(&self, revision: &str, path: &str) -> Result<FileDiff> {
        let output = self.run_checked(&["diff", "-r", revision, "--git", path])?;
        Ok(diff::parse_file_diff(&output, path))
    }

    /// Every file diff of `revision` from a single invocation.
    pub fn fetch_revision_diffs(&self, revision: &str) -> Result<Vec<FileDiff>> {
        let output = self.run_checked(&["diff", "-r", revision, "--git"])?;
        Ok(diff::parse_git_diff(&output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Canned {
        output: CommandOutput,
        calls: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(stdout: &str, stderr: &str, exit_code: i32) -> Self {
            Self {
                output: CommandOutput {
                    stdout: stdout.to_string(),
                    stderr: stderr.to_string(),
                    exit_code,
                },
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for Canned {
        fn run(&self, args: &[&str]) -> Result<CommandOutput> {
            self.calls.lock().unwrap().push(args.join(" "));
            Ok(self.output.clone())
        }
    }

    #[test]
    fn test_not_a_repository() {
        let jj = Jj::new(Canned::new("", "Error: There is no jj repo in \".\"\n", 1));
        assert!(matches!(jj.fetch_status(), Err(JjError::NotARepository)));
    }

    #[test]
    fn test_command_failed_carries_stderr() {
        let jj = Jj::new(Canned::new("", "Error: Revision \"zzz\" doesn't exist\n", 1));
        match jj.fetch_changes("zzz") {
            Err(JjError::CommandFailed(msg)) => assert_eq!(msg, "Error: Revision \"zzz\" doesn't exist"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_fetch_changes_arguments() {
        let jj = Jj::new(Canned::new("M src/lib.rs\n", "", 0));
        let changes = jj.fetch_changes("kxq").unwrap();
        assert_eq!(changes, vec![FileChange::new("src/lib.rs", FileChangeStatus::Modified)]);
        assert_eq!(jj.runner().calls.lock().unwrap()[0], "diff -r kxq --summary");
    }

    #[test]
    fn test_fetch_log_uses_template() {
        let jj = Jj::new(Canned::new("", "", 0));
        assert!(jj.fetch_log("::", 50).unwrap().is_empty());
        let call = jj.runner().calls.lock().unwrap()[0].clone();
        assert!(call.starts_with("log -r :: --no-graph -n 50 -T "));
        assert!(call.ends_with(LOG_TEMPLATE));
    }

    #[test]
    fn test_missing_repository_path() {
        let jj = Jj::new(ProcessRunner::new("jj", "/nonexistent/jj-graph/repo"));
        assert!(matches!(jj.fetch_status(), Err(JjError::NotARepository)));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let repo = std::env::temp_dir();
        let runner = ProcessRunner::new("/nonexistent/jj-graph/bin/jj", &repo);
        assert!(matches!(runner.run(&["status"]), Err(JjError::Spawn { .. })));
    }

    #[test]
    fn test_template_field_count() {
        // One separator between each of the 11 fields
        assert_eq!(LOG_TEMPLATE.matches(r#""\x00""#).count(), 10);
        assert!(LOG_TEMPLATE.ends_with(r#""\x1e""#));
    }
}
