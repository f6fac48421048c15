// src/main.rs

use clap::Parser;
use indicatif::{ParallelProgressIterator, ProgressBar};
use jj_graph::cli::{Args, ColorMode, Command, LogArgs};
use jj_graph::model::{DiffLineType, FileDiff};
use jj_graph::renderer;
use jj_graph::runner::{Jj, ProcessRunner};
use jj_graph::session::{RepositorySession, SessionConfig};
use jj_graph::Result;
use rayon::prelude::*;
use std::io::IsTerminal;
use std::process::ExitCode;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let start_time = Instant::now();
    let jj = Jj::new(ProcessRunner::new(&args.jj, &args.repo));
    let color = match args.color {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => std::io::stdout().is_terminal(),
    };

    let result = match args.command.clone().unwrap_or(Command::Log(LogArgs::default())) {
        Command::Log(log_args) => run_log(jj, &log_args, color),
        Command::Status => run_status(&jj),
        Command::Show { revision } => run_show(&jj, &revision),
        Command::Diff { revision, path } => run_diff(&jj, &revision, &path),
    };

    info!(elapsed = ?start_time.elapsed(), "Done");
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_log(jj: Jj<ProcessRunner>, args: &LogArgs, color: bool) -> Result<()> {
    let config = SessionConfig {
        log_limit: args.limit,
        revset: args.revset.clone(),
        topo_sort: args.topo,
    };
    let session = RepositorySession::new(jj, config);
    session.refresh()?;

    let snapshot = session.snapshot();
    print!("{}", renderer::render_text(&snapshot.graph, &snapshot.layout, color));

    if let Some(path) = &args.png {
        let render_start = Instant::now();
        renderer::save_png(&snapshot.layout, args.cell_size, path)?;
        info!(path = %path.display(), elapsed = ?render_start.elapsed(), "Wrote graph image");
    }
    Ok(())
}

fn run_status(jj: &Jj<ProcessRunner>) -> Result<()> {
    let changes = jj.fetch_status()?;
    if changes.is_empty() {
        println!("The working copy has no changes.");
    }
    for change in changes {
        println!("{} {}", change.status.code(), change.path);
    }
    Ok(())
}

fn run_show(jj: &Jj<ProcessRunner>, revision: &str) -> Result<()> {
    let changes = jj.fetch_changes(revision)?;

    let bar = ProgressBar::new(changes.len() as u64);
    bar.set_message("Fetching diffs");
    let diffs: Vec<FileDiff> = changes
        .par_iter()
        .progress_with(bar)
        .map(|change| jj.fetch_file_diff(revision, &change.path))
        .collect::<Result<_>>()?;

    let (mut additions, mut deletions) = (0, 0);
    for (change, diff) in changes.iter().zip(&diffs) {
        additions += diff.stats.additions;
        deletions += diff.stats.deletions;
        println!(
            "{} {:<50} +{:<5} -{}",
            change.status.code(),
            change.path,
            diff.stats.additions,
            diff.stats.deletions
        );
    }
    println!("{} files changed, {} insertions(+), {} deletions(-)", changes.len(), additions, deletions);
    Ok(())
}

fn run_diff(jj: &Jj<ProcessRunner>, revision: &str, path: &str) -> Result<()> {
    let diff = jj.fetch_file_diff(revision, path)?;
    if diff.is_empty() {
        println!("{}: no changes", diff.path);
        return Ok(());
    }

    println!("{} (+{} -{})", diff.path, diff.stats.additions, diff.stats.deletions);
    let number = |n: Option<usize>| n.map_or_else(String::new, |n| n.to_string());
    for hunk in &diff.hunks {
        println!("{}", hunk.header);
        for line in &hunk.lines {
            let marker = match line.line_type {
                DiffLineType::Context => ' ',
                DiffLineType::Addition => '+',
                DiffLineType::Deletion => '-',
            };
            println!(
                "{:>5} {:>5} {}{}",
                number(line.old_line_number),
                number(line.new_line_number),
                marker,
                line.content
            );
        }
    }
    Ok(())
}
