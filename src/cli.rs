// src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the jj repository
    #[arg(short = 'R', long, global = true, default_value = ".")]
    pub repo: PathBuf,

    /// The jj executable to run
    #[arg(long, global = true, env = "JJ_PATH", default_value = "jj")]
    pub jj: PathBuf,

    /// When to colour graph lanes
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the commit graph
    Log(LogArgs),
    /// Show working copy changes
    Status,
    /// List the files a revision changed, with line counts
    Show {
        #[arg(default_value = "@")]
        revision: String,
    },
    /// Show the diff of one file in a revision
    Diff { revision: String, path: String },
}

#[derive(clap::Args, Debug, Clone)]
pub struct LogArgs {
    /// Maximum number of commits to load
    #[arg(short = 'n', long, default_value_t = 50)]
    pub limit: usize,

    /// Revisions to show
    #[arg(short, long, default_value = "::")]
    pub revset: String,

    /// Sort children before parents instead of trusting jj's order
    #[arg(long)]
    pub topo: bool,

    /// Also write the graph as an image
    #[arg(long)]
    pub png: Option<PathBuf>,

    /// Pixel size of one graph cell in the image
    #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(u32).range(4..=256))]
    pub cell_size: u32,
}

impl Default for LogArgs {
    fn default() -> Self {
        Self {
            limit: 50,
            revset: "::".to_string(),
            topo: false,
            png: None,
            cell_size: 24,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// Colour when stdout is a terminal
    Auto,
    Always,
    Never,
}
