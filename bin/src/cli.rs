use crate::commands::parse_fold;
use clap::Parser;
use std::path::PathBuf;
use tome_text::Position;
use tome_text_transform::WrapMode;

/// Command-line interface configuration
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Write logs to this file (or directory) instead of the default location
    #[arg(long, global = true, env = "TOME_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Print the visual lines of a text file
    Layout(LayoutArgs),

    /// Apply an edit script to a text file and print the result
    Replay {
        /// Text file to load
        file: PathBuf,

        /// Edit script, one command per line
        script: PathBuf,
    },
}

#[derive(Debug, clap::Args)]
pub struct LayoutArgs {
    /// Text file to lay out
    pub file: PathBuf,

    /// Layout config file; `tome.toml` in the working directory is used if present
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Columns per visual line
    #[arg(short, long)]
    pub width: Option<usize>,

    /// Wrap mode: none, anywhere, word or word_or_anywhere
    #[arg(long)]
    pub wrap: Option<WrapMode>,

    #[arg(long)]
    pub tab_width: Option<usize>,

    /// Fold a range, as `line:column-line:column` (repeatable)
    #[arg(long = "fold", value_parser = parse_fold)]
    pub folds: Vec<(Position, Position)>,

    /// Prefix every visual line with the document line it starts in
    #[arg(short = 'n', long)]
    pub numbers: bool,
}
