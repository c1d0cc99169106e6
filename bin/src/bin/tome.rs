use clap::Parser;
use tome_bin::{
    cli::{Cli, Command},
    commands,
};
use tome_log::LogConfig;

fn main() {
    let cli = Cli::parse();

    let log_guard = match tome_log::init(LogConfig {
        log_file_path: cli.log_file.clone(),
    }) {
        Ok(guard) => {
            tracing::debug!("logging to {}", guard.log_file.display());
            Some(guard)
        },
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {e}");
            None
        },
    };

    let result = match &cli.command {
        Command::Layout(args) => commands::layout::run(args),
        Command::Replay { file, script } => commands::replay::run(file, script),
    };

    match result {
        Ok(output) => print!("{output}"),
        Err(e) => {
            tracing::error!("command failed: {e:#}");
            eprintln!("Error: {e:#}");
            drop(log_guard);
            std::process::exit(1);
        },
    }
}
