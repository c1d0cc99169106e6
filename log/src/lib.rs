//! Logging setup for tome with file output and optional stdout.
//!
//! Logs always go to a file at `warn` level (or higher if `TOME_LOG` is set).
//! Stdout logging is enabled when `TOME_LOG` or `RUST_LOG` is set, or in debug builds.
//!
//! ## Environment Variables
//!
//! 1. **`TOME_LOG`** (highest priority) - tome-specific logging control
//! 2. **`RUST_LOG`** - Standard tracing environment variable
//! 3. **Default** - `warn` globally, `info` for tome crates
//!
//! ## Log File Location
//!
//! Default: `<data_local_dir>/tome/logs/tome-<pid>.log`
//! - macOS: `~/Library/Application Support/tome/logs/tome-12345.log`
//! - Linux: `~/.local/share/tome/logs/tome-12345.log`
//!
//! Override with `--log-file <path>` on the `tome` binary.

use std::{
    env,
    path::{Path, PathBuf},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Crates that `TOME_LOG=<level>` expands to.
const TOME_CRATES: &[&str] = &["tome_text", "tome_text_transform", "tome_bin", "tome_log"];

type InitError = Box<dyn std::error::Error + Send + Sync>;

/// Returned from [`init`]; must be held alive to ensure log file flushing.
pub struct LogGuard {
    _file_guard: WorkerGuard,
    pub log_file: PathBuf,
}

#[derive(Debug, Default)]
pub struct LogConfig {
    pub log_file_path: Option<PathBuf>,
}

/// Initialize logging.
///
/// This function respects the environment variable priority described in the module docs:
/// `TOME_LOG` > `RUST_LOG` > default settings.
///
/// The returned [`LogGuard`] must be held for the lifetime of the program --
/// dropping it flushes and stops the background file writer.
pub fn init(config: LogConfig) -> Result<LogGuard, InitError> {
    let (log_dir, filename) = resolve_log_path(config.log_file_path);

    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, &filename);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_filter(create_file_filter());

    let stdout_enabled =
        env::var("TOME_LOG").is_ok() || env::var("RUST_LOG").is_ok() || cfg!(debug_assertions);

    let stdout_layer = if stdout_enabled {
        Some(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(create_filter()),
        )
    } else {
        None
    };

    Registry::default()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()?;

    Ok(LogGuard {
        _file_guard: file_guard,
        log_file: log_dir.join(filename),
    })
}

/// Initialize logging for tests.
///
/// Stdout-only (no file output). Will not crash if called multiple times or if
/// logging is already initialized by another test.
#[allow(clippy::let_unit_value)]
pub fn test() {
    let _ = fmt()
        .with_env_filter(create_filter())
        .with_test_writer()
        .try_init();
}

/// Split an optional override into `(directory, file name)`.
///
/// A path with an extension is treated as the log file itself, anything else as
/// the directory to place `tome-<pid>.log` in.
fn resolve_log_path(override_path: Option<PathBuf>) -> (PathBuf, String) {
    let filename = format!("tome-{}.log", std::process::id());

    if let Some(path) = override_path {
        if path.extension().is_some() {
            let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(filename);
            return (dir, name);
        }
        return (path, filename);
    }

    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tome")
        .join("logs");

    (dir, filename)
}

/// File filter: uses user-specified level if set, otherwise defaults to `warn`.
fn create_file_filter() -> EnvFilter {
    if env::var("TOME_LOG").is_ok() || env::var("RUST_LOG").is_ok() {
        return create_filter();
    }
    EnvFilter::new("warn")
}

/// Create the appropriate [`EnvFilter`] based on environment variables.
fn create_filter() -> EnvFilter {
    if let Ok(tome_log) = env::var("TOME_LOG") {
        return expand_tome_log(&tome_log);
    }

    if let Ok(rust_log) = env::var("RUST_LOG") {
        return EnvFilter::new(rust_log);
    }

    EnvFilter::new(directives("info"))
}

/// Expand `TOME_LOG` values into full tracing filter strings.
///
/// - `TOME_LOG=debug` becomes `warn,tome_text=debug,tome_text_transform=debug,...`
/// - `TOME_LOG=tome_text=trace,tome_bin=debug` is used as-is
fn expand_tome_log(tome_log: &str) -> EnvFilter {
    if tome_log.contains('=') || tome_log.contains(':') || tome_log.contains(',') {
        return EnvFilter::new(tome_log);
    }

    EnvFilter::new(directives(tome_log))
}

fn directives(level: &str) -> String {
    let mut out = String::from("warn");
    for krate in TOME_CRATES {
        out.push(',');
        out.push_str(krate);
        out.push('=');
        out.push_str(level);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_with_extension_is_a_file() {
        let (dir, name) = resolve_log_path(Some(PathBuf::from("/tmp/logs/custom.log")));
        assert_eq!(dir, PathBuf::from("/tmp/logs"));
        assert_eq!(name, "custom.log");
    }

    #[test]
    fn override_without_extension_is_a_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let (dir, name) = resolve_log_path(Some(tmp.path().to_path_buf()));
        assert_eq!(dir, tmp.path());
        assert_eq!(name, format!("tome-{}.log", std::process::id()));
    }

    #[test]
    fn default_path_lives_under_tome_logs() {
        let (dir, _) = resolve_log_path(None);
        assert!(dir.ends_with("tome/logs"));
    }

    #[test]
    fn level_expands_to_every_crate() {
        let expanded = directives("debug");
        assert!(expanded.starts_with("warn,"));
        for krate in TOME_CRATES {
            assert!(expanded.contains(&format!("{krate}=debug")));
        }
    }

    #[test]
    fn repeated_test_init_is_harmless() {
        test();
        test();
    }
}
