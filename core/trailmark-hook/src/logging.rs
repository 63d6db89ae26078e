//! Log setup for the replayer.
//!
//! Stdout carries the replayed records, so diagnostics go to a daily file
//! under `~/.trailmark/` (`trailmark-hook.{date}.log`, last 7 kept), or to
//! stderr when that directory cannot be used. `RUST_LOG` overrides the
//! built-in directives.

use std::path::{Path, PathBuf};

use fs_err as fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE_PREFIX: &str = "trailmark-hook";
const KEPT_LOG_FILES: usize = 7;

fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "trailmark_hook=trace,trailmark_core=trace"
    } else {
        "trailmark_hook=debug,trailmark_core=info"
    }
}

fn resolve_log_dir(log_dir: Option<PathBuf>) -> PathBuf {
    log_dir
        .or_else(trailmark_core::config::get_trailmark_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Installs the global subscriber.
///
/// The returned guard flushes buffered file output when dropped; keep it
/// alive until the replay is over. `None` means logs go to stderr.
pub fn init(log_dir: Option<PathBuf>, verbose: bool) -> Option<WorkerGuard> {
    let log_dir = resolve_log_dir(log_dir);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let appender = fs::create_dir_all(&log_dir)
        .map_err(|e| e.to_string())
        .and_then(|_| create_file_appender(&log_dir).map_err(|e| e.to_string()));

    match appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(writer)
                        .with_timer(fmt::time::UtcTime::rfc_3339())
                        .with_ansi(false),
                )
                .init();
            tracing::debug!(dir = %log_dir.display(), "File logging enabled");
            Some(guard)
        }
        Err(reason) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_timer(fmt::time::UtcTime::rfc_3339()),
                )
                .init();
            tracing::warn!(dir = %log_dir.display(), %reason, "Logging to stderr");
            None
        }
    }
}

fn create_file_appender(log_dir: &Path) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(KEPT_LOG_FILES)
        .build(log_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_explicit_log_dir_wins() {
        let dir = PathBuf::from("/tmp/trailmark-logs");
        assert_eq!(resolve_log_dir(Some(dir.clone())), dir);
    }

    #[test]
    fn test_directives_parse() {
        for verbose in [false, true] {
            assert!(default_directives(verbose).parse::<EnvFilter>().is_ok());
        }
        assert!(default_directives(false).contains("trailmark_core=info"));
    }

    #[test]
    fn test_file_appender_writes_prefixed_log() {
        let temp = tempdir().unwrap();
        let mut appender = create_file_appender(temp.path()).unwrap();
        writeln!(appender, "hello").unwrap();
        appender.flush().unwrap();

        let names: Vec<String> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("trailmark-hook."));
        assert!(names[0].ends_with(".log"));
    }
}
