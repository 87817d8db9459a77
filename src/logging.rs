//! Tracing subscriber setup.

use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// The filter is `forced` when given (e.g. from `--verbose`), otherwise it
/// comes from `ORGDASH_LOG`, then `RUST_LOG`, then `default_level`. With `log_dir` set, output goes to a daily rolling `orgdash.log` there;
/// otherwise to stderr so stdout stays clean for command output.
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init(
  forced: Option<&str>,
  default_level: &str,
  log_dir: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
  let directive = filter_directive(forced, default_level, |name| std::env::var(name).ok());
  let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(default_level));

  match log_dir {
    Some(dir) => {
      std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
      let appender = tracing_appender::rolling::daily(dir, "orgdash.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);

      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

      Ok(None)
    }
  }
}

/// First usable directive: `forced`, `ORGDASH_LOG`, `RUST_LOG`, `default_level`.
fn filter_directive(
  forced: Option<&str>,
  default_level: &str,
  lookup: impl Fn(&str) -> Option<String>,
) -> String {
  forced
    .map(str::to_string)
    .into_iter()
    .chain(lookup("ORGDASH_LOG"))
    .chain(lookup("RUST_LOG"))
    .find(|directive| EnvFilter::try_new(directive).is_ok())
    .unwrap_or_else(|| default_level.to_string())
}
