//! Logging initialization.
//!
//! The terminal belongs to the game screen, so log lines go to a file
//! instead of stderr. `GRIDSTRIKE_LOG` overrides the configured filter.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV_VAR: &str = "GRIDSTRIKE_LOG";

/// Builds the filter: `GRIDSTRIKE_LOG` if set and valid, else `level`,
/// else `info`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Installs the global subscriber. Returns whether a log file is active.
///
/// Uses `try_init()` so calling this more than once (e.g. in tests) is safe.
pub fn init_logging(config: &LoggingConfig) -> std::io::Result<bool> {
    let Some(path) = &config.file else {
        return Ok(false);
    };
    let file = open_log_file(path)?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(&config.level))
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_when_no_file() {
        let cfg = LoggingConfig { level: "debug".into(), file: None };
        assert!(!init_logging(&cfg).unwrap());
    }

    #[test]
    fn creates_log_file_and_tolerates_repeat_init() {
        let dir = std::env::temp_dir().join(format!("gridstrike_log_{}", std::process::id()));
        let path = dir.join("nested").join("game.log");
        let cfg = LoggingConfig { level: "info".into(), file: Some(path.clone()) };

        assert!(init_logging(&cfg).unwrap());
        assert!(init_logging(&cfg).unwrap());
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unwritable_path_is_an_error() {
        // A regular file cannot act as a parent directory
        let blocker = std::env::temp_dir().join(format!("gridstrike_log_blk_{}", std::process::id()));
        std::fs::write(&blocker, "").unwrap();
        let cfg = LoggingConfig { level: "info".into(), file: Some(blocker.join("x.log")) };
        assert!(init_logging(&cfg).is_err());
        let _ = std::fs::remove_file(&blocker);
    }

    #[test]
    fn bad_directive_falls_back() {
        // Must not panic on garbage
        let _ = build_filter("===");
    }
}
