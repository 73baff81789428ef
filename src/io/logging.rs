//! File logging for the `tn` binary.
//!
//! The TUI owns the terminal, so log output always goes to rotating files
//! under the state directory. Initialization happens at most once per
//! process and never panics.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};

use super::note_io::state_dir;

const LOG_FILE_BASENAME: &str = "tasknote";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

/// Environment variable overriding the configured level
pub const LOG_ENV: &str = "TASKNOTE_LOG";

static LOGGER: OnceLock<LoggerHandle> = OnceLock::new();

/// `$XDG_STATE_HOME/tasknote/logs`
pub fn default_log_dir() -> PathBuf {
    state_dir().join("logs")
}

/// Pick the level: command line, then `TASKNOTE_LOG`, then config, then
/// `warn`.
pub fn resolve_level(cli: Option<&str>, config: Option<&str>) -> String {
    let env = std::env::var(LOG_ENV).ok().filter(|v| !v.trim().is_empty());
    cli.map(str::to_string)
        .or(env)
        .or_else(|| config.map(str::to_string))
        .unwrap_or_else(|| "warn".to_string())
}

pub fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        "off" => Ok("off"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error|off"
        )),
    }
}

/// Start logging to `dir`. Later calls are ignored.
pub fn init_logging(level: &str, dir: &Path) -> Result<(), String> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let level = normalize_level(level)?;
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("failed to create log directory `{}`: {e}", dir.display()))?;

    let handle = Logger::try_with_str(level)
        .map_err(|e| format!("invalid log level `{level}`: {e}"))?
        .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|e| format!("failed to start logger: {e}"))?;

    log::info!(
        "event=app_start version={} level={} log_dir={}",
        env!("CARGO_PKG_VERSION"),
        level,
        dir.display()
    );
    let _ = LOGGER.set(handle);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_level() {
        assert_eq!(normalize_level(" WARNING "), Ok("warn"));
        assert_eq!(normalize_level("debug"), Ok("debug"));
        assert!(normalize_level("loud").is_err());
    }

    #[test]
    fn test_resolve_level_prefers_cli() {
        assert_eq!(resolve_level(Some("trace"), Some("error")), "trace");
    }
}
