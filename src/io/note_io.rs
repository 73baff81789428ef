use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::doc::{DocError, Document};
use crate::io::lock::{FileLock, LockError};
use crate::model::{AppConfig, Node};
use crate::ops::task_timer::{TimerError, purge_timers};

/// Current on-disk format version
pub const NOTE_FORMAT_VERSION: u32 = 1;

/// Error type for loading and saving notes
#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("unsupported note format version {0}")]
    UnsupportedVersion(u32),
    #[error("note content is invalid: {0}")]
    Invalid(#[from] DocError),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("could not clear countdowns: {0}")]
    Timer(#[from] TimerError),
    #[error("could not serialize note: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct NoteFile {
    version: u32,
    doc: Node,
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

fn xdg_dir(var: &str, fallback: &str) -> PathBuf {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| dirs_home().join(fallback))
        .join("tasknote")
}

/// `$XDG_CONFIG_HOME/tasknote`
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// `$XDG_DATA_HOME/tasknote`
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

/// `$XDG_STATE_HOME/tasknote`, home of logs and the local calendar
pub fn state_dir() -> PathBuf {
    xdg_dir("XDG_STATE_HOME", ".local/state")
}

/// Expand a leading `~/`
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs_home().join(rest),
        None => PathBuf::from(path),
    }
}

/// The note to open: explicit override, then config, then the data dir
pub fn resolve_note_path(config: &AppConfig, explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match &config.note.path {
        Some(path) => expand_home(path),
        None => data_dir().join("note.json"),
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Parse a note from its JSON text. Transient marks are dropped and
/// countdowns cleared: neither survives a restart.
pub fn parse_note_json(path: &Path, content: &str) -> Result<Document, NoteError> {
    let file: NoteFile = serde_json::from_str(content).map_err(|e| NoteError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    if file.version != NOTE_FORMAT_VERSION {
        return Err(NoteError::UnsupportedVersion(file.version));
    }
    let mut root = file.doc;
    root.strip_transient_marks();
    let mut doc = Document::new(root)?;
    let purged = purge_timers(&mut doc)?;
    if purged > 0 {
        log::info!("event=load_note purged_timers={}", purged);
    }
    Ok(doc)
}

/// Load the note at `path`. A missing file is a fresh, empty note.
pub fn load_note(path: &Path) -> Result<Document, NoteError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("event=load_note status=missing path={}", path.display());
            return Ok(Document::default());
        }
        Err(e) => {
            return Err(NoteError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    parse_note_json(path, &content)
}

/// The JSON that `save_note` writes for `doc`
pub fn note_json(doc: &Document) -> Result<String, NoteError> {
    let file = NoteFile {
        version: NOTE_FORMAT_VERSION,
        doc: doc.persistent_root(),
    };
    let mut json = serde_json::to_string_pretty(&file)?;
    json.push('\n');
    Ok(json)
}

/// Save the note atomically under the note lock. Returns the text written.
pub fn save_note(path: &Path, doc: &Document) -> Result<String, NoteError> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).map_err(|e| NoteError::WriteError {
            path: dir.to_path_buf(),
            source: e,
        })?;
    }
    let json = note_json(doc)?;
    let _lock = FileLock::acquire_default(path)?;
    atomic_write(path, json.as_bytes()).map_err(|e| NoteError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })?;
    log::debug!("event=save_note path={} bytes={}", path.display(), json.len());
    Ok(json)
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
