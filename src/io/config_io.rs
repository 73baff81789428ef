use std::fs;
use std::path::{Path, PathBuf};

use crate::io::note_io::{atomic_write, config_dir};
use crate::model::AppConfig;

/// Error type for reading and editing the config file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("could not parse config for editing: {0}")]
    EditError(#[from] toml_edit::TomlError),
    #[error("could not render config: {0}")]
    RenderError(#[from] toml::ser::Error),
    #[error("unknown config key: {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Keys `tn config` accepts; `ui.colors.<name>` is open-ended
const KNOWN_KEYS: &[&str] = &[
    "note.path",
    "timer.completed_grace_secs",
    "timer.sound",
    "timer.notify",
    "timer.presets",
    "features.drag_enabled",
    "autosave.debounce_ms",
    "search.scroll_debounce_ms",
    "ui.show_key_hints",
    "ui.outline_debounce_ms",
    "log.level",
    "calendar.path",
];

/// `$XDG_CONFIG_HOME/tasknote/config.toml`
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Read the config, returning both the parsed config and the raw
/// toml_edit document for round-trip-safe editing. A missing file reads
/// as defaults.
pub fn read_config(path: &Path) -> Result<(AppConfig, toml_edit::DocumentMut), ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    let config: AppConfig = toml::from_str(&text)?;
    let doc: toml_edit::DocumentMut = text.parse()?;
    Ok((config, doc))
}

pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    read_config(path).map(|(config, _)| config)
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config(path: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    atomic_write(path, doc.to_string().as_bytes()).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    let known = KNOWN_KEYS.contains(&key)
        || key
            .strip_prefix("ui.colors.")
            .is_some_and(|name| !name.is_empty() && !name.contains('.'));
    if known {
        Ok(())
    } else {
        Err(ConfigError::UnknownKey(key.to_string()))
    }
}

/// Current value of a dotted key, rendered as TOML. Unset optional keys
/// render as an empty string.
pub fn get_value(config: &AppConfig, key: &str) -> Result<String, ConfigError> {
    check_key(key)?;
    let root = toml::Value::try_from(config)?;
    let mut value = &root;
    for part in key.split('.') {
        match value.get(part) {
            Some(v) => value = v,
            None => return Ok(String::new()),
        }
    }
    Ok(match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Set a dotted key in the document. `raw` is taken as a TOML value when
/// it parses as one and as a plain string otherwise. The edited document
/// must still load as a valid config.
pub fn set_value(doc: &mut toml_edit::DocumentMut, key: &str, raw: &str) -> Result<(), ConfigError> {
    check_key(key)?;
    let value = raw
        .parse::<toml_edit::Value>()
        .unwrap_or_else(|_| toml_edit::Value::from(raw));

    let parts: Vec<&str> = key.split('.').collect();
    let Some((last, parents)) = parts.split_last() else {
        return Err(ConfigError::UnknownKey(key.to_string()));
    };
    let mut table = doc.as_table_mut();
    for part in parents {
        if !table.contains_key(part) {
            table.insert(part, toml_edit::Item::Table(toml_edit::Table::new()));
        }
        table = table
            .get_mut(part)
            .and_then(|item| item.as_table_mut())
            .ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("{} is not a table", part),
            })?;
    }
    table.insert(last, toml_edit::Item::Value(value));

    toml::from_str::<AppConfig>(&doc.to_string()).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: e.message().to_string(),
    })?;
    Ok(())
}
