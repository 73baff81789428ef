use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration from config.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub note: NoteConfig,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub autosave: AutosaveConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteConfig {
    /// Note file; defaults to `$XDG_DATA_HOME/tasknote/note.json`
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// How long a finished countdown stays on screen before it is cleared
    #[serde(default = "default_grace_secs")]
    pub completed_grace_secs: u64,
    /// System sound played when a countdown completes
    #[serde(default = "default_sound")]
    pub sound: String,
    #[serde(default = "default_true")]
    pub notify: bool,
    /// Durations offered by the "start timer" picker, in seconds
    #[serde(default = "default_presets")]
    pub presets: Vec<u64>,
}

impl Default for TimerConfig {
    fn default() -> Self {
        TimerConfig {
            completed_grace_secs: default_grace_secs(),
            sound: default_sound(),
            notify: true,
            presets: default_presets(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    #[serde(default = "default_true")]
    pub drag_enabled: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig { drag_enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutosaveConfig {
    #[serde(default = "default_autosave_ms")]
    pub debounce_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        AutosaveConfig {
            debounce_ms: default_autosave_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_scroll_ms")]
    pub scroll_debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            scroll_debounce_ms: default_scroll_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_true")]
    pub show_key_hints: bool,
    /// Color overrides, e.g. `highlight = "#FB4196"`
    #[serde(default)]
    pub colors: HashMap<String, String>,
    /// Delay before the heading outline is recounted after an edit
    #[serde(default = "default_outline_ms")]
    pub outline_debounce_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            show_key_hints: true,
            colors: HashMap::new(),
            outline_debounce_ms: default_outline_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// flexi_logger spec, e.g. `info` or `tasknote::ops=debug`
    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Local calendar store; defaults to the state directory
    #[serde(default)]
    pub path: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_grace_secs() -> u64 {
    10
}

fn default_sound() -> String {
    "Glass".to_string()
}

fn default_presets() -> Vec<u64> {
    vec![5 * 60, 15 * 60, 25 * 60, 50 * 60]
}

fn default_autosave_ms() -> u64 {
    1000
}

fn default_scroll_ms() -> u64 {
    150
}

fn default_outline_ms() -> u64 {
    300
}
