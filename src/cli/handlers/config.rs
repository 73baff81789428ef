use std::path::Path;

use crate::cli::commands::{ConfigAction, ConfigCmd};
use crate::io::config_io;
use crate::io::note_io::atomic_write;

const CONFIG_TEMPLATE: &str = r##"# tasknote configuration
# Every key is optional. Uncomment and edit to override defaults.

[note]
# path = "~/notes/today.json"

[timer]
# seconds a finished countdown stays visible before it is removed
# completed_grace_secs = 10
# sound played when a countdown finishes ("" for silence)
# sound = "Glass"
# notify = true
# durations offered by the timer prompt, in seconds
# presets = [300, 900, 1500, 3000]

[features]
# drag_enabled = true

[autosave]
# debounce_ms = 1000

[search]
# scroll_debounce_ms = 150

[ui]
# show_key_hints = true
# outline_debounce_ms = 300

# [ui.colors]
# background = "#1e1e2e"
# text = "#cdd6f4"
# highlight = "#f9e2af"

[log]
# level = "warn"

[calendar]
# path = "~/.local/state/tasknote/calendar.json"
"##;

pub fn cmd_config(cmd: ConfigCmd, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match cmd.action {
        ConfigAction::Get { key } => {
            let config = config_io::load_config(config_path)?;
            println!("{}", config_io::get_value(&config, &key)?);
        }
        ConfigAction::Set { key, value } => {
            let (_, mut doc) = config_io::read_config(config_path)?;
            config_io::set_value(&mut doc, &key, &value)?;
            config_io::write_config(config_path, &doc)?;
            println!("{} = {}", key, value);
        }
        ConfigAction::Path => println!("{}", config_path.display()),
        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                return Err(format!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                )
                .into());
            }
            atomic_write(config_path, CONFIG_TEMPLATE.as_bytes())?;
            println!("wrote {}", config_path.display());
        }
    }
    Ok(())
}
