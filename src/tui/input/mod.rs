mod common;
mod edit;
mod mouse;
mod navigate;
mod prompt;
mod search;

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent};

use super::app::{App, Mode};

#[allow(unused_imports)]
use common::*;
#[allow(unused_imports)]
use edit::*;
#[allow(unused_imports)]
use navigate::*;
#[allow(unused_imports)]
use prompt::*;
#[allow(unused_imports)]
use search::*;

pub use mouse::handle_mouse;

/// Handle a key event in the current mode
pub fn handle_key(app: &mut App, key: KeyEvent, now: Instant) {
    // Ignore bare modifier key presses (Shift, Ctrl, Alt, etc.)
    if matches!(key.code, KeyCode::Modifier(_)) {
        return;
    }

    if app.show_help {
        if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q')) {
            app.show_help = false;
        }
        return;
    }

    let key = normalize_key(key);
    match app.mode {
        Mode::Navigate => handle_navigate(app, key, now),
        Mode::Edit => handle_edit(app, key, now),
        Mode::Search => handle_search(app, key, now),
        Mode::TimerPrompt => handle_timer_prompt(app, key, now),
    }
}

/// Handle a bracketed paste. Only active in Edit mode; line breaks
/// become spaces since a task's text is one line.
pub fn handle_paste(app: &mut App, text: &str, now: Instant) {
    if app.mode != Mode::Edit || text.is_empty() {
        return;
    }
    let clean = text.replace("\r\n", " ").replace(['\n', '\r'], " ");
    insert_at_caret(app, &clean, now);
}
