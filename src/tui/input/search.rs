use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent};

use crate::tui::app::{App, Mode};
use crate::tui::command_actions::submit_search;

pub(super) fn handle_search(app: &mut App, key: KeyEvent, now: Instant) {
    match key.code {
        KeyCode::Esc => {
            app.search_input.clear();
            app.mode = Mode::Navigate;
        }
        KeyCode::Enter => submit_search(app, now),
        KeyCode::Backspace => {
            if app.search_input.pop().is_none() {
                app.mode = Mode::Navigate;
            }
        }
        KeyCode::Char(c) => app.search_input.push(c),
        _ => {}
    }
}
