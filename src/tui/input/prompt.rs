use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent};

use crate::tui::app::{App, Mode};
use crate::tui::command_actions::confirm_timer;

/// Duration prompt: arrows pick a preset, typing enters a custom value
pub(super) fn handle_timer_prompt(app: &mut App, key: KeyEvent, now: Instant) {
    let presets = app.config.timer.presets.len();
    match key.code {
        KeyCode::Esc => {
            app.timer_input.clear();
            app.mode = Mode::Navigate;
        }
        KeyCode::Enter => confirm_timer(app, now),
        KeyCode::Left | KeyCode::Up if app.timer_input.is_empty() && presets > 0 => {
            app.preset_cursor = (app.preset_cursor + presets - 1) % presets;
        }
        KeyCode::Right | KeyCode::Down | KeyCode::Tab if app.timer_input.is_empty() && presets > 0 => {
            app.preset_cursor = (app.preset_cursor + 1) % presets;
        }
        KeyCode::Backspace => {
            app.timer_input.pop();
        }
        KeyCode::Char(c) if c.is_ascii_digit() || matches!(c, 's' | 'm' | 'h') => {
            app.timer_input.push(c);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::Document;
    use crate::model::{AppConfig, Node};
    use crossterm::event::KeyModifiers;

    fn app() -> App {
        let doc = Document::new(Node::doc(vec![Node::task_list(vec![Node::task_item(
            false, "Tea",
        )])]))
        .unwrap();
        let mut app = App::new(doc, AppConfig::default(), None);
        app.mode = Mode::TimerPrompt;
        app
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_timer_prompt(app, KeyEvent::new(code, KeyModifiers::NONE), Instant::now());
    }

    #[test]
    fn test_presets_wrap() {
        let mut app = app();
        press(&mut app, KeyCode::Left);
        assert_eq!(app.preset_cursor, 3);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.preset_cursor, 0);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.coordinator.current().unwrap().seconds, 15 * 60);
    }

    #[test]
    fn test_typed_duration_ignores_other_chars() {
        let mut app = app();
        for c in "3x0s".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        assert_eq!(app.timer_input, "30s");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.coordinator.current().unwrap().seconds, 30);
    }

    #[test]
    fn test_bad_duration_reports_error() {
        let mut app = app();
        press(&mut app, KeyCode::Char('m'));
        press(&mut app, KeyCode::Enter);
        assert!(app.coordinator.current().is_none());
        assert!(app.status.as_ref().unwrap().is_error);
        assert_eq!(app.mode, Mode::Navigate);
    }
}
