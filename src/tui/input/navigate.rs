use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent};

use crate::doc::layout::LineKind;
use crate::ops::search::Direction;
use crate::tui::app::{App, Mode};
use crate::tui::command_actions::*;

use super::*;

pub(super) fn handle_navigate(app: &mut App, key: KeyEvent, now: Instant) {
    if is_ctrl(&key, 'c') {
        app.should_quit = true;
        return;
    }
    if is_ctrl(&key, 's') {
        app.save();
        if app.status.as_ref().is_none_or(|s| !s.is_error) {
            app.set_status("saved");
        }
        return;
    }

    app.status = None;
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('?') => app.show_help = true,

        // Movement
        KeyCode::Char('j') | KeyCode::Down => move_cursor(app, 1),
        KeyCode::Char('k') | KeyCode::Up => move_cursor(app, -1),
        KeyCode::Char('g') | KeyCode::Home => app.cursor_line = 0,
        KeyCode::Char('G') | KeyCode::End => {
            app.cursor_line = app.layout.lines.len().saturating_sub(1);
        }

        // Tasks
        KeyCode::Char(' ') | KeyCode::Char('x') => toggle_selected(app, now),
        KeyCode::Char('o') => new_task_below(app, now),
        KeyCode::Char('D') => delete_selected(app, now),
        KeyCode::Char('J') => move_selected(app, 1, now),
        KeyCode::Char('K') => move_selected(app, -1, now),
        KeyCode::Char('i') | KeyCode::Char('a') => start_editing(app),
        KeyCode::Enter => {
            if app.selected_line().is_some_and(|l| l.kind == LineKind::Timer) {
                jump_to_owner(app);
            } else {
                start_editing(app);
            }
        }

        // Countdown
        KeyCode::Char('t') => prompt_timer(app),
        KeyCode::Char('p') => toggle_pause(app, now),
        KeyCode::Char('r') => reset_timer(app),
        KeyCode::Char('c') => cancel_timer(app, now),

        // Search
        KeyCode::Char('/') => {
            app.search_input.clear();
            app.mode = Mode::Search;
        }
        KeyCode::Char('n') => search_step(app, Direction::Next, now),
        KeyCode::Char('N') => search_step(app, Direction::Prev, now),
        KeyCode::Esc => {
            if app.search.is_open() {
                close_search(app);
            }
        }
        _ => {}
    }
}

fn move_cursor(app: &mut App, delta: isize) {
    let last = app.layout.lines.len().saturating_sub(1);
    app.cursor_line = app.cursor_line.saturating_add_signed(delta).min(last);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::Document;
    use crate::model::{AppConfig, Node};
    use crate::ops::countdown::CountdownPhase;
    use crate::tui::input::handle_key;
    use crossterm::event::KeyModifiers;

    fn app() -> App {
        let doc = Document::new(Node::doc(vec![
            Node::paragraph("Errands"),
            Node::task_list(vec![
                Node::task_item(false, "Buy milk"),
                Node::task_item(false, "Walk dog"),
            ]),
        ]))
        .unwrap();
        App::new(doc, AppConfig::default(), None)
    }

    fn press(app: &mut App, code: KeyCode, now: Instant) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE), now);
    }

    #[test]
    fn test_cursor_stays_in_bounds() {
        let mut app = app();
        let now = Instant::now();
        press(&mut app, KeyCode::Up, now);
        assert_eq!(app.cursor_line, 0);
        for _ in 0..5 {
            press(&mut app, KeyCode::Char('j'), now);
        }
        assert_eq!(app.cursor_line, 2);
    }

    #[test]
    fn test_timer_keys() {
        let mut app = app();
        let now = Instant::now();
        app.cursor_line = 2;
        press(&mut app, KeyCode::Char('t'), now);
        assert_eq!(app.mode, Mode::TimerPrompt);
        press(&mut app, KeyCode::Enter, now);
        assert_eq!(app.coordinator.current().unwrap().task_description, "Walk dog");

        press(&mut app, KeyCode::Char('p'), now);
        assert_eq!(app.coordinator.current().unwrap().phase, CountdownPhase::Paused);
        press(&mut app, KeyCode::Char('p'), now);
        assert_eq!(app.coordinator.current().unwrap().phase, CountdownPhase::Running);

        // timer line sits below the task; Enter on it jumps back
        app.cursor_line = 3;
        press(&mut app, KeyCode::Enter, now);
        assert_eq!(app.cursor_line, 2);

        press(&mut app, KeyCode::Char('c'), now);
        assert!(app.coordinator.current().is_none());
    }

    #[test]
    fn test_search_keys() {
        let mut app = app();
        let now = Instant::now();
        press(&mut app, KeyCode::Char('/'), now);
        for c in "m".chars() {
            press(&mut app, KeyCode::Char(c), now);
        }
        press(&mut app, KeyCode::Enter, now);
        assert_eq!(app.mode, Mode::Navigate);
        assert_eq!(app.search.matches().len(), 1);
        press(&mut app, KeyCode::Char('n'), now);
        assert_eq!(app.search.active(), Some(0));
        press(&mut app, KeyCode::Esc, now);
        assert!(!app.search.is_open());
    }

    #[test]
    fn test_quit() {
        let mut app = app();
        press(&mut app, KeyCode::Char('q'), Instant::now());
        assert!(app.should_quit);
    }
}
