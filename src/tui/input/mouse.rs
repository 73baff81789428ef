use std::time::Instant;

use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};

use crate::doc::layout::LineKind;
use crate::tui::app::{App, Mode};
use crate::tui::command_actions::{begin_drag, drag_to, finish_drag, toggle_selected};

/// Mouse input: click selects, a click on a checkbox toggles it, a drag
/// from a task line reorders.
pub fn handle_mouse(app: &mut App, mouse: MouseEvent, now: Instant) {
    if app.show_help || app.mode != Mode::Navigate {
        return;
    }
    let (x, y) = (mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let Some(idx) = app.layout.line_at_row(y) else {
                return;
            };
            app.cursor_line = idx;
            if on_checkbox(app, idx, x) {
                toggle_selected(app, now);
            } else {
                begin_drag(app, idx);
            }
        }
        MouseEventKind::Drag(MouseButton::Left) if app.drag.is_some() => drag_to(app, x, y),
        MouseEventKind::Up(MouseButton::Left) => finish_drag(app, x, y, now),
        // the draw keeps the cursor in view, so the wheel moves the cursor
        MouseEventKind::ScrollDown => {
            let last = app.layout.lines.len().saturating_sub(1);
            app.cursor_line = (app.cursor_line + 1).min(last);
        }
        MouseEventKind::ScrollUp => app.cursor_line = app.cursor_line.saturating_sub(1),
        _ => {}
    }
}

fn on_checkbox(app: &App, idx: usize, x: u16) -> bool {
    let Some(line) = app.layout.lines.get(idx) else {
        return false;
    };
    let LineKind::Task { depth, .. } = line.kind else {
        return false;
    };
    let Some(col) = x.checked_sub(app.layout.origin_x) else {
        return false;
    };
    let start = depth * 2;
    (start..start + 3).contains(&(col as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::Document;
    use crate::model::{AppConfig, Node};
    use crate::ops::task_ops::task_items;
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;

    fn app() -> App {
        let doc = Document::new(Node::doc(vec![Node::task_list(vec![
            Node::task_item(false, "Buy milk"),
            Node::task_item(false, "Walk dog"),
            Node::task_item(false, "Email Bob"),
        ])]))
        .unwrap();
        let mut app = App::new(doc, AppConfig::default(), None);
        app.layout = app.layout.clone().with_viewport(2, 1, 10, 0);
        app
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn texts(app: &App) -> Vec<String> {
        task_items(app.doc.root()).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_click_checkbox_toggles() {
        let mut app = app();
        let now = Instant::now();
        handle_mouse(&mut app, mouse(MouseEventKind::Down(MouseButton::Left), 3, 2), now);
        handle_mouse(&mut app, mouse(MouseEventKind::Up(MouseButton::Left), 3, 2), now);
        assert_eq!(app.cursor_line, 1);
        assert!(task_items(app.doc.root())[1].attrs.checked);
    }

    #[test]
    fn test_drag_first_below_last() {
        let mut app = app();
        let now = Instant::now();
        handle_mouse(&mut app, mouse(MouseEventKind::Down(MouseButton::Left), 10, 1), now);
        handle_mouse(&mut app, mouse(MouseEventKind::Drag(MouseButton::Left), 14, 3), now);
        handle_mouse(&mut app, mouse(MouseEventKind::Up(MouseButton::Left), 14, 3), now);
        assert_eq!(texts(&app), vec!["Walk dog", "Email Bob", "Buy milk"]);
        assert!(!app.reorder.session().borrow().is_active());
    }

    #[test]
    fn test_drag_disabled_by_config() {
        let mut app = app();
        app.config.features.drag_enabled = false;
        let now = Instant::now();
        handle_mouse(&mut app, mouse(MouseEventKind::Down(MouseButton::Left), 10, 1), now);
        handle_mouse(&mut app, mouse(MouseEventKind::Drag(MouseButton::Left), 14, 3), now);
        handle_mouse(&mut app, mouse(MouseEventKind::Up(MouseButton::Left), 14, 3), now);
        assert_eq!(texts(&app), vec!["Buy milk", "Walk dog", "Email Bob"]);
    }
}
