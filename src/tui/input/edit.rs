use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent};

use crate::doc::layout::LineKind;
use crate::ops::task_ops;
use crate::tui::app::{App, Mode};
use crate::util::unicode::{next_grapheme_char, prev_grapheme_char};

use super::*;

/// Enter Edit mode with the caret at the end of the selected line
pub(super) fn start_editing(app: &mut App) {
    let Some(line) = app.selected_line() else {
        return;
    };
    if line.kind == LineKind::Timer {
        return;
    }
    app.edit_pos = line.content_start + line.text_len();
    app.mode = Mode::Edit;
}

pub(super) fn handle_edit(app: &mut App, key: KeyEvent, now: Instant) {
    if is_ctrl(&key, 'c') {
        app.mode = Mode::Navigate;
        return;
    }
    let Some((start, text)) = app.selected_line().map(|l| (l.content_start, l.text.clone())) else {
        app.mode = Mode::Navigate;
        return;
    };
    let end = start + text.chars().count();
    let offset = app.edit_pos.saturating_sub(start);

    match key.code {
        KeyCode::Esc => app.mode = Mode::Navigate,
        KeyCode::Left => {
            if let Some(prev) = prev_grapheme_char(&text, offset) {
                app.edit_pos = start + prev;
            }
        }
        KeyCode::Right => {
            if let Some(next) = next_grapheme_char(&text, offset) {
                app.edit_pos = (start + next).min(end);
            }
        }
        KeyCode::Home => app.edit_pos = start,
        KeyCode::End => app.edit_pos = end,
        KeyCode::Backspace => {
            if app.edit_pos > start {
                match task_ops::delete_backward(&mut app.doc, app.edit_pos) {
                    Ok(pos) => {
                        app.edit_pos = pos;
                        app.after_edit(now);
                    }
                    Err(e) => app.set_error(format!("edit failed: {}", e)),
                }
            }
        }
        KeyCode::Enter => split_at_caret(app, now),
        KeyCode::Char(c) => insert_at_caret(app, &c.to_string(), now),
        _ => {}
    }
}

pub(super) fn insert_at_caret(app: &mut App, text: &str, now: Instant) {
    match task_ops::insert_text(&mut app.doc, app.edit_pos, text) {
        Ok(()) => {
            app.edit_pos += text.chars().count();
            app.after_edit(now);
        }
        Err(e) => app.set_error(format!("edit failed: {}", e)),
    }
}

/// Enter in a task: the rest of the line becomes a new task below
fn split_at_caret(app: &mut App, now: Instant) {
    if !matches!(app.selected_line().map(|l| &l.kind), Some(LineKind::Task { .. })) {
        app.set_error("Enter splits tasks only");
        return;
    }
    match task_ops::split_task(&mut app.doc, app.edit_pos) {
        Ok(new_pos) => {
            app.after_edit(now);
            app.select_task_pos(new_pos);
            app.edit_pos = new_pos + 2;
        }
        Err(e) => app.set_error(format!("split failed: {}", e)),
    }
}
