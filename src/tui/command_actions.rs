//! Note operations triggered from the keyboard or mouse.
//!
//! Each action reports failures on the status line and leaves the
//! document as it was; none of them panic on stale selections.

use std::time::{Duration, Instant};

use crate::doc::layout::LineKind;
use crate::model::{format_clock, parse_duration};
use crate::ops::countdown::{CountdownContext, CountdownPhase};
use crate::ops::reorder::{DragData, ReorderOutcome, move_task};
use crate::ops::search::Direction;
use crate::ops::task_ops::{self, task_items};
use crate::ops::task_timer::{shows_timer_affordance, start_timer};

use super::app::{App, DragState, Job, Mode};

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

pub fn toggle_selected(app: &mut App, now: Instant) {
    let Some(task) = app.selected_task() else {
        return;
    };
    match task_ops::set_checked(&mut app.doc, task.pos, !task.attrs.checked) {
        Ok(()) => app.after_edit(now),
        Err(e) => app.set_error(format!("check failed: {}", e)),
    }
}

/// New empty task right below the selected one, ready for typing
pub fn new_task_below(app: &mut App, now: Instant) {
    let Some(task) = app.selected_task() else {
        app.set_error("select a task first");
        return;
    };
    let Some((_, end)) = task.first_paragraph_range(app.doc.root()) else {
        return;
    };
    match task_ops::split_task(&mut app.doc, end) {
        Ok(new_pos) => {
            app.after_edit(now);
            app.select_task_pos(new_pos);
            app.edit_pos = new_pos + 2;
            app.mode = Mode::Edit;
        }
        Err(e) => app.set_error(format!("cannot add task: {}", e)),
    }
}

pub fn delete_selected(app: &mut App, now: Instant) {
    let Some(task) = app.selected_task() else {
        return;
    };
    match task_ops::delete_task(&mut app.doc, task.index) {
        Ok(()) => {
            app.after_edit(now);
            app.set_status(format!("deleted \"{}\"", task.text));
        }
        Err(e) => app.set_error(format!("delete failed: {}", e)),
    }
}

/// Keyboard reorder: move the selected task `delta` places among its
/// siblings' flat order, going through the same engine as a mouse drop.
pub fn move_selected(app: &mut App, delta: isize, now: Instant) {
    let Some(task) = app.selected_task() else {
        return;
    };
    let items = task_items(app.doc.root());
    let target = if delta < 0 {
        match task.index.checked_sub(delta.unsigned_abs()) {
            Some(t) => t,
            None => return,
        }
    } else {
        let after = task.index + task.subtree_len() + delta.unsigned_abs();
        if after > items.len() {
            return;
        }
        after
    };
    match move_task(&mut app.doc, task.index, target) {
        Ok(ReorderOutcome::Moved { to, .. }) => {
            app.after_edit(now);
            if let Some(moved) = task_items(app.doc.root()).get(to) {
                app.select_task_pos(moved.pos);
            }
        }
        Ok(ReorderOutcome::NoOp) => {}
        Err(e) => app.set_error(format!("cannot move: {}", e)),
    }
}

// ---------------------------------------------------------------------------
// Drag and drop
// ---------------------------------------------------------------------------

pub fn begin_drag(app: &mut App, line_idx: usize) {
    if !app.config.features.drag_enabled {
        return;
    }
    let Some(LineKind::Task { task_pos, .. }) = app.layout.lines.get(line_idx).map(|l| l.kind.clone()) else {
        return;
    };
    let Some(index) = task_items(app.doc.root()).iter().position(|t| t.pos == task_pos) else {
        return;
    };
    let mut data = DragData::default();
    app.reorder.drag_start(index, &mut data);
    app.drag = Some(DragState {
        data,
        indicator: None,
    });
}

pub fn drag_to(app: &mut App, x: u16, y: u16) {
    let indicator = app.reorder.drag_over(&app.doc, &app.layout, x, y);
    if let Some(drag) = app.drag.as_mut() {
        drag.indicator = indicator;
    }
}

/// Finish a drag. Releasing without having moved is a click, not a drop.
pub fn finish_drag(app: &mut App, x: u16, y: u16, now: Instant) {
    let Some(drag) = app.drag.take() else {
        return;
    };
    if drag.indicator.is_none() {
        app.reorder.drag_end();
        return;
    }
    match app.reorder.drop(&mut app.doc, &app.layout, x, y, Some(&drag.data)) {
        Ok(ReorderOutcome::Moved { to, .. }) => {
            app.after_edit(now);
            if let Some(moved) = task_items(app.doc.root()).get(to) {
                app.select_task_pos(moved.pos);
            }
        }
        Ok(ReorderOutcome::NoOp) => {}
        Err(e) => app.set_error(format!("cannot move: {}", e)),
    }
}

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

/// Open the duration prompt for the selected task, if it can take a timer
pub fn prompt_timer(app: &mut App) {
    let Some(task) = app.selected_task() else {
        return;
    };
    if !shows_timer_affordance(&task, &app.coordinator) {
        app.set_error("no timer for this task");
        return;
    }
    app.timer_input.clear();
    app.preset_cursor = app.preset_cursor.min(app.config.timer.presets.len().saturating_sub(1));
    app.mode = Mode::TimerPrompt;
}

/// Start the countdown chosen in the prompt: typed input wins over the
/// highlighted preset.
pub fn confirm_timer(app: &mut App, now: Instant) {
    let seconds = if app.timer_input.trim().is_empty() {
        app.config.timer.presets.get(app.preset_cursor).copied().ok_or_else(|| "no presets configured".to_string())
    } else {
        parse_duration(&app.timer_input)
    };
    app.mode = Mode::Navigate;
    let seconds = match seconds {
        Ok(s) => s,
        Err(e) => {
            app.set_error(e);
            return;
        }
    };
    let Some(task) = app.selected_task() else {
        return;
    };
    match start_timer(&mut app.doc, &mut app.coordinator, task.pos, seconds, now) {
        Ok(_) => {
            app.after_edit(now);
            app.select_task_pos(task.pos);
            app.set_status(format!("⏱ {} {}", format_clock(seconds), task.text));
        }
        Err(e) => app.set_error(format!("cannot start timer: {}", e)),
    }
}

pub fn toggle_pause(app: &mut App, now: Instant) {
    if !app.coordinator.toggle(now) {
        return;
    }
    if let Some(state) = app.coordinator.current() {
        let label = if state.phase == CountdownPhase::Paused { "paused" } else { "resumed" };
        app.set_status(format!("{} {}", label, state.task_description));
    }
}

pub fn reset_timer(app: &mut App) {
    if app.coordinator.reset() {
        app.set_status("timer reset; p to start");
    }
}

/// Cancel a running countdown, or hide a finished one right away
pub fn cancel_timer(app: &mut App, now: Instant) {
    let completed = app.coordinator.current().map(|s| s.phase) == Some(CountdownPhase::Completed);
    let mut ctx = CountdownContext {
        doc: &mut app.doc,
        host: &mut app.host,
    };
    let changed = if completed {
        app.coordinator.dismiss(&mut ctx).is_some()
    } else {
        app.coordinator.cancel(&mut ctx)
    };
    if changed {
        app.after_edit(now);
        app.set_status(if completed { "timer dismissed" } else { "timer cancelled" });
    }
}

/// From a timer line, select the task it belongs to
pub fn jump_to_owner(app: &mut App) {
    let Some(line) = app.selected_line() else {
        return;
    };
    if line.kind != LineKind::Timer {
        return;
    }
    match app.selected_task() {
        Some(task) => app.select_task_pos(task.pos),
        None => app.set_error("task for this timer not found"),
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

pub fn submit_search(app: &mut App, now: Instant) {
    app.mode = Mode::Navigate;
    let query = std::mem::take(&mut app.search_input);
    if query.is_empty() {
        close_search(app);
        return;
    }
    match app.search.search(&mut app.doc, &query) {
        Ok(0) => app.set_error(format!("no matches for '{}'", query)),
        Ok(count) => {
            app.set_status(format!("{} matches", count));
            if let Some(pos) = app.search.active_pos(&app.doc) {
                schedule_reveal(app, pos, now);
            }
        }
        Err(e) => app.set_error(format!("search failed: {}", e)),
    }
}

pub fn search_step(app: &mut App, dir: Direction, now: Instant) {
    if !app.search.is_open() {
        return;
    }
    match app.search.navigate(&mut app.doc, dir) {
        Ok(Some(pos)) => schedule_reveal(app, pos, now),
        Ok(None) => app.set_error(format!("no matches for '{}'", app.search.query())),
        Err(e) => app.set_error(format!("search failed: {}", e)),
    }
}

pub fn close_search(app: &mut App) {
    if let Err(e) = app.search.close(&mut app.doc) {
        log::warn!("event=search_close status=failed reason=\"{}\"", e);
    }
    app.refresh_layout();
}

/// Scroll to a match once navigation settles
fn schedule_reveal(app: &mut App, pos: usize, now: Instant) {
    app.pending_reveal = Some(pos);
    app.jobs.schedule(
        Job::SearchScroll,
        now + Duration::from_millis(app.config.search.scroll_debounce_ms),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::Document;
    use crate::model::{AppConfig, Node};
    use crate::ops::task_ops::find_by_text;
    use pretty_assertions::assert_eq;

    fn app() -> App {
        let doc = Document::new(Node::doc(vec![Node::task_list(vec![
            Node::task_item(false, "Buy milk"),
            Node::task_item(false, "Walk dog"),
            Node::task_item(false, "Email Bob"),
        ])]))
        .unwrap();
        App::new(doc, AppConfig::default(), None)
    }

    fn texts(app: &App) -> Vec<String> {
        task_items(app.doc.root()).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_toggle_selected() {
        let mut app = app();
        app.cursor_line = 1;
        toggle_selected(&mut app, Instant::now());
        assert!(find_by_text(app.doc.root(), "Walk dog").unwrap().attrs.checked);
    }

    #[test]
    fn test_move_selected_down_and_up() {
        let mut app = app();
        let now = Instant::now();
        move_selected(&mut app, 1, now);
        assert_eq!(texts(&app), vec!["Walk dog", "Buy milk", "Email Bob"]);
        assert_eq!(app.selected_task().unwrap().text, "Buy milk");

        move_selected(&mut app, -1, now);
        assert_eq!(texts(&app), vec!["Buy milk", "Walk dog", "Email Bob"]);

        move_selected(&mut app, -1, now);
        assert_eq!(texts(&app), vec!["Buy milk", "Walk dog", "Email Bob"]);
    }

    #[test]
    fn test_drag_release_without_motion_is_not_a_drop() {
        let mut app = app();
        begin_drag(&mut app, 0);
        assert!(app.reorder.session().borrow().is_active());
        finish_drag(&mut app, 0, 2, Instant::now());
        assert!(!app.reorder.session().borrow().is_active());
        assert_eq!(texts(&app), vec!["Buy milk", "Walk dog", "Email Bob"]);
    }

    #[test]
    fn test_drag_to_lower_half_of_last_task() {
        let mut app = app();
        app.layout = app.layout.clone().with_viewport(0, 0, 10, 0);
        begin_drag(&mut app, 0);
        drag_to(&mut app, 12, 2);
        assert!(app.drag.as_ref().unwrap().indicator.is_some());
        finish_drag(&mut app, 12, 2, Instant::now());
        assert_eq!(texts(&app), vec!["Walk dog", "Email Bob", "Buy milk"]);
        assert!(app.is_dirty());
    }

    #[test]
    fn test_timer_prompt_preset_and_typed() {
        let mut app = app();
        let now = Instant::now();
        app.cursor_line = 1;
        prompt_timer(&mut app);
        assert_eq!(app.mode, Mode::TimerPrompt);
        app.timer_input = "90s".into();
        confirm_timer(&mut app, now);
        assert_eq!(app.mode, Mode::Navigate);
        assert_eq!(app.coordinator.current().unwrap().seconds, 90);

        // the owner hides its own affordance
        app.cursor_line = 1;
        prompt_timer(&mut app);
        assert_eq!(app.mode, Mode::Navigate);
        assert!(app.status.as_ref().unwrap().is_error);

        app.cursor_line = 0;
        prompt_timer(&mut app);
        confirm_timer(&mut app, now);
        let state = app.coordinator.current().unwrap();
        assert_eq!(state.task_description, "Buy milk");
        assert_eq!(state.seconds, 300);
        assert_eq!(
            find_by_text(app.doc.root(), "Walk dog").unwrap().attrs.countdown_seconds,
            None
        );
    }

    #[test]
    fn test_cancel_removes_timer_line() {
        let mut app = app();
        let now = Instant::now();
        app.timer_input = "5m".into();
        confirm_timer(&mut app, now);
        assert_eq!(app.layout.lines.len(), 4);
        cancel_timer(&mut app, now);
        assert!(app.coordinator.current().is_none());
        assert_eq!(app.layout.lines.len(), 3);
    }

    #[test]
    fn test_search_reveal_is_debounced() {
        let mut app = app();
        let now = Instant::now();
        app.search_input = "bob".into();
        submit_search(&mut app, now);
        assert_eq!(app.cursor_line, 0);
        app.tick(now + Duration::from_millis(150));
        assert_eq!(app.cursor_line, 2);
    }
}
