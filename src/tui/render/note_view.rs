use ratatui::Frame;
use ratatui::layout::{Position, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::doc::layout::{LayoutLine, LineKind, LineLayout};
use crate::model::{Mark, NodeKind, format_clock};
use crate::ops::countdown::CountdownPhase;
use crate::ops::task_ops::task_at;
use crate::ops::task_timer::shows_timer_affordance;
use crate::tui::app::{App, Mode};
use crate::util::unicode::{char_offset_to_display_col, display_width, truncate_to_width};

use super::helpers::{checkbox, live_state, phase_label};

/// Columns left of the text for the selection and drop markers
const GUTTER: u16 = 2;

/// Where a pending drop would land, relative to a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropMark {
    Before,
    After,
}

/// Render the note. The layout built here is stored on the app so mouse
/// events resolve against exactly what was drawn.
pub fn render_note_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let text_area = Rect {
        x: area.x + GUTTER.min(area.width),
        width: area.width.saturating_sub(GUTTER),
        ..area
    };
    let mut layout = LineLayout::build(app.doc.root()).with_viewport(
        text_area.x,
        text_area.y,
        text_area.height,
        app.scroll,
    );
    app.cursor_line = app.cursor_line.min(layout.lines.len().saturating_sub(1));
    app.scroll = layout.scroll_to_reveal(app.cursor_line);
    layout.scroll = app.scroll;

    let drop = drop_mark(app, &layout);
    let bg = app.theme.background;
    let mut lines: Vec<Line> = Vec::new();
    for (idx, line) in layout
        .lines
        .iter()
        .enumerate()
        .skip(layout.scroll)
        .take(text_area.height as usize)
    {
        let selected = idx == app.cursor_line;
        let mut spans = vec![gutter_span(app, selected, drop.filter(|(i, _)| *i == idx).map(|(_, m)| m))];
        spans.extend(line_spans(app, line, selected, text_area.width as usize));
        let mut rendered = Line::from(spans);
        if selected {
            rendered = rendered.style(Style::default().bg(app.theme.selection_bg));
        }
        lines.push(rendered);
    }
    frame.render_widget(Paragraph::new(lines).style(Style::default().bg(bg)), area);

    if app.mode == Mode::Edit
        && let Some(line) = layout.lines.get(app.cursor_line)
        && let Some(row) = layout.row_of_line(app.cursor_line)
    {
        let offset = app.edit_pos.saturating_sub(line.content_start);
        let col = display_width(&line.prefix) + char_offset_to_display_col(&line.text, offset);
        let x = text_area.x.saturating_add(col as u16).min(area.right().saturating_sub(1));
        frame.set_cursor_position(Position::new(x, row));
    }

    app.layout = layout;
}

fn drop_mark(app: &App, layout: &LineLayout) -> Option<(usize, DropMark)> {
    let indicator = app.drag.as_ref()?.indicator?;
    if let Some(idx) = layout.line_of_task(indicator.gap_pos) {
        return Some((idx, DropMark::Before));
    }
    let last = layout
        .lines
        .iter()
        .rposition(|l| matches!(l.kind, LineKind::Task { .. } | LineKind::TaskContinuation { .. } | LineKind::Timer))?;
    Some((last, DropMark::After))
}

fn gutter_span(app: &App, selected: bool, drop: Option<DropMark>) -> Span<'static> {
    let theme = &app.theme;
    match drop {
        Some(DropMark::Before) => Span::styled("\u{21E2} ", Style::default().fg(theme.drop_indicator)),
        Some(DropMark::After) => Span::styled("\u{21E3} ", Style::default().fg(theme.drop_indicator)),
        None if selected => Span::styled("\u{203A} ", Style::default().fg(theme.text_bright)),
        None => Span::raw("  "),
    }
}

fn line_spans(app: &App, line: &LayoutLine, selected: bool, width: usize) -> Vec<Span<'static>> {
    let theme = &app.theme;
    match &line.kind {
        LineKind::Timer => timer_spans(app, line),
        LineKind::Heading(_) => {
            let base = Style::default().fg(theme.heading).add_modifier(Modifier::BOLD);
            let mut spans = vec![Span::styled(line.prefix.clone(), Style::default().fg(theme.dim))];
            spans.extend(text_spans(app, line, base, width));
            spans
        }
        LineKind::Paragraph | LineKind::TaskContinuation { .. } => {
            let mut spans = vec![Span::raw(line.prefix.clone())];
            spans.extend(text_spans(app, line, Style::default().fg(theme.text), width));
            spans
        }
        LineKind::Task { checked, depth, task_pos } => {
            let (box_style, base) = if *checked {
                (
                    Style::default().fg(theme.timer_done),
                    Style::default().fg(theme.checked).add_modifier(Modifier::CROSSED_OUT),
                )
            } else {
                (Style::default().fg(theme.dim), Style::default().fg(theme.text))
            };
            let mut spans = vec![
                Span::raw("  ".repeat(*depth)),
                Span::styled(format!("{} ", checkbox(*checked)), box_style),
            ];
            spans.extend(text_spans(app, line, base, width));
            spans.extend(task_badges(app, *task_pos, selected));
            spans
        }
    }
}

/// The block's text runs, styled by their search marks
fn text_spans(app: &App, line: &LayoutLine, base: Style, width: usize) -> Vec<Span<'static>> {
    let theme = &app.theme;
    let match_style = Style::default().fg(theme.search_match_fg).bg(theme.search_match_bg);
    let active_style = Style::default()
        .fg(theme.search_match_fg)
        .bg(theme.search_active_bg)
        .add_modifier(Modifier::BOLD);

    let Some(block) = app.doc.node_at(line.block_pos) else {
        return vec![Span::styled(line.text.clone(), base)];
    };
    let budget = width.saturating_sub(display_width(&line.prefix));
    let mut used = 0;
    let mut spans = Vec::new();
    for child in &block.content {
        let NodeKind::Text { text } = &child.kind else {
            continue;
        };
        let style = match child.marks.iter().find_map(|m| match m {
            Mark::SearchMatch { active, .. } => Some(*active),
            _ => None,
        }) {
            Some(true) => active_style,
            Some(false) => match_style,
            None => base,
        };
        let room = budget.saturating_sub(used);
        if room == 0 {
            break;
        }
        let shown = truncate_to_width(text, room);
        used += display_width(&shown);
        spans.push(Span::styled(shown, style));
    }
    spans
}

fn task_badges(app: &App, task_pos: usize, selected: bool) -> Vec<Span<'static>> {
    let theme = &app.theme;
    let Some(task) = task_at(app.doc.root(), task_pos) else {
        return Vec::new();
    };
    let mut spans = Vec::new();
    if let Some(event) = &task.attrs.calendar_event {
        spans.push(Span::styled(
            format!("  @ {} {}", event.date.format("%Y-%m-%d"), event.time.format("%H:%M")),
            Style::default().fg(theme.calendar),
        ));
    }
    if selected
        && app.mode == Mode::Navigate
        && app.config.ui.show_key_hints
        && shows_timer_affordance(&task, &app.coordinator)
    {
        spans.push(Span::styled("  [t]", Style::default().fg(theme.dim)));
    }
    spans
}

fn timer_spans(app: &App, line: &LayoutLine) -> Vec<Span<'static>> {
    let theme = &app.theme;
    let Some(attrs) = app.doc.node_at(line.block_pos).and_then(|n| n.timer_attrs()) else {
        return Vec::new();
    };
    let (seconds, phase) = match live_state(attrs, &app.coordinator) {
        Some(state) => (state.seconds, state.phase),
        None => (attrs.initial_seconds, CountdownPhase::Idle),
    };
    let color = if phase == CountdownPhase::Completed { theme.timer_done } else { theme.timer };
    vec![
        Span::raw(line.prefix.clone()),
        Span::styled(
            format!("\u{23F1} {}{}", format_clock(seconds), phase_label(phase)),
            Style::default().fg(color),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::reorder::{DragData, DropIndicator};
    use crate::ops::task_ops::find_by_text;
    use crate::tui::app::DragState;
    use crate::ops::task_timer::start_timer;
    use crate::tui::render::test_helpers::*;
    use insta::assert_snapshot;
    use std::time::{Duration, Instant};

    #[test]
    fn test_note_view_basic() {
        let mut app = app_from_markdown("# Today\n\n- [ ] Buy milk\n- [x] Walk dog\n  - [ ] Leash\n");
        app.cursor_line = 1;
        let output = render_to_string(40, 6, |frame, area| {
            render_note_view(frame, &mut app, area);
        });
        assert_snapshot!(output, @r"
  # Today
› [ ] Buy milk  [t]
  [x] Walk dog
    [ ] Leash
");
    }

    #[test]
    fn test_note_view_live_timer() {
        let mut app = app_from_markdown("- [ ] Tea\n");
        let t0 = Instant::now();
        let pos = find_by_text(app.doc.root(), "Tea").unwrap().pos;
        start_timer(&mut app.doc, &mut app.coordinator, pos, 90, t0).unwrap();
        app.after_edit(t0);
        app.tick(t0 + Duration::from_secs(1));
        let output = render_to_string(40, 4, |frame, area| {
            render_note_view(frame, &mut app, area);
        });
        assert!(output.contains("1:29"), "{}", output);

        app.coordinator.pause();
        let output = render_to_string(40, 4, |frame, area| {
            render_note_view(frame, &mut app, area);
        });
        assert!(output.contains("1:29 paused"), "{}", output);
    }

    #[test]
    fn test_note_view_scrolls_to_selection() {
        let md: String = (0..10).map(|i| format!("- [ ] task {}\n", i)).collect();
        let mut app = app_from_markdown(&md);
        app.cursor_line = 8;
        let output = render_to_string(30, 3, |frame, area| {
            render_note_view(frame, &mut app, area);
        });
        assert_eq!(app.scroll, 6);
        assert!(output.ends_with("› [ ] task 8  [t]"), "{}", output);
        assert_eq!(app.layout.line_at_row(2), Some(8));
    }

    #[test]
    fn test_note_view_drop_indicator() {
        let mut app = app_from_markdown("- [ ] A\n- [ ] B\n");
        let b = find_by_text(app.doc.root(), "B").unwrap();
        app.drag = Some(DragState {
            data: DragData::default(),
            indicator: Some(DropIndicator { target: 1, gap_pos: b.pos }),
        });
        let output = render_to_string(20, 3, |frame, area| {
            render_note_view(frame, &mut app, area);
        });
        assert!(output.lines().nth(1).unwrap().starts_with("\u{21E2} [ ] B"), "{}", output);

        app.drag = Some(DragState {
            data: DragData::default(),
            indicator: Some(DropIndicator { target: 2, gap_pos: b.end }),
        });
        let output = render_to_string(20, 3, |frame, area| {
            render_note_view(frame, &mut app, area);
        });
        assert!(output.lines().nth(1).unwrap().starts_with("\u{21E3} [ ] B"), "{}", output);
    }
}
