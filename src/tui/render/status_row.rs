use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::model::format_clock;
use crate::ops::countdown::CountdownPhase;
use crate::tui::app::{App, Mode};

use super::helpers::{phase_label, spans_width};

/// Render the status row (bottom of screen)
pub fn render_status_row(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let width = area.width as usize;
    let dim = Style::default().fg(app.theme.dim).bg(bg);

    let (left, hint): (Vec<Span>, String) = if let Some(status) = &app.status {
        let color = if status.is_error { app.theme.error } else { app.theme.text_bright };
        (
            vec![Span::styled(format!(" {}", status.text), Style::default().fg(color).bg(bg))],
            String::new(),
        )
    } else {
        match app.mode {
            Mode::Navigate => navigate_spans(app, dim),
            Mode::Search => (
                vec![
                    Span::styled(
                        format!("/{}", app.search_input),
                        Style::default().fg(app.theme.text_bright).bg(bg),
                    ),
                    Span::styled("\u{258C}", Style::default().fg(app.theme.search_active_bg).bg(bg)),
                ],
                "Enter search  Esc cancel".to_string(),
            ),
            Mode::TimerPrompt => prompt_spans(app, dim),
            Mode::Edit => (
                vec![Span::styled(
                    "-- EDIT --",
                    Style::default()
                        .fg(app.theme.text_bright)
                        .bg(bg)
                        .add_modifier(Modifier::BOLD),
                )],
                "Enter new task  Esc done".to_string(),
            ),
        }
    };

    let mut spans = left;
    let used = spans_width(&spans);
    let hint_width = hint.chars().count();
    if !hint.is_empty() && used + hint_width < width {
        spans.push(Span::styled(" ".repeat(width - used - hint_width), Style::default().bg(bg)));
        spans.push(Span::styled(hint, dim));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(bg));
    frame.render_widget(paragraph, area);
}

/// Search summary and key hints on the left, the running countdown on the right
fn navigate_spans(app: &App, dim: Style) -> (Vec<Span<'static>>, String) {
    let mut spans = Vec::new();
    if app.search.is_open() {
        let total = app.search.matches().len();
        let at = app.search.active().map_or(0, |i| i + 1);
        spans.push(Span::styled(
            format!(" [{}/{}] /{}  n/N", at, total, app.search.query()),
            dim,
        ));
    } else if app.config.ui.show_key_hints {
        spans.push(Span::styled(" ? help  t timer  / search  q quit", dim));
    }

    let countdown = app.coordinator.current().map(|state| {
        format!(
            "\u{23F1} {}{} {} ",
            format_clock(state.seconds),
            phase_label(state.phase),
            state.task_description
        )
    });
    if let Some(state) = app.coordinator.current()
        && state.phase == CountdownPhase::Completed
    {
        spans.push(Span::styled(
            "  c dismiss",
            Style::default().fg(app.theme.timer_done).bg(app.theme.background),
        ));
    }
    (spans, countdown.unwrap_or_default())
}

fn prompt_spans(app: &App, dim: Style) -> (Vec<Span<'static>>, String) {
    let bg = app.theme.background;
    let mut spans = vec![Span::styled(" timer:", dim)];
    for (i, secs) in app.config.timer.presets.iter().enumerate() {
        let label = format_clock(*secs);
        if app.timer_input.is_empty() && i == app.preset_cursor {
            spans.push(Span::styled(
                format!(" [{}]", label),
                Style::default()
                    .fg(app.theme.text_bright)
                    .bg(bg)
                    .add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::styled(format!("  {} ", label), dim));
        }
    }
    if !app.timer_input.is_empty() {
        spans.push(Span::styled(
            format!("  {}\u{258C}", app.timer_input),
            Style::default().fg(app.theme.text_bright).bg(bg),
        ));
    }
    (spans, "Enter start  Esc cancel".to_string())
}
