use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::ops::task_ops::task_items;
use crate::tui::app::App;

use super::helpers::spans_width;

/// Title on the left, task progress on the right
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let width = area.width as usize;

    let name = app
        .note_path
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "(scratch)".to_string());
    let mut spans = vec![
        Span::styled(
            " tasknote",
            Style::default()
                .fg(app.theme.text_bright)
                .bg(bg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {}", name), Style::default().fg(app.theme.dim).bg(bg)),
    ];
    if app.is_dirty() {
        spans.push(Span::styled(" *", Style::default().fg(app.theme.dim).bg(bg)));
    }

    let tasks = task_items(app.doc.root());
    let done = tasks.iter().filter(|t| t.attrs.checked).count();
    let mut right = format!("{}/{} done", done, tasks.len());
    if !app.outline.is_empty() {
        right.push_str(&format!("  {} headings", app.outline.len()));
    }
    right.push(' ');

    let used = spans_width(&spans);
    let right_width = right.chars().count();
    if used + right_width < width {
        spans.push(Span::styled(" ".repeat(width - used - right_width), Style::default().bg(bg)));
        spans.push(Span::styled(right, Style::default().fg(app.theme.dim).bg(bg)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).style(Style::default().bg(bg)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::render::test_helpers::*;
    use std::path::PathBuf;

    #[test]
    fn test_header_counts() {
        let mut app = app_from_markdown("# Today\n\n- [ ] Buy milk\n- [x] Walk dog\n");
        app.note_path = Some(PathBuf::from("/tmp/today.json"));
        let output = render_to_string(50, 1, |frame, area| {
            render_header(frame, &app, area);
        });
        assert!(output.starts_with(" tasknote  today.json"), "{}", output);
        assert!(output.ends_with("1/2 done  1 headings"), "{}", output);
    }
}
