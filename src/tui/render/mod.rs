pub mod header;
pub mod help_overlay;
pub mod helpers;
pub mod note_view;
pub mod status_row;

#[cfg(test)]
pub mod test_helpers;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Style;
use ratatui::widgets::Block;

use super::app::App;

/// Draw the whole screen: header, note, status row and overlays
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Background fill
    let bg_style = Style::default().bg(app.theme.background);
    frame.render_widget(Block::default().style(bg_style), area);

    // Layout: header (1 row) | note | status row (1 row)
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    header::render_header(frame, app, chunks[0]);
    note_view::render_note_view(frame, app, chunks[1]);
    status_row::render_status_row(frame, app, chunks[2]);

    if app.show_help {
        help_overlay::render_help_overlay(frame, app, area);
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use super::*;

    #[test]
    fn test_full_frame_has_all_regions() {
        let mut app = app_from_markdown("# Today\n\n- [ ] Buy milk\n- [x] Walk dog\n");
        let output = render_to_string(TERM_W, TERM_H, |frame, _| render(frame, &mut app));
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].contains("tasknote"));
        assert!(lines[2].contains("[ ] Buy milk"));
        assert!(output.contains("? help"));
        // the layout used for mouse hits is the one just drawn
        assert_eq!(app.layout.origin_y, 1);
        assert_eq!(app.layout.origin_x, 2);
    }
}
