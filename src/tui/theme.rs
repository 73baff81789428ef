use ratatui::style::Color;

use crate::model::UiConfig;

/// Colors of the note view
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub background: Color,
    pub text: Color,
    pub text_bright: Color,
    pub heading: Color,
    pub dim: Color,
    /// Text of checked tasks
    pub checked: Color,
    /// Running countdown badge
    pub timer: Color,
    /// Countdown that reached zero and is waiting to be hidden
    pub timer_done: Color,
    pub calendar: Color,
    pub error: Color,
    pub selection_bg: Color,
    pub drop_indicator: Color,
    pub search_match_bg: Color,
    pub search_match_fg: Color,
    pub search_active_bg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            background: Color::Rgb(0x2B, 0x26, 0x1A),
            text: Color::Rgb(0xF2, 0xE6, 0xB8),
            text_bright: Color::Rgb(0xFF, 0xFB, 0xEB),
            heading: Color::Rgb(0xFF, 0xC8, 0x57),
            dim: Color::Rgb(0x9C, 0x90, 0x6A),
            checked: Color::Rgb(0x7F, 0x77, 0x5C),
            timer: Color::Rgb(0x6C, 0xD4, 0xFF),
            timer_done: Color::Rgb(0x7E, 0xE0, 0x81),
            calendar: Color::Rgb(0xC3, 0x9B, 0xFF),
            error: Color::Rgb(0xFF, 0x5F, 0x56),
            selection_bg: Color::Rgb(0x45, 0x3D, 0x28),
            drop_indicator: Color::Rgb(0xFF, 0xC8, 0x57),
            search_match_bg: Color::Rgb(0x8A, 0x6D, 0x1F),
            search_match_fg: Color::Rgb(0xFF, 0xFB, 0xEB),
            search_active_bg: Color::Rgb(0xFF, 0x9F, 0x1C),
        }
    }
}

/// Parse a hex color string like "#FF9F1C" into an RGB Color
fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

impl Theme {
    /// Defaults with `[ui.colors]` overrides applied. Unknown names and
    /// unparsable values are logged and skipped.
    pub fn from_config(ui: &UiConfig) -> Self {
        let mut theme = Theme::default();
        for (key, value) in &ui.colors {
            let Some(color) = parse_hex_color(value) else {
                log::warn!("event=theme status=bad_color key={} value=\"{}\"", key, value);
                continue;
            };
            match theme.slot(key) {
                Some(slot) => *slot = color,
                None => log::warn!("event=theme status=unknown_key key={}", key),
            }
        }
        theme
    }

    fn slot(&mut self, key: &str) -> Option<&mut Color> {
        Some(match key {
            "background" => &mut self.background,
            "text" => &mut self.text,
            "text_bright" => &mut self.text_bright,
            "heading" => &mut self.heading,
            "dim" => &mut self.dim,
            "checked" => &mut self.checked,
            "timer" => &mut self.timer,
            "timer_done" => &mut self.timer_done,
            "calendar" => &mut self.calendar,
            "error" => &mut self.error,
            "selection_bg" => &mut self.selection_bg,
            "drop_indicator" => &mut self.drop_indicator,
            "search_match_bg" => &mut self.search_match_bg,
            "search_match_fg" => &mut self.search_match_fg,
            "search_active_bg" | "highlight" => &mut self.search_active_bg,
            _ => return None,
        })
    }
}
