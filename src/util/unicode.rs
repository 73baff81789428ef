//! Char/byte/cell conversions.
//!
//! Document positions count `char`s, the terminal counts cells, and Rust
//! slices count bytes. Everything that crosses between the three goes
//! through here.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Display width in terminal cells. Tabs count as 4 cells.
pub fn display_width(s: &str) -> usize {
    s.split('\t')
        .enumerate()
        .map(|(i, part)| {
            let w = UnicodeWidthStr::width(part);
            if i > 0 { w + 4 } else { w }
        })
        .sum()
}

fn grapheme_display_width(g: &str) -> usize {
    if g == "\t" { 4 } else { UnicodeWidthStr::width(g) }
}

/// Truncate a string to fit within `max_cells` terminal cells, appending `…` if truncated.
pub fn truncate_to_width(s: &str, max_cells: usize) -> String {
    if max_cells == 0 {
        return String::new();
    }
    if display_width(s) <= max_cells {
        return s.to_string();
    }
    if max_cells <= 1 {
        return "\u{2026}".to_string();
    }
    let budget = max_cells - 1;
    let mut width = 0;
    let mut result = String::new();
    for grapheme in s.graphemes(true) {
        let gw = grapheme_display_width(grapheme);
        if width + gw > budget {
            break;
        }
        width += gw;
        result.push_str(grapheme);
    }
    result.push('\u{2026}');
    result
}

/// Byte offset of the `char_offset`-th char, or `s.len()` past the end.
pub fn char_to_byte(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Number of chars in `s[..byte_offset]`.
pub fn byte_to_char(s: &str, byte_offset: usize) -> usize {
    s[..byte_offset.min(s.len())].chars().count()
}

/// Convert a display column to a char offset, snapping to a grapheme
/// boundary. Columns past the end map to the char length.
pub fn display_col_to_char_offset(s: &str, target_col: usize) -> usize {
    let mut col = 0;
    for (i, g) in s.grapheme_indices(true) {
        let gw = grapheme_display_width(g);
        if col + gw > target_col {
            return byte_to_char(s, i);
        }
        col += gw;
    }
    s.chars().count()
}

/// Display column of the char at `char_offset`.
pub fn char_offset_to_display_col(s: &str, char_offset: usize) -> usize {
    display_width(&s[..char_to_byte(s, char_offset)])
}

/// Char offset of the next grapheme boundary, or None at the end.
pub fn next_grapheme_char(s: &str, char_offset: usize) -> Option<usize> {
    let byte = char_to_byte(s, char_offset);
    if byte >= s.len() {
        return None;
    }
    let next = s[byte..]
        .grapheme_indices(true)
        .nth(1)
        .map(|(i, _)| byte + i)
        .unwrap_or(s.len());
    Some(byte_to_char(s, next))
}

/// Char offset of the previous grapheme boundary, or None at the start.
pub fn prev_grapheme_char(s: &str, char_offset: usize) -> Option<usize> {
    if char_offset == 0 {
        return None;
    }
    let byte = char_to_byte(s, char_offset);
    let last = s[..byte]
        .grapheme_indices(true)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(0);
    Some(byte_to_char(s, last))
}
