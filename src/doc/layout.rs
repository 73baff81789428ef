//! Line layout of the note: one terminal row per textblock or timer.
//!
//! The same layout drives rendering and the reverse mapping from screen
//! cells to document positions, so a drop lands where the user saw it.

use crate::model::{Node, NodeKind};
use crate::util::unicode::{display_col_to_char_offset, display_width};

/// Maps screen coordinates back into the document
pub trait PositionResolver {
    /// Document position under the cell at (`x`, `y`), or `None` when the
    /// cell is not over any content.
    fn pos_at_coords(&self, x: u16, y: u16) -> Option<usize>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Paragraph,
    Heading(u8),
    /// First paragraph of a task item
    Task {
        checked: bool,
        depth: usize,
        task_pos: usize,
    },
    /// Further paragraphs of a task item
    TaskContinuation { depth: usize, task_pos: usize },
    Timer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutLine {
    pub kind: LineKind,
    /// Indent plus checkbox or heading marker
    pub prefix: String,
    pub text: String,
    /// Position of the block (textblock or timer) this line shows
    pub block_pos: usize,
    /// Position of the first char of `text`; equals `block_pos` for timers
    pub content_start: usize,
}

impl LayoutLine {
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether `pos` lies within this line's text (end inclusive)
    pub fn contains(&self, pos: usize) -> bool {
        match self.kind {
            LineKind::Timer => pos == self.block_pos,
            _ => pos >= self.content_start && pos <= self.content_start + self.text_len(),
        }
    }
}

/// Rows of the note, plus the viewport they are drawn into
#[derive(Debug, Clone, Default)]
pub struct LineLayout {
    pub lines: Vec<LayoutLine>,
    pub origin_x: u16,
    pub origin_y: u16,
    /// Visible rows; 0 means unbounded
    pub height: u16,
    /// Index of the first visible line
    pub scroll: usize,
}

impl LineLayout {
    pub fn build(root: &Node) -> Self {
        let mut lines = Vec::new();
        layout_blocks(&root.content, 0, 0, &mut lines);
        LineLayout {
            lines,
            ..LineLayout::default()
        }
    }

    /// Place the layout in a screen area, scrolled to `scroll`
    pub fn with_viewport(mut self, x: u16, y: u16, height: u16, scroll: usize) -> Self {
        self.origin_x = x;
        self.origin_y = y;
        self.height = height;
        self.scroll = scroll.min(self.lines.len().saturating_sub(1));
        self
    }

    /// Line index shown on screen row `y`
    pub fn line_at_row(&self, y: u16) -> Option<usize> {
        if y < self.origin_y {
            return None;
        }
        let row = (y - self.origin_y) as usize;
        if self.height > 0 && row >= self.height as usize {
            return None;
        }
        let idx = self.scroll + row;
        (idx < self.lines.len()).then_some(idx)
    }

    /// Screen row of line `idx`, if visible
    pub fn row_of_line(&self, idx: usize) -> Option<u16> {
        if idx < self.scroll {
            return None;
        }
        let row = idx - self.scroll;
        if self.height > 0 && row >= self.height as usize {
            return None;
        }
        u16::try_from(row).ok().map(|r| r + self.origin_y)
    }

    /// Index of the line showing `pos`
    pub fn line_of_pos(&self, pos: usize) -> Option<usize> {
        self.lines.iter().position(|l| l.contains(pos))
    }

    /// Index of the first line of the task item at `task_pos`
    pub fn line_of_task(&self, task_pos: usize) -> Option<usize> {
        self.lines.iter().position(|l| {
            matches!(l.kind, LineKind::Task { task_pos: p, .. } if p == task_pos)
        })
    }

    /// Scroll offset that brings line `idx` into view with minimal movement
    pub fn scroll_to_reveal(&self, idx: usize) -> usize {
        if self.height == 0 || idx < self.scroll {
            return idx.min(self.scroll);
        }
        let height = self.height as usize;
        if idx >= self.scroll + height {
            idx + 1 - height
        } else {
            self.scroll
        }
    }
}

impl PositionResolver for LineLayout {
    fn pos_at_coords(&self, x: u16, y: u16) -> Option<usize> {
        let line = &self.lines[self.line_at_row(y)?];
        if line.kind == LineKind::Timer {
            return Some(line.block_pos);
        }
        let col = x.checked_sub(self.origin_x)? as usize;
        let prefix_width = display_width(&line.prefix);
        if col < prefix_width {
            return Some(line.content_start);
        }
        let offset = display_col_to_char_offset(&line.text, col - prefix_width);
        Some(line.content_start + offset)
    }
}

fn layout_blocks(blocks: &[Node], start: usize, depth: usize, lines: &mut Vec<LayoutLine>) {
    let mut pos = start;
    for block in blocks {
        match &block.kind {
            NodeKind::Paragraph => lines.push(text_line(block, pos, LineKind::Paragraph, String::new())),
            NodeKind::Heading { level } => {
                let prefix = format!("{} ", "#".repeat(*level as usize));
                lines.push(text_line(block, pos, LineKind::Heading(*level), prefix));
            }
            NodeKind::TaskList => layout_blocks(&block.content, pos + 1, depth, lines),
            NodeKind::TaskItem(attrs) => layout_task(block, pos, depth, attrs.checked, lines),
            NodeKind::CountdownTimer(_) => lines.push(LayoutLine {
                kind: LineKind::Timer,
                prefix: indent(depth),
                text: String::new(),
                block_pos: pos,
                content_start: pos,
            }),
            NodeKind::Doc | NodeKind::Text { .. } => {}
        }
        pos += block.node_size();
    }
}

fn layout_task(item: &Node, pos: usize, depth: usize, checked: bool, lines: &mut Vec<LayoutLine>) {
    let mut child_pos = pos + 1;
    let mut first = true;
    for child in &item.content {
        match child.kind {
            NodeKind::Paragraph if first => {
                let checkbox = if checked { "[x] " } else { "[ ] " };
                let kind = LineKind::Task {
                    checked,
                    depth,
                    task_pos: pos,
                };
                lines.push(text_line(child, child_pos, kind, format!("{}{}", indent(depth), checkbox)));
                first = false;
            }
            NodeKind::Paragraph => {
                let kind = LineKind::TaskContinuation {
                    depth,
                    task_pos: pos,
                };
                lines.push(text_line(child, child_pos, kind, format!("{}    ", indent(depth))));
            }
            NodeKind::TaskList => layout_blocks(&child.content, child_pos + 1, depth + 1, lines),
            _ => {}
        }
        child_pos += child.node_size();
    }
}

fn text_line(block: &Node, pos: usize, kind: LineKind, prefix: String) -> LayoutLine {
    LayoutLine {
        kind,
        prefix,
        text: block.text_content(),
        block_pos: pos,
        content_start: pos + 1,
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}
