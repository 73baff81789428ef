use serde::Serialize;

use crate::model::format_clock;
use crate::model::task::CalendarEvent;
use crate::ops::search::SearchMatch;
use crate::ops::task_ops::TaskRef;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    pub index: usize,
    pub text: String,
    pub checked: bool,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar: Option<CalendarJson>,
}

#[derive(Serialize)]
pub struct CalendarJson {
    pub event_id: String,
    pub date: String,
    pub time: String,
}

#[derive(Serialize)]
pub struct TaskListJson {
    pub tasks: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct SearchMatchJson {
    /// Char offsets into the note's flat text
    pub from: usize,
    pub to: usize,
    /// Document position of the first matched char
    pub pos: Option<usize>,
    pub text: String,
    pub line: String,
}

#[derive(Serialize)]
pub struct SearchJson {
    pub query: String,
    pub matches: Vec<SearchMatchJson>,
}

#[derive(Serialize)]
pub struct TimerResultJson {
    pub task: String,
    pub seconds: u64,
    pub auto_checked: bool,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn calendar_to_json(event: &CalendarEvent) -> CalendarJson {
    CalendarJson {
        event_id: event.event_id.clone(),
        date: event.date.format("%Y-%m-%d").to_string(),
        time: event.time.format("%H:%M").to_string(),
    }
}

pub fn task_to_json(task: &TaskRef) -> TaskJson {
    TaskJson {
        index: task.index,
        text: task.text.clone(),
        checked: task.attrs.checked,
        depth: task.depth,
        countdown_seconds: task.attrs.countdown_seconds,
        calendar: task.attrs.calendar_event.as_ref().map(calendar_to_json),
    }
}

/// The `\n`-separated line of `flat` holding the match
pub fn match_to_json(flat: &str, m: &SearchMatch, pos: Option<usize>) -> SearchMatchJson {
    SearchMatchJson {
        from: m.from,
        to: m.to,
        pos,
        text: m.text.clone(),
        line: line_around(flat, m.from).to_string(),
    }
}

fn line_around(flat: &str, char_offset: usize) -> &str {
    let mut start = 0;
    for line in flat.split('\n') {
        let len = line.chars().count();
        if char_offset <= start + len {
            return line;
        }
        start += len + 1;
    }
    ""
}

// ---------------------------------------------------------------------------
// Human-readable output
// ---------------------------------------------------------------------------

/// One `tn list` line: index, indent, checkbox, text, badges
pub fn format_task_line(task: &TaskRef) -> String {
    let mut line = format!(
        "{:>3}  {}{} {}",
        task.index,
        "  ".repeat(task.depth),
        if task.attrs.checked { "[x]" } else { "[ ]" },
        task.text
    );
    if let Some(secs) = task.attrs.countdown_seconds {
        line.push_str(&format!("  ⏱ {}", format_clock(secs)));
    }
    if let Some(event) = &task.attrs.calendar_event {
        line.push_str(&format!(
            "  @ {} {}",
            event.date.format("%Y-%m-%d"),
            event.time.format("%H:%M")
        ));
    }
    line
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
