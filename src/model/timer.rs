use serde::{Deserialize, Serialize};

use super::task::TimerToken;

/// Attributes of a countdown timer node.
///
/// `task_description` is a copy of the owning task's text taken when the
/// timer was created, and `todo_position` is a position snapshot that may
/// have gone stale since. Both only serve as fallbacks when `token` is
/// missing or no longer matches anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerAttrs {
    pub initial_seconds: u64,
    pub task_description: String,
    pub todo_position: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<TimerToken>,
}

impl TimerAttrs {
    pub fn new(
        initial_seconds: u64,
        task_description: impl Into<String>,
        todo_position: usize,
        token: Option<TimerToken>,
    ) -> Self {
        TimerAttrs {
            initial_seconds,
            task_description: task_description.into(),
            todo_position,
            token,
        }
    }
}

/// Format seconds as `m:ss`, or `h:mm:ss` past an hour
pub fn format_clock(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Parse a duration given as plain seconds or with one unit suffix:
/// `90`, `90s`, `25m`, `1h`. Zero is rejected.
pub fn parse_duration(input: &str) -> Result<u64, String> {
    let input = input.trim();
    let (digits, scale) = match input.char_indices().last() {
        Some((i, 's')) => (&input[..i], 1),
        Some((i, 'm')) => (&input[..i], 60),
        Some((i, 'h')) => (&input[..i], 3600),
        _ => (input, 1),
    };
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration '{}'", input))?;
    match value.checked_mul(scale) {
        Some(0) => Err("duration must be greater than zero".into()),
        Some(secs) => Ok(secs),
        None => Err(format!("duration '{}' is too long", input)),
    }
}
