use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Opaque correlation token shared by a task item and the countdown timer
/// node created for it. Unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerToken(u64);

impl TimerToken {
    /// Allocate a fresh token
    pub fn next() -> Self {
        TimerToken(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A calendar entry a task has been synced to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub event_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// Attributes of a checkable task item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAttrs {
    #[serde(default)]
    pub checked: bool,
    /// Set iff a countdown timer node for this task exists in the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countdown_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_event: Option<CalendarEvent>,
    /// Links this task to its timer node; absent in legacy content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_token: Option<TimerToken>,
}

impl TaskAttrs {
    pub fn checked(checked: bool) -> Self {
        TaskAttrs {
            checked,
            ..TaskAttrs::default()
        }
    }

    /// Drop everything that ties this task to a countdown
    pub fn clear_countdown(&mut self) {
        self.countdown_seconds = None;
        self.timer_token = None;
    }

    pub fn has_countdown(&self) -> bool {
        self.countdown_seconds.is_some()
    }
}
