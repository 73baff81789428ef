use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ops::calendar::{CalendarEntry, CalendarError, CalendarService};

use super::note_io::{atomic_write, state_dir};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CalendarFile {
    #[serde(default)]
    next_id: u64,
    /// Keyed by event id, in creation order
    #[serde(default)]
    events: IndexMap<String, CalendarEntry>,
}

/// Calendar kept in a local JSON file
pub struct LocalCalendar {
    path: PathBuf,
    file: CalendarFile,
}

/// Default calendar location, next to the logs
pub fn default_calendar_path() -> PathBuf {
    state_dir().join("calendar.json")
}

impl LocalCalendar {
    /// Open the calendar at `path`; a missing file is an empty calendar.
    pub fn open(path: &Path) -> Result<Self, CalendarError> {
        let file = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CalendarFile::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(LocalCalendar {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn len(&self) -> usize {
        self.file.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file.events.is_empty()
    }

    fn save(&self) -> Result<(), CalendarError> {
        let json = serde_json::to_string_pretty(&self.file)?;
        atomic_write(&self.path, json.as_bytes())?;
        Ok(())
    }
}

impl CalendarService for LocalCalendar {
    fn events_on(&self, date: NaiveDate) -> Result<Vec<CalendarEntry>, CalendarError> {
        let mut events: Vec<CalendarEntry> = self
            .file
            .events
            .values()
            .filter(|e| e.date == date)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.time);
        Ok(events)
    }

    fn create_event(&mut self, title: &str, date: NaiveDate, time: NaiveTime) -> Result<String, CalendarError> {
        self.file.next_id += 1;
        let id = format!("local-{}", self.file.next_id);
        self.file.events.insert(
            id.clone(),
            CalendarEntry {
                id: id.clone(),
                title: title.to_string(),
                date,
                time,
            },
        );
        self.save()?;
        Ok(id)
    }

    fn delete_event(&mut self, event_id: &str) -> Result<(), CalendarError> {
        if self.file.events.shift_remove(event_id).is_none() {
            return Err(CalendarError::EventNotFound(event_id.to_string()));
        }
        self.save()
    }
}
