use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::doc::{DocError, Document};
use crate::model::CalendarEvent;

use super::task_ops::{TaskRef, find_by_text, task_at};

/// Error type for calendar sync
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("calendar event not found: {0}")]
    EventNotFound(String),
    #[error("no task at position {0}")]
    NotATask(usize),
    #[error("task {0:?} disappeared during the calendar call")]
    TaskGone(String),
    #[error("task is already on the calendar ({0})")]
    AlreadySynced(String),
    #[error("task is not on the calendar")]
    NotSynced,
    #[error("calendar store error: {0}")]
    Io(#[from] std::io::Error),
    #[error("calendar store is corrupt: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Doc(#[from] DocError),
}

/// An event as the calendar sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// The calendar a task can be synced to
pub trait CalendarService {
    fn events_on(&self, date: NaiveDate) -> Result<Vec<CalendarEntry>, CalendarError>;
    /// Returns the new event's id
    fn create_event(&mut self, title: &str, date: NaiveDate, time: NaiveTime) -> Result<String, CalendarError>;
    fn delete_event(&mut self, event_id: &str) -> Result<(), CalendarError>;
}

/// Put the task at `task_pos` on the calendar and badge it.
///
/// Once the service returns, the task is looked up again with
/// [`relocate`].
pub fn sync_task(
    doc: &mut Document,
    service: &mut dyn CalendarService,
    task_pos: usize,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<CalendarEvent, CalendarError> {
    let task = task_at(doc.root(), task_pos).ok_or(CalendarError::NotATask(task_pos))?;
    if let Some(event) = &task.attrs.calendar_event {
        return Err(CalendarError::AlreadySynced(event.event_id.clone()));
    }
    let version = doc.content_version();
    let event_id = service.create_event(&task.text, date, time)?;

    let Some(task) = relocate(doc, &task, version) else {
        if let Err(e) = service.delete_event(&event_id) {
            log::warn!("event=calendar_rollback status=failed id={} reason=\"{}\"", event_id, e);
        }
        return Err(CalendarError::TaskGone(task.text));
    };
    let event = CalendarEvent { event_id, date, time };
    let badge = event.clone();
    doc.apply(|tr| tr.update_task_attrs(task.pos, |a| a.calendar_event = Some(badge)))?;
    log::info!("event=calendar_sync id={} date={} time={}", event.event_id, date, time);
    Ok(event)
}

/// Remove the task's calendar event, then its badge. An event the
/// calendar no longer knows still gets its badge cleared.
pub fn unsync_task(
    doc: &mut Document,
    service: &mut dyn CalendarService,
    task_pos: usize,
) -> Result<(), CalendarError> {
    let task = task_at(doc.root(), task_pos).ok_or(CalendarError::NotATask(task_pos))?;
    let event = task.attrs.calendar_event.clone().ok_or(CalendarError::NotSynced)?;
    let version = doc.content_version();
    match service.delete_event(&event.event_id) {
        Ok(()) | Err(CalendarError::EventNotFound(_)) => {}
        Err(e) => return Err(e),
    }
    let task = relocate(doc, &task, version).ok_or(CalendarError::TaskGone(task.text))?;
    doc.apply(|tr| tr.update_task_attrs(task.pos, |a| a.calendar_event = None))?;
    log::info!("event=calendar_unsync id={}", event.event_id);
    Ok(())
}

/// Find `task` again after a service call.
///
/// Its position still holds when the content is unchanged, or when a task
/// with the same text sits there. Otherwise the first task with that text
/// is used.
fn relocate(doc: &Document, task: &TaskRef, version: u64) -> Option<TaskRef> {
    if let Some(here) = task_at(doc.root(), task.pos)
        && (doc.content_version() == version || here.text == task.text)
    {
        return Some(here);
    }
    log::debug!("event=calendar_relocate pos={} text=\"{}\"", task.pos, task.text);
    find_by_text(doc.root(), &task.text)
}
