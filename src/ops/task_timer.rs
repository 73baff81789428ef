//! Countdown-bearing task items.
//!
//! Keeps three things in agreement: a task's `countdown_seconds`, the
//! timer node right after it, and the coordinator's registration. Task and
//! timer are correlated by [`TimerToken`]; content without tokens falls
//! back to comparing the timer's description with the task text.

use std::time::Instant;

use crate::doc::{DocError, Document};
use crate::model::{Node, TimerAttrs, TimerToken};

use super::countdown::{CountdownContext, CountdownCoordinator, CountdownHooks, CountdownState};
use super::task_ops::{TaskRef, find_by_text, find_by_token, task_at, task_items, timer_belongs_to, timer_nodes};

#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("no task at position {0}")]
    NotATask(usize),
    #[error("countdown duration must be at least one second")]
    InvalidDuration,
    #[error(transparent)]
    Doc(#[from] DocError),
}

// ---------------------------------------------------------------------------
// Affordance
// ---------------------------------------------------------------------------

/// Whether the "start timer" control should be offered for `task`.
///
/// Hidden for checked tasks, for the task that owns the running countdown,
/// for tasks with unchecked subtasks, and for tasks without text.
pub fn shows_timer_affordance(task: &TaskRef, coordinator: &CountdownCoordinator) -> bool {
    if task.attrs.checked || task.text.trim().is_empty() {
        return false;
    }
    if task.has_children() && !task.children_all_checked {
        return false;
    }
    !owns_active_countdown(task, coordinator)
}

pub fn owns_active_countdown(task: &TaskRef, coordinator: &CountdownCoordinator) -> bool {
    match (task.attrs.timer_token, coordinator.owner()) {
        (Some(token), Some(owner)) => token == owner,
        (None, Some(_)) => {
            task.attrs.has_countdown()
                && coordinator
                    .current()
                    .is_some_and(|s| s.task_description == task.text)
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Start / remove
// ---------------------------------------------------------------------------

/// Start a countdown of `seconds` on the task at `task_pos`.
///
/// One transaction marks the task, clears every other task's countdown,
/// deletes all existing timer nodes and inserts the new one right after
/// the task. The coordinator registration then takes over from whatever
/// ran before.
pub fn start_timer(
    doc: &mut Document,
    coordinator: &mut CountdownCoordinator,
    task_pos: usize,
    seconds: u64,
    now: Instant,
) -> Result<TimerToken, TimerError> {
    if seconds == 0 {
        return Err(TimerError::InvalidDuration);
    }
    let task = task_at(doc.root(), task_pos).ok_or(TimerError::NotATask(task_pos))?;
    let token = TimerToken::next();
    let others: Vec<usize> = task_items(doc.root())
        .into_iter()
        .filter(|t| t.pos != task_pos && (t.attrs.has_countdown() || t.attrs.timer_token.is_some()))
        .map(|t| t.pos)
        .collect();
    let timers: Vec<usize> = timer_nodes(doc.root()).into_iter().map(|t| t.pos).collect();

    let mut todo_position = task_pos;
    doc.apply(|tr| {
        tr.update_task_attrs(task_pos, |a| {
            a.countdown_seconds = Some(seconds);
            a.timer_token = Some(token);
        })?;
        for pos in others {
            if let Some(pos) = tr.mapping().map_node(pos) {
                tr.update_task_attrs(pos, |a| a.clear_countdown())?;
            }
        }
        for pos in timers {
            if let Some(pos) = tr.mapping().map_node(pos) {
                tr.delete(pos, pos + 1)?;
            }
        }
        let pos = tr
            .mapping()
            .map_node(task_pos)
            .ok_or_else(|| DocError::Aborted("task vanished while starting timer".into()))?;
        let end = task_at(tr.doc(), pos)
            .ok_or_else(|| DocError::Aborted("task vanished while starting timer".into()))?
            .end;
        todo_position = pos;
        let attrs = TimerAttrs::new(seconds, task.text.clone(), pos, Some(token));
        tr.insert(end, Node::countdown_timer(attrs))
    })?;

    coordinator.start(
        token,
        CountdownState::new(seconds, task.text.clone(), todo_position),
        Box::new(TimerNodeHooks {
            token,
            description: task.text,
        }),
        now,
    );
    Ok(token)
}

/// Delete the timer node(s) for `token` (or, without a token, for
/// `description`) and clear the owning task's countdown attributes.
/// Returns the number of timer nodes removed.
pub fn remove_timer(
    doc: &mut Document,
    token: Option<TimerToken>,
    description: &str,
) -> Result<usize, TimerError> {
    let wanted = TimerAttrs::new(0, description, 0, token);
    let timers: Vec<usize> = timer_nodes(doc.root())
        .into_iter()
        .filter(|t| match token {
            Some(tok) => t.attrs.token == Some(tok),
            None => t.attrs.token.is_none() && t.attrs.task_description == description,
        })
        .map(|t| t.pos)
        .collect();
    let owners: Vec<usize> = task_items(doc.root())
        .into_iter()
        .filter(|t| t.attrs.has_countdown() && timer_belongs_to(&wanted, t))
        .map(|t| t.pos)
        .collect();

    let removed = timers.len();
    doc.apply(|tr| {
        for pos in owners {
            tr.update_task_attrs(pos, |a| a.clear_countdown())?;
        }
        for pos in timers {
            if let Some(pos) = tr.mapping().map_node(pos) {
                tr.delete(pos, pos + 1)?;
            }
        }
        Ok(())
    })?;
    log::debug!("event=remove_timer token={:?} removed={}", token, removed);
    Ok(removed)
}

/// Delete every timer node and clear every task's countdown. Countdowns
/// never outlive the session that started them.
pub fn purge_timers(doc: &mut Document) -> Result<usize, TimerError> {
    let timers: Vec<usize> = timer_nodes(doc.root()).into_iter().map(|t| t.pos).collect();
    let tasks: Vec<usize> = task_items(doc.root())
        .into_iter()
        .filter(|t| t.attrs.has_countdown() || t.attrs.timer_token.is_some())
        .map(|t| t.pos)
        .collect();
    let removed = timers.len();
    doc.apply(|tr| {
        for pos in tasks {
            tr.update_task_attrs(pos, |a| a.clear_countdown())?;
        }
        for pos in timers {
            if let Some(pos) = tr.mapping().map_node(pos) {
                tr.delete(pos, pos + 1)?;
            }
        }
        Ok(())
    })?;
    Ok(removed)
}

// ---------------------------------------------------------------------------
// Reconcile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub cleared_tasks: usize,
    pub removed_timers: usize,
    pub unregistered: bool,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        *self == ReconcileReport::default()
    }
}

/// Bring tasks, timer nodes and the registration back into agreement after
/// an edit: task countdowns without a timer are cleared, timers without a
/// task are deleted, and a registration whose timer node is gone is
/// dropped without running its hooks.
pub fn reconcile(
    doc: &mut Document,
    coordinator: &mut CountdownCoordinator,
) -> Result<ReconcileReport, TimerError> {
    let tasks = task_items(doc.root());
    let timers = timer_nodes(doc.root());
    let dangling: Vec<usize> = tasks
        .iter()
        .filter(|t| t.attrs.has_countdown() && !timers.iter().any(|tm| timer_belongs_to(&tm.attrs, t)))
        .map(|t| t.pos)
        .collect();
    let orphans: Vec<usize> = timers
        .iter()
        .filter(|tm| {
            !tasks
                .iter()
                .any(|t| t.attrs.has_countdown() && timer_belongs_to(&tm.attrs, t))
        })
        .map(|tm| tm.pos)
        .collect();

    let mut report = ReconcileReport {
        cleared_tasks: dangling.len(),
        removed_timers: orphans.len(),
        unregistered: false,
    };
    if !dangling.is_empty() || !orphans.is_empty() {
        doc.apply(|tr| {
            for pos in dangling {
                tr.update_task_attrs(pos, |a| a.clear_countdown())?;
            }
            for pos in orphans {
                if let Some(pos) = tr.mapping().map_node(pos) {
                    tr.delete(pos, pos + 1)?;
                }
            }
            Ok(())
        })?;
    }

    if let Some(owner) = coordinator.owner() {
        let alive = timer_nodes(doc.root())
            .iter()
            .any(|t| t.attrs.token == Some(owner));
        if !alive {
            report.unregistered = coordinator.unregister(owner);
        }
    }
    if !report.is_clean() {
        log::debug!(
            "event=reconcile cleared={} removed={} unregistered={}",
            report.cleared_tasks,
            report.removed_timers,
            report.unregistered
        );
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// Locating the owning task
// ---------------------------------------------------------------------------

/// Find the task a countdown belongs to.
///
/// The position snapshot is tried first and accepted only when the task
/// there still matches; then the token; then the first task, in document
/// order, whose text equals `description`.
pub fn locate_task(
    root: &Node,
    todo_position: usize,
    token: Option<TimerToken>,
    description: &str,
) -> Option<TaskRef> {
    let at_snapshot = task_at(root, todo_position).filter(|t| match token {
        Some(tok) => t.attrs.timer_token == Some(tok),
        None => t.text == description,
    });
    at_snapshot
        .or_else(|| token.and_then(|tok| find_by_token(root, tok)))
        .or_else(|| find_by_text(root, description))
}

/// Position of the task owning the timer node at `timer_pos`
pub fn scroll_to_todo(root: &Node, timer_pos: usize) -> Option<usize> {
    let timer = crate::doc::node_at(root, timer_pos)?.timer_attrs()?;
    locate_task(root, timer.todo_position, timer.token, &timer.task_description).map(|t| t.pos)
}

/// Check off the countdown's task if it can still be found
pub fn auto_check(
    doc: &mut Document,
    todo_position: usize,
    token: Option<TimerToken>,
    description: &str,
) -> Result<bool, TimerError> {
    let Some(task) = locate_task(doc.root(), todo_position, token, description) else {
        log::info!("event=auto_check status=skipped reason=task_not_found task=\"{}\"", description);
        return Ok(false);
    };
    if !task.attrs.checked {
        doc.apply(|tr| tr.update_task_attrs(task.pos, |a| a.checked = true))?;
    }
    Ok(true)
}

/// Hooks tying a registration to its timer node and task
pub struct TimerNodeHooks {
    pub token: TimerToken,
    pub description: String,
}

impl TimerNodeHooks {
    fn remove(&self, ctx: &mut CountdownContext<'_>) {
        if let Err(e) = remove_timer(ctx.doc, Some(self.token), &self.description) {
            log::warn!("event=remove_timer status=failed token={} reason=\"{}\"", self.token, e);
        }
    }
}

impl CountdownHooks for TimerNodeHooks {
    fn on_cancel(&mut self, _state: &CountdownState, ctx: &mut CountdownContext<'_>) {
        self.remove(ctx);
    }

    fn on_expire(&mut self, _state: &CountdownState, ctx: &mut CountdownContext<'_>) {
        self.remove(ctx);
    }

    fn on_complete(&mut self, state: &CountdownState, ctx: &mut CountdownContext<'_>) -> bool {
        match auto_check(ctx.doc, state.todo_position, Some(self.token), &state.task_description) {
            Ok(checked) => checked,
            Err(e) => {
                log::warn!("event=auto_check status=failed reason=\"{}\"", e);
                false
            }
        }
    }
}
