//! Drag-and-drop reordering of task items.
//!
//! A gesture is resolved to an index-based move: the source index comes
//! from the drag session, the target from the layout's coordinate mapping
//! and the item ranges at drop time. The move itself is one transaction.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::doc::{DocError, Document, PositionResolver};
use crate::model::Node;

use super::task_ops::{TaskRef, owned_range_end, task_items};

/// MIME type carrying the dragged item's index in the native payload
pub const INDEX_MIME: &str = "application/x-tasknote-index";
pub const TEXT_MIME: &str = "text/plain";

#[derive(Debug, thiserror::Error)]
pub enum ReorderError {
    #[error("no drag in progress")]
    NoSource,
    #[error("malformed drag payload: {0:?}")]
    MalformedPayload(String),
    #[error("no document position at ({x}, {y})")]
    Unresolvable { x: u16, y: u16 },
    #[error("source index {index} out of range ({len} tasks)")]
    SourceOutOfRange { index: usize, len: usize },
    #[error("cannot move task {index} into its own subtasks")]
    IntoOwnSubtree { index: usize, target: usize },
    #[error(transparent)]
    Doc(#[from] DocError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderOutcome {
    Moved { from: usize, to: usize },
    NoOp,
}

/// Which item is being dragged. One per editor; cleared on drop and on
/// drag end whatever the outcome.
#[derive(Debug, Default)]
pub struct DragSession {
    source: Option<usize>,
}

impl DragSession {
    pub fn begin(&mut self, index: usize) {
        self.source = Some(index);
    }

    pub fn source(&self) -> Option<usize> {
        self.source
    }

    pub fn is_active(&self) -> bool {
        self.source.is_some()
    }

    pub fn take(&mut self) -> Option<usize> {
        self.source.take()
    }

    pub fn clear(&mut self) {
        self.source = None;
    }
}

/// Native drag payload, keyed by MIME type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DragData {
    entries: IndexMap<String, String>,
}

impl DragData {
    pub fn set_data(&mut self, mime: &str, value: impl Into<String>) {
        self.entries.insert(mime.to_string(), value.into());
    }

    pub fn get_data(&self, mime: &str) -> Option<&str> {
        self.entries.get(mime).map(String::as_str)
    }

    /// Dragged index, preferring the dedicated MIME type
    pub fn source_index(&self) -> Result<usize, ReorderError> {
        let raw = self
            .get_data(INDEX_MIME)
            .or_else(|| self.get_data(TEXT_MIME))
            .ok_or(ReorderError::NoSource)?;
        raw.trim()
            .parse()
            .map_err(|_| ReorderError::MalformedPayload(raw.to_string()))
    }
}

/// Where a drop would land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropIndicator {
    /// Insertion index before removal of the source
    pub target: usize,
    /// Document position of the gap the item would go into
    pub gap_pos: usize,
}

/// Insertion index for a drop at `pos`.
///
/// Inside an item (the innermost one for nested items) the upper half
/// means before it and the lower half after it. Between items the next
/// item's index is used.
pub fn drop_target(items: &[TaskRef], pos: usize) -> usize {
    let hit = items
        .iter()
        .filter(|t| t.pos <= pos && pos < t.end)
        .max_by_key(|t| t.depth);
    if let Some(item) = hit {
        let mid = item.pos + (item.end - item.pos) / 2;
        return if pos < mid { item.index } else { item.index + 1 };
    }
    items
        .iter()
        .position(|t| pos < t.pos)
        .unwrap_or(items.len())
}

pub struct ReorderEngine {
    session: Rc<RefCell<DragSession>>,
}

impl ReorderEngine {
    pub fn new(session: Rc<RefCell<DragSession>>) -> Self {
        ReorderEngine { session }
    }

    pub fn session(&self) -> Rc<RefCell<DragSession>> {
        Rc::clone(&self.session)
    }

    pub fn drag_start(&self, index: usize, data: &mut DragData) {
        self.session.borrow_mut().begin(index);
        data.set_data(INDEX_MIME, index.to_string());
        data.set_data(TEXT_MIME, index.to_string());
        log::debug!("event=drag_start index={}", index);
    }

    pub fn drag_over(
        &self,
        doc: &Document,
        resolver: &dyn PositionResolver,
        x: u16,
        y: u16,
    ) -> Option<DropIndicator> {
        let pos = resolver.pos_at_coords(x, y)?;
        let items = task_items(doc.root());
        if items.is_empty() {
            return None;
        }
        let target = drop_target(&items, pos);
        let gap_pos = match items.get(target) {
            Some(item) => item.pos,
            None => {
                let source = self.session.borrow().source();
                append_anchor(doc.root(), &items, source).map_or(pos, |t| t.end)
            }
        };
        Some(DropIndicator { target, gap_pos })
    }

    /// Complete the drag at (`x`, `y`). The session is cleared whatever
    /// happens; failures are logged and leave the document untouched.
    pub fn drop(
        &self,
        doc: &mut Document,
        resolver: &dyn PositionResolver,
        x: u16,
        y: u16,
        data: Option<&DragData>,
    ) -> Result<ReorderOutcome, ReorderError> {
        let from_session = self.session.borrow_mut().take();
        let result = self.resolve_drop(doc, resolver, x, y, from_session, data);
        match &result {
            Ok(ReorderOutcome::Moved { from, to }) => {
                log::info!("event=reorder status=moved from={} to={}", from, to)
            }
            Ok(ReorderOutcome::NoOp) => log::debug!("event=reorder status=noop"),
            Err(e) => log::warn!("event=reorder status=failed reason=\"{}\"", e),
        }
        result
    }

    fn resolve_drop(
        &self,
        doc: &mut Document,
        resolver: &dyn PositionResolver,
        x: u16,
        y: u16,
        from_session: Option<usize>,
        data: Option<&DragData>,
    ) -> Result<ReorderOutcome, ReorderError> {
        let source = match (from_session, data) {
            (Some(index), _) => index,
            (None, Some(data)) => data.source_index()?,
            (None, None) => return Err(ReorderError::NoSource),
        };
        let pos = resolver
            .pos_at_coords(x, y)
            .ok_or(ReorderError::Unresolvable { x, y })?;
        let items = task_items(doc.root());
        let target = drop_target(&items, pos);
        move_task(doc, source, target)
    }

    pub fn drag_end(&self) {
        self.session.borrow_mut().clear();
    }
}

/// Move task `source` (with its subtasks and its timer) so that it lands
/// at insertion index `target`, counted before the source is removed.
pub fn move_task(
    doc: &mut Document,
    source: usize,
    target: usize,
) -> Result<ReorderOutcome, ReorderError> {
    let items = task_items(doc.root());
    let src = items
        .get(source)
        .cloned()
        .ok_or(ReorderError::SourceOutOfRange {
            index: source,
            len: items.len(),
        })?;
    let span = src.subtree_len();
    if target > source && target < source + span {
        return Err(ReorderError::IntoOwnSubtree {
            index: source,
            target,
        });
    }
    let adjusted = if source < target { target - span } else { target };
    if adjusted == source {
        return Ok(ReorderOutcome::NoOp);
    }

    let src_end = owned_range_end(doc.root(), &src);
    let moving = nodes_in_range(doc.root(), src.pos, src_end)?;
    let removal = removal_range(doc.root(), &src, src_end)?;
    // index, after removal, of the item an append lands behind
    let anchor = append_anchor(doc.root(), &items, Some(source))
        .map(|t| if t.index > source { t.index - span } else { t.index });
    doc.apply(|tr| {
        tr.delete(removal.0, removal.1)?;
        let remaining = task_items(tr.doc());
        let at = match remaining.get(adjusted) {
            Some(item) => item.pos,
            None => {
                let last = anchor
                    .and_then(|i| remaining.get(i))
                    .ok_or_else(|| DocError::Aborted("no task left to drop next to".into()))?;
                owned_range_end(tr.doc(), last)
            }
        };
        let parent = tr.resolve(at)?.parent(tr.doc()).type_name();
        if parent != "task_list" {
            return Err(DocError::Aborted(format!("drop parent is {}", parent)));
        }
        let mut insert_at = at;
        for node in moving {
            let size = node.node_size();
            tr.insert(insert_at, node)?;
            insert_at += size;
        }
        Ok(())
    })?;
    Ok(ReorderOutcome::Moved {
        from: source,
        to: adjusted,
    })
}

/// The item a drop past the last item goes after.
///
/// That is the last item of the source's own nested list when the source
/// is nested and nothing follows that list. Otherwise it is the last
/// top-level item, so the drop lands after its subtasks and timer.
/// Items in the source's subtree are skipped.
fn append_anchor<'a>(root: &Node, items: &'a [TaskRef], source: Option<usize>) -> Option<&'a TaskRef> {
    let src = source.and_then(|i| items.get(i));
    let outside = |t: &&TaskRef| src.is_none_or(|s| t.index < s.index || t.index >= s.index + s.subtree_len());
    let last = items.iter().rfind(outside)?;
    if let Some(src) = src
        && src.depth > 0
        && last.depth > 0
        && list_start(root, last.pos) == list_start(root, src.pos)
    {
        return Some(last);
    }
    items.iter().filter(outside).rfind(|t| t.depth == 0)
}

/// Start of the task list holding the item at `pos`
fn list_start(root: &Node, pos: usize) -> Option<usize> {
    crate::doc::resolve(root, pos)
        .ok()
        .map(|r| r.parent_start.saturating_sub(1))
}

/// What to delete when `task` (owning `task.pos..end`) leaves its list:
/// the whole list when nothing else is in it.
fn removal_range(root: &Node, task: &TaskRef, end: usize) -> Result<(usize, usize), DocError> {
    let resolved = crate::doc::resolve(root, task.pos)?;
    let list = resolved.parent(root);
    let list_pos = resolved.parent_start - 1;
    if task.pos == resolved.parent_start && end == list_pos + list.node_size() - 1 {
        Ok((list_pos, list_pos + list.node_size()))
    } else {
        Ok((task.pos, end))
    }
}

/// Clones of the sibling nodes covering `from..to`
fn nodes_in_range(root: &Node, from: usize, to: usize) -> Result<Vec<Node>, DocError> {
    let resolved = crate::doc::resolve(root, from)?;
    let parent = resolved.parent(root);
    let mut pos = from;
    let mut out = Vec::new();
    for node in parent.content.iter().skip(resolved.index) {
        if pos >= to {
            break;
        }
        out.push(node.clone());
        pos += node.node_size();
    }
    if pos != to {
        return Err(DocError::InvalidRange { from, to });
    }
    Ok(out)
}
