use crate::doc::{DocError, Document};
use crate::model::{Node, NodeKind, TaskAttrs, TimerAttrs, TimerToken};

/// Error type for task operations
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task not found: #{0}")]
    NotFound(usize),
    #[error("no task at position {0}")]
    NotATask(usize),
    #[error("cannot add subtask: tasks nest one level deep")]
    MaxDepthReached,
    #[error(transparent)]
    Doc(#[from] DocError),
}

/// Snapshot of a task item taken from one version of the tree.
///
/// Positions are only valid against that version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRef {
    /// Document-order index among all task items, nested ones included
    pub index: usize,
    pub pos: usize,
    pub end: usize,
    /// 0 for items in a top-level list, 1 for nested items
    pub depth: usize,
    pub attrs: TaskAttrs,
    /// Text of the item's own paragraphs joined with `\n`
    pub text: String,
    /// Position of the nested task list, if any
    pub nested_list: Option<usize>,
    pub child_count: usize,
    pub children_all_checked: bool,
}

impl TaskRef {
    pub fn has_children(&self) -> bool {
        self.child_count > 0
    }

    /// Position of the first char of the item's text
    pub fn text_start(&self) -> usize {
        self.pos + 2
    }

    /// Range of the item's first paragraph content
    pub fn first_paragraph_range(&self, root: &Node) -> Option<(usize, usize)> {
        let item = crate::doc::node_at(root, self.pos)?;
        let para = item.content.first()?;
        Some((self.pos + 2, self.pos + 2 + para.content_size()))
    }

    /// Number of task items removed along with this one
    pub fn subtree_len(&self) -> usize {
        1 + self.child_count
    }
}

/// A countdown timer node and where it sits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerRef {
    pub pos: usize,
    pub attrs: TimerAttrs,
}

// ---------------------------------------------------------------------------
// Enumeration
// ---------------------------------------------------------------------------

/// All task items in document order
pub fn task_items(root: &Node) -> Vec<TaskRef> {
    let mut out = Vec::new();
    collect_tasks(root, 0, 0, &mut out);
    out
}

fn collect_tasks(node: &Node, content_start: usize, list_depth: usize, out: &mut Vec<TaskRef>) {
    let mut pos = content_start;
    for child in &node.content {
        match &child.kind {
            NodeKind::TaskItem(attrs) => {
                let nested = child.content.iter().find(|c| c.is_task_list());
                let nested_list = nested_list_pos(child, pos);
                let (child_count, children_all_checked) = match nested {
                    Some(list) => {
                        let items: Vec<&TaskAttrs> =
                            list.content.iter().filter_map(|n| n.task_attrs()).collect();
                        (items.len(), items.iter().all(|a| a.checked))
                    }
                    None => (0, true),
                };
                out.push(TaskRef {
                    index: out.len(),
                    pos,
                    end: pos + child.node_size(),
                    depth: list_depth.saturating_sub(1),
                    attrs: attrs.clone(),
                    text: task_text(child),
                    nested_list,
                    child_count,
                    children_all_checked,
                });
                collect_tasks(child, pos + 1, list_depth, out);
            }
            NodeKind::TaskList => collect_tasks(child, pos + 1, list_depth + 1, out),
            _ => {}
        }
        pos += child.node_size();
    }
}

fn nested_list_pos(item: &Node, item_pos: usize) -> Option<usize> {
    let mut pos = item_pos + 1;
    for child in &item.content {
        if child.is_task_list() {
            return Some(pos);
        }
        pos += child.node_size();
    }
    None
}

/// Text of a task item's own paragraphs, excluding nested items
pub fn task_text(item: &Node) -> String {
    item.content
        .iter()
        .filter(|c| c.is_textblock())
        .map(|c| c.text_content())
        .collect::<Vec<_>>()
        .join("\n")
}

/// All countdown timer nodes in document order
pub fn timer_nodes(root: &Node) -> Vec<TimerRef> {
    let mut out = Vec::new();
    crate::doc::descendants(root, &mut |node, pos, _| {
        if let Some(attrs) = node.timer_attrs() {
            out.push(TimerRef {
                pos,
                attrs: attrs.clone(),
            });
        }
        !node.is_textblock()
    });
    out
}

/// End of `task` plus the timer nodes right after it that belong to it.
///
/// A timer belongs to the task when their tokens match, or, for content
/// without tokens, when its description equals the task text.
pub fn owned_range_end(root: &Node, task: &TaskRef) -> usize {
    let Ok(resolved) = crate::doc::resolve(root, task.pos) else {
        return task.end;
    };
    let parent = resolved.parent(root);
    let mut end = task.end;
    for sibling in parent.content.iter().skip(resolved.index + 1) {
        match sibling.timer_attrs() {
            Some(timer) if timer_belongs_to(timer, task) => end += sibling.node_size(),
            _ => break,
        }
    }
    end
}

pub fn timer_belongs_to(timer: &TimerAttrs, task: &TaskRef) -> bool {
    match (timer.token, task.attrs.timer_token) {
        (Some(a), Some(b)) => a == b,
        (None, None) => timer.task_description == task.text,
        _ => false,
    }
}

pub fn task_at(root: &Node, pos: usize) -> Option<TaskRef> {
    task_items(root).into_iter().find(|t| t.pos == pos)
}

pub fn task_by_index(root: &Node, index: usize) -> Result<TaskRef, TaskError> {
    task_items(root)
        .into_iter()
        .nth(index)
        .ok_or(TaskError::NotFound(index))
}

/// Innermost task item whose range contains `pos`
pub fn task_containing(root: &Node, pos: usize) -> Option<TaskRef> {
    task_items(root)
        .into_iter()
        .filter(|t| t.pos <= pos && pos < t.end)
        .max_by_key(|t| t.depth)
}

pub fn find_by_token(root: &Node, token: TimerToken) -> Option<TaskRef> {
    task_items(root)
        .into_iter()
        .find(|t| t.attrs.timer_token == Some(token))
}

/// First task, in document order, whose text equals `text`
pub fn find_by_text(root: &Node, text: &str) -> Option<TaskRef> {
    task_items(root).into_iter().find(|t| t.text == text)
}

// ---------------------------------------------------------------------------
// Checking
// ---------------------------------------------------------------------------

pub fn set_checked(doc: &mut Document, pos: usize, checked: bool) -> Result<(), TaskError> {
    doc.apply(|tr| tr.update_task_attrs(pos, |a| a.checked = checked))?;
    Ok(())
}

/// Flip the checkbox of task `index`; returns the new state
pub fn toggle_checked(doc: &mut Document, index: usize) -> Result<bool, TaskError> {
    let task = task_by_index(doc.root(), index)?;
    let checked = !task.attrs.checked;
    set_checked(doc, task.pos, checked)?;
    Ok(checked)
}

// ---------------------------------------------------------------------------
// Structure edits
// ---------------------------------------------------------------------------

/// Append a task to the last top-level task list (creating one if the note
/// has none), or as the last subtask of task `under`. Returns the new
/// task's index.
pub fn add_task(doc: &mut Document, text: &str, under: Option<usize>) -> Result<usize, TaskError> {
    let item = Node::task_item(false, text);
    let insert_pos = match under {
        Some(parent_index) => {
            let parent = task_by_index(doc.root(), parent_index)?;
            if parent.depth > 0 {
                return Err(TaskError::MaxDepthReached);
            }
            match parent.nested_list {
                Some(list_pos) => {
                    let list = doc
                        .node_at(list_pos)
                        .ok_or(TaskError::NotATask(parent.pos))?;
                    let end = list_pos + list.node_size() - 1;
                    doc.apply(|tr| tr.insert(end, item))?;
                    end
                }
                None => {
                    let end = parent.end - 1;
                    doc.apply(|tr| tr.insert(end, Node::task_list(vec![item])))?;
                    end + 1
                }
            }
        }
        None => match last_top_level_list(doc.root()) {
            Some((list_pos, size)) => {
                let end = list_pos + size - 1;
                doc.apply(|tr| tr.insert(end, item))?;
                end
            }
            None => {
                let end = doc.content_size();
                doc.apply(|tr| tr.insert(end, Node::task_list(vec![item])))?;
                end + 1
            }
        },
    };
    let index = task_items(doc.root())
        .iter()
        .position(|t| t.pos == insert_pos)
        .ok_or(TaskError::NotATask(insert_pos))?;
    log::debug!("event=add_task index={} under={:?}", index, under);
    Ok(index)
}

fn last_top_level_list(root: &Node) -> Option<(usize, usize)> {
    let mut pos = 0;
    let mut found = None;
    for child in &root.content {
        if child.is_task_list() {
            found = Some((pos, child.node_size()));
        }
        pos += child.node_size();
    }
    found
}

/// Replace the text of task `index`'s first paragraph
pub fn set_task_text(doc: &mut Document, index: usize, text: &str) -> Result<(), TaskError> {
    let task = task_by_index(doc.root(), index)?;
    let (from, to) = task
        .first_paragraph_range(doc.root())
        .ok_or(TaskError::NotATask(task.pos))?;
    doc.apply(|tr| {
        tr.delete(from, to)?;
        tr.insert_text(from, text)
    })?;
    Ok(())
}

/// Delete task `index` with its nested items. A list left empty is
/// removed too.
pub fn delete_task(doc: &mut Document, index: usize) -> Result<(), TaskError> {
    let task = task_by_index(doc.root(), index)?;
    let resolved = doc.resolve(task.pos)?;
    let list = resolved.parent(doc.root());
    let (from, to) = if list.content.len() == 1 {
        let list_pos = resolved.parent_start - 1;
        (list_pos, list_pos + list.node_size())
    } else {
        (task.pos, task.end)
    };
    doc.apply(|tr| tr.delete(from, to))?;
    Ok(())
}

/// Split the task whose first paragraph contains `pos`: text after `pos`
/// moves into a new unchecked task right after it. Returns the new task's
/// position.
pub fn split_task(doc: &mut Document, pos: usize) -> Result<usize, TaskError> {
    let task = task_containing(doc.root(), pos).ok_or(TaskError::NotATask(pos))?;
    let (from, to) = task
        .first_paragraph_range(doc.root())
        .ok_or(TaskError::NotATask(task.pos))?;
    if pos < from || pos > to {
        return Err(TaskError::NotATask(pos));
    }
    let first_line = task.text.lines().next().unwrap_or_default();
    let tail: String = first_line.chars().skip(pos - from).collect();
    let mut new_pos = 0;
    doc.apply(|tr| {
        tr.delete(pos, to)?;
        let at = tr.mapping().map(task.end);
        new_pos = at;
        tr.insert(at, Node::task_item(false, &tail))
    })?;
    Ok(new_pos)
}

/// Insert `text` at `pos` inside a textblock
pub fn insert_text(doc: &mut Document, pos: usize, text: &str) -> Result<(), TaskError> {
    doc.apply(|tr| tr.insert_text(pos, text))?;
    Ok(())
}

/// Delete the char before `pos` when both sit in the same textblock.
/// Returns the new cursor position.
pub fn delete_backward(doc: &mut Document, pos: usize) -> Result<usize, TaskError> {
    if pos == 0 {
        return Ok(pos);
    }
    let resolved = doc.resolve(pos)?;
    if !resolved.parent(doc.root()).is_textblock() || pos == resolved.parent_start {
        return Ok(pos);
    }
    doc.apply(|tr| tr.delete(pos - 1, pos))?;
    Ok(pos - 1)
}

// ---------------------------------------------------------------------------
// Outline
// ---------------------------------------------------------------------------

/// A heading and where it sits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub level: u8,
    pub text: String,
    pub pos: usize,
}

pub fn heading_outline(root: &Node) -> Vec<OutlineEntry> {
    let mut out = Vec::new();
    crate::doc::descendants(root, &mut |node, pos, _| {
        if let NodeKind::Heading { level } = node.kind {
            out.push(OutlineEntry {
                level,
                text: node.text_content(),
                pos,
            });
        }
        !node.is_textblock()
    });
    out
}
