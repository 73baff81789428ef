use crate::model::{Mark, Node, NodeKind, TaskAttrs, normalize_text_children};
use crate::util::unicode::char_to_byte;

use super::document::{DocError, ResolvedPos, node_at, resolve};
use super::schema;

/// How a replaced range moved: `old_size` positions at `pos` became `new_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepMap {
    pub pos: usize,
    pub old_size: usize,
    pub new_size: usize,
}

impl StepMap {
    /// Map a position through this step. `right` decides which side of an
    /// insertion a position exactly at the insertion point ends up on.
    pub fn map(&self, pos: usize, right: bool) -> usize {
        let end = self.pos + self.old_size;
        if pos < self.pos || (pos == self.pos && !right) {
            pos
        } else if pos > end || (pos == end && self.old_size > 0) {
            pos - self.old_size + self.new_size
        } else if right {
            self.pos + self.new_size
        } else {
            self.pos
        }
    }

    /// Map the start of a node; `None` if the step deleted it.
    pub fn map_node(&self, pos: usize) -> Option<usize> {
        if self.old_size > 0 && pos >= self.pos && pos < self.pos + self.old_size {
            return None;
        }
        Some(self.map(pos, true))
    }
}

/// Accumulated step maps of a transaction
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn map(&self, pos: usize) -> usize {
        self.maps.iter().fold(pos, |p, m| m.map(p, false))
    }

    /// Map the start of a node that existed before the transaction.
    pub fn map_node(&self, pos: usize) -> Option<usize> {
        self.maps.iter().try_fold(pos, |p, m| m.map_node(p))
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

/// Summary of a committed transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
    pub steps: usize,
    pub transient: bool,
}

/// A batch of mutations against a working copy of the tree.
///
/// Every step validates the touched parent against the schema, so a
/// transaction that would leave the tree malformed fails at the step that
/// breaks it. Positions passed to later steps must be expressed against
/// the evolving tree; use [`Transaction::mapping`] to carry snapshots over.
pub struct Transaction {
    root: Node,
    mapping: Mapping,
    steps: usize,
    transient: bool,
}

impl Transaction {
    pub(super) fn new(root: Node) -> Self {
        Transaction {
            root,
            mapping: Mapping::default(),
            steps: 0,
            transient: false,
        }
    }

    pub(super) fn finish(self) -> (Node, Applied) {
        (
            self.root,
            Applied {
                steps: self.steps,
                transient: self.transient,
            },
        )
    }

    /// The tree as it stands after the steps so far
    pub fn doc(&self) -> &Node {
        &self.root
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Mark this transaction as only touching transient marks
    pub fn set_transient(&mut self) {
        self.transient = true;
    }

    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos, DocError> {
        resolve(&self.root, pos)
    }

    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        node_at(&self.root, pos)
    }

    /// Delete `from..to`. The range must either cover whole sibling nodes
    /// or lie inside a single textblock.
    pub fn delete(&mut self, from: usize, to: usize) -> Result<(), DocError> {
        if from > to {
            return Err(DocError::InvalidRange { from, to });
        }
        if from == to {
            return Ok(());
        }
        let rf = self.resolve(from)?;
        let rt = self.resolve(to)?;
        if rf.path() != rt.path() {
            return Err(DocError::InvalidRange { from, to });
        }
        let list_depth = rf.list_depth(&self.root);
        let parent = node_at_path_mut(&mut self.root, rf.path());
        if parent.is_textblock() {
            let local_from = from - rf.parent_start;
            let local_to = to - rf.parent_start;
            let start = split_text_at(&mut parent.content, local_from);
            let end = split_text_at(&mut parent.content, local_to);
            parent.content.drain(start..end);
            normalize_text_children(&mut parent.content);
        } else {
            if !rf.is_boundary() || !rt.is_boundary() {
                return Err(DocError::InvalidRange { from, to });
            }
            let mut candidate = parent.clone();
            candidate.content.drain(rf.index..rt.index);
            schema::check_node(&candidate, parent_depth(list_depth, &candidate))?;
            *parent = candidate;
        }
        self.record(StepMap {
            pos: from,
            old_size: to - from,
            new_size: 0,
        });
        Ok(())
    }

    /// Insert `node` at `pos`. Text nodes may be inserted inside a
    /// textblock; anything else needs a node boundary.
    pub fn insert(&mut self, pos: usize, node: Node) -> Result<(), DocError> {
        let resolved = self.resolve(pos)?;
        let list_depth = resolved.list_depth(&self.root);
        let size = node.node_size();
        let parent = node_at_path_mut(&mut self.root, resolved.path());
        let mut candidate = parent.clone();
        if candidate.is_textblock() && node.is_text() {
            let at = split_text_at(&mut candidate.content, pos - resolved.parent_start);
            candidate.content.insert(at, node);
            normalize_text_children(&mut candidate.content);
        } else {
            if !resolved.is_boundary() {
                return Err(DocError::InvalidRange { from: pos, to: pos });
            }
            candidate.content.insert(resolved.index, node);
        }
        schema::check_node(&candidate, parent_depth(list_depth, &candidate))?;
        *parent = candidate;
        self.record(StepMap {
            pos,
            old_size: 0,
            new_size: size,
        });
        Ok(())
    }

    /// Insert plain text at `pos`, which must be inside a textblock
    pub fn insert_text(&mut self, pos: usize, text: &str) -> Result<(), DocError> {
        if text.is_empty() {
            return Ok(());
        }
        let resolved = self.resolve(pos)?;
        if !resolved.parent(&self.root).is_textblock() {
            return Err(DocError::WrongNodeType {
                pos,
                expected: "textblock",
            });
        }
        self.insert(pos, Node::text(text))
    }

    /// Replace the attributes of the task item starting at `pos`
    pub fn update_task_attrs<F>(&mut self, pos: usize, f: F) -> Result<(), DocError>
    where
        F: FnOnce(&mut TaskAttrs),
    {
        let resolved = self.resolve(pos)?;
        let parent = node_at_path_mut(&mut self.root, resolved.path());
        let attrs = match parent.content.get_mut(resolved.index) {
            Some(node) if resolved.is_boundary() => node.task_attrs_mut(),
            _ => None,
        }
        .ok_or(DocError::WrongNodeType {
            pos,
            expected: "task_item",
        })?;
        let before = attrs.clone();
        f(attrs);
        if *attrs != before {
            self.steps += 1;
        }
        Ok(())
    }

    /// Change the kind of the textblock at `pos` (paragraph ⇄ heading)
    pub fn set_block_kind(&mut self, pos: usize, kind: NodeKind) -> Result<(), DocError> {
        if !matches!(kind, NodeKind::Paragraph | NodeKind::Heading { .. }) {
            return Err(DocError::WrongNodeType {
                pos,
                expected: "textblock kind",
            });
        }
        let resolved = self.resolve(pos)?;
        let list_depth = resolved.list_depth(&self.root);
        let parent = node_at_path_mut(&mut self.root, resolved.path());
        let mut candidate = parent.clone();
        match candidate.content.get_mut(resolved.index) {
            Some(node) if resolved.is_boundary() && node.is_textblock() => node.kind = kind,
            _ => {
                return Err(DocError::WrongNodeType {
                    pos,
                    expected: "textblock",
                });
            }
        }
        schema::check_node(&candidate, parent_depth(list_depth, &candidate))?;
        *parent = candidate;
        self.steps += 1;
        Ok(())
    }

    /// Add `mark` to all text in `from..to`
    pub fn add_mark(&mut self, from: usize, to: usize, mark: Mark) -> Result<(), DocError> {
        self.check_range(from, to)?;
        let mut changed = false;
        for_text_in_range(&mut self.root, 0, from, to, &mut |text| {
            if !text.marks.contains(&mark) {
                text.marks.push(mark.clone());
                changed = true;
            }
        });
        if changed {
            self.steps += 1;
        }
        Ok(())
    }

    /// Remove marks matching `pred` from all text in `from..to`
    pub fn remove_marks(
        &mut self,
        from: usize,
        to: usize,
        pred: &dyn Fn(&Mark) -> bool,
    ) -> Result<(), DocError> {
        self.check_range(from, to)?;
        let mut changed = false;
        for_text_in_range(&mut self.root, 0, from, to, &mut |text| {
            let before = text.marks.len();
            text.marks.retain(|m| !pred(m));
            changed |= text.marks.len() != before;
        });
        if changed {
            self.steps += 1;
        }
        Ok(())
    }

    fn check_range(&self, from: usize, to: usize) -> Result<(), DocError> {
        let size = self.root.content_size();
        if from > to {
            return Err(DocError::InvalidRange { from, to });
        }
        if to > size {
            return Err(DocError::OutOfRange { pos: to, size });
        }
        Ok(())
    }

    fn record(&mut self, map: StepMap) {
        self.mapping.maps.push(map);
        self.steps += 1;
    }
}

fn parent_depth(list_depth: usize, parent: &Node) -> usize {
    // check_node counts the node itself when it is a list
    list_depth - usize::from(parent.is_task_list())
}

fn node_at_path_mut<'a>(root: &'a mut Node, path: &[usize]) -> &'a mut Node {
    let mut node = root;
    for &i in path {
        node = &mut node.content[i];
    }
    node
}

/// Make sure a text-node boundary exists at char offset `offset` within
/// inline `content`; returns the index of the first node after it.
fn split_text_at(content: &mut Vec<Node>, offset: usize) -> usize {
    let mut pos = 0;
    for i in 0..content.len() {
        if pos == offset {
            return i;
        }
        let size = content[i].node_size();
        if offset < pos + size {
            let node = &content[i];
            if let Some(text) = node.text_str() {
                let byte = char_to_byte(text, offset - pos);
                let left = Node::text_with_marks(&text[..byte], node.marks.clone());
                let right = Node::text_with_marks(&text[byte..], node.marks.clone());
                content.splice(i..=i, [left, right]);
                return i + 1;
            }
            return i;
        }
        pos += size;
    }
    content.len()
}

/// Apply `f` to every text node (split at the range edges) within `from..to`.
fn for_text_in_range(
    node: &mut Node,
    content_start: usize,
    from: usize,
    to: usize,
    f: &mut dyn FnMut(&mut Node),
) {
    if node.is_textblock() {
        let local_from = from.saturating_sub(content_start);
        let local_to = (to - content_start).min(node.content_size());
        if local_from >= local_to {
            return;
        }
        let start = split_text_at(&mut node.content, local_from);
        let end = split_text_at(&mut node.content, local_to);
        for text in &mut node.content[start..end] {
            f(text);
        }
        normalize_text_children(&mut node.content);
        return;
    }
    let mut pos = content_start;
    for child in &mut node.content {
        let size = child.node_size();
        let end = pos + size;
        if end > from && pos < to && !child.is_atom() && !child.is_text() {
            for_text_in_range(child, pos + 1, from, to, f);
        }
        pos = end;
        if pos >= to {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::Document;
    use pretty_assertions::assert_eq;

    fn three_tasks() -> Document {
        Document::new(Node::doc(vec![Node::task_list(vec![
            Node::task_item(false, "Buy milk"),
            Node::task_item(false, "Walk dog"),
            Node::task_item(false, "Email Bob"),
        ])]))
        .unwrap()
    }

    #[test]
    fn test_step_map_deletion() {
        let m = StepMap {
            pos: 10,
            old_size: 5,
            new_size: 0,
        };
        assert_eq!(m.map(3, false), 3);
        assert_eq!(m.map(12, false), 10);
        assert_eq!(m.map(15, false), 10);
        assert_eq!(m.map(20, false), 15);
        assert_eq!(m.map_node(10), None);
        assert_eq!(m.map_node(15), Some(10));
    }

    #[test]
    fn test_step_map_insertion_assoc() {
        let m = StepMap {
            pos: 10,
            old_size: 0,
            new_size: 4,
        };
        assert_eq!(m.map(10, false), 10);
        assert_eq!(m.map(10, true), 14);
        assert_eq!(m.map_node(10), Some(14));
        assert_eq!(m.map(11, false), 15);
    }

    #[test]
    fn test_delete_whole_node() {
        let mut doc = three_tasks();
        // "Buy milk" item spans 1..13
        doc.apply(|tr| tr.delete(1, 13)).unwrap();
        let texts: Vec<String> = doc.root().content[0]
            .content
            .iter()
            .map(Node::text_content)
            .collect();
        assert_eq!(texts, vec!["Walk dog", "Email Bob"]);
        assert_eq!(doc.content_version(), 1);
    }

    #[test]
    fn test_delete_partial_node_rejected() {
        let mut doc = three_tasks();
        let err = doc.apply(|tr| tr.delete(1, 5)).unwrap_err();
        assert_eq!(err, DocError::InvalidRange { from: 1, to: 5 });
    }

    #[test]
    fn test_delete_text_inside_block() {
        let mut doc = three_tasks();
        // text "Buy milk" at 3..11; remove "Buy "
        doc.apply(|tr| tr.delete(3, 7)).unwrap();
        assert_eq!(doc.root().content[0].content[0].text_content(), "milk");
    }

    #[test]
    fn test_insert_rejects_schema_violation() {
        let mut doc = three_tasks();
        let err = doc
            .apply(|tr| tr.insert(1, Node::paragraph("loose")))
            .unwrap_err();
        assert!(matches!(err, DocError::Schema { .. }));
    }

    #[test]
    fn test_insert_text_merges() {
        let mut doc = three_tasks();
        doc.apply(|tr| tr.insert_text(11, "s")).unwrap();
        let para = &doc.root().content[0].content[0].content[0];
        assert_eq!(para.content, vec![Node::text("Buy milks")]);
    }

    #[test]
    fn test_mapping_tracks_multiple_steps() {
        let mut doc = three_tasks();
        doc.apply(|tr| {
            tr.delete(1, 13)?;
            // "Email Bob" started at 25 before the delete
            let pos = tr.mapping().map_node(25).unwrap();
            assert_eq!(pos, 13);
            tr.update_task_attrs(pos, |a| a.checked = true)
        })
        .unwrap();
        let last = &doc.root().content[0].content[1];
        assert!(last.task_attrs().unwrap().checked);
    }

    #[test]
    fn test_marks_add_and_remove() {
        let mut doc = three_tasks();
        let mark = Mark::SearchMatch {
            query: "milk".into(),
            active: true,
        };
        doc.apply(|tr| {
            tr.set_transient();
            tr.add_mark(7, 11, mark.clone())
        })
        .unwrap();
        assert_eq!(doc.content_version(), 0);
        assert_eq!(doc.version(), 1);
        let para = &doc.root().content[0].content[0].content[0];
        assert_eq!(para.content.len(), 2);
        assert_eq!(para.content[1].marks, vec![mark]);

        let size = doc.content_size();
        doc.apply(|tr| tr.remove_marks(0, size, &|m| m.is_transient()))
            .unwrap();
        let para = &doc.root().content[0].content[0].content[0];
        assert_eq!(para.content, vec![Node::text("Buy milk")]);
    }

    #[test]
    fn test_update_attrs_wrong_type() {
        let mut doc = three_tasks();
        let err = doc.apply(|tr| tr.update_task_attrs(0, |_| {})).unwrap_err();
        assert_eq!(
            err,
            DocError::WrongNodeType {
                pos: 0,
                expected: "task_item"
            }
        );
    }

    #[test]
    fn test_noop_transaction_keeps_version() {
        let mut doc = three_tasks();
        let applied = doc.apply(|tr| tr.update_task_attrs(1, |_| {})).unwrap();
        assert_eq!(applied.steps, 0);
        assert_eq!(doc.version(), 0);
    }
}
