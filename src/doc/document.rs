use crate::model::{Node, NodeKind};

use super::schema;
use super::transaction::{Applied, Transaction};

/// Error type for document reads and mutations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocError {
    #[error("position {pos} is outside the document (size {size})")]
    OutOfRange { pos: usize, size: usize },
    #[error("range {from}..{to} does not cover whole nodes of one parent")]
    InvalidRange { from: usize, to: usize },
    #[error("expected {expected} at position {pos}")]
    WrongNodeType { pos: usize, expected: &'static str },
    #[error("{child} is not allowed inside {parent}")]
    Schema {
        parent: &'static str,
        child: &'static str,
    },
    #[error("root node must be a doc")]
    NotADoc,
    #[error("transaction aborted: {0}")]
    Aborted(String),
}

/// A position resolved against a tree: which parent it falls in and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPos {
    pub pos: usize,
    /// Child indices from the root down to the parent node
    path: Vec<usize>,
    /// Position at which the parent's content starts
    pub parent_start: usize,
    /// Index of the child the position points at (or `len` at the end)
    pub index: usize,
    /// Offset into that child when it is a text node; 0 on a node boundary
    pub text_offset: usize,
}

impl ResolvedPos {
    /// Nesting depth of the parent (0 = the root)
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn is_boundary(&self) -> bool {
        self.text_offset == 0
    }

    pub fn parent<'a>(&self, root: &'a Node) -> &'a Node {
        let mut node = root;
        for &i in &self.path {
            node = &node.content[i];
        }
        node
    }

    /// Number of task lists enclosing the parent's content, counting the
    /// parent itself when it is one.
    pub fn list_depth(&self, root: &Node) -> usize {
        let mut depth = usize::from(root.is_task_list());
        let mut node = root;
        for &i in &self.path {
            node = &node.content[i];
            if node.is_task_list() {
                depth += 1;
            }
        }
        depth
    }
}

/// Resolve `pos` inside `root`.
pub fn resolve(root: &Node, pos: usize) -> Result<ResolvedPos, DocError> {
    let size = root.content_size();
    if pos > size {
        return Err(DocError::OutOfRange { pos, size });
    }
    let mut node = root;
    let mut start = 0;
    let mut path = Vec::new();
    'descend: loop {
        let mut offset = start;
        for (i, child) in node.content.iter().enumerate() {
            let end = offset + child.node_size();
            if pos < end {
                if pos == offset {
                    return Ok(ResolvedPos {
                        pos,
                        path,
                        parent_start: start,
                        index: i,
                        text_offset: 0,
                    });
                }
                if child.is_text() {
                    return Ok(ResolvedPos {
                        pos,
                        path,
                        parent_start: start,
                        index: i,
                        text_offset: pos - offset,
                    });
                }
                path.push(i);
                node = child;
                start = offset + 1;
                continue 'descend;
            }
            offset = end;
        }
        return Ok(ResolvedPos {
            pos,
            path,
            parent_start: start,
            index: node.content.len(),
            text_offset: 0,
        });
    }
}

/// The node starting at `pos`, or the text node `pos` falls inside.
pub fn node_at(root: &Node, pos: usize) -> Option<&Node> {
    let resolved = resolve(root, pos).ok()?;
    resolved.parent(root).content.get(resolved.index)
}

/// Visit every descendant of `root` in document order with its start
/// position and parent. Returning `false` skips the node's children.
pub fn descendants<'a>(root: &'a Node, f: &mut dyn FnMut(&'a Node, usize, &'a Node) -> bool) {
    walk(root, 0, f);
}

fn walk<'a>(node: &'a Node, content_start: usize, f: &mut dyn FnMut(&'a Node, usize, &'a Node) -> bool) {
    let mut pos = content_start;
    for child in &node.content {
        if f(child, pos, node) && !child.content.is_empty() {
            walk(child, pos + 1, f);
        }
        pos += child.node_size();
    }
}

/// Plain-text projection of the document, with a map back to positions.
///
/// Textblocks are joined with `\n`. Offsets are in chars.
#[derive(Debug, Clone, Default)]
pub struct FlatText {
    pub text: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    flat_start: usize,
    doc_start: usize,
    len: usize,
}

impl FlatText {
    pub fn build(root: &Node) -> Self {
        let mut flat = FlatText::default();
        let mut flat_len = 0;
        let mut first_block = true;
        descendants(root, &mut |node, pos, _| {
            if !node.is_textblock() {
                return true;
            }
            if !first_block {
                flat.text.push('\n');
                flat_len += 1;
            }
            first_block = false;
            let mut child_pos = pos + 1;
            for child in &node.content {
                if let NodeKind::Text { text } = &child.kind {
                    let len = child.node_size();
                    flat.segments.push(Segment {
                        flat_start: flat_len,
                        doc_start: child_pos,
                        len,
                    });
                    flat.text.push_str(text);
                    flat_len += len;
                }
                child_pos += child.node_size();
            }
            false
        });
        flat
    }

    pub fn char_len(&self) -> usize {
        self.segments
            .last()
            .map_or(0, |s| s.flat_start + s.len)
            .max(self.text.chars().count())
    }

    /// Document position of the char at `offset` (range start side).
    pub fn start_pos(&self, offset: usize) -> Option<usize> {
        self.segments
            .iter()
            .find(|s| offset < s.flat_start + s.len)
            .map(|s| s.doc_start + offset.saturating_sub(s.flat_start))
    }

    /// Document position just after the char before `offset` (range end side).
    pub fn end_pos(&self, offset: usize) -> Option<usize> {
        self.segments
            .iter()
            .rev()
            .find(|s| offset > s.flat_start)
            .map(|s| s.doc_start + (offset - s.flat_start).min(s.len))
    }
}

/// The note document. All mutation goes through [`Document::apply`].
#[derive(Debug, Clone)]
pub struct Document {
    root: Node,
    version: u64,
    content_version: u64,
}

impl Default for Document {
    fn default() -> Self {
        Document {
            root: Node::doc(vec![Node::paragraph("")]),
            version: 0,
            content_version: 0,
        }
    }
}

impl Document {
    pub fn new(root: Node) -> Result<Self, DocError> {
        if root.kind != NodeKind::Doc {
            return Err(DocError::NotADoc);
        }
        schema::check_node(&root, 0)?;
        Ok(Document {
            root,
            version: 0,
            content_version: 0,
        })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn content_size(&self) -> usize {
        self.root.content_size()
    }

    /// Bumped by every committed transaction
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Bumped only by transactions that changed content, not transient marks
    pub fn content_version(&self) -> u64 {
        self.content_version
    }

    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos, DocError> {
        resolve(&self.root, pos)
    }

    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        node_at(&self.root, pos)
    }

    pub fn descendants<'a>(&'a self, f: &mut dyn FnMut(&'a Node, usize, &'a Node) -> bool) {
        descendants(&self.root, f)
    }

    pub fn flat_text(&self) -> FlatText {
        FlatText::build(&self.root)
    }

    /// Run `f` against a private copy of the document and commit the result
    /// only if it returns `Ok`. Nothing is visible until the commit, and a
    /// failed transaction leaves the document untouched.
    pub fn apply<F>(&mut self, f: F) -> Result<Applied, DocError>
    where
        F: FnOnce(&mut Transaction) -> Result<(), DocError>,
    {
        let mut tr = Transaction::new(self.root.clone());
        if let Err(e) = f(&mut tr) {
            log::debug!("event=transaction status=discarded reason=\"{}\"", e);
            return Err(e);
        }
        let (root, applied) = tr.finish();
        if applied.steps > 0 {
            self.root = root;
            self.version += 1;
            if !applied.transient {
                self.content_version += 1;
            }
        }
        Ok(applied)
    }

    /// Copy of the tree without transient marks, for saving
    pub fn persistent_root(&self) -> Node {
        let mut root = self.root.clone();
        root.strip_transient_marks();
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // doc(0) task_list(0..) item "ab" at 1, item "cd" at 7, paragraph "ef"
    fn sample() -> Node {
        Node::doc(vec![
            Node::task_list(vec![Node::task_item(false, "ab"), Node::task_item(true, "cd")]),
            Node::paragraph("ef"),
        ])
    }

    #[test]
    fn test_resolve_boundaries() {
        let root = sample();
        let r = resolve(&root, 0).unwrap();
        assert_eq!((r.depth(), r.index), (0, 0));
        let r = resolve(&root, 1).unwrap();
        assert_eq!((r.depth(), r.index, r.parent_start), (1, 0, 1));
        let r = resolve(&root, 7).unwrap();
        assert_eq!((r.depth(), r.index), (1, 1));
        // end of the task list content
        let r = resolve(&root, 13).unwrap();
        assert_eq!((r.depth(), r.index), (1, 2));
        let r = resolve(&root, 14).unwrap();
        assert_eq!((r.depth(), r.index), (0, 1));
    }

    #[test]
    fn test_resolve_inside_text() {
        let root = sample();
        // item at 1, paragraph at 2, text starts at 3
        let r = resolve(&root, 4).unwrap();
        assert_eq!(r.depth(), 3);
        assert_eq!(r.text_offset, 1);
        assert_eq!(r.parent(&root).type_name(), "paragraph");
    }

    #[test]
    fn test_resolve_out_of_range() {
        let root = sample();
        let size = root.content_size();
        assert!(resolve(&root, size).is_ok());
        assert_eq!(
            resolve(&root, size + 1),
            Err(DocError::OutOfRange {
                pos: size + 1,
                size
            })
        );
    }

    #[test]
    fn test_node_at() {
        let root = sample();
        assert_eq!(node_at(&root, 0).map(Node::type_name), Some("task_list"));
        assert_eq!(node_at(&root, 1).map(Node::type_name), Some("task_item"));
        assert_eq!(node_at(&root, 7).map(|n| n.text_content()), Some("cd".into()));
        assert_eq!(node_at(&root, 13), None);
    }

    #[test]
    fn test_descendants_positions() {
        let root = sample();
        let mut items = Vec::new();
        descendants(&root, &mut |node, pos, _| {
            if node.is_task_item() {
                items.push((pos, node.text_content()));
            }
            true
        });
        assert_eq!(items, vec![(1, "ab".to_string()), (7, "cd".to_string())]);
    }

    #[test]
    fn test_flat_text_mapping() {
        let root = Node::doc(vec![Node::task_list(vec![
            Node::task_item(false, "Walk dog"),
            Node::task_item(false, "Buy dog food"),
        ])]);
        let flat = FlatText::build(&root);
        assert_eq!(flat.text, "Walk dog\nBuy dog food");
        // first text starts at 3 (list 0, item 1, paragraph 2)
        assert_eq!(flat.start_pos(0), Some(3));
        assert_eq!(flat.start_pos(5), Some(8));
        assert_eq!(flat.end_pos(8), Some(11));
        // second item at 13, paragraph 14, text 15
        assert_eq!(flat.start_pos(9), Some(15));
        assert_eq!(flat.end_pos(16), Some(22));
    }

    #[test]
    fn test_new_rejects_bad_schema() {
        let root = Node::doc(vec![Node::task_item(false, "loose")]);
        assert!(Document::new(root).is_err());
        assert_eq!(Document::new(Node::paragraph("x")).unwrap_err(), DocError::NotADoc);
    }

    #[test]
    fn test_failed_transaction_leaves_document() {
        let mut doc = Document::new(sample()).unwrap();
        let before = doc.root().clone();
        let result = doc.apply(|tr| {
            tr.delete(1, 7)?;
            Err(DocError::Aborted("test".into()))
        });
        assert!(result.is_err());
        assert_eq!(doc.root(), &before);
        assert_eq!(doc.version(), 0);
    }
}
