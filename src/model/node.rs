use serde::{Deserialize, Serialize};

use super::task::TaskAttrs;
use super::timer::TimerAttrs;

/// Inline formatting carried by text nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mark {
    Bold,
    Italic,
    Strike,
    Code,
    /// Search highlight overlay. Never persisted.
    SearchMatch { query: String, active: bool },
}

impl Mark {
    /// Transient marks are stripped before saving and do not count as edits
    pub fn is_transient(&self) -> bool {
        matches!(self, Mark::SearchMatch { .. })
    }
}

/// The type of a document node, with its attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Doc,
    Paragraph,
    Heading { level: u8 },
    TaskList,
    TaskItem(TaskAttrs),
    /// Block-level atom: occupies exactly one position
    CountdownTimer(TimerAttrs),
    Text { text: String },
}

/// A node in the note document tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
    /// Only meaningful on text nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl Node {
    pub fn new(kind: NodeKind, content: Vec<Node>) -> Self {
        Node {
            kind,
            content,
            marks: Vec::new(),
        }
    }

    pub fn doc(content: Vec<Node>) -> Self {
        Node::new(NodeKind::Doc, content)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::new(NodeKind::Text { text: text.into() }, Vec::new())
    }

    pub fn text_with_marks(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Node {
            kind: NodeKind::Text { text: text.into() },
            content: Vec::new(),
            marks,
        }
    }

    /// A paragraph holding `text`; empty text yields an empty paragraph
    pub fn paragraph(text: &str) -> Self {
        Node::new(NodeKind::Paragraph, text_content_nodes(text))
    }

    pub fn heading(level: u8, text: &str) -> Self {
        Node::new(NodeKind::Heading { level }, text_content_nodes(text))
    }

    pub fn task_list(items: Vec<Node>) -> Self {
        Node::new(NodeKind::TaskList, items)
    }

    pub fn task_item(checked: bool, text: &str) -> Self {
        Node::new(
            NodeKind::TaskItem(TaskAttrs::checked(checked)),
            vec![Node::paragraph(text)],
        )
    }

    pub fn countdown_timer(attrs: TimerAttrs) -> Self {
        Node::new(NodeKind::CountdownTimer(attrs), Vec::new())
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Doc => "doc",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading { .. } => "heading",
            NodeKind::TaskList => "task_list",
            NodeKind::TaskItem(_) => "task_item",
            NodeKind::CountdownTimer(_) => "countdown_timer",
            NodeKind::Text { .. } => "text",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text { .. })
    }

    pub fn is_atom(&self) -> bool {
        matches!(self.kind, NodeKind::CountdownTimer(_))
    }

    /// Blocks whose content is inline text
    pub fn is_textblock(&self) -> bool {
        matches!(self.kind, NodeKind::Paragraph | NodeKind::Heading { .. })
    }

    pub fn is_task_item(&self) -> bool {
        matches!(self.kind, NodeKind::TaskItem(_))
    }

    pub fn is_task_list(&self) -> bool {
        matches!(self.kind, NodeKind::TaskList)
    }

    pub fn is_timer(&self) -> bool {
        matches!(self.kind, NodeKind::CountdownTimer(_))
    }

    pub fn text_str(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn task_attrs(&self) -> Option<&TaskAttrs> {
        match &self.kind {
            NodeKind::TaskItem(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn task_attrs_mut(&mut self) -> Option<&mut TaskAttrs> {
        match &mut self.kind {
            NodeKind::TaskItem(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn timer_attrs(&self) -> Option<&TimerAttrs> {
        match &self.kind {
            NodeKind::CountdownTimer(attrs) => Some(attrs),
            _ => None,
        }
    }

    /// Size of this node in document positions
    pub fn node_size(&self) -> usize {
        match &self.kind {
            NodeKind::Text { text } => text.chars().count(),
            NodeKind::CountdownTimer(_) => 1,
            _ => 2 + self.content_size(),
        }
    }

    /// Total size of this node's children
    pub fn content_size(&self) -> usize {
        self.content.iter().map(Node::node_size).sum()
    }

    /// Concatenated text of all descendant text nodes, no separators
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Two text nodes with identical marks can be merged into one
    pub fn same_markup(&self, other: &Node) -> bool {
        self.is_text() && other.is_text() && self.marks == other.marks
    }

    /// True if any text node in this subtree carries a mark matching `pred`
    pub fn has_mark(&self, pred: &dyn Fn(&Mark) -> bool) -> bool {
        if self.marks.iter().any(pred) {
            return true;
        }
        self.content.iter().any(|c| c.has_mark(pred))
    }

    /// Remove transient marks from this subtree, merging text nodes that
    /// become identical in markup.
    pub fn strip_transient_marks(&mut self) {
        for child in &mut self.content {
            child.marks.retain(|m| !m.is_transient());
            child.strip_transient_marks();
        }
        normalize_text_children(&mut self.content);
    }
}

fn text_content_nodes(text: &str) -> Vec<Node> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![Node::text(text)]
    }
}

fn collect_text(node: &Node, out: &mut String) {
    if let NodeKind::Text { text } = &node.kind {
        out.push_str(text);
    }
    for child in &node.content {
        collect_text(child, out);
    }
}

/// Merge adjacent text nodes with identical marks and drop empty ones
pub fn normalize_text_children(content: &mut Vec<Node>) {
    let mut merged: Vec<Node> = Vec::with_capacity(content.len());
    for node in content.drain(..) {
        if node.text_str().is_some_and(str::is_empty) {
            continue;
        }
        if let Some(last) = merged.last_mut()
            && last.same_markup(&node)
            && let (NodeKind::Text { text: a }, NodeKind::Text { text: b }) =
                (&mut last.kind, &node.kind)
        {
            a.push_str(b);
            continue;
        }
        merged.push(node);
    }
    *content = merged;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_sizes() {
        let item = Node::task_item(false, "Buy milk");
        // task_item(2) + paragraph(2) + 8 chars
        assert_eq!(item.node_size(), 12);
        let list = Node::task_list(vec![item.clone(), item]);
        assert_eq!(list.node_size(), 26);
        let timer = Node::countdown_timer(TimerAttrs::new(60, "x", 0, None));
        assert_eq!(timer.node_size(), 1);
        assert_eq!(Node::paragraph("").node_size(), 2);
    }

    #[test]
    fn test_text_size_counts_chars_not_bytes() {
        assert_eq!(Node::text("héllo").node_size(), 5);
    }

    #[test]
    fn test_strip_transient_marks_merges_text() {
        let mut para = Node::new(
            NodeKind::Paragraph,
            vec![
                Node::text("Walk "),
                Node::text_with_marks(
                    "dog",
                    vec![Mark::SearchMatch {
                        query: "dog".into(),
                        active: true,
                    }],
                ),
                Node::text(" now"),
            ],
        );
        para.strip_transient_marks();
        assert_eq!(para.content, vec![Node::text("Walk dog now")]);
    }

    #[test]
    fn test_strip_keeps_persistent_marks() {
        let mut para = Node::new(
            NodeKind::Paragraph,
            vec![Node::text("a"), Node::text_with_marks("b", vec![Mark::Bold])],
        );
        para.strip_transient_marks();
        assert_eq!(para.content.len(), 2);
    }

    #[test]
    fn test_serde_shape() {
        let item = Node::task_item(true, "Done thing");
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"type\":\"task_item\""));
        assert!(json.contains("\"checked\":true"));
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }
}
