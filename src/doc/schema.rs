use crate::model::{Node, NodeKind};

use super::document::DocError;

/// Check that `node`'s subtree obeys the content rules.
///
/// `list_depth` is the number of task lists enclosing `node` (not counting
/// `node` itself). Task items may carry a nested list only when they sit
/// in a top-level list.
pub fn check_node(node: &Node, list_depth: usize) -> Result<(), DocError> {
    let child_depth = list_depth + usize::from(node.is_task_list());
    match &node.kind {
        NodeKind::Text { .. } | NodeKind::CountdownTimer(_) => {
            if let Some(child) = node.content.first() {
                return Err(schema_error(node, child));
            }
        }
        NodeKind::Doc => {
            for child in &node.content {
                if !matches!(
                    child.kind,
                    NodeKind::Paragraph
                        | NodeKind::Heading { .. }
                        | NodeKind::TaskList
                        | NodeKind::CountdownTimer(_)
                ) {
                    return Err(schema_error(node, child));
                }
            }
        }
        NodeKind::Paragraph | NodeKind::Heading { .. } => {
            if let Some(child) = node.content.iter().find(|c| !c.is_text()) {
                return Err(schema_error(node, child));
            }
        }
        NodeKind::TaskList => {
            if let Some(child) = node
                .content
                .iter()
                .find(|c| !c.is_task_item() && !c.is_timer())
            {
                return Err(schema_error(node, child));
            }
        }
        NodeKind::TaskItem(_) => check_task_item(node, list_depth)?,
    }
    for child in &node.content {
        check_node(child, child_depth)?;
    }
    Ok(())
}

/// paragraph+ task_list?, and the list only at the first nesting level
fn check_task_item(node: &Node, list_depth: usize) -> Result<(), DocError> {
    let Some(first) = node.content.first() else {
        return Err(DocError::Schema {
            parent: "task_item",
            child: "nothing",
        });
    };
    if !matches!(first.kind, NodeKind::Paragraph) {
        return Err(schema_error(node, first));
    }
    let mut seen_list = false;
    for child in &node.content[1..] {
        match child.kind {
            NodeKind::Paragraph if !seen_list => {}
            NodeKind::TaskList if !seen_list && list_depth <= 1 => seen_list = true,
            _ => return Err(schema_error(node, child)),
        }
    }
    Ok(())
}

fn schema_error(parent: &Node, child: &Node) -> DocError {
    DocError::Schema {
        parent: parent.type_name(),
        child: child.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested_item(text: &str, subs: &[&str]) -> Node {
        let mut item = Node::task_item(false, text);
        item.content.push(Node::task_list(
            subs.iter().map(|s| Node::task_item(false, s)).collect(),
        ));
        item
    }

    #[test]
    fn test_single_level_nesting_allowed() {
        let doc = Node::doc(vec![Node::task_list(vec![nested_item("a", &["b"])])]);
        assert!(check_node(&doc, 0).is_ok());
    }

    #[test]
    fn test_second_level_nesting_rejected() {
        let inner = nested_item("b", &["c"]);
        let mut outer = Node::task_item(false, "a");
        outer.content.push(Node::task_list(vec![inner]));
        let doc = Node::doc(vec![Node::task_list(vec![outer])]);
        assert!(matches!(
            check_node(&doc, 0),
            Err(DocError::Schema {
                parent: "task_item",
                child: "task_list"
            })
        ));
    }

    #[test]
    fn test_task_item_needs_leading_paragraph() {
        let item = Node::new(
            NodeKind::TaskItem(Default::default()),
            vec![Node::task_list(vec![])],
        );
        let doc = Node::doc(vec![Node::task_list(vec![item])]);
        assert!(check_node(&doc, 0).is_err());
    }

    #[test]
    fn test_task_list_rejects_paragraph() {
        let doc = Node::doc(vec![Node::task_list(vec![Node::paragraph("x")])]);
        assert!(check_node(&doc, 0).is_err());
    }

    #[test]
    fn test_timer_allowed_in_task_list() {
        let timer = Node::countdown_timer(crate::model::TimerAttrs::new(60, "a", 0, None));
        let doc = Node::doc(vec![Node::task_list(vec![
            Node::task_item(false, "a"),
            timer,
        ])]);
        assert!(check_node(&doc, 0).is_ok());
    }
}
