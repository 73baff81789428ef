use crate::model::{Node, NodeKind, format_clock};

use super::note_parser::TIMER_PREFIX;

/// Render the note as markdown. Blocks are separated by blank lines;
/// timer nodes become `⏱` lines under their task, which the parser skips.
pub fn serialize_note(root: &Node) -> String {
    let mut blocks: Vec<Vec<String>> = Vec::new();
    for block in &root.content {
        let mut lines = Vec::new();
        match &block.kind {
            NodeKind::Heading { level } => lines.push(format!(
                "{} {}",
                "#".repeat(*level as usize),
                block.text_content()
            )),
            NodeKind::Paragraph => lines.push(block.text_content()),
            NodeKind::TaskList => serialize_items(&block.content, 0, &mut lines),
            NodeKind::CountdownTimer(timer) => {
                lines.push(format!("{} {}", TIMER_PREFIX, format_clock(timer.initial_seconds)))
            }
            NodeKind::Doc | NodeKind::TaskItem(_) | NodeKind::Text { .. } => {}
        }
        blocks.push(lines);
    }
    let mut out = blocks
        .into_iter()
        .map(|lines| lines.join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push('\n');
    out
}

/// Serialize task items at `indent` spaces
pub fn serialize_items(items: &[Node], indent: usize, lines: &mut Vec<String>) {
    let pad = " ".repeat(indent);
    for node in items {
        match &node.kind {
            NodeKind::TaskItem(attrs) => {
                let check = if attrs.checked { 'x' } else { ' ' };
                let mut first = true;
                for child in &node.content {
                    match child.kind {
                        NodeKind::Paragraph if first => {
                            lines.push(format!("{}- [{}] {}", pad, check, child.text_content()));
                            first = false;
                        }
                        NodeKind::Paragraph => {
                            lines.push(format!("{}  {}", pad, child.text_content()))
                        }
                        NodeKind::TaskList => serialize_items(&child.content, indent + 2, lines),
                        _ => {}
                    }
                }
            }
            NodeKind::CountdownTimer(timer) => lines.push(format!(
                "{}  {} {}",
                pad,
                TIMER_PREFIX,
                format_clock(timer.initial_seconds)
            )),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TimerAttrs;
    use crate::parse::parse_note;

    fn sample() -> Node {
        let mut errands = Node::task_item(false, "Errands");
        errands.content.push(Node::paragraph("at lunch"));
        errands.content.push(Node::task_list(vec![
            Node::task_item(true, "Bank"),
            Node::task_item(false, "Post"),
        ]));
        Node::doc(vec![
            Node::heading(2, "Today"),
            Node::paragraph("Remember the keys"),
            Node::task_list(vec![
                errands,
                Node::task_item(false, "Walk dog"),
                Node::countdown_timer(TimerAttrs::new(300, "Walk dog", 40, None)),
            ]),
        ])
    }

    #[test]
    fn test_serialize_snapshot() {
        insta::assert_snapshot!(serialize_note(&sample()), @r"
        ## Today

        Remember the keys

        - [ ] Errands
          at lunch
          - [x] Bank
          - [ ] Post
        - [ ] Walk dog
          ⏱ 5:00
        ");
    }

    #[test]
    fn test_round_trip_drops_timers_only() {
        let text = serialize_note(&sample());
        let parsed = parse_note(&text);
        let mut expected = sample();
        expected.content[2].content.pop();
        pretty_assertions::assert_eq!(parsed, expected);
    }
}
