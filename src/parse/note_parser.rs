use crate::model::Node;

/// Prefix marking a countdown line in exported markdown. Such lines are
/// dropped on import; countdowns never come back from text.
pub const TIMER_PREFIX: &str = "⏱";

/// Parse markdown into a note document.
///
/// Understands `#` headings, `- [ ]` / `- [x]` task lines (two-space indent
/// per level, one nested level kept), indented continuation paragraphs
/// inside tasks, and plain paragraphs. Anything else is kept as a
/// paragraph of its own.
pub fn parse_note(text: &str) -> Node {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::new();
    let mut idx = 0;

    while idx < lines.len() {
        let line = lines[idx];
        if line.trim().is_empty() || is_timer_line(line) {
            idx += 1;
            continue;
        }
        if let Some(task) = parse_task_line(line)
            && task.indent == 0
        {
            let (items, next) = parse_items(&lines, idx, 0, 0);
            blocks.push(Node::task_list(items));
            idx = next;
            continue;
        }
        if let Some((level, heading)) = parse_heading(line) {
            blocks.push(Node::heading(level, heading));
        } else {
            blocks.push(Node::paragraph(line.trim()));
        }
        idx += 1;
    }

    if blocks.is_empty() {
        blocks.push(Node::paragraph(""));
    }
    Node::doc(blocks)
}

struct TaskLine<'a> {
    indent: usize,
    checked: bool,
    text: &'a str,
}

fn parse_task_line(line: &str) -> Option<TaskLine<'_>> {
    let trimmed = line.trim_start_matches(' ');
    let indent = line.len() - trimmed.len();
    let rest = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))?;
    let (checked, text) = if let Some(t) = rest.strip_prefix("[ ]") {
        (false, t)
    } else if let Some(t) = rest
        .strip_prefix("[x]")
        .or_else(|| rest.strip_prefix("[X]"))
    {
        (true, t)
    } else {
        return None;
    };
    Some(TaskLine {
        indent,
        checked,
        text: text.strip_prefix(' ').unwrap_or(text),
    })
}

fn parse_heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = line[hashes..].strip_prefix(' ')?;
    Some((hashes as u8, rest.trim()))
}

fn is_timer_line(line: &str) -> bool {
    line.trim_start().starts_with(TIMER_PREFIX)
}

fn count_indent(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Parse task items at `indent` starting at `start`. Returns the items and
/// the index of the first line not consumed.
fn parse_items(lines: &[&str], start: usize, indent: usize, depth: usize) -> (Vec<Node>, usize) {
    let mut items = Vec::new();
    let mut idx = start;

    while idx < lines.len() {
        let line = lines[idx];
        if is_timer_line(line) {
            idx += 1;
            continue;
        }
        let Some(task) = parse_task_line(line) else {
            break;
        };
        if task.indent < indent {
            break;
        }
        if task.indent > indent {
            // deeper than anything we keep: flatten into this level
            if depth >= 1 || items.is_empty() {
                items.push(Node::task_item(task.checked, task.text));
                idx += 1;
                continue;
            }
            break;
        }

        let mut item = Node::task_item(task.checked, task.text);
        idx += 1;

        // continuation paragraphs, then subtasks
        while idx < lines.len() {
            let next = lines[idx];
            if next.trim().is_empty()
                || parse_task_line(next).is_some()
                || is_timer_line(next)
                || count_indent(next) < indent + 2
            {
                break;
            }
            item.content.push(Node::paragraph(next.trim()));
            idx += 1;
        }
        if depth == 0
            && let Some(sub) = lines.get(idx).and_then(|l| parse_task_line(l))
            && sub.indent > indent
        {
            let (children, next) = parse_items(lines, idx, sub.indent, depth + 1);
            item.content.push(Node::task_list(children));
            idx = next;
        }
        items.push(item);
    }

    (items, idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_blocks() {
        let doc = parse_note("# Today\n\nRemember the keys\n\n- [ ] Buy milk\n- [x] Walk dog\n");
        assert_eq!(
            doc,
            Node::doc(vec![
                Node::heading(1, "Today"),
                Node::paragraph("Remember the keys"),
                Node::task_list(vec![
                    Node::task_item(false, "Buy milk"),
                    Node::task_item(true, "Walk dog"),
                ]),
            ])
        );
    }

    #[test]
    fn test_parse_nested_and_continuation() {
        let doc = parse_note("- [ ] Errands\n  at lunch\n  - [x] Bank\n  - [ ] Post\n- [ ] Gym\n");
        let mut errands = Node::task_item(false, "Errands");
        errands.content.push(Node::paragraph("at lunch"));
        errands.content.push(Node::task_list(vec![
            Node::task_item(true, "Bank"),
            Node::task_item(false, "Post"),
        ]));
        assert_eq!(
            doc,
            Node::doc(vec![Node::task_list(vec![
                errands,
                Node::task_item(false, "Gym")
            ])])
        );
    }

    #[test]
    fn test_deep_nesting_flattened() {
        let doc = parse_note("- [ ] a\n  - [ ] b\n    - [ ] c\n");
        let mut a = Node::task_item(false, "a");
        a.content.push(Node::task_list(vec![
            Node::task_item(false, "b"),
            Node::task_item(false, "c"),
        ]));
        assert_eq!(doc, Node::doc(vec![Node::task_list(vec![a])]));
    }

    #[test]
    fn test_timer_lines_dropped() {
        let doc = parse_note("- [ ] Walk dog\n  ⏱ 4:59\n- [ ] Gym\n");
        assert_eq!(
            doc,
            Node::doc(vec![Node::task_list(vec![
                Node::task_item(false, "Walk dog"),
                Node::task_item(false, "Gym"),
            ])])
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_note(""), Node::doc(vec![Node::paragraph("")]));
        assert_eq!(parse_note("#hashtag"), Node::doc(vec![Node::paragraph("#hashtag")]));
    }
}
