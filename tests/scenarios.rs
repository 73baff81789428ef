//! End-to-end behavior of the editing core through the library API:
//! reordering, the single countdown slot, search highlighting and
//! finding a countdown's task after edits.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tasknote::doc::{Document, LineLayout};
use tasknote::io::host::{HostError, HostServices};
use tasknote::model::{Mark, Node, TimerAttrs, TimerToken};
use tasknote::ops::countdown::{
    CountdownContext, CountdownCoordinator, CountdownHooks, CountdownPhase, CountdownSettings, CountdownState,
};
use tasknote::ops::reorder::{DragData, DragSession, ReorderEngine, ReorderOutcome, move_task};
use tasknote::ops::search::{Direction, SearchOverlay};
use tasknote::ops::task_ops::{find_by_text, insert_text, task_items};
use tasknote::ops::task_timer::{scroll_to_todo, start_timer};

struct Silent;

impl HostServices for Silent {
    fn notify(&mut self, _title: &str, _body: &str) -> Result<(), HostError> {
        Ok(())
    }
    fn play_sound(&mut self, _name: &str) -> Result<(), HostError> {
        Ok(())
    }
}

fn errands() -> Document {
    Document::new(Node::doc(vec![Node::task_list(vec![
        Node::task_item(false, "Buy milk"),
        Node::task_item(false, "Walk dog"),
        Node::task_item(false, "Email Bob"),
    ])]))
    .unwrap()
}

fn texts(doc: &Document) -> Vec<String> {
    task_items(doc.root()).into_iter().map(|t| t.text).collect()
}

fn timer_positions(doc: &Document) -> Vec<usize> {
    let mut out = Vec::new();
    doc.descendants(&mut |node, pos, _| {
        if node.is_timer() {
            out.push(pos);
        }
        true
    });
    out
}

// ---------------------------------------------------------------------------
// Reorder
// ---------------------------------------------------------------------------

#[test]
fn test_drop_on_own_position_leaves_tree_unchanged() {
    let mut doc = errands();
    let before = doc.root().clone();
    for i in 0..3 {
        assert_eq!(move_task(&mut doc, i, i).unwrap(), ReorderOutcome::NoOp);
        // the gap right after an item is also its own position
        assert_eq!(move_task(&mut doc, i, i + 1).unwrap(), ReorderOutcome::NoOp);
    }
    assert_eq!(doc.root(), &before);
}

#[test]
fn test_every_move_keeps_all_items() {
    for source in 0..3 {
        for target in 0..=3 {
            let mut doc = errands();
            let moved = texts(&doc)[source].clone();
            move_task(&mut doc, source, target).unwrap();
            let after = texts(&doc);
            assert_eq!(after.len(), 3, "{} -> {}", source, target);
            let mut sorted = after.clone();
            sorted.sort();
            assert_eq!(sorted, vec!["Buy milk", "Email Bob", "Walk dog"]);
            assert_eq!(after.iter().filter(|t| **t == moved).count(), 1);
        }
    }
}

#[test]
fn test_drag_first_into_lower_half_of_last() {
    let mut doc = errands();
    let layout = LineLayout::build(doc.root()).with_viewport(0, 0, 10, 0);
    let engine = ReorderEngine::new(Rc::new(RefCell::new(DragSession::default())));
    let mut data = DragData::default();
    engine.drag_start(0, &mut data);

    // row 2 is "Email Bob"; column 12 is past the middle of its text
    let outcome = engine.drop(&mut doc, &layout, 12, 2, Some(&data)).unwrap();
    assert_eq!(outcome, ReorderOutcome::Moved { from: 0, to: 2 });
    assert_eq!(texts(&doc), vec!["Walk dog", "Email Bob", "Buy milk"]);
    assert!(!engine.session().borrow().is_active());
}

#[test]
fn test_drag_below_list_with_nested_last_item() {
    let mut walk = Node::task_item(false, "Walk dog");
    walk.content.push(Node::task_list(vec![Node::task_item(false, "Leash")]));
    let mut doc = Document::new(Node::doc(vec![
        Node::task_list(vec![Node::task_item(false, "Buy milk"), walk]),
        Node::paragraph("notes"),
    ]))
    .unwrap();
    let layout = LineLayout::build(doc.root()).with_viewport(0, 0, 10, 0);
    let engine = ReorderEngine::new(Rc::new(RefCell::new(DragSession::default())));
    let mut data = DragData::default();
    engine.drag_start(0, &mut data);

    // row 3 is the paragraph under the list
    let outcome = engine.drop(&mut doc, &layout, 0, 3, Some(&data)).unwrap();
    assert_eq!(outcome, ReorderOutcome::Moved { from: 0, to: 2 });
    let outline: Vec<(String, usize)> = task_items(doc.root())
        .into_iter()
        .map(|t| (t.text, t.depth))
        .collect();
    assert_eq!(
        outline,
        vec![
            ("Walk dog".to_string(), 0),
            ("Leash".to_string(), 1),
            ("Buy milk".to_string(), 0),
        ]
    );
}

#[test]
fn test_drop_outside_note_changes_nothing() {
    let mut doc = errands();
    let before = doc.root().clone();
    let layout = LineLayout::build(doc.root()).with_viewport(0, 0, 10, 0);
    let engine = ReorderEngine::new(Rc::new(RefCell::new(DragSession::default())));
    let mut data = DragData::default();
    engine.drag_start(1, &mut data);

    assert!(engine.drop(&mut doc, &layout, 0, 7, Some(&data)).is_err());
    assert!(!engine.session().borrow().is_active());
    assert_eq!(doc.root(), &before);
}

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

#[test]
fn test_second_countdown_takes_over() {
    let mut doc = errands();
    let mut coordinator = CountdownCoordinator::default();
    let now = Instant::now();
    let milk = find_by_text(doc.root(), "Buy milk").unwrap().pos;
    start_timer(&mut doc, &mut coordinator, milk, 60, now).unwrap();
    let dog = find_by_text(doc.root(), "Walk dog").unwrap().pos;
    let second = start_timer(&mut doc, &mut coordinator, dog, 300, now).unwrap();

    assert_eq!(coordinator.owner(), Some(second));
    assert_eq!(coordinator.current().unwrap().task_description, "Walk dog");
    let milk = find_by_text(doc.root(), "Buy milk").unwrap();
    assert_eq!(milk.attrs.countdown_seconds, None);
    assert_eq!(timer_positions(&doc).len(), 1);
}

#[derive(Clone, Default)]
struct Cancels(Rc<RefCell<Vec<String>>>);

struct Recording(Cancels);

impl CountdownHooks for Recording {
    fn on_cancel(&mut self, state: &CountdownState, _ctx: &mut CountdownContext<'_>) {
        self.0.0.borrow_mut().push(state.task_description.clone());
    }
    fn on_expire(&mut self, _state: &CountdownState, _ctx: &mut CountdownContext<'_>) {}
    fn on_complete(&mut self, _state: &CountdownState, _ctx: &mut CountdownContext<'_>) -> bool {
        false
    }
}

#[test]
fn test_takeover_does_not_cancel() {
    let mut doc = errands();
    let mut host = Silent;
    let mut coordinator = CountdownCoordinator::default();
    let cancels = Cancels::default();
    let now = Instant::now();

    coordinator.start(
        TimerToken::next(),
        CountdownState::new(60, "Buy milk", 1),
        Box::new(Recording(cancels.clone())),
        now,
    );
    coordinator.start(
        TimerToken::next(),
        CountdownState::new(300, "Walk dog", 13),
        Box::new(Recording(cancels.clone())),
        now,
    );
    assert!(cancels.0.borrow().is_empty());

    let mut ctx = CountdownContext {
        doc: &mut doc,
        host: &mut host,
    };
    assert!(coordinator.cancel(&mut ctx));
    assert_eq!(*cancels.0.borrow(), vec!["Walk dog".to_string()]);
}

#[test]
fn test_countdown_completes_then_clears() {
    let mut doc = errands();
    let mut host = Silent;
    let settings = CountdownSettings {
        grace: Duration::from_secs(10),
        sound: String::new(),
        notify: true,
    };
    let mut coordinator = CountdownCoordinator::new(settings);
    let t0 = Instant::now();
    let dog = find_by_text(doc.root(), "Walk dog").unwrap().pos;
    start_timer(&mut doc, &mut coordinator, dog, 300, t0).unwrap();

    let mut ctx = CountdownContext {
        doc: &mut doc,
        host: &mut host,
    };
    coordinator.advance(t0 + Duration::from_secs(299), &mut ctx);
    assert_eq!(coordinator.current().unwrap().seconds, 1);
    coordinator.advance(t0 + Duration::from_secs(300), &mut ctx);
    assert_eq!(coordinator.current().unwrap().phase, CountdownPhase::Completed);
    assert!(find_by_text(ctx.doc.root(), "Walk dog").unwrap().attrs.checked);

    coordinator.advance(t0 + Duration::from_secs(309), &mut ctx);
    assert!(coordinator.current().is_some());
    coordinator.advance(t0 + Duration::from_secs(310), &mut ctx);
    assert!(coordinator.current().is_none());
    assert!(timer_positions(&doc).is_empty());
}

#[test]
fn test_stale_position_found_by_description() {
    // the snapshot points at "Buy milk", as if a task had been inserted above
    let doc = Document::new(Node::doc(vec![Node::task_list(vec![
        Node::task_item(false, "Buy milk"),
        Node::task_item(false, "Walk dog"),
        Node::countdown_timer(TimerAttrs::new(300, "Walk dog", 1, None)),
    ])]))
    .unwrap();
    let timer = timer_positions(&doc)[0];
    let dog = find_by_text(doc.root(), "Walk dog").unwrap().pos;
    assert_eq!(scroll_to_todo(doc.root(), timer), Some(dog));
}

#[test]
fn test_owner_found_after_edit_above() {
    let mut doc = errands();
    let mut coordinator = CountdownCoordinator::default();
    let dog = find_by_text(doc.root(), "Walk dog").unwrap().pos;
    start_timer(&mut doc, &mut coordinator, dog, 300, Instant::now()).unwrap();

    let milk = find_by_text(doc.root(), "Buy milk").unwrap().pos;
    insert_text(&mut doc, milk + 2, "Oat ").unwrap();
    let timer = timer_positions(&doc)[0];
    let dog = find_by_text(doc.root(), "Walk dog").unwrap().pos;
    assert_eq!(scroll_to_todo(doc.root(), timer), Some(dog));
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

fn search_marks(doc: &Document) -> Vec<String> {
    let mut out = Vec::new();
    doc.descendants(&mut |node, _, _| {
        for mark in &node.marks {
            if let Mark::SearchMatch { query, .. } = mark {
                out.push(query.clone());
            }
        }
        true
    });
    out
}

#[test]
fn test_new_query_clears_old_highlights() {
    let mut doc = errands();
    let mut search = SearchOverlay::default();
    assert_eq!(search.search(&mut doc, "o").unwrap(), 2);
    search.search(&mut doc, "milk").unwrap();
    let marks = search_marks(&doc);
    assert_eq!(marks, vec!["milk".to_string()]);

    search.close(&mut doc).unwrap();
    assert!(search_marks(&doc).is_empty());
}

#[test]
fn test_navigate_cycles() {
    let mut doc = Document::new(Node::doc(vec![
        Node::paragraph("Walk dog"),
        Node::paragraph("Buy dog food"),
    ]))
    .unwrap();
    let version = doc.content_version();
    let mut search = SearchOverlay::default();
    assert_eq!(search.search(&mut doc, "dog").unwrap(), 2);
    let ranges: Vec<(usize, usize)> = search.matches().iter().map(|m| (m.from, m.to)).collect();
    assert_eq!(ranges, vec![(5, 8), (13, 16)]);

    assert_eq!(search.active(), Some(0));
    search.navigate(&mut doc, Direction::Next).unwrap();
    assert_eq!(search.active(), Some(1));
    search.navigate(&mut doc, Direction::Next).unwrap();
    assert_eq!(search.active(), Some(0));
    assert_eq!(search_marks(&doc).len(), 2);
    assert_eq!(doc.content_version(), version);
}
