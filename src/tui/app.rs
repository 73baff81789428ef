use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    Event, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::cli::handlers::NoteEnv;
use crate::doc::layout::{LayoutLine, LineKind, LineLayout};
use crate::doc::Document;
use crate::io::host::TerminalHost;
use crate::io::note_io::{load_note, parse_note_json, save_note};
use crate::io::watcher::NoteWatcher;
use crate::model::AppConfig;
use crate::ops::countdown::{CountdownContext, CountdownCoordinator, CountdownEvent, CountdownSettings};
use crate::ops::reorder::{DragData, DragSession, DropIndicator, ReorderEngine};
use crate::ops::scheduler::Scheduler;
use crate::ops::search::SearchOverlay;
use crate::ops::task_ops::{OutlineEntry, TaskRef, heading_outline, task_at};
use crate::ops::task_timer::{reconcile, scroll_to_todo};

use super::input;
use super::render;
use super::theme::Theme;

/// Longest the event loop sleeps when nothing is scheduled
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Current interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Navigate,
    /// Typing into the selected block
    Edit,
    /// Typing a search query
    Search,
    /// Choosing a countdown duration
    TimerPrompt,
}

/// Delayed work owned by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Autosave,
    SearchScroll,
    Outline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

/// A mouse drag in progress
#[derive(Debug, Clone)]
pub struct DragState {
    pub data: DragData,
    pub indicator: Option<DropIndicator>,
}

/// Main application state
pub struct App {
    pub doc: Document,
    pub config: AppConfig,
    /// `None` when nothing should be written (tests)
    pub note_path: Option<PathBuf>,
    pub theme: Theme,
    pub mode: Mode,
    pub should_quit: bool,
    pub show_help: bool,
    pub coordinator: CountdownCoordinator,
    pub search: SearchOverlay,
    pub reorder: ReorderEngine,
    pub drag: Option<DragState>,
    pub jobs: Scheduler<Job>,
    pub host: TerminalHost,
    /// Layout of the last draw; mouse events resolve against it
    pub layout: LineLayout,
    /// Selected line
    pub cursor_line: usize,
    /// Caret position while editing
    pub edit_pos: usize,
    pub scroll: usize,
    pub search_input: String,
    pub timer_input: String,
    pub preset_cursor: usize,
    pub status: Option<StatusMessage>,
    pub outline: Vec<OutlineEntry>,
    pub(super) pending_reveal: Option<usize>,
    watcher: Option<NoteWatcher>,
    saved_version: u64,
    last_written: Option<String>,
}

impl App {
    pub fn new(doc: Document, config: AppConfig, note_path: Option<PathBuf>) -> Self {
        let coordinator = CountdownCoordinator::new(CountdownSettings::from_config(&config.timer));
        let layout = LineLayout::build(doc.root());
        let outline = heading_outline(doc.root());
        let saved_version = doc.content_version();
        App {
            theme: Theme::from_config(&config.ui),
            host: TerminalHost::new(true),
            doc,
            config,
            note_path,
            mode: Mode::Navigate,
            should_quit: false,
            show_help: false,
            coordinator,
            search: SearchOverlay::default(),
            reorder: ReorderEngine::new(Rc::new(RefCell::new(DragSession::default()))),
            drag: None,
            jobs: Scheduler::new(),
            layout,
            cursor_line: 0,
            edit_pos: 0,
            scroll: 0,
            search_input: String::new(),
            timer_input: String::new(),
            preset_cursor: 0,
            status: None,
            outline,
            pending_reveal: None,
            watcher: None,
            saved_version,
            last_written: None,
        }
    }

    /// Unsaved edits exist. Search highlighting does not count.
    pub fn is_dirty(&self) -> bool {
        self.doc.content_version() != self.saved_version
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: false,
        });
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: true,
        });
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    pub fn selected_line(&self) -> Option<&LayoutLine> {
        self.layout.lines.get(self.cursor_line)
    }

    /// Task on the selected line. A timer line selects the task it counts
    /// down for.
    pub fn selected_task(&self) -> Option<TaskRef> {
        let line = self.selected_line()?;
        let task_pos = match line.kind {
            LineKind::Task { task_pos, .. } | LineKind::TaskContinuation { task_pos, .. } => task_pos,
            LineKind::Timer => scroll_to_todo(self.doc.root(), line.block_pos)?,
            LineKind::Paragraph | LineKind::Heading(_) => return None,
        };
        task_at(self.doc.root(), task_pos)
    }

    /// Rebuild the layout from the document, keeping the viewport
    pub fn refresh_layout(&mut self) {
        let LineLayout {
            origin_x,
            origin_y,
            height,
            ..
        } = self.layout;
        self.layout = LineLayout::build(self.doc.root()).with_viewport(origin_x, origin_y, height, self.scroll);
        self.cursor_line = self.cursor_line.min(self.layout.lines.len().saturating_sub(1));
    }

    /// Select the line showing `pos` and scroll it into view
    pub fn reveal_pos(&mut self, pos: usize) {
        if let Some(idx) = self.layout.line_of_pos(pos) {
            self.cursor_line = idx;
            self.scroll = self.layout.scroll_to_reveal(idx);
            self.layout.scroll = self.scroll;
        }
    }

    pub fn select_task_pos(&mut self, task_pos: usize) {
        if let Some(idx) = self.layout.line_of_task(task_pos) {
            self.cursor_line = idx;
        }
    }

    // -----------------------------------------------------------------------
    // Document updates
    // -----------------------------------------------------------------------

    /// Run after every document change: reconcile countdown state with
    /// the nodes, then debounce autosave and the heading recount.
    pub fn after_edit(&mut self, now: Instant) {
        match reconcile(&mut self.doc, &mut self.coordinator) {
            Ok(report) if report.unregistered => self.set_status("countdown removed with its task"),
            Ok(_) => {}
            Err(e) => log::warn!("event=reconcile status=failed reason=\"{}\"", e),
        }
        self.refresh_layout();
        if self.is_dirty() {
            self.jobs.schedule(
                Job::Autosave,
                now + Duration::from_millis(self.config.autosave.debounce_ms),
            );
        }
        self.jobs.schedule(
            Job::Outline,
            now + Duration::from_millis(self.config.ui.outline_debounce_ms),
        );
    }

    /// Drive countdowns and due jobs up to `now`
    pub fn tick(&mut self, now: Instant) {
        let version = self.doc.content_version();
        let mut ctx = CountdownContext {
            doc: &mut self.doc,
            host: &mut self.host,
        };
        let events = self.coordinator.advance(now, &mut ctx);
        for event in &events {
            match event {
                CountdownEvent::Completed { .. } => {
                    if let Some(n) = self.host.take_notification() {
                        self.set_status(format!("{}: {}", n.title, n.body));
                    }
                }
                CountdownEvent::Expired { .. } => log::debug!("event=tui_countdown_hidden"),
                CountdownEvent::Tick { .. } => {}
            }
        }
        if self.doc.content_version() != version {
            self.after_edit(now);
        }

        while let Some((job, _)) = self.jobs.pop_due(now) {
            match job {
                Job::Autosave => self.save(),
                Job::SearchScroll => {
                    if let Some(pos) = self.pending_reveal.take() {
                        self.reveal_pos(pos);
                    }
                }
                Job::Outline => self.outline = heading_outline(self.doc.root()),
            }
        }
    }

    /// How long the event loop may wait for input
    pub fn next_wakeup(&self, now: Instant) -> Duration {
        [self.coordinator.next_deadline(), self.jobs.next_deadline()]
            .into_iter()
            .flatten()
            .min()
            .map_or(IDLE_POLL, |at| at.saturating_duration_since(now).min(IDLE_POLL))
    }

    // -----------------------------------------------------------------------
    // Disk
    // -----------------------------------------------------------------------

    pub fn save(&mut self) {
        self.jobs.cancel(&Job::Autosave);
        let Some(path) = self.note_path.clone() else {
            self.saved_version = self.doc.content_version();
            return;
        };
        match save_note(&path, &self.doc) {
            Ok(json) => {
                self.saved_version = self.doc.content_version();
                self.last_written = Some(json);
            }
            Err(e) => {
                log::error!("event=autosave status=failed reason=\"{}\"", e);
                self.set_error(format!("save failed: {}", e));
            }
        }
    }

    pub fn watch(&mut self) {
        let Some(path) = &self.note_path else {
            return;
        };
        match NoteWatcher::start(path) {
            Ok(w) => self.watcher = Some(w),
            Err(e) => log::warn!("event=watch status=failed reason=\"{}\"", e),
        }
    }

    /// Reload the note if another process rewrote it. Local edits that
    /// have not been saved yet win; our own writes are recognised and
    /// ignored.
    pub fn check_external_change(&mut self) {
        let changed = self.watcher.as_ref().is_some_and(|w| w.poll());
        let Some(path) = self.note_path.clone().filter(|_| changed) else {
            return;
        };
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                log::debug!("event=reload status=skipped reason=\"{}\"", e);
                return;
            }
        };
        if self.last_written.as_deref() == Some(content.as_str()) {
            return;
        }
        if self.is_dirty() {
            self.set_error("note changed on disk; keeping local edits");
            return;
        }
        match parse_note_json(&path, &content) {
            Ok(doc) => {
                self.coordinator.teardown();
                self.search = SearchOverlay::default();
                self.doc = doc;
                self.saved_version = self.doc.content_version();
                self.last_written = Some(content);
                self.refresh_layout();
                self.outline = heading_outline(self.doc.root());
                self.jobs.cancel_all();
                self.set_status("reloaded from disk");
                log::info!("event=reload path={}", path.display());
            }
            Err(e) => self.set_error(format!("reload failed: {}", e)),
        }
    }

    /// Flush pending edits and stop every timer
    pub fn shutdown(&mut self) {
        if self.is_dirty() {
            self.save();
        }
        self.jobs.cancel_all();
        self.coordinator.teardown();
    }
}

/// Run the TUI application
pub fn run(env: &NoteEnv) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load_note(&env.note_path)?;
    let mut app = App::new(doc, env.config.clone(), Some(env.note_path.clone()));
    app.watch();
    log::info!("event=tui_start note={}", env.note_path.display());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Install panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(
            io::stdout(),
            DisableBracketedPaste,
            DisableMouseCapture,
            LeaveAlternateScreen
        );
        original_hook(panic_info);
    }));

    let result = run_event_loop(&mut terminal, &mut app);
    app.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|frame| render::render(frame, app))?;

        if event::poll(app.next_wakeup(Instant::now()))? {
            let now = Instant::now();
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => input::handle_key(app, key, now),
                Event::Mouse(mouse) => input::handle_mouse(app, mouse, now),
                Event::Paste(text) => input::handle_paste(app, &text, now),
                _ => {}
            }
        }

        let now = Instant::now();
        app.tick(now);
        app.check_external_change();

        if app.should_quit {
            break;
        }
    }
    Ok(())
}
