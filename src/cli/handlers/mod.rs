mod config;
pub use config::cmd_config;

use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::Instant;

use chrono::{NaiveDate, NaiveTime};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::doc::Document;
use crate::io::calendar_store::{LocalCalendar, default_calendar_path};
use crate::io::config_io::{self, ConfigError};
use crate::io::host::TerminalHost;
use crate::io::note_io::{self, expand_home};
use crate::model::{AppConfig, Node, format_clock, parse_duration};
use crate::ops::calendar::{sync_task, unsync_task};
use crate::ops::countdown::{CountdownContext, CountdownCoordinator, CountdownEvent, CountdownSettings};
use crate::ops::reorder::{ReorderOutcome, move_task};
use crate::ops::search::find_matches;
use crate::ops::task_ops::{self, task_by_index, task_items};
use crate::ops::task_timer::start_timer;
use crate::parse::{parse_note, serialize_note};

/// Where the config and note live, resolved once from the global flags
#[derive(Debug, Clone)]
pub struct NoteEnv {
    pub config_path: PathBuf,
    pub config: AppConfig,
    pub note_path: PathBuf,
}

impl NoteEnv {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let config_path = cli
            .config
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(config_io::default_config_path);
        let config = config_io::load_config(&config_path)?;
        let explicit = cli.note.as_deref().map(expand_home);
        let note_path = note_io::resolve_note_path(&config, explicit.as_deref());
        Ok(NoteEnv {
            config_path,
            config,
            note_path,
        })
    }

    pub fn calendar_path(&self) -> PathBuf {
        match &self.config.calendar.path {
            Some(path) => expand_home(path),
            None => default_calendar_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli, env: &NoteEnv) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;

    match cli.command {
        None => crate::tui::run(env),
        Some(cmd) => match cmd {
            // Read commands
            Commands::List => cmd_list(env, json),
            Commands::Search(args) => cmd_search(env, args, json),
            Commands::Export => cmd_export(env),

            // Write commands
            Commands::Add(args) => cmd_add(env, args),
            Commands::Check(args) => cmd_check(env, args),
            Commands::Edit(args) => cmd_edit(env, args),
            Commands::Rm(args) => cmd_rm(env, args),
            Commands::Mv(args) => cmd_mv(env, args),
            Commands::Import(args) => cmd_import(env, args),

            // Timer and calendar
            Commands::Timer(args) => cmd_timer(env, args, json),
            Commands::Sync(args) => cmd_sync(env, args, json),
            Commands::Unsync(args) => cmd_unsync(env, args),

            Commands::Config(cmd) => cmd_config(cmd, &env.config_path),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load(env: &NoteEnv) -> Result<Document, Box<dyn std::error::Error>> {
    Ok(note_io::load_note(&env.note_path)?)
}

fn save(env: &NoteEnv, doc: &Document) -> Result<(), Box<dyn std::error::Error>> {
    note_io::save_note(&env.note_path, doc)?;
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD)", s))
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| format!("invalid time '{}' (expected HH:MM)", s))
}

/// `mv` takes the index the task should end up at; the reorder engine
/// wants the insertion index counted before the source is removed.
fn insertion_target(doc: &Document, from: usize, to: usize) -> Result<usize, Box<dyn std::error::Error>> {
    let items = task_items(doc.root());
    let src = task_by_index(doc.root(), from)?;
    let target = if to > from { to + src.subtree_len() } else { to };
    Ok(target.min(items.len()))
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(env: &NoteEnv, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load(env)?;
    let tasks = task_items(doc.root());
    if json {
        return print_json(&TaskListJson {
            tasks: tasks.iter().map(task_to_json).collect(),
        });
    }
    if tasks.is_empty() {
        println!("no tasks");
        return Ok(());
    }
    for task in &tasks {
        println!("{}", format_task_line(task));
    }
    Ok(())
}

fn cmd_search(env: &NoteEnv, args: SearchArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load(env)?;
    let flat = doc.flat_text();
    let matches: Vec<SearchMatchJson> = find_matches(&flat.text, &args.query)
        .iter()
        .map(|m| match_to_json(&flat.text, m, flat.start_pos(m.from)))
        .collect();
    if json {
        return print_json(&SearchJson {
            query: args.query,
            matches,
        });
    }
    if matches.is_empty() {
        println!("no matches for '{}'", args.query);
        return Ok(());
    }
    for m in &matches {
        println!("{:>5}  {}", m.from, m.line);
    }
    Ok(())
}

fn cmd_export(env: &NoteEnv) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load(env)?;
    print!("{}", serialize_note(doc.root()));
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(env: &NoteEnv, args: AddArgs) -> Result<(), Box<dyn std::error::Error>> {
    let text = args.text.trim();
    if text.is_empty() {
        return Err("task text is empty".into());
    }
    let mut doc = load(env)?;
    let index = task_ops::add_task(&mut doc, text, args.under)?;
    save(env, &doc)?;
    println!("{}  [ ] {}", index, text);
    Ok(())
}

fn cmd_check(env: &NoteEnv, args: IndexArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = load(env)?;
    let checked = task_ops::toggle_checked(&mut doc, args.index)?;
    save(env, &doc)?;
    let task = task_by_index(doc.root(), args.index)?;
    println!("{}  {} {}", task.index, if checked { "[x]" } else { "[ ]" }, task.text);
    Ok(())
}

fn cmd_edit(env: &NoteEnv, args: EditArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = load(env)?;
    task_ops::set_task_text(&mut doc, args.index, &args.text)?;
    save(env, &doc)?;
    println!("{}  {}", args.index, args.text);
    Ok(())
}

fn cmd_rm(env: &NoteEnv, args: IndexArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = load(env)?;
    let task = task_by_index(doc.root(), args.index)?;
    task_ops::delete_task(&mut doc, args.index)?;
    save(env, &doc)?;
    println!("deleted {}", task.text);
    Ok(())
}

fn cmd_mv(env: &NoteEnv, args: MvArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = load(env)?;
    let target = insertion_target(&doc, args.from, args.to)?;
    match move_task(&mut doc, args.from, target)? {
        ReorderOutcome::NoOp => println!("already at {}", args.from),
        ReorderOutcome::Moved { from, to } => {
            save(env, &doc)?;
            println!("moved {} -> {}", from, to);
        }
    }
    Ok(())
}

fn cmd_import(env: &NoteEnv, args: ImportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let text = if args.file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.file).map_err(|e| format!("cannot read {}: {}", args.file, e))?
    };
    let imported = parse_note(&text);

    let current = load(env)?;
    let blank = current.root().text_content().trim().is_empty() && task_items(current.root()).is_empty();
    let root = if args.replace || blank {
        imported
    } else {
        let mut content = current.persistent_root().content;
        content.extend(imported.content);
        Node::doc(content)
    };
    let doc = Document::new(root)?;
    save(env, &doc)?;
    println!("imported {} tasks", task_items(doc.root()).len());
    Ok(())
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// Run a countdown in the foreground. The note is written once, after the
/// countdown finishes and its task has been checked off; interrupting the
/// command leaves the note as it was.
fn cmd_timer(env: &NoteEnv, args: TimerArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let seconds = parse_duration(&args.duration)?;
    let mut doc = load(env)?;
    let task = task_by_index(doc.root(), args.index)?;
    let mut coordinator = CountdownCoordinator::new(CountdownSettings::from_config(&env.config.timer));
    // the bell would corrupt JSON on stdout
    let mut host = TerminalHost::new(!json);

    let owner = start_timer(&mut doc, &mut coordinator, task.pos, seconds, Instant::now())?;
    let mut auto_checked = false;
    let mut stderr = std::io::stderr();
    if !json {
        let _ = write!(stderr, "\r⏱ {}  {}", format_clock(seconds), task.text);
    }

    while let Some(deadline) = coordinator.next_deadline() {
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        let mut ctx = CountdownContext {
            doc: &mut doc,
            host: &mut host,
        };
        let mut done = false;
        for event in coordinator.advance(Instant::now(), &mut ctx) {
            match event {
                CountdownEvent::Tick { seconds, .. } if !json => {
                    let _ = write!(stderr, "\r⏱ {}  {}", format_clock(seconds), task.text);
                    let _ = stderr.flush();
                }
                CountdownEvent::Completed { auto_checked: checked, .. } => {
                    auto_checked = checked;
                    done = true;
                }
                _ => {}
            }
        }
        if done {
            coordinator.dismiss(&mut ctx);
            break;
        }
    }
    log::debug!("event=cli_timer_done owner={} auto_checked={}", owner, auto_checked);
    save(env, &doc)?;

    if json {
        return print_json(&TimerResultJson {
            task: task.text,
            seconds,
            auto_checked,
        });
    }
    let _ = writeln!(stderr);
    match host.take_notification() {
        Some(n) => println!("{}: {}", n.title, n.body),
        None => println!("done: {}", task.text),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

fn cmd_sync(env: &NoteEnv, args: SyncArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let date = parse_date(&args.date)?;
    let time = parse_time(&args.time)?;
    let mut doc = load(env)?;
    let task = task_by_index(doc.root(), args.index)?;
    let mut calendar = LocalCalendar::open(&env.calendar_path())?;
    let event = sync_task(&mut doc, &mut calendar, task.pos, date, time)?;
    save(env, &doc)?;
    if json {
        return print_json(&calendar_to_json(&event));
    }
    println!(
        "{} on {} {} ({})",
        task.text,
        event.date.format("%Y-%m-%d"),
        event.time.format("%H:%M"),
        event.event_id
    );
    Ok(())
}

fn cmd_unsync(env: &NoteEnv, args: IndexArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = load(env)?;
    let task = task_by_index(doc.root(), args.index)?;
    let mut calendar = LocalCalendar::open(&env.calendar_path())?;
    unsync_task(&mut doc, &mut calendar, task.pos)?;
    save(env, &doc)?;
    println!("{} removed from calendar", task.text);
    Ok(())
}
