use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tn", about = concat!("tasknote v", env!("CARGO_PKG_VERSION"), " - a sticky note with timers"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Note file to use instead of the configured one
    #[arg(short = 'f', long = "note", global = true, env = "TASKNOTE_NOTE")]
    pub note: Option<String>,

    /// Config file to use
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tasks with their index
    List,
    /// Add a task at the end, or as a subtask
    Add(AddArgs),
    /// Toggle a task's checkbox
    Check(IndexArgs),
    /// Change a task's text
    Edit(EditArgs),
    /// Delete a task and its subtasks
    Rm(IndexArgs),
    /// Move a task to another position
    Mv(MvArgs),
    /// Find text in the note
    Search(SearchArgs),
    /// Run a countdown for a task in the foreground; checks it off when done
    Timer(TimerArgs),
    /// Import a markdown file into the note
    Import(ImportArgs),
    /// Print the note as markdown
    Export,
    /// Put a task on the calendar
    Sync(SyncArgs),
    /// Take a task off the calendar
    Unsync(IndexArgs),
    /// Read or change configuration
    Config(ConfigCmd),
}

#[derive(Args)]
pub struct IndexArgs {
    /// Task index as shown by `tn list`
    pub index: usize,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task text
    pub text: String,
    /// Add as a subtask of this task index
    #[arg(long)]
    pub under: Option<usize>,
}

#[derive(Args)]
pub struct EditArgs {
    pub index: usize,
    /// New text
    pub text: String,
}

#[derive(Args)]
pub struct MvArgs {
    /// Task to move
    pub from: usize,
    /// Index the task should end up at
    pub to: usize,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Text to look for (case-insensitive, literal)
    pub query: String,
}

#[derive(Args)]
pub struct TimerArgs {
    pub index: usize,
    /// Duration: seconds, or with a unit (90s, 25m, 1h)
    pub duration: String,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Markdown file to read ("-" for stdin)
    pub file: String,
    /// Replace the note instead of appending
    #[arg(long)]
    pub replace: bool,
}

#[derive(Args)]
pub struct SyncArgs {
    pub index: usize,
    /// Date (YYYY-MM-DD)
    pub date: String,
    /// Time (HH:MM)
    pub time: String,
}

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print a config value
    Get { key: String },
    /// Set a config value, keeping the file's comments and layout
    Set { key: String, value: String },
    /// Print the config file location
    Path,
    /// Write a commented starter config
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}
