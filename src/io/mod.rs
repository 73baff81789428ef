pub mod calendar_store;
pub mod config_io;
pub mod host;
pub mod lock;
pub mod logging;
pub mod note_io;
pub mod watcher;
