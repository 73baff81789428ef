use std::io::Write;

/// Error type for calls into the host environment
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("unsupported sound: {0}")]
    Unsupported(String),
    #[error("host service unavailable: {0}")]
    Unavailable(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Side effects the note asks of its host: notifications and sounds.
///
/// Failures never abort note operations; callers log them and move on.
pub trait HostServices {
    fn notify(&mut self, title: &str, body: &str) -> Result<(), HostError>;
    fn play_sound(&mut self, name: &str) -> Result<(), HostError>;
}

/// A notification as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Sounds the terminal host knows how to play (all as the bell)
const KNOWN_SOUNDS: &[&str] = &["Glass", "Ping", "Pop", "Hero", "Basso", "bell"];

/// Host backed by the controlling terminal. Notifications land in the
/// status line; every known sound rings the bell.
pub struct TerminalHost {
    bell: bool,
    last: Option<Notification>,
}

impl TerminalHost {
    pub fn new(bell: bool) -> Self {
        TerminalHost { bell, last: None }
    }

    /// Most recent notification, cleared on read
    pub fn take_notification(&mut self) -> Option<Notification> {
        self.last.take()
    }
}

impl HostServices for TerminalHost {
    fn notify(&mut self, title: &str, body: &str) -> Result<(), HostError> {
        log::info!("event=notify title=\"{}\" body=\"{}\"", title, body);
        self.last = Some(Notification {
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    fn play_sound(&mut self, name: &str) -> Result<(), HostError> {
        if !KNOWN_SOUNDS.contains(&name) {
            return Err(HostError::Unsupported(name.to_string()));
        }
        if self.bell {
            let mut out = std::io::stdout();
            out.write_all(b"\x07")?;
            out.flush()?;
        }
        Ok(())
    }
}
