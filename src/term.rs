use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crossterm::terminal;

/// Puts the terminal in raw mode for the lifetime of the value so key
/// presses reach [`cancel_requested`] without waiting for Enter. Returns
/// `None` when there is no terminal to configure (e.g. piped stdin).
pub struct RawGuard(());

impl RawGuard {
    pub fn new() -> Option<RawGuard> {
        terminal::enable_raw_mode().ok().map(|_| RawGuard(()))
    }
}

impl Drop for RawGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Drain pending key events between step batches; true if the user asked to
/// stop the program (Escape or Ctrl+C).
pub fn cancel_requested() -> bool {
    while event::poll(Duration::ZERO).unwrap_or(false) {
        match event::read() {
            Ok(Event::Key(key)) => match (key.modifiers, key.code) {
                (_, KeyCode::Esc) => return true,
                (KeyModifiers::CONTROL, KeyCode::Char('c')) => return true,
                _ => {}
            },
            Ok(_) => {}
            Err(_) => return false,
        }
    }
    false
}

/// Run a closure with raw mode suspended, restoring it afterwards. Line
/// reads (the IN instruction) need a cooked terminal.
pub fn with_cooked<R>(f: impl FnOnce() -> R) -> R {
    let was_raw = terminal::is_raw_mode_enabled().unwrap_or(false);
    if was_raw {
        let _ = terminal::disable_raw_mode();
    }
    let out = f();
    if was_raw {
        let _ = terminal::enable_raw_mode();
    }
    out
}
