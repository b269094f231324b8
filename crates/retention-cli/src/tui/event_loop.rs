use crossterm::event;

use crate::tui::event::TuiEvent;

/// Event loop state management.
///
/// Yields a render after every terminal event and otherwise blocks until
/// the next one arrives.
#[derive(Debug)]
pub(super) struct EventLoop {
    dirty: bool,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        Self {
            dirty: true, // Initial render is required on startup
        }
    }

    /// Returns the next event.
    pub(super) fn next(&mut self) -> anyhow::Result<TuiEvent> {
        if self.dirty {
            self.dirty = false;
            return Ok(TuiEvent::Render);
        }
        let event = event::read()?;
        self.dirty = true;
        Ok(event.into())
    }
}
