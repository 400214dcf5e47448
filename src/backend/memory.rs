use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Result, bail};
use crossbeam::channel::{Receiver, Sender, unbounded};

use crate::backend::{Backend, EventSource};
use crate::color::Attributes;
use crate::event::TtkEvent;
use crate::tui::Cell;

/// One `set_cell` call as the backend saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellWrite {
    pub x: u16,
    pub y: u16,
    pub glyph: char,
    pub attrs: Attributes,
}

/// What a [`MemoryBackend`] has been told to display.
#[derive(Debug, Clone, Default)]
pub struct Screen {
    pub width: u16,
    pub height: u16,
    pub cells: Vec<Cell>,
    pub cursor: Option<(u16, u16)>,
    /// Writes since the last flush.
    pub pending: Vec<CellWrite>,
    /// Writes of every flush so far, oldest first.
    pub flushes: Vec<Vec<CellWrite>>,
    pub raw: bool,
}

impl Screen {
    fn new(width: u16, height: u16) -> Self {
        Screen {
            width,
            height,
            cells: vec![Cell::default(); usize::from(width) * usize::from(height)],
            ..Screen::default()
        }
    }

    pub fn row_text(&self, y: u16) -> String {
        if y >= self.height {
            return String::new();
        }
        let start = usize::from(y) * usize::from(self.width);
        self.cells[start..start + usize::from(self.width)]
            .iter()
            .map(|cell| cell.glyph)
            .collect()
    }

    pub fn cell(&self, x: u16, y: u16) -> Option<&Cell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get(usize::from(x) + usize::from(y) * usize::from(self.width))
    }
}

/// A headless backend that keeps the screen in memory. Clones share the same
/// screen so tests can inspect it while the toolkit owns the backend.
#[derive(Clone)]
pub struct MemoryBackend {
    screen: Arc<Mutex<Screen>>,
    events_tx: Sender<TtkEvent>,
    events_rx: Receiver<TtkEvent>,
}

impl MemoryBackend {
    pub fn new(width: u16, height: u16) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            screen: Arc::new(Mutex::new(Screen::new(width, height))),
            events_tx,
            events_rx,
        }
    }

    pub fn screen(&self) -> MutexGuard<'_, Screen> {
        self.screen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Feeds an event to the listener.
    pub fn send(&self, event: TtkEvent) {
        // the receiver lives as long as self
        let _ = self.events_tx.send(event);
    }

    /// Changes the reported size. The resize event has to be sent separately.
    pub fn set_size(&self, width: u16, height: u16) {
        let mut screen = self.screen();
        let flushes = std::mem::take(&mut screen.flushes);
        let raw = screen.raw;
        *screen = Screen {
            flushes,
            raw,
            ..Screen::new(width, height)
        };
    }
}

impl Backend for MemoryBackend {
    fn init(&mut self) -> Result<()> {
        self.screen().raw = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.screen().raw = false;
        Ok(())
    }

    fn size(&self) -> Result<(u16, u16)> {
        let screen = self.screen();
        Ok((screen.width, screen.height))
    }

    fn clear(&mut self, attrs: Attributes) -> Result<()> {
        let mut screen = self.screen();
        screen.cells.fill(Cell::new(' ', attrs));
        Ok(())
    }

    fn set_cell(&mut self, x: u16, y: u16, glyph: char, attrs: Attributes) -> Result<()> {
        let mut screen = self.screen();
        if x >= screen.width || y >= screen.height {
            bail!("cell {x},{y} outside {}x{} screen", screen.width, screen.height);
        }
        let index = usize::from(x) + usize::from(y) * usize::from(screen.width);
        screen.cells[index] = Cell::new(glyph, attrs);
        screen.pending.push(CellWrite { x, y, glyph, attrs });
        Ok(())
    }

    fn set_cursor(&mut self, x: u16, y: u16) -> Result<()> {
        self.screen().cursor = Some((x, y));
        Ok(())
    }

    fn hide_cursor(&mut self) -> Result<()> {
        self.screen().cursor = None;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let mut screen = self.screen();
        let writes = std::mem::take(&mut screen.pending);
        screen.flushes.push(writes);
        Ok(())
    }

    fn events(&mut self) -> Result<Box<dyn EventSource>> {
        Ok(Box::new(MemoryEvents {
            events: self.events_rx.clone(),
        }))
    }
}

struct MemoryEvents {
    events: Receiver<TtkEvent>,
}

impl EventSource for MemoryEvents {
    fn next_event(&mut self) -> Result<TtkEvent> {
        Ok(self.events.recv()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    #[test]
    fn records_writes_per_flush() {
        let mut backend = MemoryBackend::new(3, 2);
        backend.set_cell(1, 1, 'x', Attributes::default()).unwrap();
        backend.flush().unwrap();
        backend.flush().unwrap();

        let screen = backend.screen();
        assert_eq!(screen.row_text(1), " x ");
        assert_eq!(screen.flushes.len(), 2);
        assert_eq!(screen.flushes[0].len(), 1);
        assert!(screen.flushes[1].is_empty());
    }

    #[test]
    fn rejects_cells_outside_the_screen() {
        let mut backend = MemoryBackend::new(3, 2);
        assert!(backend.set_cell(3, 0, 'x', Attributes::default()).is_err());
    }

    #[test]
    fn events_arrive_in_order() {
        let mut backend = MemoryBackend::new(3, 2);
        let mut events = backend.events().unwrap();
        backend.send(TtkEvent::Resize(4, 4));
        backend.send(TtkEvent::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
        assert!(matches!(events.next_event().unwrap(), TtkEvent::Resize(4, 4)));
        assert!(matches!(events.next_event().unwrap(), TtkEvent::Key(_)));
    }
}
