use anyhow::Result;

use crate::color::Attributes;
use crate::event::TtkEvent;

pub mod crossterm;
pub mod memory;

pub use self::crossterm::CrosstermBackend;
pub use memory::MemoryBackend;

/// The terminal the toolkit draws on. Every call except [`Backend::events`]
/// and the initial setup happens on the worker thread.
pub trait Backend: Send {
    /// Switches the terminal into raw mode.
    fn init(&mut self) -> Result<()>;

    /// Restores the terminal.
    fn close(&mut self) -> Result<()>;

    /// Columns and rows.
    fn size(&self) -> Result<(u16, u16)>;

    fn clear(&mut self, attrs: Attributes) -> Result<()>;

    fn set_cell(&mut self, x: u16, y: u16, glyph: char, attrs: Attributes) -> Result<()>;

    fn set_cursor(&mut self, x: u16, y: u16) -> Result<()>;

    fn hide_cursor(&mut self) -> Result<()>;

    /// Makes everything written since the last flush visible.
    fn flush(&mut self) -> Result<()>;

    /// A blocking source of input events, polled from the listener thread.
    fn events(&mut self) -> Result<Box<dyn EventSource>>;
}

pub trait EventSource: Send {
    /// Blocks until the next event. An error ends the listener.
    fn next_event(&mut self) -> Result<TtkEvent>;
}
