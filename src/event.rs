use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent};

use crate::runtime::WindowId;
use crate::tui::WidgetId;

/// Raw events produced by a backend's event source.
#[derive(Debug, Clone)]
pub enum TtkEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
}

/// A keystroke that no widget consumed, handed to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
    /// Window that was focused when the key arrived.
    pub window: Option<WindowId>,
    /// Focused widget that declined the key.
    pub widget: Option<WidgetId>,
}

impl Key {
    pub fn event(&self) -> KeyEvent {
        KeyEvent::new(self.code, self.modifiers)
    }
}
