//! A small terminal widget toolkit. Windows hold labels, edits and lists,
//! a single worker thread serializes every mutation and render, and only the
//! cells that changed are written to the terminal.

pub mod backend;
pub mod color;
pub mod config;
pub mod error;
pub mod escape;
pub mod event;
pub mod runtime;
pub mod tui;

pub use backend::{Backend, CrosstermBackend, EventSource, MemoryBackend};
pub use color::{Attributes, Color, Face};
pub use config::ToolkitConfig;
pub use error::{EscapeError, TtkError};
pub use event::{Key, TtkEvent};
pub use runtime::{Context, Controller, Toolkit, WindowId};
pub use tui::{Edit, Justify, Label, List, Location, Visibility, Widget, WidgetId, Window};
