use std::any::Any;
use std::collections::HashMap;

use anyhow::Result;
use crossterm::event::KeyEvent;

use crate::error::TtkError;

pub mod edit;
pub mod label;
pub mod list;
pub mod surface;
pub mod window;

pub use edit::Edit;
pub use label::{Justify, Label};
pub use list::{List, Location};
pub use surface::{Cell, Surface};
pub use window::Window;

/// Index of a widget inside its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetId(pub(crate) usize);

impl WidgetId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Show,
    Hide,
}

/// The capability set every widget implements. All calls happen on the
/// worker, so implementations must never make blocking toolkit calls.
pub trait Widget: Any {
    /// Whether the widget can take keyboard focus.
    fn can_focus(&self) -> bool;

    /// Takes focus, showing the caret if the widget has one.
    fn focus(&mut self, surface: &mut Surface);

    fn render(&mut self, surface: &mut Surface);

    /// Recomputes derived geometry from the current window size.
    fn resize(&mut self, surface: &Surface);

    /// Returns true if the key was consumed.
    fn key_handler(&mut self, surface: &mut Surface, key: &KeyEvent) -> bool;

    fn visibility(&self) -> Visibility;

    fn set_visibility(&mut self, surface: &mut Surface, visibility: Visibility);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Builds a widget anchored at `(x, y)` of a window.
pub type WidgetConstructor = Box<dyn Fn(&Surface, i32, i32) -> Result<Box<dyn Widget>>>;

pub const WIDGET_LABEL: &str = "label";
pub const WIDGET_EDIT: &str = "edit";
pub const WIDGET_LIST: &str = "list";

/// Maps widget kinds to constructors. Applications register their own kinds
/// so they go through the same add path as the builtins.
pub struct WidgetRegistry {
    constructors: HashMap<String, WidgetConstructor>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// A registry with label, edit and list registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(WIDGET_LABEL, |_, x, y| Ok(Box::new(Label::new(x, y)) as Box<dyn Widget>));
        registry.register(WIDGET_EDIT, |_, x, y| Ok(Box::new(Edit::new(x, y)) as Box<dyn Widget>));
        registry.register(WIDGET_LIST, |_, x, y| Ok(Box::new(List::new(x, y)) as Box<dyn Widget>));
        registry
    }

    pub fn register<F>(&mut self, kind: &str, constructor: F)
    where
        F: Fn(&Surface, i32, i32) -> Result<Box<dyn Widget>> + 'static,
    {
        self.constructors
            .insert(kind.to_string(), Box::new(constructor));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    pub fn construct(&self, kind: &str, surface: &Surface, x: i32, y: i32) -> Result<Box<dyn Widget>> {
        let constructor = self
            .constructors
            .get(kind)
            .ok_or_else(|| TtkError::WidgetNotRegistered(kind.to_string()))?;
        constructor(surface, x, y)
    }
}

impl Default for WidgetRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
