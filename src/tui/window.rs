use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use crossterm::event::KeyEvent;

use crate::color::Attributes;
use crate::error::TtkError;
use crate::runtime::WindowId;
use crate::tui::{
    Edit, Justify, Label, List, Surface, WIDGET_EDIT, WIDGET_LABEL, WIDGET_LIST, Widget,
    WidgetId, WidgetRegistry,
};

/// A full screen of widgets. Only the focused window is painted to the
/// terminal, every other window keeps its contents in its own surface.
pub struct Window {
    id: WindowId,
    surface: Surface,
    widgets: Vec<Box<dyn Widget>>,
    /// Index of the focused widget, `None` until something focusable exists.
    focus: Option<usize>,
    registry: Rc<RefCell<WidgetRegistry>>,
}

impl Window {
    pub fn new(
        id: WindowId,
        width: u16,
        height: u16,
        defaults: Attributes,
        registry: Rc<RefCell<WidgetRegistry>>,
    ) -> Self {
        Window {
            id,
            surface: Surface::new(width, height, defaults),
            widgets: Vec::new(),
            focus: None,
            registry,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn width(&self) -> u16 {
        self.surface.width()
    }

    pub fn height(&self) -> u16 {
        self.surface.height()
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    /// Prints into the window, see [`Surface::print`].
    pub fn print(&mut self, x: i32, y: i32, attrs: Attributes, text: &str) {
        self.surface.print(x, y, attrs, text);
    }

    pub fn focused_widget(&self) -> Option<WidgetId> {
        self.focus.map(WidgetId)
    }

    pub fn widget_count(&self) -> usize {
        self.widgets.len()
    }

    /// Builds a widget of a registered kind anchored at `(x, y)` and appends
    /// it to the focus order.
    pub fn add_widget(&mut self, kind: &str, x: i32, y: i32) -> Result<WidgetId> {
        let widget = self.registry.borrow().construct(kind, &self.surface, x, y)?;
        self.widgets.push(widget);
        Ok(WidgetId(self.widgets.len() - 1))
    }

    fn add_typed<W: Widget>(
        &mut self,
        kind: &str,
        x: i32,
        y: i32,
        setup: impl FnOnce(&mut W, &mut Surface),
    ) -> Result<WidgetId> {
        let id = self.add_widget(kind, x, y)?;
        if self.with_widget(id, setup).is_none() {
            self.widgets.pop();
            return Err(TtkError::UnexpectedWidget(kind.to_string()).into());
        }
        Ok(id)
    }

    pub fn add_label(&mut self, x: i32, y: i32, text: impl Into<String>) -> Result<WidgetId> {
        let attrs = self.surface.defaults();
        self.add_typed(WIDGET_LABEL, x, y, |label: &mut Label, surface| {
            label.resize(surface);
            label.set_attributes(attrs);
            label.set_text(text);
        })
    }

    /// Adds a label that spans the full row at `y` with flipped default
    /// colors.
    pub fn add_status(&mut self, y: i32, justify: Justify, text: impl Into<String>) -> Result<WidgetId> {
        let attrs = self.surface.defaults().flipped();
        self.add_typed(WIDGET_LABEL, 0, y, |label: &mut Label, surface| {
            label.resize(surface);
            label.set_status(justify);
            label.set_attributes(attrs);
            label.set_text(text);
        })
    }

    /// Adds an edit bound to `target`. The caret starts at the end of the
    /// text. Enter copies the edited text back into `target`. Unlike labels,
    /// a negative `y` resolves to `height + y + 1`.
    pub fn add_edit(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        target: Rc<RefCell<String>>,
    ) -> Result<WidgetId> {
        let attrs = self.surface.defaults().flipped();
        self.add_typed(WIDGET_EDIT, x, y, |edit: &mut Edit, surface| {
            edit.place(surface, width);
            edit.set_attributes(attrs);
            edit.set_text(surface, target, true);
        })
    }

    pub fn add_list(&mut self, x: i32, y: i32, width: i32, height: i32) -> Result<WidgetId> {
        let attrs = self.surface.defaults();
        self.add_typed(WIDGET_LIST, x, y, |list: &mut List, surface| {
            list.place(surface, width, height);
            list.set_attributes(attrs);
        })
    }

    pub fn widget<W: Widget>(&self, id: WidgetId) -> Option<&W> {
        self.widgets.get(id.0)?.as_any().downcast_ref()
    }

    pub fn widget_mut<W: Widget>(&mut self, id: WidgetId) -> Option<&mut W> {
        self.widgets.get_mut(id.0)?.as_any_mut().downcast_mut()
    }

    /// Runs `f` on a widget together with the surface it paints into.
    pub fn with_widget<W: Widget, R>(
        &mut self,
        id: WidgetId,
        f: impl FnOnce(&mut W, &mut Surface) -> R,
    ) -> Option<R> {
        let widget = self.widgets.get_mut(id.0)?.as_any_mut().downcast_mut()?;
        Some(f(widget, &mut self.surface))
    }

    /// Reallocates the surface and lets every widget recompute its geometry.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.surface.resize(width, height);
        for widget in &mut self.widgets {
            widget.resize(&self.surface);
        }
    }

    /// Paints every widget, then restores widget focus.
    pub fn render(&mut self) {
        for widget in &mut self.widgets {
            widget.render(&mut self.surface);
        }
        self.focus_widget();
    }

    /// Focuses the stored widget, or the first focusable one if there is
    /// none yet.
    pub fn focus_widget(&mut self) {
        self.surface.hide_cursor();
        let index = match self.focus {
            Some(index) => index,
            None => match self.widgets.iter().position(|w| w.can_focus()) {
                Some(index) => index,
                None => return,
            },
        };
        if let Some(widget) = self.widgets.get_mut(index) {
            self.focus = Some(index);
            widget.focus(&mut self.surface);
        }
    }

    fn focus_index(&mut self, index: usize) {
        self.surface.hide_cursor();
        self.focus = Some(index);
        self.widgets[index].focus(&mut self.surface);
    }

    /// Moves focus to the next focusable widget, wrapping to the first.
    pub fn focus_next(&mut self) {
        let Some(current) = self.focus else {
            self.focus_widget();
            return;
        };
        match (current + 1..self.widgets.len()).find(|&i| self.widgets[i].can_focus()) {
            Some(next) => self.focus_index(next),
            None => {
                self.focus = None;
                self.focus_widget();
            }
        }
    }

    /// Moves focus to the previous focusable widget, wrapping to the last.
    /// Nothing happens if no other widget can take focus.
    pub fn focus_previous(&mut self) {
        let Some(current) = self.focus else {
            self.focus_widget();
            return;
        };
        let previous = (0..current)
            .rev()
            .chain((current + 1..self.widgets.len()).rev())
            .find(|&i| self.widgets[i].can_focus());
        if let Some(previous) = previous {
            self.focus_index(previous);
        }
    }

    /// Hands the key to the focused widget. Returns whether it was consumed
    /// and which widget saw it.
    pub fn key_handler(&mut self, key: &KeyEvent) -> (bool, Option<WidgetId>) {
        let Some(index) = self.focus else {
            return (false, None);
        };
        match self.widgets.get_mut(index) {
            Some(widget) => (widget.key_handler(&mut self.surface, key), Some(WidgetId(index))),
            None => (false, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn window(width: u16, height: u16) -> Window {
        Window::new(
            WindowId(0),
            width,
            height,
            Attributes::default(),
            Rc::new(RefCell::new(WidgetRegistry::with_builtins())),
        )
    }

    fn target(text: &str) -> Rc<RefCell<String>> {
        Rc::new(RefCell::new(text.to_string()))
    }

    fn press(window: &mut Window, code: KeyCode) -> (bool, Option<WidgetId>) {
        window.key_handler(&KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn typed_access_checks_the_type() {
        let mut window = window(10, 3);
        let label = window.add_label(0, 0, "hi").unwrap();
        assert_eq!(window.widget::<Label>(label).unwrap().text(), "hi");
        assert!(window.widget::<Edit>(label).is_none());
        assert!(window.widget_mut::<Label>(WidgetId(7)).is_none());
    }

    #[test]
    fn unknown_kind_fails() {
        let mut window = window(10, 3);
        let err = window.add_widget("button", 0, 0).unwrap_err();
        assert_eq!(
            err.downcast_ref::<TtkError>(),
            Some(&TtkError::WidgetNotRegistered("button".into()))
        );
        assert_eq!(window.widget_count(), 0);
    }

    #[test]
    fn render_focuses_first_focusable() {
        let mut window = window(10, 3);
        window.add_label(0, 0, "name").unwrap();
        let edit = window.add_edit(0, 1, 0, target("ab")).unwrap();
        window.render();
        assert_eq!(window.focused_widget(), Some(edit));
        assert_eq!(window.surface().cursor(), Some((2, 1)));
    }

    #[test]
    fn window_without_focusable_widgets_stays_unfocused() {
        let mut window = window(10, 3);
        window.add_label(0, 0, "a").unwrap();
        window.add_list(0, 1, 0, 0).unwrap();
        window.render();
        window.focus_next();
        window.focus_previous();
        assert_eq!(window.focused_widget(), None);
        assert_eq!(press(&mut window, KeyCode::Char('x')), (false, None));
    }

    #[test]
    fn focus_next_skips_unfocusable_and_wraps() {
        let mut window = window(20, 6);
        let first = window.add_edit(0, 0, 5, target("")).unwrap();
        window.add_label(0, 1, "skip").unwrap();
        let second = window.add_edit(0, 2, 5, target("")).unwrap();
        window.add_list(0, 3, 0, 1).unwrap();
        let third = window.add_edit(0, 4, 5, target("")).unwrap();

        window.focus_next();
        assert_eq!(window.focused_widget(), Some(first));
        window.focus_next();
        assert_eq!(window.focused_widget(), Some(second));
        window.focus_next();
        assert_eq!(window.focused_widget(), Some(third));
        window.focus_next();
        assert_eq!(window.focused_widget(), Some(first));
        assert_eq!(window.surface().cursor(), Some((0, 0)));
    }

    #[test]
    fn focus_previous_wraps_to_last() {
        let mut window = window(20, 6);
        let first = window.add_edit(0, 0, 5, target("")).unwrap();
        window.add_label(0, 1, "skip").unwrap();
        let second = window.add_edit(0, 2, 5, target("")).unwrap();
        let third = window.add_edit(0, 4, 5, target("")).unwrap();
        window.add_label(0, 5, "skip").unwrap();

        window.focus_previous();
        assert_eq!(window.focused_widget(), Some(first));
        window.focus_previous();
        assert_eq!(window.focused_widget(), Some(third));
        window.focus_previous();
        assert_eq!(window.focused_widget(), Some(second));
        window.focus_previous();
        assert_eq!(window.focused_widget(), Some(first));
    }

    #[test]
    fn focus_previous_with_single_focusable_is_noop() {
        let mut window = window(20, 3);
        window.add_label(0, 0, "skip").unwrap();
        let only = window.add_edit(0, 1, 5, target("x")).unwrap();
        window.render();
        window.focus_previous();
        assert_eq!(window.focused_widget(), Some(only));
        window.focus_next();
        assert_eq!(window.focused_widget(), Some(only));
    }

    #[test]
    fn keys_route_to_focused_widget() {
        let mut window = window(20, 5);
        let edit = window.add_edit(2, 4, -2, target("12345")).unwrap();
        window.render();
        assert_eq!(window.surface().cursor(), Some((7, 4)));

        assert_eq!(press(&mut window, KeyCode::Home), (true, Some(edit)));
        assert_eq!(press(&mut window, KeyCode::Char('A')), (true, Some(edit)));
        assert_eq!(window.widget::<Edit>(edit).unwrap().text(), "A12345");
        assert_eq!(press(&mut window, KeyCode::F(1)), (false, Some(edit)));
    }

    #[test]
    fn resize_reanchors_widgets() {
        let mut window = window(10, 4);
        let status = window.add_status(-1, Justify::Left, "status").unwrap();
        window.render();
        assert_eq!(window.surface().row_text(3), "status    ");

        window.resize(12, 6);
        window.render();
        assert_eq!(window.surface().row_text(5), "status      ");
        assert!(window.widget::<Label>(status).unwrap().is_status());
        let attrs = window.surface().cell(0, 5).unwrap().attrs;
        assert_eq!(attrs, Attributes::default().flipped());
    }

    #[test]
    fn custom_widget_kinds_use_the_shared_registry() {
        let registry = Rc::new(RefCell::new(WidgetRegistry::with_builtins()));
        registry.borrow_mut().register("title", |_, x, y| {
            let mut label = Label::new(x, y);
            label.set_text("custom");
            Ok(Box::new(label) as Box<dyn Widget>)
        });
        let mut window = Window::new(WindowId(3), 8, 1, Attributes::default(), registry);
        let id = window.add_widget("title", 1, 0).unwrap();
        window.render();
        assert_eq!(window.surface().row_text(0), " custom ");
        assert_eq!(window.widget::<Label>(id).unwrap().text(), "custom");

        // a typed add on a kind that builds something else fails
        let err = window.add_typed(WIDGET_EDIT, 0, 0, |_: &mut List, _| ()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<TtkError>(),
            Some(&TtkError::UnexpectedWidget(WIDGET_EDIT.into()))
        );
        assert_eq!(window.widget_count(), 1);
    }
}
