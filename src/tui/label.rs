use std::any::Any;

use crossterm::event::KeyEvent;

use crate::color::Attributes;
use crate::escape;
use crate::tui::{Surface, Visibility, Widget};

/// Where a status label puts its text within the full row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Justify {
    #[default]
    Left,
    Right,
    Center,
}

/// A text only widget. A status label fills its entire row and justifies
/// the text within it.
pub struct Label {
    x: i32,
    y: i32,
    true_x: i32,
    true_y: i32,
    text: String,
    attrs: Attributes,
    status: bool,
    justify: Justify,
    visibility: Visibility,
}

impl Label {
    pub fn new(x: i32, y: i32) -> Self {
        Label {
            x,
            y,
            true_x: x,
            true_y: y,
            text: String::new(),
            attrs: Attributes::default(),
            status: false,
            justify: Justify::Left,
            visibility: Visibility::Show,
        }
    }

    /// Turns the label into a status bar.
    pub fn set_status(&mut self, justify: Justify) {
        self.status = true;
        self.justify = justify;
    }

    pub fn is_status(&self) -> bool {
        self.status
    }

    /// Sets the caption. Shown on the next render.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_attributes(&mut self, attrs: Attributes) {
        self.attrs = attrs;
    }

    pub fn attributes(&self) -> Attributes {
        self.attrs
    }

    fn clear(&self, surface: &mut Surface) {
        let blank = " ".repeat(usize::from(surface.width()));
        let defaults = surface.defaults();
        surface.print(self.true_x, self.true_y, defaults, &blank);
    }

    fn justified(&self, width: u16) -> String {
        let spacing = usize::from(width).saturating_sub(escape::visible_len(&self.text));
        let (left, right) = match self.justify {
            Justify::Left => (0, spacing),
            Justify::Right => (spacing, 0),
            Justify::Center => (spacing / 2, spacing / 2 + spacing % 2),
        };
        format!("{}{}{}", " ".repeat(left), self.text, " ".repeat(right))
    }
}

impl Widget for Label {
    fn can_focus(&self) -> bool {
        false
    }

    fn focus(&mut self, _surface: &mut Surface) {}

    fn render(&mut self, surface: &mut Surface) {
        if self.visibility == Visibility::Hide {
            self.clear(surface);
            return;
        }
        if !self.status {
            surface.print(self.true_x, self.true_y, self.attrs, &self.text);
            return;
        }
        let line = self.justified(surface.width());
        surface.print(0, self.true_y, self.attrs, &line);
    }

    fn resize(&mut self, surface: &Surface) {
        self.true_x = self.x;
        self.true_y = self.y;
        // y < 0 counts lines from the bottom
        if self.y < 0 {
            self.true_y = i32::from(surface.height()) + self.y;
        }
    }

    fn key_handler(&mut self, _surface: &mut Surface, _key: &KeyEvent) -> bool {
        false
    }

    fn visibility(&self) -> Visibility {
        self.visibility
    }

    fn set_visibility(&mut self, _surface: &mut Surface, visibility: Visibility) {
        self.visibility = visibility;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::escape::{ATTR_NA, COLOR_RED, encode};

    fn rendered(label: &mut Label, width: u16, height: u16) -> Surface {
        let mut surface = Surface::new(width, height, Attributes::default());
        label.resize(&surface);
        label.render(&mut surface);
        surface
    }

    #[test]
    fn plain_label_prints_at_anchor() {
        let mut label = Label::new(2, 1);
        label.set_text("hello");
        let surface = rendered(&mut label, 10, 3);
        assert_eq!(surface.row_text(1), "  hello   ");
        assert!(!surface.cell(7, 1).unwrap().is_dirty());
    }

    #[test]
    fn negative_y_anchors_from_bottom() {
        let mut label = Label::new(0, -1);
        label.set_text("bottom");
        let surface = rendered(&mut label, 8, 4);
        assert_eq!(surface.row_text(3), "bottom  ");
    }

    #[test]
    fn status_fills_row_with_justification() {
        let mut label = Label::new(0, 0);
        label.set_status(Justify::Right);
        label.set_text("abc");
        assert_eq!(rendered(&mut label, 7, 1).row_text(0), "    abc");

        label.set_status(Justify::Center);
        let surface = rendered(&mut label, 8, 1);
        assert_eq!(surface.row_text(0), "  abc   ");
        assert!(surface.cell(7, 0).unwrap().is_dirty());

        label.set_status(Justify::Left);
        assert_eq!(rendered(&mut label, 6, 1).row_text(0), "abc   ");
    }

    #[test]
    fn status_spacing_ignores_escape_sequences() {
        let red = encode(ATTR_NA, COLOR_RED, ATTR_NA).unwrap();
        let mut label = Label::new(0, 0);
        label.set_status(Justify::Right);
        label.set_text(format!("{red}ab"));
        let surface = rendered(&mut label, 5, 1);
        assert_eq!(surface.row_text(0), "   ab");
        assert_eq!(surface.cell(3, 0).unwrap().attrs.fg.color, Some(Color::Red));
    }

    #[test]
    fn hidden_label_blanks_its_row() {
        let mut label = Label::new(1, 0);
        label.set_text("gone");
        label.set_attributes(Attributes::colors(Color::Yellow, Color::Blue));
        let mut surface = Surface::new(6, 1, Attributes::default());
        label.resize(&surface);
        label.render(&mut surface);
        label.set_visibility(&mut surface, Visibility::Hide);
        label.render(&mut surface);
        assert_eq!(surface.row_text(0), "      ");
        assert_eq!(surface.cell(1, 0).unwrap().attrs, Attributes::default());
        assert_eq!(label.visibility(), Visibility::Hide);
    }
}
