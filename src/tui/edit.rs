use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::color::Attributes;
use crate::tui::{Surface, Visibility, Widget};

/// Caret coordinate that has not been placed yet.
const UNPLACED: i32 = -1;

/// What a handled key requires afterwards.
enum Outcome {
    /// Not consumed, the caller may act on the key.
    Ignored,
    /// Consumed, only the caret moved.
    Moved,
    /// Consumed, the visible text changed.
    Changed,
}

/// Single line text entry. Edits happen on a display buffer that is copied
/// into the shared target string when the user hits enter.
pub struct Edit {
    x: i32,
    y: i32,
    true_x: i32,
    true_y: i32,
    true_w: i32,
    /// Declared width, `< 1` means distance from the right edge.
    width: i32,
    target: Option<Rc<RefCell<String>>>,
    display: Vec<char>,
    /// First displayed character.
    at: i32,
    cx: i32,
    cy: i32,
    prev_x: i32,
    prev_y: i32,
    visibility: Visibility,
    attrs: Attributes,
}

impl Edit {
    /// An edit anchored at `(x, y)`. A negative `y` resolves to
    /// `height + y + 1`, one row lower than a label, so `-2` is the last row.
    pub fn new(x: i32, y: i32) -> Self {
        Edit {
            x,
            y,
            true_x: x,
            true_y: y,
            true_w: 0,
            width: 0,
            target: None,
            display: Vec::new(),
            at: 0,
            cx: UNPLACED,
            cy: UNPLACED,
            prev_x: 0,
            prev_y: 0,
            visibility: Visibility::Show,
            attrs: Attributes::default(),
        }
    }

    /// Sets the declared width and computes the initial geometry for the
    /// current window size.
    pub fn place(&mut self, surface: &Surface, width: i32) {
        self.width = width;
        self.prev_x = i32::from(surface.width());
        self.prev_y = i32::from(surface.height());
        self.resize(surface);
        self.cx = UNPLACED;
        self.cy = self.true_y;
    }

    /// Binds the edit to `target` and loads its contents. The caret goes to
    /// the end of the text when `end` is set, otherwise to the start.
    pub fn set_text(&mut self, surface: &mut Surface, target: Rc<RefCell<String>>, end: bool) {
        self.display = target.borrow().chars().collect();
        self.target = Some(target);
        self.at = 0;

        let key = if end { KeyCode::End } else { KeyCode::Home };
        self.key_handler(surface, &KeyEvent::new(key, KeyModifiers::NONE));
        self.render(surface);
    }

    /// Current contents of the display buffer.
    pub fn text(&self) -> String {
        self.display.iter().collect()
    }

    pub fn target(&self) -> Option<Rc<RefCell<String>>> {
        self.target.clone()
    }

    pub fn set_attributes(&mut self, attrs: Attributes) {
        self.attrs = attrs;
    }

    /// Index into the display buffer the caret sits before.
    pub fn caret(&self) -> usize {
        usize::try_from(self.position()).unwrap_or(0)
    }

    /// Index of the first displayed character.
    pub fn viewport(&self) -> usize {
        usize::try_from(self.at).unwrap_or(0)
    }

    /// Screen position of the caret.
    pub fn cursor(&self) -> (i32, i32) {
        (self.cx, self.cy)
    }

    fn len(&self) -> i32 {
        i32::try_from(self.display.len()).unwrap_or(i32::MAX)
    }

    fn position(&self) -> i32 {
        self.cx - self.true_x + self.at
    }

    /// Characters from the viewport start to the end of the buffer.
    fn remaining(&self) -> i32 {
        (self.len() - self.at).max(0)
    }

    fn last_column(&self) -> i32 {
        self.true_x + self.true_w - 1
    }

    fn clear(&self, surface: &mut Surface) {
        let blank = " ".repeat(usize::try_from(self.true_w).unwrap_or(0));
        let defaults = surface.defaults();
        surface.print(self.true_x, self.true_y, defaults, &blank);
    }

    /// Keeps the caret inside the buffer and the field, and the viewport
    /// start at or before the caret, leaving the screen column where the arithmetic put it
    /// whenever both already hold.
    fn settle(&mut self) {
        let position = self.position().clamp(0, self.len());
        let mut at = self.at.clamp(0, position);
        // a caret past the last column scrolls the view instead
        let span = (self.true_w - 1).max(0);
        if position - at > span {
            at = position - span;
        }
        self.at = at;
        self.cx = self.true_x + position - at;
    }

    fn home(&mut self) -> Outcome {
        self.cx = self.true_x;
        self.at = 0;
        Outcome::Changed
    }

    fn end(&mut self) -> Outcome {
        let len = self.len();
        if len < self.true_w - 1 {
            self.cx = self.true_x + len - self.at;
            return Outcome::Moved;
        }
        self.cx = self.last_column();
        self.at = len - self.true_w + 1;
        Outcome::Changed
    }

    fn kill(&mut self) -> Outcome {
        self.cx = self.true_x;
        self.at = 0;
        self.display.clear();
        Outcome::Changed
    }

    fn right(&mut self) -> Outcome {
        // nothing on the right hand side
        if self.cx - self.true_x == self.remaining() {
            return Outcome::Moved;
        }
        self.cx += 1;
        if self.cx > self.last_column() {
            self.cx = self.last_column();
            if self.remaining() == 0 {
                return Outcome::Moved;
            }
            self.at += 1;
            return Outcome::Changed;
        }
        Outcome::Moved
    }

    fn left(&mut self) -> Outcome {
        self.cx -= 1;
        if self.cx < self.true_x {
            self.cx = self.true_x;
            self.at = (self.at - 1).max(0);
            return Outcome::Changed;
        }
        Outcome::Moved
    }

    fn delete(&mut self) -> Outcome {
        let position = self.position();
        if position < 0 || position >= self.len() {
            return Outcome::Moved;
        }
        self.display.remove(position as usize);
        Outcome::Changed
    }

    fn backspace(&mut self) -> Outcome {
        let position = self.position();
        if position <= 0 || position > self.len() {
            return Outcome::Moved;
        }
        self.display.remove((position - 1) as usize);

        // caret one column past the left edge scrolls the viewport back
        if self.cx == self.true_x + 1 {
            if self.at > self.true_w - 1 {
                self.cx = self.true_w - 1;
            } else {
                self.cx = self.at + self.true_x;
            }
            if self.at >= self.cx {
                self.at -= self.cx;
            }
        } else {
            self.cx -= 1;
        }
        Outcome::Changed
    }

    fn insert(&mut self, ch: char) -> Outcome {
        let position = self.position().clamp(0, self.len());
        self.display.insert(position as usize, ch);
        if self.cx < self.last_column() {
            self.cx += 1;
        } else {
            self.at += 1;
        }
        Outcome::Changed
    }

    fn commit(&mut self) -> Outcome {
        if let Some(target) = &self.target {
            *target.borrow_mut() = self.text();
        }
        // let the application decide what enter means
        Outcome::Ignored
    }
}

impl Widget for Edit {
    fn can_focus(&self) -> bool {
        true
    }

    fn focus(&mut self, surface: &mut Surface) {
        if self.cx == UNPLACED || self.cy == UNPLACED {
            self.cx = self.true_x;
            self.cy = self.true_y;
            self.at = 0;
        }
        surface.set_cursor(self.cx, self.cy);
    }

    fn render(&mut self, surface: &mut Surface) {
        if self.visibility == Visibility::Hide {
            self.clear(surface);
            return;
        }

        let width = usize::try_from(self.true_w).unwrap_or(0);
        let start = self.viewport().min(self.display.len());
        let visible = &self.display[start..];
        let mut line: String = visible.iter().take(width).collect();
        if visible.len() < width {
            // erase the right hand side
            line.push_str(&" ".repeat(width - visible.len()));
        }
        surface.print(self.true_x, self.true_y, self.attrs, &line);
    }

    fn resize(&mut self, surface: &Surface) {
        let window_w = i32::from(surface.width());
        let window_h = i32::from(surface.height());
        let position = self.position();

        self.true_x = self.x;
        self.true_y = self.y;
        self.true_w = self.width;
        // y < 0 is relative to the bottom line
        if self.y < 0 {
            self.true_y = window_h + self.y + 1;
        }
        // width < 1 is distance from the right edge
        if self.width < 1 {
            self.true_w = window_w - self.x + self.width;
        }

        if window_h != self.prev_y {
            self.cy = self.true_y;
            self.prev_y = window_h;
        }
        if window_w != self.prev_x {
            let len = self.len();
            if len == position {
                if len < self.true_w - 1 {
                    self.cx = self.true_x + len;
                    self.at = 0;
                } else {
                    self.cx = self.last_column();
                    self.at = len - self.true_w + 1;
                }
            } else if position <= 0 {
                self.at = 0;
                self.cx = self.true_x;
            } else if self.prev_x > window_w && self.cx >= window_w {
                // middle of the text, shift by how much the window shrank
                let shrink = self.prev_x - window_w;
                self.cx -= shrink;
                self.at += shrink;
            }
            self.prev_x = window_w;
            self.settle();
        }
    }

    fn key_handler(&mut self, surface: &mut Surface, key: &KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let outcome = match key.code {
            KeyCode::Home => self.home(),
            KeyCode::Char('a') if ctrl => self.home(),
            KeyCode::End => self.end(),
            KeyCode::Char('e') if ctrl => self.end(),
            KeyCode::Char('u') if ctrl => self.kill(),
            KeyCode::Right => self.right(),
            KeyCode::Left => self.left(),
            KeyCode::Delete => self.delete(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Char('h') if ctrl => self.backspace(),
            KeyCode::Enter => self.commit(),
            KeyCode::Char(ch) if (key.modifiers - KeyModifiers::SHIFT).is_empty() => {
                self.insert(ch)
            }
            _ => Outcome::Ignored,
        };

        match outcome {
            Outcome::Ignored => false,
            Outcome::Moved => {
                self.settle();
                surface.set_cursor(self.cx, self.cy);
                true
            }
            Outcome::Changed => {
                self.settle();
                surface.set_cursor(self.cx, self.cy);
                self.render(surface);
                true
            }
        }
    }

    fn visibility(&self) -> Visibility {
        self.visibility
    }

    fn set_visibility(&mut self, surface: &mut Surface, visibility: Visibility) {
        self.visibility = visibility;
        match visibility {
            Visibility::Show => self.render(surface),
            Visibility::Hide => self.clear(surface),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
