use std::any::Any;

use crossterm::event::KeyEvent;

use crate::color::Attributes;
use crate::escape::{self, ESC};
use crate::tui::{Surface, Visibility, Widget};

/// Where [`List::display`] should move the view before rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Top,
    Bottom,
    /// One page up, keeping a line of overlap.
    Up,
    /// One page down, keeping a line of overlap.
    Down,
    Current,
}

/// Append only scrolling pane. New lines keep the bottom in view unless the
/// user is paging through history.
pub struct List {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    true_x: i32,
    true_y: i32,
    true_w: i32,
    true_h: i32,
    /// First source line of the view.
    at: i32,
    paging: bool,
    content: Vec<String>,
    attrs: Attributes,
    visibility: Visibility,
}

impl List {
    pub fn new(x: i32, y: i32) -> Self {
        List {
            x,
            y,
            width: 0,
            height: 0,
            true_x: x,
            true_y: y,
            true_w: 0,
            true_h: 0,
            at: 0,
            paging: false,
            content: Vec::new(),
            attrs: Attributes::default(),
            visibility: Visibility::Show,
        }
    }

    /// Sets the declared size and computes the geometry for the current
    /// window size.
    pub fn place(&mut self, surface: &Surface, width: i32, height: i32) {
        self.width = width;
        self.height = height;
        self.resize(surface);
    }

    pub fn set_attributes(&mut self, attrs: Attributes) {
        self.attrs = attrs;
    }

    /// Adds a line. Shown on the next render or display.
    pub fn append(&mut self, line: impl Into<String>) {
        self.content.push(line.into());
        if self.paging {
            return;
        }
        self.at = (self.len_i32() - self.true_h).max(0);
    }

    /// Whether the view was moved away from the bottom.
    pub fn is_paging(&self) -> bool {
        self.paging
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Index of the first line in view.
    pub fn top(&self) -> usize {
        usize::try_from(self.at).unwrap_or(0)
    }

    fn len_i32(&self) -> i32 {
        i32::try_from(self.content.len()).unwrap_or(i32::MAX)
    }

    fn rows(&self) -> usize {
        usize::try_from(self.true_h).unwrap_or(0)
    }

    fn columns(&self) -> usize {
        usize::try_from(self.true_w).unwrap_or(0)
    }

    fn blank(&self, surface: &mut Surface, from: usize) {
        let blank = " ".repeat(self.columns());
        let defaults = surface.defaults();
        for row in from..self.rows() {
            surface.print(self.true_x, self.true_y + row as i32, defaults, &blank);
        }
    }

    /// Moves the view and renders it.
    pub fn display(&mut self, surface: &mut Surface, location: Location) {
        if self.content.is_empty() || self.visibility == Visibility::Hide {
            return;
        }

        let len = self.len_i32();
        match location {
            Location::Current => {}
            Location::Top => {
                if len > self.true_h {
                    self.at = 0;
                    self.paging = true;
                }
            }
            Location::Bottom => {
                self.at = (len - self.true_h).max(0);
                self.paging = false;
            }
            Location::Up => {
                self.at = (self.at - self.true_h + 1).max(0);
                self.paging = true;
            }
            Location::Down => {
                let y = self.at + self.true_h - 1;
                if y + self.true_h > len {
                    return self.display(surface, Location::Bottom);
                }
                self.at = y;
                self.paging = true;
            }
        }

        let start = self.at.clamp(0, len);
        let end = (self.at + self.true_h).clamp(start, len);
        let width = self.columns();
        let rows: Vec<String> = self.content[start as usize..end as usize]
            .iter()
            .flat_map(|line| wrap(line, width))
            .collect();

        // only the bottom rows fit
        let shown = &rows[rows.len().saturating_sub(self.rows())..];
        for (i, row) in shown.iter().enumerate() {
            surface.print(self.true_x, self.true_y + i as i32, self.attrs, row);
        }
        self.blank(surface, shown.len());
    }
}

/// Splits `line` into rows of exactly `width` printable characters. Escape
/// sequences take no columns. A continuation row starts with the sequence
/// that was active where the line was split.
fn wrap(line: &str, width: usize) -> Vec<String> {
    let mut rows = Vec::new();
    if width == 0 {
        return rows;
    }

    let mut row = String::new();
    let mut printed = 0;
    let mut active = "";
    let mut i = 0;
    while let Some(ch) = line[i..].chars().next() {
        if ch == ESC {
            if let Some(skip) = escape::sequence_len(&line[i..]) {
                active = &line[i..i + skip];
                row.push_str(active);
                i += skip;
                continue;
            }
        }
        i += ch.len_utf8();
        row.push(ch);
        printed += 1;
        if printed == width {
            rows.push(std::mem::replace(&mut row, active.to_string()));
            printed = 0;
        }
    }

    // a line ending exactly on the boundary has no partial row
    if printed > 0 || rows.is_empty() {
        row.push_str(&" ".repeat(width - printed));
        rows.push(row);
    }
    rows
}

impl Widget for List {
    fn can_focus(&self) -> bool {
        false
    }

    fn focus(&mut self, _surface: &mut Surface) {}

    fn render(&mut self, surface: &mut Surface) {
        if self.content.is_empty() || self.visibility == Visibility::Hide {
            return;
        }
        self.display(surface, Location::Current);
    }

    fn resize(&mut self, surface: &Surface) {
        self.true_x = self.x;
        self.true_y = self.y;
        self.true_w = self.width;
        self.true_h = self.height;
        // width < 1 is distance from the right edge
        if self.width < 1 {
            self.true_w = i32::from(surface.width()) - self.x + self.width;
        }
        // height < 1 is distance from the bottom edge
        if self.height < 1 {
            self.true_h = (i32::from(surface.height()) - self.y + self.height).max(0);
        }
    }

    fn key_handler(&mut self, _surface: &mut Surface, _key: &KeyEvent) -> bool {
        false
    }

    fn visibility(&self) -> Visibility {
        self.visibility
    }

    fn set_visibility(&mut self, surface: &mut Surface, visibility: Visibility) {
        self.visibility = visibility;
        match visibility {
            Visibility::Show => self.render(surface),
            Visibility::Hide => self.blank(surface, 0),
        }
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
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn list_with(lines: usize, window: (u16, u16), x: i32, y: i32, size: (i32, i32)) -> (List, Surface) {
        let mut surface = Surface::new(window.0, window.1, Attributes::default());
        let mut list = List::new(x, y);
        list.place(&surface, size.0, size.1);
        for i in 0..lines {
            list.append(format!("line {i}"));
        }
        list.render(&mut surface);
        (list, surface)
    }

    #[test]
    fn wrap_splits_at_width_and_pads() {
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh "]);
        assert_eq!(wrap("abcdef", 3), vec!["abc", "def"]);
        assert_eq!(wrap("", 3), vec!["   "]);
    }

    #[test]
    fn wrap_carries_color_across_split() {
        let red = encode(ATTR_NA, COLOR_RED, ATTR_NA).unwrap();
        let rows = wrap(&format!("ab{red}cd"), 3);
        assert_eq!(rows, vec![format!("ab{red}c"), format!("{red}d  ")]);
    }

    #[test]
    fn wrap_ignores_trailing_sequence_after_exact_split() {
        let red = encode(ATTR_NA, COLOR_RED, ATTR_NA).unwrap();
        assert_eq!(wrap(&format!("abc{red}"), 3), vec!["abc".to_string()]);
        assert_eq!(wrap(&red, 2), vec![format!("{red}  ")]);
    }

    #[test]
    fn renders_from_anchor_and_blanks_below() {
        let (list, surface) = list_with(2, (10, 5), 1, 1, (0, 0));
        assert_eq!(list.len(), 2);
        assert_eq!(surface.row_text(0), "          ");
        assert_eq!(surface.row_text(1), " line 0   ");
        assert_eq!(surface.row_text(2), " line 1   ");
        assert_eq!(surface.row_text(3), "          ");
        assert!(surface.cell(9, 4).unwrap().is_dirty());
    }

    #[test]
    fn append_follows_bottom() {
        let (list, surface) = list_with(10, (8, 3), 0, 0, (0, 0));
        assert_eq!(list.top(), 7);
        assert!(!list.is_paging());
        assert_eq!(surface.row_text(0), "line 7  ");
        assert_eq!(surface.row_text(2), "line 9  ");
    }

    #[test]
    fn top_shows_first_page() {
        let (mut list, mut surface) = list_with(10, (8, 3), 0, 0, (0, 0));
        list.display(&mut surface, Location::Top);
        assert!(list.is_paging());
        assert_eq!(surface.row_text(0), "line 0  ");
        assert_eq!(surface.row_text(1), "line 1  ");
        assert_eq!(surface.row_text(2), "line 2  ");

        // paging keeps the view put
        list.append("line 10");
        assert_eq!(list.top(), 0);
    }

    #[test]
    fn top_is_ignored_when_everything_fits() {
        let (mut list, mut surface) = list_with(2, (8, 3), 0, 0, (0, 0));
        list.display(&mut surface, Location::Top);
        assert!(!list.is_paging());
    }

    #[test]
    fn paging_overlaps_one_line() {
        let (mut list, mut surface) = list_with(10, (8, 3), 0, 0, (0, 0));
        list.display(&mut surface, Location::Top);
        list.display(&mut surface, Location::Down);
        assert_eq!(list.top(), 2);
        list.display(&mut surface, Location::Down);
        assert_eq!(list.top(), 4);
        list.display(&mut surface, Location::Up);
        assert_eq!(list.top(), 2);
        assert!(list.is_paging());

        list.display(&mut surface, Location::Down);
        list.display(&mut surface, Location::Down);
        assert_eq!(list.top(), 6);
        assert!(list.is_paging());

        // running off the end snaps to the bottom
        list.display(&mut surface, Location::Down);
        assert_eq!(list.top(), 7);
        assert!(!list.is_paging());
        assert_eq!(surface.row_text(2), "line 9  ");

        list.display(&mut surface, Location::Up);
        list.display(&mut surface, Location::Up);
        list.display(&mut surface, Location::Up);
        list.display(&mut surface, Location::Up);
        assert_eq!(list.top(), 0);
        list.display(&mut surface, Location::Bottom);
        assert_eq!(list.top(), 7);
        assert!(!list.is_paging());
    }

    #[test]
    fn page_up_then_down_returns_to_bottom() {
        let (mut list, mut surface) = list_with(10, (8, 3), 0, 0, (0, 0));
        list.display(&mut surface, Location::Bottom);
        let bottom: Vec<String> = (0..3).map(|y| surface.row_text(y)).collect();

        list.display(&mut surface, Location::Up);
        assert_eq!(list.top(), 5);
        list.display(&mut surface, Location::Down);
        assert_eq!(list.top(), 7);
        let rows: Vec<String> = (0..3).map(|y| surface.row_text(y)).collect();
        assert_eq!(rows, bottom);
    }

    proptest! {
        #[test]
        fn paging_round_trip_from_bottom(lines in 0usize..20, height in 1u16..6) {
            let (mut list, mut surface) = list_with(lines, (8, height), 0, 0, (0, 0));
            list.display(&mut surface, Location::Bottom);
            let top = list.top();
            let bottom: Vec<String> = (0..height).map(|y| surface.row_text(y)).collect();

            list.display(&mut surface, Location::Up);
            list.display(&mut surface, Location::Down);
            let rows: Vec<String> = (0..height).map(|y| surface.row_text(y)).collect();
            prop_assert_eq!(list.top(), top);
            prop_assert_eq!(rows, bottom);
        }
    }

    #[test]
    fn wrapped_lines_keep_bottom_rows() {
        let mut surface = Surface::new(4, 2, Attributes::default());
        let mut list = List::new(0, 0);
        list.place(&surface, 0, 0);
        list.append("abcdefgh");
        list.append("ij");
        list.render(&mut surface);
        assert_eq!(surface.row_text(0), "efgh");
        assert_eq!(surface.row_text(1), "ij  ");
    }

    #[test]
    fn continuation_row_keeps_color() {
        let red = encode(ATTR_NA, COLOR_RED, ATTR_NA).unwrap();
        let mut surface = Surface::new(3, 2, Attributes::default());
        let mut list = List::new(0, 0);
        list.place(&surface, 0, 0);
        list.append(format!("a{red}bcd"));
        list.render(&mut surface);
        assert_eq!(surface.row_text(0), "abc");
        assert_eq!(surface.row_text(1), "d  ");
        assert_eq!(surface.cell(0, 0).unwrap().attrs.fg.color, None);
        assert_eq!(surface.cell(0, 1).unwrap().attrs.fg.color, Some(Color::Red));
    }

    #[test]
    fn hide_blanks_the_pane() {
        let (mut list, mut surface) = list_with(3, (6, 3), 0, 0, (0, 0));
        list.set_visibility(&mut surface, Visibility::Hide);
        assert_eq!(surface.row_text(0), "      ");
        list.display(&mut surface, Location::Bottom);
        assert_eq!(surface.row_text(0), "      ");
        list.set_visibility(&mut surface, Visibility::Show);
        assert_eq!(surface.row_text(0), "line 0");
    }
}
