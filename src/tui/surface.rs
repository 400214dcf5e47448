use crate::color::Attributes;
use crate::escape::{self, ESC};

/// One character position of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub glyph: char,
    pub attrs: Attributes,
    dirty: bool,
}

impl Cell {
    pub const fn new(glyph: char, attrs: Attributes) -> Self {
        Self {
            glyph,
            attrs,
            dirty: false,
        }
    }

    /// Changed since the last flush.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::new(' ', Attributes::default())
    }
}

/// The backing store of a window: the desired screen contents plus the
/// desired hardware caret. Widgets paint into this instead of the terminal,
/// the runtime copies dirty cells out on flush.
pub struct Surface {
    cells: Vec<Cell>,
    width: u16,
    height: u16,
    defaults: Attributes,
    cursor: Option<(u16, u16)>,
}

impl Surface {
    pub fn new(width: u16, height: u16, defaults: Attributes) -> Self {
        Self {
            cells: vec![Cell::default(); usize::from(width) * usize::from(height)],
            width,
            height,
            defaults,
            cursor: None,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Attributes used for blank space and restored by a reset sequence.
    pub fn defaults(&self) -> Attributes {
        self.defaults
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = u16::try_from(x).ok().filter(|x| *x < self.width)?;
        let y = u16::try_from(y).ok().filter(|y| *y < self.height)?;
        Some(usize::from(x) + usize::from(y) * usize::from(self.width))
    }

    /// Writes a cell and marks it dirty. Writes outside the store are dropped.
    pub fn set_cell(&mut self, x: i32, y: i32, mut cell: Cell) {
        if let Some(i) = self.index(x, y) {
            cell.dirty = true;
            self.cells[i] = cell;
        }
    }

    pub fn cell(&self, x: i32, y: i32) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    pub fn cell_mut(&mut self, x: i32, y: i32) -> Option<&mut Cell> {
        self.index(x, y).map(|i| &mut self.cells[i])
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Prints `text` left to right starting at column `x`, switching
    /// attributes at every embedded escape sequence. Sequences take no
    /// columns. Output stops at the right edge, there is no wrapping.
    pub fn print(&mut self, x: i32, y: i32, attrs: Attributes, text: &str) {
        if y < 0 || y >= i32::from(self.height) {
            return;
        }
        let width = i32::from(self.width);
        let mut attrs = attrs;
        let mut column = x;
        let mut i = 0;
        while let Some(ch) = text[i..].chars().next() {
            if column >= width {
                break;
            }
            if ch == ESC {
                if let Ok((decoded, skip)) = escape::decode(&text[i..], self.defaults) {
                    attrs = decoded;
                    i += skip;
                    continue;
                }
            }
            i += ch.len_utf8();
            self.set_cell(column, y, Cell::new(ch, attrs));
            column += 1;
        }
    }

    /// Reallocates the store. Contents are not migrated, a resize is always
    /// followed by a full render.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.cells = vec![Cell::default(); usize::from(width) * usize::from(height)];
        self.cursor = None;
    }

    /// Places the caret. It shows on the next flush.
    pub fn set_cursor(&mut self, x: i32, y: i32) {
        self.cursor = match (u16::try_from(x), u16::try_from(y)) {
            (Ok(x), Ok(y)) if x < self.width && y < self.height => Some((x, y)),
            _ => None,
        };
    }

    pub fn hide_cursor(&mut self) {
        self.cursor = None;
    }

    pub fn cursor(&self) -> Option<(u16, u16)> {
        self.cursor
    }

    /// Visible text of row `y`, for tests and debugging.
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Color, Face};
    use crate::escape::{ATTR_BOLD, ATTR_NA, ATTR_RESET, COLOR_RED, encode};

    #[test]
    fn set_cell_marks_dirty() {
        let mut surface = Surface::new(4, 2, Attributes::default());
        assert!(surface.cells().iter().all(|cell| !cell.is_dirty()));

        surface.set_cell(3, 1, Cell::new('x', Attributes::default()));
        let cell = surface.cell_mut(3, 1).unwrap();
        assert!(cell.is_dirty());
        assert_eq!(cell.glyph, 'x');
        cell.clear_dirty();
        assert!(!surface.cell(3, 1).unwrap().is_dirty());
        assert_eq!(surface.cells()[3 + 4].glyph, 'x');
    }

    #[test]
    fn out_of_bounds_writes_are_dropped() {
        let mut surface = Surface::new(2, 2, Attributes::default());
        surface.set_cell(2, 0, Cell::new('x', Attributes::default()));
        surface.set_cell(-1, 0, Cell::new('x', Attributes::default()));
        surface.set_cell(0, 2, Cell::new('x', Attributes::default()));
        assert!(surface.cells().iter().all(|cell| !cell.is_dirty()));
    }

    #[test]
    fn print_stops_at_right_edge() {
        let mut surface = Surface::new(5, 1, Attributes::default());
        surface.print(2, 0, Attributes::default(), "abcdef");
        assert_eq!(surface.row_text(0), "  abc");
        assert!(!surface.cell(1, 0).unwrap().is_dirty());
    }

    #[test]
    fn print_switches_attributes_inline() {
        let defaults = Attributes::colors(Color::White, Color::Black);
        let mut surface = Surface::new(6, 1, defaults);
        let red = encode(ATTR_BOLD, COLOR_RED, ATTR_NA).unwrap();
        let reset = encode(ATTR_RESET, ATTR_NA, ATTR_NA).unwrap();
        surface.print(0, 0, defaults, &format!("a{red}bc{reset}d"));

        assert_eq!(surface.row_text(0), "abcd  ");
        assert_eq!(surface.cell(0, 0).unwrap().attrs, defaults);
        let bold_red = surface.cell(1, 0).unwrap().attrs;
        assert_eq!(bold_red.fg.color, Some(Color::Red));
        assert!(bold_red.fg.bold);
        assert_eq!(bold_red.bg, Face::DEFAULT);
        assert_eq!(surface.cell(3, 0).unwrap().attrs, defaults);
    }

    #[test]
    fn print_keeps_malformed_escape_literally() {
        let mut surface = Surface::new(8, 1, Attributes::default());
        surface.print(0, 0, Attributes::default(), "\x1b[9zok");
        assert_eq!(surface.row_text(0), "\x1b[9zok  ");
    }

    #[test]
    fn resize_reallocates_clean_store() {
        let mut surface = Surface::new(3, 3, Attributes::default());
        surface.print(0, 0, Attributes::default(), "abc");
        surface.set_cursor(1, 1);
        surface.resize(5, 2);
        assert_eq!(surface.cells().len(), 10);
        assert!(surface.cells().iter().all(|cell| !cell.is_dirty()));
        assert_eq!(surface.cursor(), None);
    }

    #[test]
    fn cursor_outside_store_is_hidden() {
        let mut surface = Surface::new(3, 3, Attributes::default());
        surface.set_cursor(2, 2);
        assert_eq!(surface.cursor(), Some((2, 2)));
        surface.set_cursor(3, 0);
        assert_eq!(surface.cursor(), None);
        surface.set_cursor(0, -1);
        assert_eq!(surface.cursor(), None);
    }
}
