use supports_color::Stream;

/// The eight basic terminal colors, in ANSI order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl Color {
    pub const ALL: [Color; 8] = [
        Color::Black,
        Color::Red,
        Color::Green,
        Color::Yellow,
        Color::Blue,
        Color::Magenta,
        Color::Cyan,
        Color::White,
    ];

    /// Palette index, 0 for black through 7 for white.
    pub const fn index(self) -> i32 {
        self as i32
    }

    pub fn from_index(index: i32) -> Option<Color> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Color::ALL.get(i).copied())
    }
}

/// Color and text attributes of one plane (foreground or background) of a cell.
///
/// `color: None` means the terminal's default color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Face {
    pub color: Option<Color>,
    pub bold: bool,
    pub underline: bool,
    pub reverse: bool,
}

impl Face {
    pub const DEFAULT: Face = Face {
        color: None,
        bold: false,
        underline: false,
        reverse: false,
    };

    pub const fn color(color: Color) -> Self {
        Face {
            color: Some(color),
            ..Face::DEFAULT
        }
    }
}

/// Foreground and background of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Attributes {
    pub fg: Face,
    pub bg: Face,
}

impl Attributes {
    pub const fn new(fg: Face, bg: Face) -> Self {
        Attributes { fg, bg }
    }

    pub const fn colors(fg: Color, bg: Color) -> Self {
        Attributes {
            fg: Face::color(fg),
            bg: Face::color(bg),
        }
    }

    /// Swaps foreground and background, used for status bars and edit fields.
    pub const fn flipped(self) -> Self {
        Attributes {
            fg: self.bg,
            bg: self.fg,
        }
    }
}

/// Detect the level of color support
pub fn color_level() -> ColorLevel {
    match supports_color::on(Stream::Stdout) {
        Some(level) => match level.has_16m {
            true => ColorLevel::TrueColor,
            false => match level.has_256 {
                true => ColorLevel::Color256,
                false => ColorLevel::Color16,
            },
        },
        None => ColorLevel::None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorLevel {
    /// No color support
    None,
    /// 16 basic colors
    Color16,
    /// 256 ANSI colors
    Color256,
    /// True color (24-bit RGB)
    TrueColor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_indices_round_trip() {
        for color in Color::ALL {
            assert_eq!(Color::from_index(color.index()), Some(color));
        }
        assert_eq!(Color::from_index(-1), None);
        assert_eq!(Color::from_index(8), None);
    }

    #[test]
    fn flipped_swaps_planes() {
        let attrs = Attributes::colors(Color::Yellow, Color::Blue);
        let flipped = attrs.flipped();
        assert_eq!(flipped.fg, Face::color(Color::Blue));
        assert_eq!(flipped.bg, Face::color(Color::Yellow));
    }

    #[test]
    fn default_is_terminal_default() {
        let attrs = Attributes::default();
        assert_eq!(attrs.fg, Face::DEFAULT);
        assert_eq!(attrs.bg, Face::DEFAULT);
    }
}
