//! Color escape sequences embedded in plain strings.
//!
//! The wire format is `ESC [ field (; field)* m` where every field is a
//! decimal integer. Fields select an attribute (reset, bold, underline,
//! reverse), a foreground color (30 + index) or a background color
//! (40 + index).

use crate::color::{Attributes, Color};
use crate::error::EscapeError;

pub const ESC: char = '\x1b';

const PREFIX: &str = "\x1b[";
const TERMINATOR: char = 'm';

pub const ANSI_FG: i32 = 30;
pub const ANSI_BG: i32 = 40;

/// Field not present.
pub const ATTR_NA: i32 = -1;
pub const ATTR_RESET: i32 = 0;
pub const ATTR_BOLD: i32 = 1;
pub const ATTR_UNDERLINE: i32 = 3;
pub const ATTR_REVERSE: i32 = 7;

pub const COLOR_BLACK: i32 = 0;
pub const COLOR_RED: i32 = 1;
pub const COLOR_GREEN: i32 = 2;
pub const COLOR_YELLOW: i32 = 3;
pub const COLOR_BLUE: i32 = 4;
pub const COLOR_MAGENTA: i32 = 5;
pub const COLOR_CYAN: i32 = 6;
pub const COLOR_WHITE: i32 = 7;

/// Builds the escape sequence for an attribute, foreground and background.
/// Any of them may be [`ATTR_NA`], but not all three.
pub fn encode(attribute: i32, foreground: i32, background: i32) -> Result<String, EscapeError> {
    if attribute == ATTR_NA && foreground == ATTR_NA && background == ATTR_NA {
        return Err(EscapeError::InvalidColor);
    }

    let mut fields = Vec::with_capacity(3);
    match attribute {
        ATTR_NA => {}
        ATTR_RESET | ATTR_BOLD | ATTR_UNDERLINE | ATTR_REVERSE => fields.push(attribute),
        _ => return Err(EscapeError::InvalidAttribute),
    }
    match foreground {
        ATTR_NA => {}
        fg if Color::from_index(fg).is_some() => fields.push(fg + ANSI_FG),
        _ => return Err(EscapeError::InvalidForeground),
    }
    match background {
        ATTR_NA => {}
        bg if Color::from_index(bg).is_some() => fields.push(bg + ANSI_BG),
        _ => return Err(EscapeError::InvalidBackground),
    }

    let fields: Vec<String> = fields.iter().map(|field| field.to_string()).collect();
    Ok(format!("{PREFIX}{}{TERMINATOR}", fields.join(";")))
}

/// Decodes the escape sequence at the start of `text`, ignoring whatever
/// follows it. Returns the resulting attributes and the byte offset of the
/// first character past the sequence. A reset field yields `defaults`.
pub fn decode(text: &str, defaults: Attributes) -> Result<(Attributes, usize), EscapeError> {
    let body = text
        .strip_prefix(PREFIX)
        .ok_or(EscapeError::NotEscapeSequence)?;
    let end = body
        .find(TERMINATOR)
        .ok_or(EscapeError::NotEscapeSequence)?;

    let mut attrs = Attributes::default();
    for field in body[..end].split(';') {
        let n: i32 = field
            .parse()
            .map_err(|_| EscapeError::NotEscapeSequence)?;
        match n {
            ATTR_RESET => attrs = defaults,
            ATTR_BOLD => attrs.fg.bold = true,
            ATTR_UNDERLINE => attrs.fg.underline = true,
            ATTR_REVERSE => attrs.fg.reverse = true,
            n if (ANSI_FG..=ANSI_FG + COLOR_WHITE).contains(&n) => {
                attrs.fg.color = Color::from_index(n - ANSI_FG);
            }
            n if (ANSI_BG..=ANSI_BG + COLOR_WHITE).contains(&n) => {
                attrs.bg.color = Color::from_index(n - ANSI_BG);
            }
            _ => return Err(EscapeError::NotEscapeSequence),
        }
    }

    Ok((attrs, PREFIX.len() + end + TERMINATOR.len_utf8()))
}

/// Length in bytes of the well formed sequence at the start of `text`.
pub(crate) fn sequence_len(text: &str) -> Option<usize> {
    decode(text, Attributes::default()).ok().map(|(_, len)| len)
}

/// Walks the printable characters of `text`, skipping well formed sequences.
/// An escape character that does not start a sequence is printable.
fn visible_chars(text: &str, mut f: impl FnMut(char)) {
    let mut i = 0;
    while let Some(ch) = text[i..].chars().next() {
        if ch == ESC {
            if let Some(skip) = sequence_len(&text[i..]) {
                i += skip;
                continue;
            }
        }
        f(ch);
        i += ch.len_utf8();
    }
}

/// Number of characters that occupy a column once sequences are removed.
pub fn visible_len(text: &str) -> usize {
    let mut len = 0;
    visible_chars(text, |_| len += 1);
    len
}

/// Returns `text` with all well formed sequences removed.
pub fn strip(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    visible_chars(text, |ch| plain.push(ch));
    plain
}
