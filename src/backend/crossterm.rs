use std::io::{Stdout, Write, stdout};
use std::sync::Once;

use anyhow::Result;
use crossterm::{
    ExecutableCommand, QueueableCommand,
    cursor::{Hide, MoveTo, Show},
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    style::{Attribute, Color as TermColor, Print, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::debug;

use crate::backend::{Backend, EventSource};
use crate::color::{Attributes, Color, ColorLevel, Face, color_level};
use crate::event::TtkEvent;

static PANIC_HOOK: Once = Once::new();

/// Puts the terminal back into cooked mode on the main screen. Safe to call
/// more than once, meant for fatal exits where the toolkit can't deinit.
pub fn restore_terminal() -> Result<()> {
    let mut out = stdout();
    out.queue(SetAttribute(Attribute::Reset))?
        .queue(Show)?
        .queue(DisableMouseCapture)?
        .queue(LeaveAlternateScreen)?;
    out.flush()?;
    terminal::disable_raw_mode()?;
    Ok(())
}

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            // the terminal must be usable before the panic message prints
            let _ = restore_terminal();
            previous(info);
        }));
    });
}

fn term_color(color: Option<Color>) -> TermColor {
    match color {
        None => TermColor::Reset,
        Some(Color::Black) => TermColor::Black,
        Some(Color::Red) => TermColor::DarkRed,
        Some(Color::Green) => TermColor::DarkGreen,
        Some(Color::Yellow) => TermColor::DarkYellow,
        Some(Color::Blue) => TermColor::DarkBlue,
        Some(Color::Magenta) => TermColor::DarkMagenta,
        Some(Color::Cyan) => TermColor::DarkCyan,
        Some(Color::White) => TermColor::Grey,
    }
}

/// Control characters would move the terminal cursor behind our back.
fn printable(glyph: char) -> char {
    if glyph.is_control() { '?' } else { glyph }
}

/// Draws on the real terminal through crossterm, in the alternate screen.
pub struct CrosstermBackend {
    out: Stdout,
    colors: bool,
    /// Attributes the terminal currently has, `None` when unknown.
    style: Option<Attributes>,
    /// Where the terminal cursor sits after the last print.
    next: Option<(u16, u16)>,
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self {
            out: stdout(),
            colors: color_level() != ColorLevel::None,
            style: None,
            next: None,
        }
    }

    fn apply_face(&mut self, face: Face) -> Result<()> {
        if face.bold {
            self.out.queue(SetAttribute(Attribute::Bold))?;
        }
        if face.underline {
            self.out.queue(SetAttribute(Attribute::Underlined))?;
        }
        if face.reverse {
            self.out.queue(SetAttribute(Attribute::Reverse))?;
        }
        Ok(())
    }

    fn apply(&mut self, attrs: Attributes) -> Result<()> {
        if self.style == Some(attrs) {
            return Ok(());
        }
        self.out.queue(SetAttribute(Attribute::Reset))?;
        if self.colors {
            self.out
                .queue(SetForegroundColor(term_color(attrs.fg.color)))?
                .queue(SetBackgroundColor(term_color(attrs.bg.color)))?;
        }
        self.apply_face(attrs.fg)?;
        self.style = Some(attrs);
        Ok(())
    }
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for CrosstermBackend {
    fn init(&mut self) -> Result<()> {
        install_panic_hook();
        terminal::enable_raw_mode()?;
        self.out
            .execute(EnterAlternateScreen)?
            .execute(EnableMouseCapture)?;
        self.style = None;
        self.next = None;
        debug!(colors = self.colors, "terminal in raw mode");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.style = None;
        self.next = None;
        restore_terminal()
    }

    fn size(&self) -> Result<(u16, u16)> {
        Ok(terminal::size()?)
    }

    fn clear(&mut self, attrs: Attributes) -> Result<()> {
        self.apply(attrs)?;
        self.out.queue(Clear(ClearType::All))?;
        self.next = None;
        Ok(())
    }

    fn set_cell(&mut self, x: u16, y: u16, glyph: char, attrs: Attributes) -> Result<()> {
        self.apply(attrs)?;
        if self.next != Some((x, y)) {
            self.out.queue(MoveTo(x, y))?;
        }
        self.out.queue(Print(printable(glyph)))?;
        self.next = Some((x.saturating_add(1), y));
        Ok(())
    }

    fn set_cursor(&mut self, x: u16, y: u16) -> Result<()> {
        self.out.queue(MoveTo(x, y))?.queue(Show)?;
        self.next = Some((x, y));
        Ok(())
    }

    fn hide_cursor(&mut self) -> Result<()> {
        self.out.queue(Hide)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    fn events(&mut self) -> Result<Box<dyn EventSource>> {
        Ok(Box::new(CrosstermEvents))
    }
}

/// Reads events from the terminal, keeping key presses, mouse and resize.
pub struct CrosstermEvents;

impl EventSource for CrosstermEvents {
    fn next_event(&mut self) -> Result<TtkEvent> {
        loop {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => return Ok(TtkEvent::Key(key)),
                Event::Mouse(mouse) => return Ok(TtkEvent::Mouse(mouse)),
                Event::Resize(width, height) => return Ok(TtkEvent::Resize(width, height)),
                _ => {}
            }
        }
    }
}
