use std::cell::RefCell;
use std::fs::OpenOptions;
use std::rc::Rc;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use ttk::backend::crossterm::restore_terminal;
use ttk::{
    Attributes, Color, Controller, CrosstermBackend, Justify, Key, Label, List, Location,
    Toolkit, ToolkitConfig, WidgetId, Window,
};

fn main() -> Result<()> {
    let config = ToolkitConfig::from_env();
    let _guard = init_logging(&config)?;
    info!("ttk demo starting");

    let result = run(config);
    if result.is_err() {
        // deinit may not have happened
        let _ = restore_terminal();
    }

    info!("ttk demo shutting down");
    result
}

/// Logs go to a file, the terminal belongs to the toolkit.
fn init_logging(config: &ToolkitConfig) -> Result<WorkerGuard> {
    let path = config.log_file.as_deref().unwrap_or("ttk.log");
    let log_file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(true)
        .open(path)?;
    let (writer, guard) = tracing_appender::non_blocking(log_file);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

fn run(config: ToolkitConfig) -> Result<()> {
    let toolkit = Toolkit::new(config)?;
    toolkit.init(CrosstermBackend::new())?;

    // Always restore the terminal, even if the key loop fails
    let result = key_loop(&toolkit);
    toolkit.deinit()?;
    result
}

fn key_loop(toolkit: &Toolkit) -> Result<()> {
    let second = toolkit.new_window(SecondWindow::default)?;
    let main = toolkit.new_window(MainWindow::default)?;
    toolkit.focus(main);

    let keys = toolkit.keys();
    smol::block_on(async {
        while let Ok(key) = keys.recv().await {
            match key.code {
                KeyCode::F(1) => toolkit.focus(main),
                KeyCode::F(2) => toolkit.focus(second),
                KeyCode::Char('q') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                KeyCode::Enter => {
                    if let Some(window) = key.window {
                        toolkit.focus_next(window);
                    }
                }
                _ => toolkit.forward_key(key),
            }
        }
    });

    let dropped = toolkit.dropped_keys();
    if dropped > 0 {
        warn!(dropped, "keys were dropped");
    }
    Ok(())
}

fn paint_label(window: &mut Window, id: WidgetId, attrs: Attributes) {
    window.with_widget(id, |label: &mut Label, _| label.set_attributes(attrs));
}

#[derive(Default)]
struct MainWindow {
    targets: Vec<Rc<RefCell<String>>>,
    list: Option<WidgetId>,
}

impl MainWindow {
    fn edit(&mut self, window: &mut Window, x: i32, y: i32, width: i32, text: &str) -> Result<()> {
        let target = Rc::new(RefCell::new(text.to_string()));
        window.add_edit(x, y, width, target.clone())?;
        self.targets.push(target);
        Ok(())
    }
}

impl Controller for MainWindow {
    fn init(&mut self, window: &mut Window) -> Result<()> {
        let label = window.add_label(2, 2, "hello world")?;
        paint_label(window, label, Attributes::colors(Color::Yellow, Color::Blue));

        self.edit(window, 2, 4, -2, "12345")?;
        self.edit(window, 4, 5, -4, "")?;
        self.edit(window, 3, 6, -8, "")?;
        self.edit(window, 0, 8, 0, "")?;

        let list = window.add_list(10, 10, 0, -2)?;
        window.with_widget(list, |list: &mut List, _| {
            list.append("this is a list box with some content");
        });
        self.list = Some(list);

        let title = window.add_status(0, Justify::Center, format!("title {}", 12))?;
        paint_label(window, title, Attributes::colors(Color::Black, Color::Green));

        let status = window.add_status(-1, Justify::Right, format!("status: {}", "OMG"))?;
        paint_label(window, status, Attributes::colors(Color::Black, Color::Yellow));
        Ok(())
    }

    fn key_handler(&mut self, window: &mut Window, key: &Key) -> Result<()> {
        let Some(list) = self.list else {
            return Ok(());
        };
        window.with_widget(list, |list: &mut List, surface| match key.code {
            KeyCode::PageUp => list.display(surface, Location::Up),
            KeyCode::PageDown => list.display(surface, Location::Down),
            code => {
                list.append(format!("unhandled key {code:?}"));
                list.display(surface, Location::Current);
            }
        });
        Ok(())
    }
}

#[derive(Default)]
struct SecondWindow {
    target: Rc<RefCell<String>>,
}

impl Controller for SecondWindow {
    fn init(&mut self, window: &mut Window) -> Result<()> {
        let label = window.add_label(2, 2, "hello world from #2")?;
        paint_label(window, label, Attributes::colors(Color::Red, Color::Cyan));

        self.target.replace("abc".to_string());
        window.add_edit(2, 14, -2, self.target.clone())?;
        Ok(())
    }
}
