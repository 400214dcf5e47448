use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};

use anyhow::Result;
use crossbeam::channel::{self, Receiver, Sender};
use crossterm::event::KeyEvent;
use smol::channel::TrySendError;
use tracing::{debug, error, info, warn};

use crate::backend::{Backend, EventSource};
use crate::color::Attributes;
use crate::config::ToolkitConfig;
use crate::error::TtkError;
use crate::event::{Key, TtkEvent};
use crate::tui::{Surface, Widget, WidgetRegistry, Window};

/// Identifies a window for the lifetime of a toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub(crate) usize);

/// Application side of a window. All callbacks run on the worker and must
/// not make blocking toolkit calls.
pub trait Controller: 'static {
    /// Called once when the window is created, usually to add widgets.
    fn init(&mut self, window: &mut Window) -> Result<()>;

    /// Called on every full render, before the widgets paint.
    fn render(&mut self, _window: &mut Window) -> Result<()> {
        Ok(())
    }

    /// Receives keys the application passed to [`Toolkit::forward_key`].
    fn key_handler(&mut self, _window: &mut Window, _key: &Key) -> Result<()> {
        Ok(())
    }
}

type Task = Box<dyn FnOnce(&mut Context) + Send>;

struct Queued {
    task: Task,
    /// Queued from another thread, holding one permit.
    foreign: bool,
}

struct ManagedWindow {
    window: Window,
    controller: Box<dyn Controller>,
}

#[derive(Debug, Default)]
struct RawState {
    raw: bool,
    listener: bool,
}

fn lock(state: &Mutex<RawState>) -> MutexGuard<'_, RawState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything the worker owns. Queued tasks get exclusive access to it.
pub struct Context {
    backend: Option<Box<dyn Backend>>,
    width: u16,
    height: u16,
    defaults: Attributes,
    windows: BTreeMap<WindowId, ManagedWindow>,
    next_window: usize,
    /// Focused window, only ever an id so focus never owns a window.
    focus: Option<WindowId>,
    previous: Option<WindowId>,
    registry: Rc<RefCell<WidgetRegistry>>,
    keys: smol::channel::Sender<Key>,
    dropped: Arc<AtomicU64>,
    state: Arc<Mutex<RawState>>,
}

impl Context {
    fn new(keys: smol::channel::Sender<Key>, dropped: Arc<AtomicU64>, state: Arc<Mutex<RawState>>) -> Self {
        Context {
            backend: None,
            width: 0,
            height: 0,
            defaults: Attributes::default(),
            windows: BTreeMap::new(),
            next_window: 0,
            focus: None,
            previous: None,
            registry: Rc::new(RefCell::new(WidgetRegistry::with_builtins())),
            keys,
            dropped,
            state,
        }
    }

    fn install(&mut self, backend: Box<dyn Backend>, width: u16, height: u16, defaults: Attributes) {
        self.backend = Some(backend);
        self.width = width;
        self.height = height;
        self.defaults = defaults;
    }

    /// Terminal size as of the last init or resize.
    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn defaults(&self) -> Attributes {
        self.defaults
    }

    pub fn focused(&self) -> Option<WindowId> {
        self.focus
    }

    pub fn previous(&self) -> Option<WindowId> {
        self.previous
    }

    pub fn window(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.get_mut(&id).map(|managed| &mut managed.window)
    }

    pub fn register_widget<F>(&mut self, kind: &str, constructor: F)
    where
        F: Fn(&Surface, i32, i32) -> Result<Box<dyn Widget>> + 'static,
    {
        self.registry.borrow_mut().register(kind, constructor);
    }

    /// Creates a window the size of the terminal and lets the controller
    /// populate it. The window is dropped if the controller fails.
    pub fn new_window(&mut self, mut controller: Box<dyn Controller>) -> Result<WindowId> {
        let id = WindowId(self.next_window);
        self.next_window += 1;

        let mut window = Window::new(id, self.width, self.height, self.defaults, self.registry.clone());
        controller.init(&mut window)?;
        self.windows.insert(id, ManagedWindow { window, controller });
        info!(window = id.0, "window created");
        Ok(id)
    }

    /// Makes `id` the visible window and renders it. Unknown or already
    /// focused windows are ignored.
    pub fn focus_window(&mut self, id: WindowId) {
        if !self.windows.contains_key(&id) || self.focus == Some(id) {
            return;
        }
        self.previous = self.focus;
        self.focus = Some(id);
        debug!(window = id.0, previous = ?self.previous.map(|p| p.0), "focus window");
        self.resize_and_render(Some(id));
    }

    pub fn focus_previous_window(&mut self) {
        if let Some(previous) = self.previous {
            self.focus_window(previous);
        }
    }

    /// Clears the terminal, picks up its size and repaints `id` from scratch.
    pub fn resize_and_render(&mut self, id: Option<WindowId>) {
        let Some(id) = id else {
            return;
        };
        if let Some(backend) = self.backend.as_mut() {
            if let Err(err) = backend.clear(self.defaults) {
                error!("clear failed: {err:#}");
            }
            match backend.size() {
                Ok((width, height)) => {
                    self.width = width;
                    self.height = height;
                }
                Err(err) => error!("size failed: {err:#}"),
            }
        }

        let Some(managed) = self.windows.get_mut(&id) else {
            return;
        };
        managed.window.resize(self.width, self.height);
        if let Err(err) = managed.controller.render(&mut managed.window) {
            error!(window = id.0, "controller render failed: {err:#}");
        }
        managed.window.render();
        self.flush();
    }

    /// Copies the dirty cells of the focused window to the terminal.
    pub fn flush(&mut self) {
        let Some(id) = self.focus else {
            return;
        };
        let (Some(backend), Some(managed)) = (self.backend.as_mut(), self.windows.get_mut(&id)) else {
            return;
        };
        match write_dirty(backend.as_mut(), managed.window.surface_mut()) {
            Ok(written) => debug!(window = id.0, written, "flush"),
            Err(err) => error!(window = id.0, "flush failed: {err:#}"),
        }
    }

    fn dispatch_key(&mut self, event: KeyEvent) {
        let mut window = None;
        let mut widget = None;
        if let Some(id) = self.focus {
            if let Some(managed) = self.windows.get_mut(&id) {
                let (used, origin) = managed.window.key_handler(&event);
                if used {
                    self.flush();
                    return;
                }
                window = Some(id);
                widget = origin;
            }
        }

        self.send_key(Key {
            code: event.code,
            modifiers: event.modifiers,
            window,
            widget,
        });
    }

    /// Hands a key to the application without ever blocking the worker. A
    /// full channel drops the new key.
    fn send_key(&self, key: Key) {
        match self.keys.try_send(key) {
            Ok(()) => {}
            Err(TrySendError::Full(key)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(code = ?key.code, dropped, "key channel full, dropping key");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Runs the controller key handler of the window the key came from.
    pub fn forward_key(&mut self, key: &Key) {
        let Some(id) = key.window else {
            return;
        };
        let Some(managed) = self.windows.get_mut(&id) else {
            return;
        };
        if let Err(err) = managed.controller.key_handler(&mut managed.window, key) {
            error!(window = id.0, "controller key handler failed: {err:#}");
        }
    }

    fn deinit(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            if let Err(err) = backend.close() {
                error!("closing terminal failed: {err:#}");
            }
        }
        self.focus = None;
        self.previous = None;
        self.windows.clear();
        lock(&self.state).raw = false;
        info!("terminal restored");
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if self.backend.is_some() {
            warn!("toolkit dropped while initialized");
            self.deinit();
        }
    }
}

fn write_dirty(backend: &mut dyn Backend, surface: &mut Surface) -> Result<usize> {
    let mut written = 0;
    for y in 0..surface.height() {
        for x in 0..surface.width() {
            let Some(cell) = surface.cell_mut(i32::from(x), i32::from(y)) else {
                continue;
            };
            if !cell.is_dirty() {
                continue;
            }
            cell.clear_dirty();
            backend.set_cell(x, y, cell.glyph, cell.attrs)?;
            written += 1;
        }
    }
    match surface.cursor() {
        Some((x, y)) => backend.set_cursor(x, y)?,
        None => backend.hide_cursor()?,
    }
    backend.flush()?;
    Ok(written)
}

fn run_worker(mut context: Context, tasks: Receiver<Queued>, permits: Receiver<()>) {
    for queued in tasks.iter() {
        if queued.foreign {
            // the producer took its permit before sending
            let _ = permits.try_recv();
        }
        (queued.task)(&mut context);
    }
    debug!("worker exiting");
}

struct Shared {
    /// Single FIFO for every producer, so tasks run in the order queued.
    tasks: Sender<Queued>,
    /// Bounds how many foreign tasks may wait. The worker itself never
    /// takes a permit, so it never waits on its own queue.
    permits: Sender<()>,
    worker: ThreadId,
    keys: smol::channel::Receiver<Key>,
    dropped: Arc<AtomicU64>,
    state: Arc<Mutex<RawState>>,
}

/// Handle to the toolkit. Cheap to clone, every clone talks to the same
/// worker. The worker exits once the last handle is dropped.
#[derive(Clone)]
pub struct Toolkit {
    shared: Arc<Shared>,
}

impl Toolkit {
    /// Starts the worker. Nothing touches the terminal until [`Toolkit::init`].
    pub fn new(config: ToolkitConfig) -> Result<Self> {
        let (tasks_tx, tasks_rx) = channel::unbounded();
        let (permits_tx, permits_rx) = channel::bounded(config.queue_capacity.max(1));
        let (keys_tx, keys_rx) = smol::channel::bounded(config.key_capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        let state = Arc::new(Mutex::new(RawState::default()));

        let worker = {
            let dropped = dropped.clone();
            let state = state.clone();
            thread::Builder::new()
                .name("ttk-worker".to_string())
                .spawn(move || {
                    let context = Context::new(keys_tx, dropped, state);
                    run_worker(context, tasks_rx, permits_rx);
                })?
        };

        Ok(Self {
            shared: Arc::new(Shared {
                tasks: tasks_tx,
                permits: permits_tx,
                worker: worker.thread().id(),
                keys: keys_rx,
                dropped,
                state,
            }),
        })
    }

    fn on_worker(&self) -> bool {
        thread::current().id() == self.shared.worker
    }

    /// Queues `task` on the worker. Blocks only while a foreign caller finds
    /// the queue full.
    pub fn queue<F>(&self, task: F)
    where
        F: FnOnce(&mut Context) + Send + 'static,
    {
        let foreign = !self.on_worker();
        let sent = (!foreign || self.shared.permits.send(()).is_ok())
            && self
                .shared
                .tasks
                .send(Queued {
                    task: Box::new(task),
                    foreign,
                })
                .is_ok();
        if !sent {
            warn!("worker gone, task dropped");
        }
    }

    /// Runs `f` on the worker and waits for its result.
    fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Context) -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.on_worker() {
            return Err(TtkError::WorkerContext.into());
        }
        let (reply_tx, reply_rx) = channel::bounded(1);
        self.queue(move |cx| {
            let _ = reply_tx.send(f(cx));
        });
        reply_rx.recv().map_err(|_| TtkError::WorkerGone.into())
    }

    /// Takes over the terminal through `backend`. Fails if the toolkit is
    /// already initialized. The input listener is started on first init.
    pub fn init<B: Backend + 'static>(&self, mut backend: B) -> Result<()> {
        let mut state = lock(&self.shared.state);
        if state.raw {
            return Err(TtkError::AlreadyInitialized.into());
        }

        let defaults = Attributes::default();
        backend.init()?;
        backend.hide_cursor()?;
        backend.clear(defaults)?;
        let (width, height) = backend.size()?;
        backend.flush()?;

        if !state.listener {
            let events = backend.events()?;
            spawn_listener(Arc::downgrade(&self.shared), events)?;
            state.listener = true;
        }
        state.raw = true;
        drop(state);

        let backend: Box<dyn Backend> = Box::new(backend);
        self.queue(move |cx| cx.install(backend, width, height, defaults));
        info!(width, height, "terminal initialized");
        Ok(())
    }

    /// Restores the terminal and forgets every window. Ordered after all
    /// work queued before it, returns once it ran.
    pub fn deinit(&self) -> Result<()> {
        self.call(Context::deinit)
    }

    /// Creates a window bound to the controller `make` builds. The
    /// controller is built on the worker so it may hold worker-only state.
    pub fn new_window<F, C>(&self, make: F) -> Result<WindowId>
    where
        F: FnOnce() -> C + Send + 'static,
        C: Controller,
    {
        self.call(move |cx| cx.new_window(Box::new(make())))?
    }

    pub fn default_attributes(&self) -> Result<Attributes> {
        self.call(|cx| cx.defaults())
    }

    pub fn focus(&self, id: WindowId) {
        self.queue(move |cx| cx.focus_window(id));
    }

    pub fn focus_previous_window(&self) {
        self.queue(Context::focus_previous_window);
    }

    pub fn flush(&self) {
        self.queue(Context::flush);
    }

    pub fn focus_next(&self, id: WindowId) {
        self.update_window(id, Window::focus_next);
    }

    pub fn focus_previous(&self, id: WindowId) {
        self.update_window(id, Window::focus_previous);
    }

    /// Runs `f` on a window and flushes.
    pub fn update_window<F>(&self, id: WindowId, f: F)
    where
        F: FnOnce(&mut Window) + Send + 'static,
    {
        self.queue(move |cx| {
            if let Some(window) = cx.window(id) {
                f(window);
            }
            cx.flush();
        });
    }

    /// Passes a key the application did not handle to the controller of the
    /// window it came from.
    pub fn forward_key(&self, key: Key) {
        self.queue(move |cx| {
            cx.forward_key(&key);
            cx.flush();
        });
    }

    pub fn register_widget<F>(&self, kind: &str, constructor: F)
    where
        F: Fn(&Surface, i32, i32) -> Result<Box<dyn Widget>> + Send + 'static,
    {
        let kind = kind.to_string();
        self.queue(move |cx| cx.register_widget(&kind, constructor));
    }

    /// Keys no widget consumed.
    pub fn keys(&self) -> smol::channel::Receiver<Key> {
        self.shared.keys.clone()
    }

    /// Keys dropped because the key channel was full.
    pub fn dropped_keys(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    pub fn is_initialized(&self) -> bool {
        lock(&self.shared.state).raw
    }
}

fn spawn_listener(shared: Weak<Shared>, mut events: Box<dyn EventSource>) -> Result<()> {
    thread::Builder::new()
        .name("ttk-listener".to_string())
        .spawn(move || {
            loop {
                let event = match events.next_event() {
                    Ok(event) => event,
                    Err(err) => {
                        warn!("event source failed, listener exiting: {err:#}");
                        return;
                    }
                };
                let Some(shared) = shared.upgrade() else {
                    return;
                };
                let toolkit = Toolkit { shared };
                match event {
                    TtkEvent::Key(key) => toolkit.queue(move |cx| cx.dispatch_key(key)),
                    TtkEvent::Resize(..) => toolkit.queue(|cx| cx.resize_and_render(cx.focused())),
                    TtkEvent::Mouse(_) => {}
                }
            }
        })?;
    Ok(())
}
