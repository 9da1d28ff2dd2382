//! Thread-separated hosting of a visual element.
//!
//! `ThreadSeparatedHost` is the node that sits in the parent thread's tree. Loading it
//! inserts a [`HostVisual`] placeholder, spawns a dedicated thread, builds the hosted element
//! there through an [`ElementFactory`], binds a [`VisualTarget`] to the placeholder and then
//! parks the thread in its own [`DispatcherLoop`]. Layout and property access from the
//! parent thread are marshalled onto that loop.
//!
//! # Blocking behaviour
//! - `load` waits (unbounded) for the hosted thread to finish wiring the bridge.
//! - `measure_override` waits at most [`HostConfig::measure_timeout`].
//! - `arrange_override` and property writes never wait.

use parking_lot::{Mutex, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

use crate::bridge::{CompositionAnchor, CompositionHandle, CompositionTarget, HostVisual, VisualTarget};
use crate::config::HostConfig;
use crate::dispatcher::{panic_message, Dispatcher, DispatcherLoop, DispatcherState};
use crate::element::{ElementFactory, HostedElement};
use crate::error::{DispatchError, HostError, Result};
use crate::gate::{ready_gate, ReadySignal};
use crate::layout::Size;
use crate::parent::ParentThread;
use crate::property::{Property, PropertyProxy};

/// Lifecycle of the dedicated hosted thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostedThreadState {
    NotStarted,
    Running,
    ShuttingDown,
    Stopped,
}

/// State owned by the hosted thread's loop.
pub struct HostedState<E: HostedElement> {
    target: VisualTarget<E>,
}

impl<E: HostedElement> HostedState<E> {
    pub fn element(&self) -> Option<&E> {
        self.target.root()
    }

    pub fn element_mut(&mut self) -> Option<&mut E> {
        self.target.root_mut()
    }

    pub fn target(&self) -> &VisualTarget<E> {
        &self.target
    }
}

impl<E: HostedElement> DispatcherState for HostedState<E> {
    fn after_dispatch(&mut self) {
        let dirty = self.target.root().is_some_and(|root| root.is_visual_dirty());
        if dirty {
            if let Some(composition) = self.target.render() {
                trace!(revision = composition.revision, "hosted element composed");
            }
        }
    }
}

pub type HostedDispatcher<E> = Dispatcher<HostedState<E>>;

struct Connection<E: HostedElement> {
    generation: u64,
    dispatcher: HostedDispatcher<E>,
}

/// Shared view of the current connection, used by property proxies.
pub(crate) struct HostLink<E: HostedElement> {
    connection: RwLock<Option<Connection<E>>>,
    generation: AtomicU64,
}

impl<E: HostedElement> HostLink<E> {
    fn new() -> Self {
        Self {
            connection: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn connect(&self, generation: u64, dispatcher: HostedDispatcher<E>) {
        *self.connection.write() = Some(Connection {
            generation,
            dispatcher,
        });
    }

    fn disconnect(&self) -> Option<HostedDispatcher<E>> {
        self.connection.write().take().map(|c| c.dispatcher)
    }

    pub(crate) fn dispatcher(&self) -> Option<HostedDispatcher<E>> {
        self.connection.read().as_ref().map(|c| c.dispatcher.clone())
    }

    /// Dispatcher plus the load generation it belongs to.
    pub(crate) fn connection(&self) -> Option<(u64, HostedDispatcher<E>)> {
        self.connection
            .read()
            .as_ref()
            .map(|c| (c.generation, c.dispatcher.clone()))
    }
}

struct LayoutRequest {
    measure_valid: AtomicBool,
    on_invalidate: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
}

impl LayoutRequest {
    fn invalidate_measure(&self) {
        self.measure_valid.store(false, Ordering::Release);
        let callback = self.on_invalidate.lock().clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}

/// Parent-tree node whose content is a [`HostedElement`] running on its own thread.
pub struct ThreadSeparatedHost<F: ElementFactory> {
    factory: Arc<F>,
    parent: Arc<dyn ParentThread>,
    config: HostConfig,
    anchor: Option<HostVisual>,
    link: Arc<HostLink<F::Element>>,
    thread_state: Arc<Mutex<HostedThreadState>>,
    thread: Option<JoinHandle<()>>,
    layout: Arc<LayoutRequest>,
    loaded_handlers: Vec<Box<dyn FnMut() + Send>>,
}

impl<F: ElementFactory> ThreadSeparatedHost<F> {
    pub fn new(factory: F, parent: Arc<dyn ParentThread>, config: HostConfig) -> Self {
        Self {
            factory: Arc::new(factory),
            parent,
            config,
            anchor: None,
            link: Arc::new(HostLink::new()),
            thread_state: Arc::new(Mutex::new(HostedThreadState::NotStarted)),
            thread: None,
            layout: Arc::new(LayoutRequest {
                measure_valid: AtomicBool::new(true),
                on_invalidate: Mutex::new(None),
            }),
            loaded_handlers: Vec::new(),
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn thread_state(&self) -> HostedThreadState {
        *self.thread_state.lock()
    }

    /// Dispatcher of the hosted thread; `Some` exactly while the bridge is connected.
    pub fn hosted_dispatcher(&self) -> Option<HostedDispatcher<F::Element>> {
        self.link.dispatcher()
    }

    pub fn is_connected(&self) -> bool {
        self.link.dispatcher().is_some()
    }

    pub fn anchor(&self) -> Option<&HostVisual> {
        self.anchor.as_ref()
    }

    pub fn logical_children(&self) -> impl Iterator<Item = &HostVisual> {
        self.anchor.iter()
    }

    /// Register a handler fired after every successful `load`.
    pub fn on_loaded(&mut self, handler: impl FnMut() + Send + 'static) {
        self.loaded_handlers.push(Box::new(handler));
    }

    /// Register the framework's measure-invalidation callback. Runs on the parent thread.
    pub fn on_invalidate_measure(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.layout.on_invalidate.lock() = Some(Arc::new(callback));
    }

    pub fn is_measure_valid(&self) -> bool {
        self.layout.measure_valid.load(Ordering::Acquire)
    }

    /// True once per remeasure request posted since the last call or measure pass.
    pub fn take_measure_request(&self) -> bool {
        !self.layout.measure_valid.swap(true, Ordering::AcqRel)
    }

    /// Typed proxy for one property of the hosted element.
    pub fn property<T>(&self, property: Property<F::Element, T>) -> PropertyProxy<F::Element, T>
    where
        T: Clone + PartialEq + Default + Send + 'static,
    {
        PropertyProxy::new(property, self.link.clone())
    }

    /// Create the bridge and start the hosted thread. No-op while a bridge exists.
    ///
    /// Blocks until the hosted thread has wired its target, or has given up because the
    /// factory produced nothing.
    pub fn load(&mut self) -> Result<()> {
        if self.anchor.is_some() {
            trace!("load skipped: bridge already exists");
            return Ok(());
        }

        let anchor = HostVisual::new();
        let handle = anchor.composition_handle();
        self.attach_anchor(anchor);

        if self.parent.is_design_mode() {
            debug!("design mode: bridge created without a hosted thread");
            return Ok(());
        }

        let generation = self.link.next_generation();
        let thread_state = Arc::new(Mutex::new(HostedThreadState::NotStarted));
        self.thread_state = thread_state.clone();

        let (signal, gate) = ready_gate();
        let context = ThreadContext {
            factory: self.factory.clone(),
            parent: self.parent.clone(),
            layout: self.layout.clone(),
            thread_state,
            name: self.config.thread_name.clone(),
            elevate_priority: self.config.elevate_priority,
        };

        let spawned = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || run_hosted_thread(context, handle, signal));

        match spawned {
            Ok(join_handle) => self.thread = Some(join_handle),
            Err(e) => {
                self.detach_anchor();
                return Err(HostError::Spawn(e));
            }
        }

        match gate.wait() {
            Some(dispatcher) => {
                self.link.connect(generation, dispatcher);
                info!(thread = %self.config.thread_name, "hosted element loaded");
                for handler in &mut self.loaded_handlers {
                    handler();
                }
            }
            None => {
                warn!(
                    thread = %self.config.thread_name,
                    "no hosted element; bridge stays unconnected"
                );
            }
        }
        Ok(())
    }

    /// Stop the hosted loop and remove the bridge. No-op when nothing is loaded.
    ///
    /// The hosted thread is not joined: on return its loop accepts no new work, but the
    /// thread itself may still be unwinding.
    pub fn unload(&mut self) {
        if self.anchor.is_none() {
            return;
        }

        if let Some(dispatcher) = self.link.disconnect() {
            *self.thread_state.lock() = HostedThreadState::ShuttingDown;
            dispatcher.begin_invoke_shutdown();
        }
        self.detach_anchor();
        self.thread.take();
        debug!(thread = %self.config.thread_name, "hosted element unloaded");
    }

    /// Measure the hosted element, waiting at most the configured timeout.
    ///
    /// Returns [`Size::ZERO`] without blocking when nothing is hosted, and [`Size::ZERO`]
    /// when the hosted loop does not answer in time; the next layout pass retries.
    pub fn measure_override(&self, constraint: Size) -> Size {
        self.layout.measure_valid.store(true, Ordering::Release);
        let Some(dispatcher) = self.link.dispatcher() else {
            return Size::ZERO;
        };

        let operation = dispatcher.invoke_async(move |state: &mut HostedState<F::Element>| {
            state
                .element_mut()
                .map(|element| element.measure(constraint))
                .unwrap_or(Size::ZERO)
        });

        match operation.and_then(|op| op.wait_timeout(self.config.measure_timeout)) {
            Ok(size) => size,
            Err(DispatchError::Timeout(timeout)) => {
                debug!(?timeout, "measure timed out; reporting zero size");
                Size::ZERO
            }
            Err(e) => {
                warn!(error = %e, "measure dispatch failed");
                Size::ZERO
            }
        }
    }

    /// Queue an arrange pass on the hosted thread and return `final_size` immediately.
    pub fn arrange_override(&self, final_size: Size) -> Size {
        if let Some(dispatcher) = self.link.dispatcher() {
            let queued = dispatcher.begin_invoke(move |state: &mut HostedState<F::Element>| {
                if let Some(element) = state.element_mut() {
                    element.arrange(final_size);
                }
            });
            if let Err(e) = queued {
                warn!(error = %e, "arrange dispatch failed");
            }
        }
        final_size
    }

    /// Run `work` against the hosted element and wait for the result.
    ///
    /// `Ok(None)` when nothing is hosted.
    pub fn invoke_on_element<T, W>(&self, work: W) -> Result<Option<T>>
    where
        T: Send + 'static,
        W: FnOnce(&mut F::Element) -> T + Send + 'static,
    {
        let Some(dispatcher) = self.link.dispatcher() else {
            return Ok(None);
        };
        let value = dispatcher.invoke(move |state: &mut HostedState<F::Element>| {
            state.element_mut().map(work)
        })?;
        Ok(value)
    }

    /// Queue `work` against the hosted element. Dropped when nothing is hosted.
    pub fn begin_invoke_on_element<W>(&self, work: W) -> Result<()>
    where
        W: FnOnce(&mut F::Element) + Send + 'static,
    {
        let Some(dispatcher) = self.link.dispatcher() else {
            return Ok(());
        };
        dispatcher.begin_invoke(move |state: &mut HostedState<F::Element>| {
            if let Some(element) = state.element_mut() {
                work(element);
            }
        })?;
        Ok(())
    }
}

impl<F: ElementFactory> CompositionAnchor for ThreadSeparatedHost<F> {
    fn attach_anchor(&mut self, anchor: HostVisual) {
        debug_assert!(self.anchor.is_none(), "host already holds an anchor");
        self.anchor = Some(anchor);
    }

    fn detach_anchor(&mut self) -> Option<HostVisual> {
        self.anchor.take()
    }

    fn visual_children_count(&self) -> usize {
        usize::from(self.anchor.is_some())
    }

    fn visual_child(&self, index: usize) -> Option<&HostVisual> {
        match index {
            0 => self.anchor.as_ref(),
            _ => None,
        }
    }
}

impl<F: ElementFactory> Drop for ThreadSeparatedHost<F> {
    fn drop(&mut self) {
        self.unload();
    }
}

struct ThreadContext<F: ElementFactory> {
    factory: Arc<F>,
    parent: Arc<dyn ParentThread>,
    layout: Arc<LayoutRequest>,
    thread_state: Arc<Mutex<HostedThreadState>>,
    name: String,
    elevate_priority: bool,
}

fn run_hosted_thread<F: ElementFactory>(
    context: ThreadContext<F>,
    handle: CompositionHandle,
    signal: ReadySignal<HostedDispatcher<F::Element>>,
) {
    let name = context.name.as_str();
    if context.elevate_priority {
        elevate_current_thread_priority(name);
    }

    let created = panic::catch_unwind(AssertUnwindSafe(|| context.factory.create_element()));
    let element = match created {
        Ok(Ok(Some(element))) => element,
        Ok(Ok(None)) => {
            debug!(thread = %name, "factory produced no element; hosted thread exiting");
            *context.thread_state.lock() = HostedThreadState::Stopped;
            return;
        }
        Ok(Err(e)) => {
            error!(thread = %name, error = %format!("{e:#}"), "hosted element factory failed");
            *context.thread_state.lock() = HostedThreadState::Stopped;
            return;
        }
        Err(payload) => {
            error!(
                thread = %name,
                panic = %panic_message(payload.as_ref()),
                "hosted element factory panicked"
            );
            *context.thread_state.lock() = HostedThreadState::Stopped;
            return;
        }
    };

    let (dispatcher, event_loop) = DispatcherLoop::new(name);
    let anchor_id = handle.anchor_id();
    let mut target = VisualTarget::new(handle);
    target.set_root(Some(element));
    let mut state = HostedState { target };

    *context.thread_state.lock() = HostedThreadState::Running;

    let layout = context.layout.clone();
    context.parent.post(Box::new(move || layout.invalidate_measure()));

    state.after_dispatch();
    signal.signal(dispatcher);

    debug!(thread = %name, anchor = anchor_id, "hosted element thread running");
    event_loop.run(&mut state);

    state.target.dispose();
    *context.thread_state.lock() = HostedThreadState::Stopped;
    debug!(thread = %name, "hosted element thread stopped");
}

#[cfg(target_os = "windows")]
fn elevate_current_thread_priority(name: &str) {
    use windows::Win32::System::Threading::{GetCurrentThread, SetThreadPriority, THREAD_PRIORITY_HIGHEST};

    let result = unsafe { SetThreadPriority(GetCurrentThread(), THREAD_PRIORITY_HIGHEST) };
    match result {
        Ok(()) => debug!(thread = %name, "hosted thread priority raised"),
        Err(e) => warn!(thread = %name, error = %e, "failed to raise hosted thread priority"),
    }
}

#[cfg(not(target_os = "windows"))]
fn elevate_current_thread_priority(name: &str) {
    debug!(thread = %name, "priority control not available on this platform");
}
