//! Single-threaded cooperative event loop.
//!
//! A [`DispatcherLoop`] owns the state of the thread it runs on and executes queued work
//! items against it one at a time, in submission order. Other threads talk to it through
//! cloneable [`Dispatcher`] handles:
//!
//! ```text
//! parent thread                         hosted thread
//! ─────────────                         ─────────────
//! begin_invoke(f) ──┐                   DispatcherLoop::run(&mut state)
//! invoke_async(f) ──┼──► unbounded ──►    f(&mut state)
//! shutdown        ──┘      queue          after_dispatch(&mut state)
//!        ▲                                     │
//!        └──────── bounded(1) reply ◄──────────┘
//! ```

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tracing::{debug, error};

use crate::error::DispatchError;

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

enum Message<S> {
    Invoke(Job<S>),
    Shutdown,
}

/// Hook the loop runs after every work item.
pub trait DispatcherState {
    fn after_dispatch(&mut self) {}
}

impl DispatcherState for () {}

struct Shared {
    name: String,
    shutdown_started: AtomicBool,
    thread: OnceLock<ThreadId>,
}

impl Shared {
    fn on_loop_thread(&self) -> bool {
        self.thread.get() == Some(&thread::current().id())
    }
}

/// Handle for submitting work to a [`DispatcherLoop`].
pub struct Dispatcher<S> {
    tx: Sender<Message<S>>,
    shared: Arc<Shared>,
}

impl<S> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<S> std::fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.shared.name)
            .field(
                "shutdown_started",
                &self.shared.shutdown_started.load(Ordering::Acquire),
            )
            .finish()
    }
}

impl<S: 'static> Dispatcher<S> {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// True when called from the thread running this dispatcher's loop.
    pub fn check_access(&self) -> bool {
        self.shared.on_loop_thread()
    }

    pub fn has_shutdown_started(&self) -> bool {
        self.shared.shutdown_started.load(Ordering::Acquire)
    }

    /// Queue `work` without waiting for it.
    pub fn begin_invoke<F>(&self, work: F) -> Result<(), DispatchError>
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        if self.has_shutdown_started() {
            return Err(DispatchError::ShutDown);
        }
        self.tx
            .send(Message::Invoke(Box::new(work)))
            .map_err(|_| DispatchError::ShutDown)
    }

    /// Queue `work` and return an operation that can be waited on for its result.
    pub fn invoke_async<T, F>(&self, work: F) -> Result<DispatchOperation<T>, DispatchError>
    where
        T: Send + 'static,
        F: FnOnce(&mut S) -> T + Send + 'static,
    {
        let (reply_tx, reply_rx) = bounded(1);
        self.begin_invoke(move |state| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(state)))
                .map_err(|payload| DispatchError::Panicked(panic_message(payload.as_ref())));
            // The waiter may have given up already.
            let _ = reply_tx.send(outcome);
        })?;
        Ok(DispatchOperation {
            rx: reply_rx,
            shared: self.shared.clone(),
        })
    }

    /// Run `work` on the loop and block until it completes.
    pub fn invoke<T, F>(&self, work: F) -> Result<T, DispatchError>
    where
        T: Send + 'static,
        F: FnOnce(&mut S) -> T + Send + 'static,
    {
        if self.check_access() {
            return Err(DispatchError::WouldDeadlock);
        }
        self.invoke_async(work)?.wait()
    }

    /// Ask the loop to stop once the work queued ahead of this request has run.
    pub fn begin_invoke_shutdown(&self) {
        if self.shared.shutdown_started.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(dispatcher = %self.shared.name, "shutdown requested");
        let _ = self.tx.send(Message::Shutdown);
    }
}

/// Pending result of [`Dispatcher::invoke_async`].
#[must_use]
pub struct DispatchOperation<T> {
    rx: Receiver<Result<T, DispatchError>>,
    shared: Arc<Shared>,
}

impl<T> DispatchOperation<T> {
    pub fn wait(self) -> Result<T, DispatchError> {
        if self.shared.on_loop_thread() {
            return Err(DispatchError::WouldDeadlock);
        }
        self.rx.recv().unwrap_or(Err(DispatchError::Aborted))
    }

    pub fn wait_timeout(self, timeout: Duration) -> Result<T, DispatchError> {
        if self.shared.on_loop_thread() {
            return Err(DispatchError::WouldDeadlock);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => Err(DispatchError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(DispatchError::Aborted),
        }
    }
}

/// The receiving half: runs work items on the current thread.
pub struct DispatcherLoop<S> {
    rx: Receiver<Message<S>>,
    shared: Arc<Shared>,
}

impl<S: DispatcherState + 'static> DispatcherLoop<S> {
    pub fn new(name: impl Into<String>) -> (Dispatcher<S>, Self) {
        let (tx, rx) = unbounded();
        let shared = Arc::new(Shared {
            name: name.into(),
            shutdown_started: AtomicBool::new(false),
            thread: OnceLock::new(),
        });
        (
            Dispatcher {
                tx,
                shared: shared.clone(),
            },
            Self { rx, shared },
        )
    }

    /// Process work until shutdown is requested or every [`Dispatcher`] is dropped.
    ///
    /// Work still queued behind the shutdown request is dropped with the queue.
    pub fn run(self, state: &mut S) {
        let _ = self.shared.thread.set(thread::current().id());
        let name = self.shared.name.as_str();
        debug!(dispatcher = %name, "entering dispatcher loop");

        while let Ok(message) = self.rx.recv() {
            let job = match message {
                Message::Invoke(job) => job,
                Message::Shutdown => break,
            };

            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| job(state))) {
                error!(
                    dispatcher = %name,
                    panic = %panic_message(payload.as_ref()),
                    "dispatched work item panicked"
                );
            }
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| state.after_dispatch())) {
                error!(
                    dispatcher = %name,
                    panic = %panic_message(payload.as_ref()),
                    "post-dispatch pass panicked"
                );
            }
        }

        self.shared.shutdown_started.store(true, Ordering::Release);
        debug!(dispatcher = %name, "dispatcher loop exited");
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
