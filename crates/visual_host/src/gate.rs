//! One-shot "ready" gate between a spawning thread and the thread it spawned.

use crossbeam_channel::{bounded, Receiver, Sender};

/// Create a gate that is signalled at most once and waited on at most once.
pub fn ready_gate<T>() -> (ReadySignal<T>, ReadyGate<T>) {
    let (tx, rx) = bounded(1);
    (ReadySignal { tx }, ReadyGate { rx })
}

/// Signalling half, consumed by [`ReadySignal::signal`].
///
/// Dropping it without signalling releases the waiter with `None`.
pub struct ReadySignal<T> {
    tx: Sender<T>,
}

impl<T> ReadySignal<T> {
    pub fn signal(self, value: T) {
        let _ = self.tx.send(value);
    }
}

/// Waiting half, consumed by [`ReadyGate::wait`].
pub struct ReadyGate<T> {
    rx: Receiver<T>,
}

impl<T> ReadyGate<T> {
    pub fn wait(self) -> Option<T> {
        self.rx.recv().ok()
    }
}
